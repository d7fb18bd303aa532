//! Explicit watch management

use crate::core::types::CacheEngine;
use crate::errors::Result;
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::{DocumentRef, Query};

impl CacheEngine {
    /// Keep a document fresh from remote change events. Watching an already
    /// watched document does nothing.
    pub async fn watch(&self, reference: &DocumentRef) -> Result<()> {
        self.inner
            .listeners
            .watch_document(&self.inner.tiers, reference)
            .await
            .map(drop)
    }

    /// Stop watching a document; cached data stays in place.
    /// Returns whether a subscription was cancelled.
    pub async fn unwatch(&self, reference: &DocumentRef) -> bool {
        self.inner
            .listeners
            .unwatch(EntityKind::Document, &CacheKey::for_document(reference))
            .await
    }

    /// Keep a query's result set fresh from remote change events
    pub async fn watch_collection(&self, query: &Query) -> Result<()> {
        self.inner
            .listeners
            .watch_query(&self.inner.tiers, query)
            .await
            .map(drop)
    }

    pub async fn unwatch_collection(&self, query: &Query) -> Result<bool> {
        let key = CacheKey::for_query(query)?;
        Ok(self.inner.listeners.unwatch(EntityKind::Query, &key).await)
    }

    pub fn is_watching(&self, reference: &DocumentRef) -> bool {
        self.inner
            .listeners
            .is_watching(EntityKind::Document, &CacheKey::for_document(reference))
    }

    pub fn is_watching_collection(&self, query: &Query) -> Result<bool> {
        let key = CacheKey::for_query(query)?;
        Ok(self.inner.listeners.is_watching(EntityKind::Query, &key))
    }
}
