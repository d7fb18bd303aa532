//! Clearing and teardown

use crate::core::types::CacheEngine;
use crate::errors::Result;
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::{DocumentRef, Query};

impl CacheEngine {
    /// Remove one document from memory and disk, or with `None` wipe every
    /// cached document and query result. Watches are left running.
    pub async fn clear(&self, reference: Option<&DocumentRef>) -> Result<()> {
        match reference {
            Some(reference) => {
                self.clear_key(EntityKind::Document, CacheKey::for_document(reference))
                    .await
            }
            None => self.clear_all().await,
        }
    }

    /// Remove one query result from memory and disk
    pub async fn clear_collection(&self, query: &Query) -> Result<()> {
        self.clear_key(EntityKind::Query, CacheKey::for_query(query)?)
            .await
    }

    async fn clear_key(&self, kind: EntityKind, key: CacheKey) -> Result<()> {
        let tiers = &self.inner.tiers;
        tiers.memory.remove(kind, &key);
        let removed = tiers.eviction.delete(&tiers.path_for(&key, kind)).await?;
        tracing::debug!(key = %key, kind = %kind, removed, "Cleared cache entry");
        Ok(())
    }

    async fn clear_all(&self) -> Result<()> {
        let tiers = &self.inner.tiers;
        tiers.memory.clear();
        tiers.eviction.store().clear_all().await?;
        tiers.eviction.reset();
        tracing::info!(
            base_dir = %tiers.eviction.store().base_dir().display(),
            "Cleared cache"
        );
        Ok(())
    }

    /// Cancel every subscription and drop every memory entry. Persisted
    /// entries survive for the next engine. Safe to call more than once.
    pub async fn dispose(&self) {
        self.inner.listeners.dispose_all().await;
        self.inner.tiers.memory.clear();
        tracing::debug!("Disposed cache engine");
    }
}
