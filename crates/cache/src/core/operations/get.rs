//! Document reads

use crate::core::internal::EngineCounters;
use crate::core::types::CacheEngine;
use crate::entry::CachedDocument;
use crate::errors::Result;
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::DocumentRef;
use std::sync::Arc;

impl CacheEngine {
    /// Read a document through memory, disk and remote, in that order.
    ///
    /// A document the remote reports as absent comes back with
    /// `exists() == false` and is neither persisted nor cached. `Ok(None)`
    /// means every tier failed to produce an answer, typically because the
    /// remote is unreachable. Only filesystem failures while persisting a
    /// fresh result are returned as errors.
    pub async fn get(&self, reference: &DocumentRef) -> Result<Option<Arc<CachedDocument>>> {
        let tiers = &self.inner.tiers;
        let key = CacheKey::for_document(reference);

        if self.inner.config.auto_watch
            && !self.inner.listeners.is_watching(EntityKind::Document, &key)
        {
            if let Err(e) = self.inner.listeners.watch_document(tiers, reference).await {
                tracing::warn!(key = %key, error = %e, "Auto-watch failed");
            }
        }

        if let Some(document) = tiers.memory.document(&key) {
            EngineCounters::bump(&tiers.counters.memory_hits);
            tracing::debug!(key = %key, "Memory hit");
            return Ok(Some(document));
        }

        if let Some(document) = tiers.load_document(reference, &key).await {
            EngineCounters::bump(&tiers.counters.disk_hits);
            tracing::debug!(key = %key, "Disk hit");
            let document = Arc::new(document);
            tiers
                .memory
                .insert_document(key, Arc::clone(&document));
            return Ok(Some(document));
        }

        EngineCounters::bump(&tiers.counters.remote_fetches);
        let snapshot = match tiers.remote.fetch_document(reference).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                EngineCounters::bump(&tiers.counters.remote_failures);
                tracing::warn!(key = %key, error = %e, "Remote fetch failed");
                return Ok(None);
            }
        };

        let document = CachedDocument::from(snapshot);
        if !document.exists() {
            tracing::debug!(key = %key, "Remote reports document missing");
            return Ok(Some(Arc::new(document)));
        }
        tiers.apply_document(&key, document).await.map(Some)
    }
}
