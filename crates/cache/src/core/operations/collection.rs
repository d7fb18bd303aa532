//! Query reads

use crate::core::internal::EngineCounters;
use crate::core::types::CacheEngine;
use crate::entry::CachedQueryResult;
use crate::errors::Result;
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::Query;
use std::sync::Arc;

impl CacheEngine {
    /// Read a query result through memory, disk and remote, in that order.
    ///
    /// A failed remote fetch yields an empty result that is not cached, so
    /// the next call tries the remote again.
    pub async fn get_collection(&self, query: &Query) -> Result<Arc<CachedQueryResult>> {
        let tiers = &self.inner.tiers;
        let key = CacheKey::for_query(query)?;

        if self.inner.config.auto_watch && !self.inner.listeners.is_watching(EntityKind::Query, &key)
        {
            if let Err(e) = self.inner.listeners.watch_query(tiers, query).await {
                tracing::warn!(key = %key, error = %e, "Auto-watch failed");
            }
        }

        if let Some(result) = tiers.memory.collection(&key) {
            EngineCounters::bump(&tiers.counters.memory_hits);
            tracing::debug!(key = %key, "Memory hit");
            return Ok(result);
        }

        if let Some(result) = tiers.load_collection(&key).await {
            EngineCounters::bump(&tiers.counters.disk_hits);
            tracing::debug!(key = %key, size = result.size(), "Disk hit");
            let result = Arc::new(result);
            tiers
                .memory
                .insert_collection(key, Arc::clone(&result));
            return Ok(result);
        }

        EngineCounters::bump(&tiers.counters.remote_fetches);
        match tiers.remote.fetch_query(query).await {
            Ok(snapshots) => {
                tiers
                    .apply_collection(&key, CachedQueryResult::from(snapshots))
                    .await
            }
            Err(e) => {
                EngineCounters::bump(&tiers.counters.remote_failures);
                tracing::warn!(key = %key, error = %e, "Remote query failed");
                Ok(Arc::new(CachedQueryResult::empty()))
            }
        }
    }
}
