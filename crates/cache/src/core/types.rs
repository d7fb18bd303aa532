//! Engine type and its shared state

use crate::config::EngineConfig;
use crate::listeners::ListenerRegistry;
use std::sync::Arc;

use super::internal::Tiers;

/// Read-through, write-behind cache in front of a [`RemoteSource`](coldstore_core::RemoteSource)
#[derive(Clone)]
pub struct CacheEngine {
    pub(super) inner: Arc<EngineInner>,
}

pub(super) struct EngineInner {
    pub config: EngineConfig,
    pub tiers: Arc<Tiers>,
    pub listeners: ListenerRegistry,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        // Listener tasks only hold the tiers, so they must be stopped here
        self.listeners.abort_all();
    }
}

impl std::fmt::Debug for CacheEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("base_dir", &self.inner.config.base_dir)
            .field("auto_watch", &self.inner.config.auto_watch)
            .field("limit", &self.inner.tiers.eviction.limit())
            .field("documents", &self.inner.tiers.memory.document_count())
            .field("collections", &self.inner.tiers.memory.collection_count())
            .field("watchers", &self.inner.listeners.watch_count())
            .finish()
    }
}
