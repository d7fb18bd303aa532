//! Engine construction

use crate::config::EngineConfig;
use crate::errors::Result;
use crate::eviction::EvictionController;
use crate::listeners::ListenerRegistry;
use crate::memory::MemoryCache;
use crate::storage::PersistentStore;
use coldstore_core::RemoteSource;
use std::sync::Arc;

use super::internal::{EngineCounters, Tiers};
use super::types::{CacheEngine, EngineInner};

impl CacheEngine {
    /// Open the cache namespace and build an engine reading through `remote`.
    ///
    /// With a byte ceiling configured, whatever an earlier process left on
    /// disk is counted against it before any traffic is served.
    pub async fn new(remote: Arc<dyn RemoteSource>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let store = PersistentStore::open(config.base_dir.clone()).await?;
        let memory = Arc::new(MemoryCache::new());
        let eviction =
            EvictionController::new(store, Arc::clone(&memory), config.byte_limit()).await?;

        tracing::info!(
            base_dir = %config.base_dir.display(),
            auto_watch = config.auto_watch,
            limit = ?config.byte_limit(),
            current_bytes = eviction.current_bytes(),
            "Opened cache engine"
        );

        let tiers = Arc::new(Tiers {
            memory,
            eviction,
            remote,
            counters: EngineCounters::default(),
        });

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                tiers,
                listeners: ListenerRegistry::new(),
            }),
        })
    }

    /// Engine configured from `COLDSTORE_*` environment variables
    pub async fn from_env(remote: Arc<dyn RemoteSource>) -> Result<Self> {
        Self::new(remote, EngineConfig::from_env()?).await
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}
