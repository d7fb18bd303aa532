//! State shared between the engine and its listener tasks

use crate::entry::{CachedDocument, CachedQueryResult};
use crate::errors::Result;
use crate::eviction::EvictionController;
use crate::keys::{CacheKey, EntityKind};
use crate::memory::MemoryCache;
use crate::serialization;
use coldstore_core::{DocumentRef, Fields, RemoteResolver, RemoteSource};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Atomic counters behind [`CacheStats`](super::CacheStats)
#[derive(Debug, Default)]
pub(crate) struct EngineCounters {
    pub memory_hits: AtomicU64,
    pub disk_hits: AtomicU64,
    pub remote_fetches: AtomicU64,
    pub remote_failures: AtomicU64,
    pub decode_failures: AtomicU64,
}

impl EngineCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn read(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Memory tier, persistent tier and remote, as seen by readers and listeners.
///
/// Listener tasks hold an `Arc<Tiers>` rather than the engine itself so a
/// live subscription never keeps the engine alive.
pub(crate) struct Tiers {
    pub memory: Arc<MemoryCache>,
    pub eviction: EvictionController,
    pub remote: Arc<dyn RemoteSource>,
    pub counters: EngineCounters,
}

impl Tiers {
    pub fn path_for(&self, key: &CacheKey, kind: EntityKind) -> PathBuf {
        self.eviction.store().path_for(key, kind)
    }

    /// Disk tier lookup for a document; unreadable entries count as a miss
    pub async fn load_document(
        &self,
        reference: &DocumentRef,
        key: &CacheKey,
    ) -> Option<CachedDocument> {
        let bytes = self.read_entry(key, EntityKind::Document).await?;
        let resolver = RemoteResolver(self.remote.as_ref());
        match serialization::decode_document(key, &bytes, &resolver) {
            Ok(fields) => Some(CachedDocument::existing(reference.clone(), fields)),
            Err(e) => {
                EngineCounters::bump(&self.counters.decode_failures);
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Disk tier lookup for a query result
    pub async fn load_collection(&self, key: &CacheKey) -> Option<CachedQueryResult> {
        let bytes = self.read_entry(key, EntityKind::Query).await?;
        let resolver = RemoteResolver(self.remote.as_ref());
        match serialization::decode_query(key, &bytes, &resolver) {
            Ok(result) => Some(result),
            Err(e) => {
                EngineCounters::bump(&self.counters.decode_failures);
                tracing::warn!(key = %key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    async fn read_entry(&self, key: &CacheKey, kind: EntityKind) -> Option<Vec<u8>> {
        let path = self.path_for(key, kind);
        match self.eviction.store().read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read cache entry");
                None
            }
        }
    }

    /// Persist an existing document; a missing one has its entry removed
    pub async fn persist_document(&self, key: &CacheKey, document: &CachedDocument) -> Result<()> {
        let path = self.path_for(key, EntityKind::Document);
        if !document.exists() {
            self.eviction.delete(&path).await?;
            return Ok(());
        }
        let empty = Fields::new();
        let bytes = serialization::encode_document(key, document.data().unwrap_or(&empty))?;
        self.eviction.write(&path, &bytes).await?;
        Ok(())
    }

    pub async fn persist_collection(&self, key: &CacheKey, result: &CachedQueryResult) -> Result<()> {
        let path = self.path_for(key, EntityKind::Query);
        let bytes = serialization::encode_query(key, result)?;
        self.eviction.write(&path, &bytes).await?;
        Ok(())
    }

    /// Persist first, then replace the memory entry
    pub async fn apply_document(
        &self,
        key: &CacheKey,
        document: CachedDocument,
    ) -> Result<Arc<CachedDocument>> {
        self.persist_document(key, &document).await?;
        let document = Arc::new(document);
        self.memory
            .insert_document(key.clone(), Arc::clone(&document));
        Ok(document)
    }

    pub async fn apply_collection(
        &self,
        key: &CacheKey,
        result: CachedQueryResult,
    ) -> Result<Arc<CachedQueryResult>> {
        self.persist_collection(key, &result).await?;
        let result = Arc::new(result);
        self.memory
            .insert_collection(key.clone(), Arc::clone(&result));
        Ok(result)
    }
}
