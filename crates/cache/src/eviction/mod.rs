//! Size-bounded eviction of persisted entries
//!
//! Every write and delete against the persistent tier goes through the
//! [`EvictionController`] so the usage ledger always matches what is on disk.
//! When the running total exceeds the ceiling, the oldest files by
//! modification time are deleted (ties keep listing order) together with
//! their memory entries until usage is back under the ceiling.
//!
//! Admission is a soft pre-check: a write is attempted only while usage is
//! strictly below the ceiling, so one write may overshoot and the overshoot
//! is corrected right after it lands.

mod ledger;

pub use ledger::UsageLedger;

use crate::errors::Result;
use crate::memory::MemoryCache;
use crate::storage::PersistentStore;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct EvictionController {
    store: PersistentStore,
    memory: Arc<MemoryCache>,
    ledger: Mutex<UsageLedger>,
    limit: Option<u64>,
    enforcing: tokio::sync::Mutex<()>,
    evictions: AtomicU64,
}

impl EvictionController {
    /// Build a controller; with a ceiling, the existing namespace is walked
    /// once so leftovers from earlier runs count against it.
    pub async fn new(
        store: PersistentStore,
        memory: Arc<MemoryCache>,
        limit: Option<u64>,
    ) -> Result<Self> {
        let mut ledger = UsageLedger::new();
        if limit.is_some() {
            for file in store.list().await? {
                ledger.record(&file.path, Some(file.size));
            }
            tracing::debug!(
                files = ledger.len(),
                bytes = ledger.total(),
                "Loaded persisted cache usage"
            );
        }

        Ok(Self {
            store,
            memory,
            ledger: Mutex::new(ledger),
            limit,
            enforcing: tokio::sync::Mutex::new(()),
            evictions: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn current_bytes(&self) -> u64 {
        self.ledger.lock().total()
    }

    pub fn tracked_files(&self) -> usize {
        self.ledger.lock().len()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Whether a new persistent write may start now
    pub fn admits_write(&self) -> bool {
        match self.limit {
            None => true,
            Some(max) => self.current_bytes() < max,
        }
    }

    /// Persist `bytes` at `path` if admitted; returns whether the write happened
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<bool> {
        if !self.admits_write() {
            tracing::debug!(
                path = %path.display(),
                current = self.current_bytes(),
                "Cache at capacity, skipping persistent write"
            );
            return Ok(false);
        }
        let size = self.store.write(path, bytes).await?;
        self.record_size(path, Some(size)).await?;
        Ok(true)
    }

    /// Delete the entry at `path`; returns whether a file was removed
    pub async fn delete(&self, path: &Path) -> Result<bool> {
        let removed = self.store.delete(path).await?;
        self.record_size(path, None).await?;
        Ok(removed)
    }

    /// Track the new size of `path` (or its removal) and enforce the ceiling
    pub async fn record_size(&self, path: &Path, size: Option<u64>) -> Result<()> {
        let over = {
            let mut ledger = self.ledger.lock();
            ledger.record(path, size);
            self.over_limit(ledger.total())
        };
        if over {
            self.enforce().await?;
        }
        Ok(())
    }

    /// Forget all tracked sizes
    pub fn reset(&self) {
        self.ledger.lock().clear();
    }

    fn over_limit(&self, total: u64) -> bool {
        self.limit.is_some_and(|max| total > max)
    }

    async fn enforce(&self) -> Result<()> {
        let _guard = self.enforcing.lock().await;
        if !self.over_limit(self.current_bytes()) {
            return Ok(());
        }

        let mut files = self.store.list().await?;
        // Stable sort keeps listing order for equal timestamps
        files.sort_by_key(|file| file.modified);

        let before = self.current_bytes();
        let mut evicted = 0u64;
        for file in files {
            if !self.over_limit(self.current_bytes()) {
                break;
            }
            if let Err(e) = self.store.delete(&file.path).await {
                tracing::warn!(
                    path = %file.path.display(),
                    error = %e,
                    "Failed to evict cache entry"
                );
                continue;
            }
            self.ledger.lock().record(&file.path, None);
            if let Some((kind, key)) = self.store.entry_for_path(&file.path) {
                self.memory.remove(kind, &key);
            }
            evicted += 1;
        }

        self.evictions.fetch_add(evicted, Ordering::Relaxed);
        tracing::info!(
            evicted,
            freed = before.saturating_sub(self.current_bytes()),
            current = self.current_bytes(),
            "Evicted least recently modified cache entries"
        );
        Ok(())
    }
}

impl std::fmt::Debug for EvictionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionController")
            .field("base_dir", &self.store.base_dir())
            .field("limit", &self.limit)
            .field("current_bytes", &self.current_bytes())
            .finish()
    }
}
