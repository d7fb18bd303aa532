//! Read-only inspection of the engine

use crate::core::internal::EngineCounters;
use crate::core::types::CacheEngine;
use crate::errors::Result;
use crate::keys::{CacheKey, EntityKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Usage snapshot of one engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub current_bytes: u64,
    /// `None` when the cache is unlimited
    pub max_bytes: Option<u64>,
    /// 0.0 when the cache is unlimited
    pub percent_used: f64,
    pub cached_documents: usize,
    pub cached_collections: usize,
    pub watched_documents: usize,
    pub watched_collections: usize,
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub remote_fetches: u64,
    pub remote_failures: u64,
    pub decode_failures: u64,
    pub evictions: u64,
}

/// One cached document or query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntryInfo {
    pub key: CacheKey,
    pub kind: EntityKind,
    /// Persisted size, `None` for memory-only entries
    pub size_bytes: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
    pub in_memory: bool,
    pub watched: bool,
}

/// Watched keys split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveWatchers {
    pub documents: Vec<CacheKey>,
    pub collections: Vec<CacheKey>,
}

impl ActiveWatchers {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty() && self.collections.is_empty()
    }
}

impl CacheEngine {
    pub fn stats(&self) -> CacheStats {
        let tiers = &self.inner.tiers;
        let counters = &tiers.counters;
        let current_bytes = tiers.eviction.current_bytes();
        let max_bytes = tiers.eviction.limit();

        CacheStats {
            current_bytes,
            max_bytes,
            percent_used: percent_of(current_bytes, max_bytes),
            cached_documents: tiers.memory.document_count(),
            cached_collections: tiers.memory.collection_count(),
            watched_documents: self.inner.listeners.watched(EntityKind::Document).len(),
            watched_collections: self.inner.listeners.watched(EntityKind::Query).len(),
            memory_hits: EngineCounters::read(&counters.memory_hits),
            disk_hits: EngineCounters::read(&counters.disk_hits),
            remote_fetches: EngineCounters::read(&counters.remote_fetches),
            remote_failures: EngineCounters::read(&counters.remote_failures),
            decode_failures: EngineCounters::read(&counters.decode_failures),
            evictions: tiers.eviction.evictions(),
        }
    }

    /// Bytes currently tracked against the ceiling
    pub fn current_cache_size(&self) -> u64 {
        self.inner.tiers.eviction.current_bytes()
    }

    /// Cached documents, persisted or memory-only, sorted by key
    pub async fn cached_documents(&self) -> Result<Vec<CachedEntryInfo>> {
        self.cached_entries(EntityKind::Document).await
    }

    /// Cached query results, persisted or memory-only, sorted by key
    pub async fn cached_collections(&self) -> Result<Vec<CachedEntryInfo>> {
        self.cached_entries(EntityKind::Query).await
    }

    async fn cached_entries(&self, kind: EntityKind) -> Result<Vec<CachedEntryInfo>> {
        let tiers = &self.inner.tiers;
        let store = tiers.eviction.store();
        let mut entries = BTreeMap::new();

        for file in store.list().await? {
            let Some((file_kind, key)) = store.entry_for_path(&file.path) else {
                continue;
            };
            if file_kind != kind {
                continue;
            }
            entries.insert(
                key.clone(),
                CachedEntryInfo {
                    in_memory: tiers.memory.contains(kind, &key),
                    watched: self.inner.listeners.is_watching(kind, &key),
                    key,
                    kind,
                    size_bytes: Some(file.size),
                    last_modified: Some(DateTime::<Utc>::from(file.modified)),
                },
            );
        }

        for key in tiers.memory.keys(kind) {
            if entries.contains_key(&key) {
                continue;
            }
            entries.insert(
                key.clone(),
                CachedEntryInfo {
                    in_memory: true,
                    watched: self.inner.listeners.is_watching(kind, &key),
                    key,
                    kind,
                    size_bytes: None,
                    last_modified: None,
                },
            );
        }

        Ok(entries.into_values().collect())
    }

    pub fn active_watchers(&self) -> ActiveWatchers {
        ActiveWatchers {
            documents: self.inner.listeners.watched(EntityKind::Document),
            collections: self.inner.listeners.watched(EntityKind::Query),
        }
    }

    /// Whether usage has reached `threshold_percent` of the ceiling; always
    /// false for an unlimited cache
    pub fn is_nearly_full(&self, threshold_percent: f64) -> bool {
        let tiers = &self.inner.tiers;
        match tiers.eviction.limit() {
            None => false,
            Some(max) => percent_of(tiers.eviction.current_bytes(), Some(max)) >= threshold_percent,
        }
    }
}

fn percent_of(current: u64, max: Option<u64>) -> f64 {
    match max {
        Some(max) if max > 0 => current as f64 / max as f64 * 100.0,
        _ => 0.0,
    }
}
