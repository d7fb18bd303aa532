//! Process-lifetime memory tier

use crate::entry::{CachedDocument, CachedQueryResult};
use crate::keys::{CacheKey, EntityKind};
use dashmap::DashMap;
use std::sync::Arc;

/// Resolved documents and query results keyed by cache key
#[derive(Default)]
pub struct MemoryCache {
    documents: DashMap<CacheKey, Arc<CachedDocument>>,
    collections: DashMap<CacheKey, Arc<CachedQueryResult>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, key: &CacheKey) -> Option<Arc<CachedDocument>> {
        self.documents.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn collection(&self, key: &CacheKey) -> Option<Arc<CachedQueryResult>> {
        self.collections
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert_document(&self, key: CacheKey, document: Arc<CachedDocument>) {
        self.documents.insert(key, document);
    }

    pub fn insert_collection(&self, key: CacheKey, result: Arc<CachedQueryResult>) {
        self.collections.insert(key, result);
    }

    /// Drop one entry; returns whether anything was cached under the key
    pub fn remove(&self, kind: EntityKind, key: &CacheKey) -> bool {
        match kind {
            EntityKind::Document => self.documents.remove(key).is_some(),
            EntityKind::Query => self.collections.remove(key).is_some(),
        }
    }

    pub fn contains(&self, kind: EntityKind, key: &CacheKey) -> bool {
        match kind {
            EntityKind::Document => self.documents.contains_key(key),
            EntityKind::Query => self.collections.contains_key(key),
        }
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }

    pub fn keys(&self, kind: EntityKind) -> Vec<CacheKey> {
        match kind {
            EntityKind::Document => self.documents.iter().map(|e| e.key().clone()).collect(),
            EntityKind::Query => self.collections.iter().map(|e| e.key().clone()).collect(),
        }
    }

    pub fn clear(&self) {
        self.documents.clear();
        self.collections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coldstore_core::{DocumentRef, Fields};

    #[test]
    fn test_document_and_collection_namespaces_are_separate() {
        let cache = MemoryCache::new();
        let doc = DocumentRef::new("a/b").unwrap();
        let key = CacheKey::for_document(&doc);

        cache.insert_document(
            key.clone(),
            Arc::new(CachedDocument::existing(doc, Fields::new())),
        );
        assert!(cache.contains(EntityKind::Document, &key));
        assert!(!cache.contains(EntityKind::Query, &key));
        assert!(cache.collection(&key).is_none());

        assert!(!cache.remove(EntityKind::Query, &key));
        assert!(cache.remove(EntityKind::Document, &key));
        assert_eq!(cache.document_count(), 0);
    }

    #[test]
    fn test_replace_and_clear() {
        let cache = MemoryCache::new();
        let doc = DocumentRef::new("a/b").unwrap();
        let key = CacheKey::for_document(&doc);

        cache.insert_document(key.clone(), Arc::new(CachedDocument::missing(doc.clone())));
        cache.insert_document(
            key.clone(),
            Arc::new(CachedDocument::existing(doc, Fields::new())),
        );
        assert_eq!(cache.document_count(), 1);
        assert!(cache.document(&key).unwrap().exists());

        cache.insert_collection(key.clone(), Arc::new(CachedQueryResult::empty()));
        cache.clear();
        assert_eq!(cache.document_count(), 0);
        assert_eq!(cache.collection_count(), 0);
    }
}
