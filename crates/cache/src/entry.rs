//! Resolved entities handed back to callers

use coldstore_core::{DocumentRef, Fields, RemoteDocument, Value};

/// A document as seen by the cache.
///
/// Instances are never mutated; an update replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDocument {
    reference: DocumentRef,
    data: Option<Fields>,
    exists: bool,
}

impl CachedDocument {
    /// Document that exists with the given fields
    pub fn existing(reference: DocumentRef, data: Fields) -> Self {
        Self {
            reference,
            data: Some(data),
            exists: true,
        }
    }

    /// Document the remote reported as absent
    pub fn missing(reference: DocumentRef) -> Self {
        Self {
            reference,
            data: None,
            exists: false,
        }
    }

    /// Last path segment
    pub fn id(&self) -> &str {
        self.reference.id()
    }

    pub fn reference(&self) -> &DocumentRef {
        &self.reference
    }

    pub fn data(&self) -> Option<&Fields> {
        self.data.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Shortcut for a top-level field
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(field))
    }
}

impl From<RemoteDocument> for CachedDocument {
    fn from(snapshot: RemoteDocument) -> Self {
        Self {
            reference: snapshot.reference,
            exists: snapshot.exists,
            data: snapshot.data,
        }
    }
}

/// Ordered result set of a query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedQueryResult {
    documents: Vec<CachedDocument>,
}

impl CachedQueryResult {
    pub fn new(documents: Vec<CachedDocument>) -> Self {
        Self { documents }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[CachedDocument] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn size(&self) -> usize {
        self.documents.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CachedDocument> {
        self.documents.iter()
    }
}

impl From<Vec<RemoteDocument>> for CachedQueryResult {
    fn from(snapshots: Vec<RemoteDocument>) -> Self {
        Self::new(snapshots.into_iter().map(CachedDocument::from).collect())
    }
}

impl<'a> IntoIterator for &'a CachedQueryResult {
    type Item = &'a CachedDocument;
    type IntoIter = std::slice::Iter<'a, CachedDocument>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.iter()
    }
}
