//! Boundary to the remote document database
//!
//! The cache only ever reads through this trait: single-document fetches,
//! query fetches and live subscriptions. Mutations happen elsewhere and reach
//! the cache as change events on a subscription.

use crate::codec::ReferenceResolver;
use crate::errors::Result;
use crate::types::{DocumentRef, Fields, Query};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// One document as reported by the remote database
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub reference: DocumentRef,
    pub exists: bool,
    pub data: Option<Fields>,
}

impl RemoteDocument {
    /// Snapshot of a document that exists with `data`
    pub fn found(reference: DocumentRef, data: Fields) -> Self {
        Self {
            reference,
            exists: true,
            data: Some(data),
        }
    }

    /// Snapshot of a document that does not exist
    pub fn missing(reference: DocumentRef) -> Self {
        Self {
            reference,
            exists: false,
            data: None,
        }
    }

    pub fn id(&self) -> &str {
        self.reference.id()
    }
}

/// Live feed of document snapshots. Dropping the stream ends the subscription.
pub type DocumentChanges = BoxStream<'static, Result<RemoteDocument>>;

/// Live feed of full query result sets. Dropping the stream ends the subscription.
pub type QueryChanges = BoxStream<'static, Result<Vec<RemoteDocument>>>;

/// Read-side client of the remote document database
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetch the current state of one document
    async fn fetch_document(&self, reference: &DocumentRef) -> Result<RemoteDocument>;

    /// Execute a query and return the matching documents in result order
    async fn fetch_query(&self, query: &Query) -> Result<Vec<RemoteDocument>>;

    /// Open a subscription delivering a snapshot on every change to the document
    async fn subscribe_document(&self, reference: &DocumentRef) -> Result<DocumentChanges>;

    /// Open a subscription delivering the full result set on every change
    async fn subscribe_query(&self, query: &Query) -> Result<QueryChanges>;

    /// Rebuild a handle from a persisted reference path
    fn resolve_reference(&self, path: &str) -> Option<DocumentRef> {
        DocumentRef::new(path).ok()
    }
}

/// Adapter so any remote can stand in as the codec's reference resolver
pub struct RemoteResolver<'a>(pub &'a dyn RemoteSource);

impl ReferenceResolver for RemoteResolver<'_> {
    fn resolve(&self, path: &str) -> Option<DocumentRef> {
        self.0.resolve_reference(path)
    }
}
