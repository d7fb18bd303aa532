//! Test doubles and helpers
//!
//! [`MockRemote`] is an in-memory [`RemoteSource`] that tests can script:
//! seed documents and query results, take the connection down, count calls and
//! push change events into live subscriptions. Subscriptions do not emit an
//! initial snapshot; every event is pushed explicitly by the test.

use crate::constants::COLDSTORE_LOG_VAR;
use crate::errors::{Error, Result};
use crate::remote::{DocumentChanges, QueryChanges, RemoteDocument, RemoteSource};
use crate::types::{DocumentRef, Fields, Query};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

type DocumentSender = UnboundedSender<Result<RemoteDocument>>;
type QuerySender = UnboundedSender<Result<Vec<RemoteDocument>>>;

#[derive(Default)]
struct MockState {
    documents: HashMap<String, Fields>,
    query_results: HashMap<String, Vec<RemoteDocument>>,
    document_subscribers: HashMap<String, Vec<DocumentSender>>,
    query_subscribers: HashMap<String, Vec<QuerySender>>,
}

/// Scriptable in-memory remote database
pub struct MockRemote {
    state: Mutex<MockState>,
    connected: AtomicBool,
    document_fetches: AtomicUsize,
    query_fetches: AtomicUsize,
    subscriptions_opened: AtomicUsize,
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            connected: AtomicBool::new(true),
            document_fetches: AtomicUsize::new(0),
            query_fetches: AtomicUsize::new(0),
            subscriptions_opened: AtomicUsize::new(0),
        }
    }

    /// Store a document; fetches return it as existing
    pub fn set_document(&self, reference: &DocumentRef, data: Fields) {
        self.state
            .lock()
            .documents
            .insert(reference.path().to_string(), data);
    }

    pub fn remove_document(&self, reference: &DocumentRef) {
        self.state.lock().documents.remove(reference.path());
    }

    /// Script the result of a specific query
    pub fn set_query_result(&self, query: &Query, documents: Vec<RemoteDocument>) -> Result<()> {
        let key = query.canonical_json()?;
        self.state.lock().query_results.insert(key, documents);
        Ok(())
    }

    /// Simulate losing or regaining the connection; every call fails while down
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn document_fetches(&self) -> usize {
        self.document_fetches.load(Ordering::SeqCst)
    }

    pub fn query_fetches(&self) -> usize {
        self.query_fetches.load(Ordering::SeqCst)
    }

    /// Total subscriptions ever opened
    pub fn subscriptions_opened(&self) -> usize {
        self.subscriptions_opened.load(Ordering::SeqCst)
    }

    /// Subscriptions whose consumer is still attached
    pub fn live_subscriptions(&self) -> usize {
        let state = self.state.lock();
        let documents = state
            .document_subscribers
            .values()
            .flatten()
            .filter(|tx| !tx.is_closed())
            .count();
        let queries = state
            .query_subscribers
            .values()
            .flatten()
            .filter(|tx| !tx.is_closed())
            .count();
        documents + queries
    }

    /// Deliver a document snapshot to every live subscriber; returns how many received it
    pub fn push_document_change(&self, snapshot: RemoteDocument) -> usize {
        let mut state = self.state.lock();
        match &snapshot.data {
            Some(data) if snapshot.exists => {
                state
                    .documents
                    .insert(snapshot.reference.path().to_string(), data.clone());
            }
            _ => {
                state.documents.remove(snapshot.reference.path());
            }
        }
        let path = snapshot.reference.path().to_string();
        deliver(
            state.document_subscribers.get_mut(&path),
            || Ok(snapshot.clone()),
        )
    }

    /// Deliver a full result set to every live subscriber of `query`
    pub fn push_query_change(&self, query: &Query, documents: Vec<RemoteDocument>) -> Result<usize> {
        let key = query.canonical_json()?;
        let mut state = self.state.lock();
        state.query_results.insert(key.clone(), documents.clone());
        Ok(deliver(state.query_subscribers.get_mut(&key), || {
            Ok(documents.clone())
        }))
    }

    /// Deliver a stream error to subscribers of a document
    pub fn push_document_error(&self, reference: &DocumentRef, message: &str) -> usize {
        let mut state = self.state.lock();
        deliver(
            state.document_subscribers.get_mut(reference.path()),
            || Err(Error::subscription(reference.path(), message)),
        )
    }

    fn ensure_connected(&self, operation: &str) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::remote(operation, "remote database unavailable"))
        }
    }
}

fn deliver<T>(
    senders: Option<&mut Vec<UnboundedSender<T>>>,
    item: impl Fn() -> T,
) -> usize {
    let Some(senders) = senders else {
        return 0;
    };
    senders.retain(|tx| !tx.is_closed());
    senders.iter().filter(|tx| tx.send(item()).is_ok()).count()
}

#[async_trait]
impl RemoteSource for MockRemote {
    async fn fetch_document(&self, reference: &DocumentRef) -> Result<RemoteDocument> {
        self.document_fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected("fetch document")?;
        let state = self.state.lock();
        Ok(match state.documents.get(reference.path()) {
            Some(data) => RemoteDocument::found(reference.clone(), data.clone()),
            None => RemoteDocument::missing(reference.clone()),
        })
    }

    async fn fetch_query(&self, query: &Query) -> Result<Vec<RemoteDocument>> {
        self.query_fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected("fetch query")?;
        let key = query.canonical_json()?;
        let state = self.state.lock();
        if let Some(scripted) = state.query_results.get(&key) {
            return Ok(scripted.clone());
        }
        if !query.is_unfiltered() {
            return Err(Error::remote(
                "fetch query",
                format!("no scripted result for '{query}'"),
            ));
        }
        // Unfiltered queries list the collection's direct children in path order
        let mut children: Vec<RemoteDocument> = state
            .documents
            .iter()
            .filter_map(|(path, data)| {
                let reference = DocumentRef::new(path.as_str()).ok()?;
                (reference.parent_path() == Some(query.collection_path()))
                    .then(|| RemoteDocument::found(reference, data.clone()))
            })
            .collect();
        children.sort_by(|a, b| a.reference.cmp(&b.reference));
        Ok(children)
    }

    async fn subscribe_document(&self, reference: &DocumentRef) -> Result<DocumentChanges> {
        self.ensure_connected("subscribe document")?;
        self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded_channel();
        self.state
            .lock()
            .document_subscribers
            .entry(reference.path().to_string())
            .or_default()
            .push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn subscribe_query(&self, query: &Query) -> Result<QueryChanges> {
        self.ensure_connected("subscribe query")?;
        let key = query.canonical_json()?;
        self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded_channel();
        self.state
            .lock()
            .query_subscribers
            .entry(key)
            .or_default()
            .push(tx);
        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

/// Install a fmt subscriber for tests, filtered by `COLDSTORE_LOG` (default `warn`)
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(COLDSTORE_LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
