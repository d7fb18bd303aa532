//! Live remote subscriptions, at most one per key
//!
//! Each watched key owns a spawned task that drains the remote change stream
//! and applies every event through [`Tiers`]: persisted state first, then the
//! memory entry. Events for one key are therefore applied strictly in order.
//! Cancelling sends a stop signal and waits for the task, so once
//! `unwatch`/`dispose_all` returns no further event lands for that key.

use crate::core::internal::Tiers;
use crate::entry::{CachedDocument, CachedQueryResult};
use crate::errors::{CacheError, Result};
use crate::keys::{CacheKey, EntityKind};
use coldstore_core::{DocumentRef, Query};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{BoxStream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Cancel capability for one running listener task
struct Subscription {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    fn spawn<F>(task: impl FnOnce(oneshot::Receiver<()>) -> F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        Self {
            stop: Some(stop_tx),
            handle: Some(tokio::spawn(task(stop_rx))),
        }
    }

    /// Stop the task and wait until it has finished
    async fn cancel(mut self, key: &CacheKey) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::warn!(key = %key, "Listener task panicked");
                }
            }
        }
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Watch state for documents and queries of one engine
#[derive(Default)]
pub struct ListenerRegistry {
    documents: DashMap<CacheKey, Subscription>,
    collections: DashMap<CacheKey, Subscription>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self, kind: EntityKind) -> &DashMap<CacheKey, Subscription> {
        match kind {
            EntityKind::Document => &self.documents,
            EntityKind::Query => &self.collections,
        }
    }

    pub fn is_watching(&self, kind: EntityKind, key: &CacheKey) -> bool {
        self.subscriptions(kind).contains_key(key)
    }

    /// Watched keys of one kind, sorted
    pub fn watched(&self, kind: EntityKind) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self
            .subscriptions(kind)
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn watch_count(&self) -> usize {
        self.documents.len() + self.collections.len()
    }

    /// Start listening to a document; returns false if it was already watched
    pub(crate) async fn watch_document(
        &self,
        tiers: &Arc<Tiers>,
        reference: &DocumentRef,
    ) -> Result<bool> {
        let key = CacheKey::for_document(reference);
        if self.is_watching(EntityKind::Document, &key) {
            return Ok(false);
        }

        let changes = tiers
            .remote
            .subscribe_document(reference)
            .await
            .map_err(|e| CacheError::remote("subscribe document", e))?;
        let task_tiers = Arc::clone(tiers);
        let task_key = key.clone();
        let subscription = Subscription::spawn(move |stop| {
            listen(changes, stop, task_key, move |key, snapshot| {
                let tiers = Arc::clone(&task_tiers);
                async move {
                    tiers
                        .apply_document(&key, CachedDocument::from(snapshot))
                        .await
                        .map(drop)
                }
            })
        });

        Ok(self.register(EntityKind::Document, key, subscription).await)
    }

    /// Start listening to a query's result set; returns false if it was already watched
    pub(crate) async fn watch_query(&self, tiers: &Arc<Tiers>, query: &Query) -> Result<bool> {
        let key = CacheKey::for_query(query)?;
        if self.is_watching(EntityKind::Query, &key) {
            return Ok(false);
        }

        let changes = tiers
            .remote
            .subscribe_query(query)
            .await
            .map_err(|e| CacheError::remote("subscribe query", e))?;
        let task_tiers = Arc::clone(tiers);
        let task_key = key.clone();
        let subscription = Subscription::spawn(move |stop| {
            listen(changes, stop, task_key, move |key, snapshots| {
                let tiers = Arc::clone(&task_tiers);
                async move {
                    tiers
                        .apply_collection(&key, CachedQueryResult::from(snapshots))
                        .await
                        .map(drop)
                }
            })
        });

        Ok(self.register(EntityKind::Query, key, subscription).await)
    }

    async fn register(&self, kind: EntityKind, key: CacheKey, subscription: Subscription) -> bool {
        // A concurrent watch may have registered while we were subscribing
        let duplicate = match self.subscriptions(kind).entry(key.clone()) {
            Entry::Occupied(_) => Some(subscription),
            Entry::Vacant(slot) => {
                slot.insert(subscription);
                None
            }
        };
        match duplicate {
            Some(subscription) => {
                subscription.cancel(&key).await;
                false
            }
            None => {
                tracing::debug!(key = %key, kind = %kind, "Started watching");
                true
            }
        }
    }

    /// Stop listening to one key; returns false if it was not watched
    pub async fn unwatch(&self, kind: EntityKind, key: &CacheKey) -> bool {
        let Some((key, subscription)) = self.subscriptions(kind).remove(key) else {
            return false;
        };
        subscription.cancel(&key).await;
        tracing::debug!(key = %key, kind = %kind, "Stopped watching");
        true
    }

    /// Cancel every subscription of both kinds
    pub async fn dispose_all(&self) {
        for kind in [EntityKind::Document, EntityKind::Query] {
            for key in self.watched(kind) {
                self.unwatch(kind, &key).await;
            }
        }
    }

    /// Abort every task without waiting; used when the owner is dropped
    pub(crate) fn abort_all(&self) {
        for mut entry in self.documents.iter_mut() {
            entry.value_mut().abort();
        }
        for mut entry in self.collections.iter_mut() {
            entry.value_mut().abort();
        }
        self.documents.clear();
        self.collections.clear();
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("documents", &self.documents.len())
            .field("collections", &self.collections.len())
            .finish()
    }
}

/// Drain `changes` until stopped or the stream ends, applying events in order
async fn listen<T, A, Fut>(
    mut changes: BoxStream<'static, coldstore_core::Result<T>>,
    mut stop: oneshot::Receiver<()>,
    key: CacheKey,
    apply: A,
) where
    T: Send + 'static,
    A: Fn(CacheKey, T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            next = changes.next() => match next {
                Some(Ok(event)) => {
                    if let Err(e) = apply(key.clone(), event).await {
                        tracing::warn!(key = %key, error = %e, "Failed to apply remote change");
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(key = %key, error = %e, "Remote subscription reported an error");
                }
                None => {
                    tracing::debug!(key = %key, "Remote subscription ended");
                    break;
                }
            },
        }
    }
}
