//! The document store contract.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use tokio::sync::mpsc;

use crate::document::{Document, Fields};
use crate::error::{Result, StoreError};
use crate::query::Query;

/// How `set` treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace every field.
    Overwrite,
    /// Write the given fields, keep the others.
    Merge,
}

/// Target of a live subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum Watch {
    /// A single document; snapshots hold zero or one document.
    Document(String),
    /// Every document matching a query, in query order.
    Query(Query),
}

/// One delivery of a live subscription: the full current result, or the
/// error the backend reported for this round.
pub type Snapshot = std::result::Result<Vec<Document>, StoreError>;

/// Hosted document database.
///
/// Every write is atomic per document. Nothing is atomic across documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Document>>;

    async fn set(&self, path: &str, fields: Fields, mode: WriteMode) -> Result<()>;

    /// Write the document only if the path is free.
    ///
    /// Returns `false`, leaving the stored document untouched, when a
    /// document already exists at `path`.
    async fn create(&self, path: &str, fields: Fields) -> Result<bool>;

    /// Merge fields into an existing document. Fails with
    /// [`StoreError::NotFound`] when there is none.
    async fn update(&self, path: &str, fields: Fields) -> Result<()>;

    /// Insert into a collection under a store-generated id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String>;

    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Start a live subscription. The current state is delivered first.
    fn subscribe(&self, target: Watch) -> Result<Subscription>;
}

type Release = Box<dyn FnOnce() + Send>;

/// Handle on a live subscription.
///
/// The backing listener is released exactly once: by [`Subscription::close`]
/// or, failing that, when the handle is dropped.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<Snapshot>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(
        events: mpsc::UnboundedReceiver<Snapshot>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            release: Some(Box::new(release)),
        }
    }

    /// Wait for the next snapshot. `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.release.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// Take an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        if self.release.is_none() {
            return None;
        }
        self.events.try_recv().ok()
    }

    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            self.events.close();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl Stream for Subscription {
    type Item = Snapshot;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.release.is_none() {
            return Poll::Ready(None);
        }
        this.events.poll_recv(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
