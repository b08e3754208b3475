//! In-process [`DocumentStore`] with live subscriptions.
//!
//! Used as the substitutable fake for the hosted database. Besides the
//! store contract it can be told to fail selected operations and to push
//! listener errors, which is how the remote-failure paths are exercised.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::document::{check_collection_path, split_doc_path, Document, Fields};
use crate::error::{Result, StoreError};
use crate::query::Query;
use crate::store::{DocumentStore, Snapshot, Subscription, Watch, WriteMode};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Get,
    Set,
    Create,
    Update,
    Add,
    Query,
    Subscribe,
}

struct Listener {
    target: Watch,
    tx: mpsc::UnboundedSender<Snapshot>,
}

#[derive(Default)]
struct Inner {
    docs: BTreeMap<String, Fields>,
    listeners: HashMap<u64, Listener>,
    next_listener: u64,
    failing: HashSet<Op>,
}

impl Inner {
    fn check(&self, op: Op) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} rejected by backend")));
        }
        Ok(())
    }

    fn document(&self, path: &str) -> Option<Document> {
        self.docs
            .get(path)
            .map(|fields| Document::new(path, fields.clone()))
    }

    fn collection(&self, collection: &str) -> Vec<Document> {
        let prefix = format!("{collection}/");
        self.docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter(|(path, _)| !path[prefix.len()..].contains('/'))
            .map(|(path, fields)| Document::new(path.as_str(), fields.clone()))
            .collect()
    }

    fn snapshot(&self, target: &Watch) -> Vec<Document> {
        match target {
            Watch::Document(path) => self.document(path).into_iter().collect(),
            Watch::Query(query) => query.apply(self.collection(&query.collection)),
        }
    }

    /// Push a fresh snapshot to every listener affected by a write to `path`.
    fn notify(&mut self, path: &str) {
        let parent = path.rsplit_once('/').map(|(parent, _)| parent);
        let affected: Vec<u64> = self
            .listeners
            .iter()
            .filter(|(_, l)| match &l.target {
                Watch::Document(p) => p == path,
                Watch::Query(q) => Some(q.collection.as_str()) == parent,
            })
            .map(|(id, _)| *id)
            .collect();

        for id in affected {
            let Some(listener) = self.listeners.get(&id) else {
                continue;
            };
            let snapshot = self.snapshot(&listener.target);
            if listener.tx.send(Ok(snapshot)).is_err() {
                trace!(listener = id, "dropping listener with closed receiver");
                self.listeners.remove(&id);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every listed operation fail with [`StoreError::Unavailable`]
    /// until [`MemoryStore::heal`] is called.
    pub fn fail_ops(&self, ops: &[Op]) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing.extend(ops.iter().copied());
        }
    }

    pub fn heal(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failing.clear();
        }
    }

    /// Deliver an error to every live listener, as a backend would on a
    /// permission or network failure.
    pub fn emit_listener_error(&self, message: &str) {
        if let Ok(inner) = self.inner.lock() {
            for listener in inner.listeners.values() {
                let _ = listener
                    .tx
                    .send(Err(StoreError::Unavailable(message.to_string())));
            }
        }
    }

    /// Number of listeners still registered.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|i| i.listeners.len()).unwrap_or(0)
    }

    /// Number of documents directly inside a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .map(|i| i.collection(collection).len())
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>> {
        split_doc_path(path)?;
        let inner = self.lock()?;
        inner.check(Op::Get)?;
        Ok(inner.document(path))
    }

    async fn set(&self, path: &str, fields: Fields, mode: WriteMode) -> Result<()> {
        split_doc_path(path)?;
        let mut inner = self.lock()?;
        inner.check(Op::Set)?;

        let existing = match mode {
            WriteMode::Merge => inner.docs.get_mut(path),
            WriteMode::Overwrite => None,
        };
        if let Some(existing) = existing {
            existing.extend(fields);
        } else {
            inner.docs.insert(path.to_string(), fields);
        }
        debug!(path, ?mode, "set document");
        inner.notify(path);
        Ok(())
    }

    async fn create(&self, path: &str, fields: Fields) -> Result<bool> {
        split_doc_path(path)?;
        let mut inner = self.lock()?;
        inner.check(Op::Create)?;

        if inner.docs.contains_key(path) {
            debug!(path, "create skipped, document exists");
            return Ok(false);
        }
        inner.docs.insert(path.to_string(), fields);
        debug!(path, "created document");
        inner.notify(path);
        Ok(true)
    }

    async fn update(&self, path: &str, fields: Fields) -> Result<()> {
        split_doc_path(path)?;
        let mut inner = self.lock()?;
        inner.check(Op::Update)?;

        let existing = inner
            .docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        existing.extend(fields);
        debug!(path, "updated document");
        inner.notify(path);
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String> {
        check_collection_path(collection)?;
        let mut inner = self.lock()?;
        inner.check(Op::Add)?;

        let id = Uuid::new_v4().simple().to_string();
        let path = format!("{collection}/{id}");
        inner.docs.insert(path.clone(), fields);
        debug!(path = %path, "added document");
        inner.notify(&path);
        Ok(id)
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        check_collection_path(&query.collection)?;
        let inner = self.lock()?;
        inner.check(Op::Query)?;
        Ok(query.apply(inner.collection(&query.collection)))
    }

    fn subscribe(&self, target: Watch) -> Result<Subscription> {
        match &target {
            Watch::Document(path) => {
                split_doc_path(path)?;
            }
            Watch::Query(query) => check_collection_path(&query.collection)?,
        }

        let mut inner = self.lock()?;
        inner.check(Op::Subscribe)?;

        let (tx, rx) = mpsc::unbounded_channel();
        // initial state; the receiver is alive so this cannot fail
        let _ = tx.send(Ok(inner.snapshot(&target)));

        let id = inner.next_listener;
        inner.next_listener += 1;
        inner.listeners.insert(id, Listener { target, tx });
        debug!(listener = id, "listener registered");

        let registry = Arc::downgrade(&self.inner);
        Ok(Subscription::new(rx, move || {
            if let Some(inner) = registry.upgrade() {
                if let Ok(mut inner) = inner.lock() {
                    inner.listeners.remove(&id);
                    debug!(listener = id, "listener released");
                }
            }
        }))
    }
}
