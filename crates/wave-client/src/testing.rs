use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use wave_store::{
    Document, DocumentStore, Fields, FsBlobStore, MemoryStore, Query, RemoteStore, SessionIdentity,
    StoreError, Subscription, Watch, WriteMode,
};

use crate::config::ClientConfig;
use crate::state::AppState;

/// One shared backend and any number of signed-in clients on it.
pub(crate) struct World {
    pub mem: MemoryStore,
    pub blobs: Arc<FsBlobStore>,
    pub config: ClientConfig,
    _dir: TempDir,
}

impl World {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let blob_root = dir.path().join("blobs");
        let config = ClientConfig {
            blob_base_url: format!("file://{}", blob_root.display()),
            blob_root,
            max_file_size: 1024,
            log_filter: None,
        };
        let blobs = FsBlobStore::new(
            config.blob_root.clone(),
            config.blob_base_url.clone(),
            config.max_file_size,
        )
        .await
        .unwrap();

        Self {
            mem: MemoryStore::new(),
            blobs: Arc::new(blobs),
            config,
            _dir: dir,
        }
    }

    fn state(&self, identity: SessionIdentity) -> AppState {
        self.state_on(Arc::new(self.mem.clone()), identity)
    }

    fn state_on(&self, docs: Arc<dyn DocumentStore>, identity: SessionIdentity) -> AppState {
        AppState::new(
            docs,
            self.blobs.clone(),
            Arc::new(identity),
            self.config.clone(),
        )
    }

    pub fn client(&self, user: &str) -> AppState {
        self.state(SessionIdentity::signed_in(user))
    }

    /// A client whose store calls give way to other tasks before running,
    /// so concurrent sends interleave at every round trip.
    pub fn yielding_client(&self, user: &str) -> AppState {
        self.scripted_client(user, Scripted { yield_first: true, ..self.scripted() })
    }

    /// A client whose single-document subscriptions are refused.
    pub fn client_without_record_watch(&self, user: &str) -> AppState {
        self.scripted_client(user, Scripted { refuse_document_watch: true, ..self.scripted() })
    }

    fn scripted(&self) -> Scripted {
        Scripted {
            mem: self.mem.clone(),
            yield_first: false,
            refuse_document_watch: false,
        }
    }

    fn scripted_client(&self, user: &str, store: Scripted) -> AppState {
        self.state_on(Arc::new(store), SessionIdentity::signed_in(user))
    }

    pub fn client_signed_out(&self) -> AppState {
        self.state(SessionIdentity::signed_out())
    }

    pub fn remote(&self) -> RemoteStore {
        RemoteStore::new(Arc::new(self.mem.clone()))
    }
}

/// [`MemoryStore`] with scripted misbehaviour.
struct Scripted {
    mem: MemoryStore,
    yield_first: bool,
    refuse_document_watch: bool,
}

impl Scripted {
    async fn pause(&self) {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl DocumentStore for Scripted {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.pause().await;
        self.mem.get(path).await
    }

    async fn set(&self, path: &str, fields: Fields, mode: WriteMode) -> Result<(), StoreError> {
        self.pause().await;
        self.mem.set(path, fields, mode).await
    }

    async fn create(&self, path: &str, fields: Fields) -> Result<bool, StoreError> {
        self.pause().await;
        self.mem.create(path, fields).await
    }

    async fn update(&self, path: &str, fields: Fields) -> Result<(), StoreError> {
        self.pause().await;
        self.mem.update(path, fields).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        self.pause().await;
        self.mem.add(collection, fields).await
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.pause().await;
        self.mem.query(query).await
    }

    fn subscribe(&self, target: Watch) -> Result<Subscription, StoreError> {
        if self.refuse_document_watch && matches!(target, Watch::Document(_)) {
            return Err(StoreError::Unavailable("document watch refused".into()));
        }
        self.mem.subscribe(target)
    }
}
