//! Application state shared by every screen.
//!
//! [`AppState`] wires the hosted-service contracts (document store, blob
//! store, identity provider) into the chat services. Each service is cheap
//! to clone and can be handed to background tasks.

use std::sync::Arc;

use tracing::info;
use wave_shared::UserId;
use wave_store::{BlobStore, DocumentStore, FsBlobStore, IdentityProvider, MemoryStore, RemoteStore};

use crate::channel::MessageChannel;
use crate::chat_list::ChatList;
use crate::config::ClientConfig;
use crate::error::{ChatError, Result};
use crate::handshake::Handshake;
use crate::profiles::Profiles;
use crate::session::ChatSession;

/// The signed-in user, or [`ChatError::NotSignedIn`]. An empty id counts
/// as signed out.
pub(crate) fn signed_in_user(identity: &dyn IdentityProvider) -> Result<UserId> {
    identity
        .current_user_id()
        .filter(|id| !id.is_empty())
        .ok_or(ChatError::NotSignedIn)
}

pub struct AppState {
    pub config: ClientConfig,

    identity: Arc<dyn IdentityProvider>,

    /// Typed access to the document store.
    remote: RemoteStore,

    handshake: Handshake,
    channel: MessageChannel,
    profiles: Profiles,
    chat_list: ChatList,
}

impl AppState {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityProvider>,
        config: ClientConfig,
    ) -> Self {
        let remote = RemoteStore::new(docs);
        let handshake = Handshake::new(remote.clone(), Arc::clone(&identity));
        let channel = MessageChannel::new(
            handshake.clone(),
            remote.clone(),
            blobs,
            config.max_file_size,
        );
        let profiles = Profiles::new(remote.clone(), Arc::clone(&identity));
        let chat_list = ChatList::new(remote.clone(), profiles.clone(), Arc::clone(&identity));

        Self {
            config,
            identity,
            remote,
            handshake,
            channel,
            profiles,
            chat_list,
        }
    }

    /// State backed by an in-process document store and the filesystem
    /// blob store at `config.blob_root`.
    pub async fn local(config: ClientConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        let blobs = FsBlobStore::new(
            config.blob_root.clone(),
            config.blob_base_url.clone(),
            config.max_file_size,
        )
        .await?;
        info!(blob_root = %config.blob_root.display(), "Local backend ready");

        Ok(Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(blobs),
            identity,
            config,
        ))
    }

    pub fn current_user(&self) -> Option<UserId> {
        signed_in_user(self.identity.as_ref()).ok()
    }

    pub fn remote(&self) -> &RemoteStore {
        &self.remote
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn channel(&self) -> &MessageChannel {
        &self.channel
    }

    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    pub fn chat_list(&self) -> &ChatList {
        &self.chat_list
    }

    /// Open the chat view with `peer`.
    pub async fn open_chat(&self, peer: &UserId) -> Result<ChatSession> {
        ChatSession::open(self.channel.clone(), peer.clone()).await
    }
}
