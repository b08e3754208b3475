//! Typed access to the hosted document store.
//!
//! The [`RemoteStore`] struct wraps any [`DocumentStore`] and provides typed
//! helpers for every domain model; the helpers live next to their model in
//! `users.rs`, `chats.rs` and `messages.rs`.

use std::sync::Arc;

use wave_shared::constants::{CHATS_COLLECTION, MESSAGES_COLLECTION, USERS_COLLECTION};
use wave_shared::{ChatId, UserId};

use crate::document::doc_path;
use crate::store::DocumentStore;

#[derive(Clone)]
pub struct RemoteStore {
    docs: Arc<dyn DocumentStore>,
}

impl RemoteStore {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Self { docs }
    }

    /// Return the underlying document store.
    pub fn docs(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }
}

pub fn user_path(id: &UserId) -> String {
    doc_path(USERS_COLLECTION, id.as_str())
}

pub fn chat_path(id: &ChatId) -> String {
    doc_path(CHATS_COLLECTION, id.as_str())
}

pub fn messages_path(id: &ChatId) -> String {
    format!("{}/{}", chat_path(id), MESSAGES_COLLECTION)
}
