//! The signed-in user's chats, newest activity first.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};
use wave_shared::protocol::ChatStatus;
use wave_shared::{ChatId, Timestamp, UserId};
use wave_store::chats::chats_of;
use wave_store::{ChatRecord, Document, IdentityProvider, RemoteStore, Subscription, User};

use crate::error::Result;
use crate::profiles::Profiles;
use crate::state::signed_in_user;

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat: ChatId,
    pub peer: User,
    pub status: ChatStatus,
    pub last_message: Option<String>,
    pub last_timestamp: Option<Timestamp>,
    /// Both sides may send.
    pub writable: bool,
    /// The viewer received this request and has not answered it.
    pub awaiting_my_decision: bool,
}

#[derive(Clone)]
pub struct ChatList {
    remote: RemoteStore,
    profiles: Profiles,
    identity: Arc<dyn IdentityProvider>,
}

impl ChatList {
    pub fn new(remote: RemoteStore, profiles: Profiles, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            remote,
            profiles,
            identity,
        }
    }

    fn me(&self) -> Result<UserId> {
        signed_in_user(self.identity.as_ref())
    }

    pub async fn load(&self) -> Result<Vec<ChatSummary>> {
        let me = self.me()?;
        let docs = self.remote.docs().query(&chats_of(&me)).await?;
        Ok(self.summarize(&me, &docs).await)
    }

    /// Live chat list, re-projected on every change to the user's chats.
    pub fn subscribe(&self) -> Result<ChatFeed> {
        let me = self.me()?;
        let inner = self.remote.watch_chats_for(&me)?;
        debug!(user = %me, "chat list subscription opened");
        Ok(ChatFeed {
            list: self.clone(),
            me,
            inner,
        })
    }

    async fn summarize(&self, me: &UserId, docs: &[Document]) -> Vec<ChatSummary> {
        let records = docs.iter().filter_map(|doc| match ChatRecord::from_document(doc) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(path = %doc.path, error = %e, "skipping malformed chat");
                None
            }
        });
        join_all(records.map(|record| self.summary(me, record)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    async fn summary(&self, me: &UserId, record: ChatRecord) -> Option<ChatSummary> {
        let peer_id = record.peer_of(me)?.clone();
        let peer = match self.profiles.peer(&peer_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user = %peer_id, error = %e, "peer lookup failed, using placeholder");
                User::placeholder(peer_id)
            }
        };

        Some(ChatSummary {
            writable: record.status == ChatStatus::Accepted,
            awaiting_my_decision: record.status == ChatStatus::Pending && &record.receiver_id == me,
            chat: record.id,
            peer,
            status: record.status,
            last_message: record.last_message,
            last_timestamp: record.last_timestamp,
        })
    }
}

impl std::fmt::Debug for ChatList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatList").finish_non_exhaustive()
    }
}

/// Live feed of [`ChatSummary`] lists. Dropping it releases the
/// subscription.
#[derive(Debug)]
pub struct ChatFeed {
    list: ChatList,
    me: UserId,
    inner: Subscription,
}

impl ChatFeed {
    pub async fn next(&mut self) -> Option<Vec<ChatSummary>> {
        loop {
            match self.inner.next().await? {
                Ok(docs) => return Some(self.list.summarize(&self.me, &docs).await),
                Err(e) => warn!(user = %self.me, error = %e, "chat list listener error"),
            }
        }
    }

    pub fn close(self) {
        debug!(user = %self.me, "chat list subscription closed");
        self.inner.close();
    }
}
