//! First-contact handshake.
//!
//! A pair of users starts in [`HandshakeState::NoChat`]. The first message
//! from either side creates the chat record as `Pending`, with that side as
//! the sender. Only the receiver can then move it to `Accepted` or
//! `Blocked`, and both of those are final.
//!
//! The rules are pure functions over a [`HandshakeState`]
//! ([`authorize_send`], [`decide`], [`prompt_for`]); the [`Handshake`]
//! service reads the current state from the store and applies them.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wave_shared::protocol::ChatStatus;
use wave_shared::{ChatId, UserId};
use wave_store::{ChatRecord, IdentityProvider, RemoteStore, Subscription};

use crate::error::{AuthorizationError, Result};
use crate::events::Prompt;
use crate::state::signed_in_user;

/// The two sides of a chat record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parties {
    /// Made first contact.
    pub sender: UserId,
    pub receiver: UserId,
}

impl Parties {
    pub fn includes(&self, user: &UserId) -> bool {
        &self.sender == user || &self.receiver == user
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HandshakeState {
    #[default]
    NoChat,
    Pending(Parties),
    Accepted(Parties),
    Blocked(Parties),
}

impl HandshakeState {
    pub fn status(&self) -> Option<ChatStatus> {
        match self {
            Self::NoChat => None,
            Self::Pending(_) => Some(ChatStatus::Pending),
            Self::Accepted(_) => Some(ChatStatus::Accepted),
            Self::Blocked(_) => Some(ChatStatus::Blocked),
        }
    }

    pub fn parties(&self) -> Option<&Parties> {
        match self {
            Self::NoChat => None,
            Self::Pending(p) | Self::Accepted(p) | Self::Blocked(p) => Some(p),
        }
    }

    /// Whether either participant may send free-form messages.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

impl From<Option<ChatRecord>> for HandshakeState {
    fn from(record: Option<ChatRecord>) -> Self {
        let Some(record) = record else {
            return Self::NoChat;
        };
        let parties = Parties {
            sender: record.sender_id,
            receiver: record.receiver_id,
        };
        match record.status {
            ChatStatus::Pending => Self::Pending(parties),
            ChatStatus::Accepted => Self::Accepted(parties),
            ChatStatus::Blocked => Self::Blocked(parties),
        }
    }
}

/// What a caller cleared to send is allowed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    /// No record yet: create it and send an opener.
    FirstContact,
    /// The record exists but its opener never made it; send one now.
    ResendOpener,
    /// Free-form messages.
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Block,
}

impl Decision {
    fn status(self) -> ChatStatus {
        match self {
            Self::Accept => ChatStatus::Accepted,
            Self::Block => ChatStatus::Blocked,
        }
    }
}

/// Check run before every send.
///
/// A pending sender always gets [`AuthorizationError::AwaitReceiver`] here;
/// [`Handshake::authorize`] relaxes that to [`Permit::ResendOpener`] when the
/// opener itself is missing.
pub fn authorize_send(
    state: &HandshakeState,
    caller: &UserId,
) -> std::result::Result<Permit, AuthorizationError> {
    match state {
        HandshakeState::NoChat => Ok(Permit::FirstContact),
        HandshakeState::Pending(p) if &p.sender == caller => Err(AuthorizationError::AwaitReceiver),
        HandshakeState::Pending(p) if &p.receiver == caller => {
            Err(AuthorizationError::DecisionRequired)
        }
        HandshakeState::Accepted(p) if p.includes(caller) => Ok(Permit::Open),
        HandshakeState::Blocked(p) if p.includes(caller) => Err(AuthorizationError::Blocked),
        _ => Err(AuthorizationError::NotParticipant),
    }
}

/// Status the chat moves to when `caller` takes `decision`.
pub fn decide(
    state: &HandshakeState,
    caller: &UserId,
    decision: Decision,
) -> std::result::Result<ChatStatus, AuthorizationError> {
    match state {
        HandshakeState::NoChat => Err(AuthorizationError::NoChat),
        HandshakeState::Pending(p) if &p.receiver == caller => Ok(decision.status()),
        HandshakeState::Pending(p) if &p.sender == caller => Err(AuthorizationError::NotReceiver),
        HandshakeState::Accepted(p) if p.includes(caller) => {
            Err(AuthorizationError::AlreadyDecided(ChatStatus::Accepted))
        }
        HandshakeState::Blocked(p) if p.includes(caller) => {
            Err(AuthorizationError::AlreadyDecided(ChatStatus::Blocked))
        }
        _ => Err(AuthorizationError::NotParticipant),
    }
}

/// The prompt `viewer` must answer before doing anything else in the chat.
pub fn prompt_for(chat: &ChatId, state: &HandshakeState, viewer: &UserId) -> Option<Prompt> {
    match state {
        HandshakeState::Pending(p) if &p.receiver == viewer => Some(Prompt::DecideRequest {
            chat: chat.clone(),
            sender: p.sender.clone(),
        }),
        _ => None,
    }
}

/// Handshake rules bound to the store and the signed-in user.
#[derive(Clone)]
pub struct Handshake {
    remote: RemoteStore,
    identity: Arc<dyn IdentityProvider>,
}

impl Handshake {
    pub fn new(remote: RemoteStore, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { remote, identity }
    }

    pub fn me(&self) -> Result<UserId> {
        signed_in_user(self.identity.as_ref())
    }

    pub async fn state(&self, chat: &ChatId) -> Result<HandshakeState> {
        Ok(self.remote.get_chat(chat).await?.into())
    }

    /// Read the chat's state and decide what `caller` may send.
    pub async fn authorize(&self, chat: &ChatId, caller: &UserId) -> Result<Permit> {
        let state = self.state(chat).await?;
        match authorize_send(&state, caller) {
            Ok(permit) => Ok(permit),
            Err(AuthorizationError::AwaitReceiver) => {
                if self.remote.has_opener(chat).await? {
                    debug!(chat = %chat, caller = %caller, "sender waits for the receiver");
                    return Err(AuthorizationError::AwaitReceiver.into());
                }
                debug!(chat = %chat, "pending chat has no opener, allowing resend");
                Ok(Permit::ResendOpener)
            }
            Err(e) => {
                debug!(chat = %chat, caller = %caller, reason = %e, "send refused");
                Err(e.into())
            }
        }
    }

    pub async fn accept(&self, chat: &ChatId) -> Result<ChatStatus> {
        self.apply(chat, Decision::Accept).await
    }

    pub async fn block(&self, chat: &ChatId) -> Result<ChatStatus> {
        self.apply(chat, Decision::Block).await
    }

    async fn apply(&self, chat: &ChatId, decision: Decision) -> Result<ChatStatus> {
        let me = self.me()?;
        let state = self.state(chat).await?;
        let status = decide(&state, &me, decision)?;

        self.remote.set_chat_status(chat, status).await?;
        info!(chat = %chat, receiver = %me, status = %status, "chat request decided");
        Ok(status)
    }

    /// Follow the chat record as it changes.
    pub fn watch(&self, chat: &ChatId) -> Result<StateWatch> {
        Ok(StateWatch {
            chat: chat.clone(),
            inner: self.remote.watch_chat(chat)?,
        })
    }
}

/// Live [`HandshakeState`] of one chat.
#[derive(Debug)]
pub struct StateWatch {
    chat: ChatId,
    inner: Subscription,
}

impl StateWatch {
    /// Next state. Listener errors and malformed records are logged and
    /// skipped; `None` once closed.
    pub async fn next(&mut self) -> Option<HandshakeState> {
        loop {
            match self.inner.next().await? {
                Ok(docs) => match docs.first().map(ChatRecord::from_document).transpose() {
                    Ok(record) => return Some(record.into()),
                    Err(e) => warn!(chat = %self.chat, error = %e, "ignoring malformed chat record"),
                },
                Err(e) => warn!(chat = %self.chat, error = %e, "chat listener error"),
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn close(self) {
        debug!(chat = %self.chat, "closing chat watch");
        self.inner.close();
    }
}
