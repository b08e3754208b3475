//! The message log of a chat.
//!
//! Every send goes through [`Handshake::authorize`] first. A message that
//! passes is appended to `chats/{chatId}/messages`, then the chat record's
//! `lastMessage`/`lastTimestamp` preview is refreshed. The preview is best
//! effort: if it fails the message stays written and the failure is logged.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use wave_shared::constants::{CHAT_FILES_PREFIX, FILE_PREVIEW_PREFIX};
use wave_shared::protocol::{canonical_opener, message_text, MessageKind};
use wave_shared::{ChatId, MessageId, Timestamp, UserId, ValidationError};
use wave_store::{BlobStore, ChatRecord, Message, NewMessage, RemoteStore, StoreError, Subscription};

use crate::error::{AuthorizationError, Result};
use crate::handshake::{Handshake, Permit};

/// Two rounds cover losing the create race once: the second read sees the
/// record the other side wrote.
const FIRST_CONTACT_ATTEMPTS: usize = 2;

/// Wall clock that never repeats or goes backwards for messages sent
/// through the same channel.
#[derive(Debug, Default)]
pub struct SendClock {
    last: AtomicI64,
}

impl SendClock {
    pub fn tick(&self) -> Timestamp {
        let now = Timestamp::now().millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return Timestamp(next),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[derive(Clone)]
pub struct MessageChannel {
    handshake: Handshake,
    remote: RemoteStore,
    blobs: Arc<dyn BlobStore>,
    max_file_size: usize,
    clock: Arc<SendClock>,
}

impl MessageChannel {
    pub fn new(
        handshake: Handshake,
        remote: RemoteStore,
        blobs: Arc<dyn BlobStore>,
        max_file_size: usize,
    ) -> Self {
        Self {
            handshake,
            remote,
            blobs,
            max_file_size,
            clock: Arc::new(SendClock::default()),
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Send `text` to `peer`, opening the chat if this is first contact.
    ///
    /// The first message of a chat must be an opener; it is stored in its
    /// canonical spelling.
    pub async fn send_text(&self, peer: &UserId, text: &str) -> Result<Message> {
        let me = self.handshake.me()?;
        if &me == peer {
            return Err(ValidationError::SelfChat.into());
        }
        let text = message_text(text)?;
        let chat = ChatId::for_pair(&me, peer);

        for attempt in 0..FIRST_CONTACT_ATTEMPTS {
            let message = match self.handshake.authorize(&chat, &me).await? {
                Permit::Open => NewMessage::text(me.clone(), text, false),
                Permit::ResendOpener => NewMessage::text(me.clone(), canonical_opener(text)?, true),
                Permit::FirstContact => {
                    let opener = canonical_opener(text)?;
                    let record =
                        ChatRecord::new_pending(me.clone(), peer.clone(), opener, self.clock.tick());
                    if !self.remote.create_chat(&record).await? {
                        debug!(chat = %chat, attempt, "chat created concurrently, re-reading");
                        continue;
                    }
                    info!(chat = %chat, sender = %me, receiver = %peer, "chat opened, awaiting receiver");
                    NewMessage::text(me.clone(), opener, true)
                }
            };
            return self.write(&chat, message).await;
        }

        Err(StoreError::Conflict(chat.to_string()).into())
    }

    /// Append a message to an existing chat.
    ///
    /// The message must come from the signed-in user. A chat with no record
    /// yet is refused; first contact goes through [`Self::send_text`].
    pub async fn append(&self, chat: &ChatId, mut message: NewMessage) -> Result<MessageId> {
        let me = self.handshake.me()?;
        if message.sender_id != me {
            return Err(AuthorizationError::NotParticipant.into());
        }
        if message.kind == MessageKind::Text {
            message.text = message_text(&message.text)?.to_string();
        }

        match self.handshake.authorize(chat, &me).await? {
            Permit::Open => message.is_first_message = false,
            Permit::ResendOpener => {
                if message.kind != MessageKind::Text {
                    return Err(ValidationError::NotAnOpener.into());
                }
                message.text = canonical_opener(&message.text)?.to_string();
                message.is_first_message = true;
            }
            Permit::FirstContact => return Err(AuthorizationError::NoChat.into()),
        }

        Ok(self.write(chat, message).await?.id)
    }

    /// Upload a file and post it to an accepted chat.
    pub async fn send_file(&self, peer: &UserId, file_name: &str, bytes: &[u8]) -> Result<Message> {
        let me = self.handshake.me()?;
        if &me == peer {
            return Err(ValidationError::SelfChat.into());
        }
        let file_name = sanitize_file_name(file_name)?;
        if bytes.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }
        if bytes.len() > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size: bytes.len(),
                max: self.max_file_size,
            }
            .into());
        }

        let chat = ChatId::for_pair(&me, peer);
        match self.handshake.authorize(&chat, &me).await? {
            Permit::Open => {}
            // a file can never open a chat
            Permit::FirstContact | Permit::ResendOpener => {
                return Err(ValidationError::NotAnOpener.into())
            }
        }

        let path = format!(
            "{CHAT_FILES_PREFIX}/{chat}/{}_{file_name}",
            Uuid::new_v4().simple()
        );
        let handle = self.blobs.upload(&path, bytes).await?;
        let url = self.blobs.download_url(&handle).await?;
        info!(chat = %chat, path = %handle.path, size = handle.size, "file uploaded");

        self.write(&chat, NewMessage::file(me, file_name, url)).await
    }

    async fn write(&self, chat: &ChatId, mut message: NewMessage) -> Result<Message> {
        message.timestamp = self.clock.tick();
        let id = if message.is_first_message {
            // a concurrent send from the same side already wrote it
            self.remote
                .create_opener(chat, &message)
                .await?
                .ok_or(AuthorizationError::AwaitReceiver)?
        } else {
            self.remote.append_message(chat, &message).await?
        };
        debug!(chat = %chat, message = %id, first = message.is_first_message, "message appended");

        let preview = match (message.kind, &message.file_name) {
            (MessageKind::File, Some(name)) => format!("{FILE_PREVIEW_PREFIX}{name}"),
            _ => message.text.clone(),
        };
        if let Err(e) = self
            .remote
            .touch_last_message(chat, &preview, message.timestamp)
            .await
        {
            warn!(chat = %chat, error = %e, "failed to refresh chat preview");
        }

        Ok(message.into_message(id))
    }

    /// Live, timestamp-ordered messages of a chat.
    pub fn subscribe(&self, chat: &ChatId) -> Result<MessageStream> {
        let inner = self.remote.watch_messages(chat)?;
        debug!(chat = %chat, "message subscription opened");
        Ok(MessageStream {
            chat: chat.clone(),
            inner,
        })
    }
}

/// Strip directories and surrounding whitespace from a client file name.
fn sanitize_file_name(name: &str) -> std::result::Result<String, ValidationError> {
    let base = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(ValidationError::EmptyField("file name"));
    }
    Ok(base.to_string())
}

/// Subscription to a chat's messages.
///
/// Dropping the stream releases the subscription.
#[derive(Debug)]
pub struct MessageStream {
    chat: ChatId,
    inner: Subscription,
}

impl MessageStream {
    /// Next full, ordered list of messages. Listener errors are logged and
    /// the stream keeps waiting; `None` once closed.
    pub async fn next(&mut self) -> Option<Vec<Message>> {
        loop {
            match self.inner.next().await? {
                Ok(docs) => {
                    return Some(
                        docs.iter()
                            .filter_map(|doc| match Message::from_document(doc) {
                                Ok(message) => Some(message),
                                Err(e) => {
                                    warn!(chat = %self.chat, error = %e, "skipping malformed message");
                                    None
                                }
                            })
                            .collect(),
                    )
                }
                Err(e) => warn!(chat = %self.chat, error = %e, "message listener error"),
            }
        }
    }

    pub fn chat(&self) -> &ChatId {
        &self.chat
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    pub fn close(self) {
        debug!(chat = %self.chat, "message subscription closed");
        self.inner.close();
    }
}
