use wave_shared::constants::OPENER_MESSAGE_ID;
use wave_shared::{ChatId, MessageId};

use crate::document::doc_path;
use crate::error::Result;
use crate::models::{Message, NewMessage};
use crate::query::{Direction, Query};
use crate::remote::{messages_path, RemoteStore};
use crate::store::{Subscription, Watch};

/// Messages of a chat in send order.
pub fn messages_of(chat: &ChatId) -> Query {
    Query::collection(messages_path(chat)).order_by("timestamp", Direction::Ascending)
}

pub fn opener_path(chat: &ChatId) -> String {
    doc_path(&messages_path(chat), OPENER_MESSAGE_ID)
}

impl RemoteStore {
    pub async fn append_message(&self, chat: &ChatId, message: &NewMessage) -> Result<MessageId> {
        let id = self
            .docs()
            .add(&messages_path(chat), message.to_fields())
            .await?;
        Ok(MessageId(id))
    }

    /// Write the chat's opener under its fixed id.
    ///
    /// Returns `None` when the chat already has an opener; the existing one
    /// is left as is.
    pub async fn create_opener(
        &self,
        chat: &ChatId,
        message: &NewMessage,
    ) -> Result<Option<MessageId>> {
        let created = self
            .docs()
            .create(&opener_path(chat), message.to_fields())
            .await?;
        Ok(created.then(|| MessageId(OPENER_MESSAGE_ID.to_string())))
    }

    pub async fn has_opener(&self, chat: &ChatId) -> Result<bool> {
        Ok(self.docs().get(&opener_path(chat)).await?.is_some())
    }

    pub async fn get_messages(&self, chat: &ChatId) -> Result<Vec<Message>> {
        let docs = self.docs().query(&messages_of(chat)).await?;
        docs.iter()
            .map(|doc| Message::from_document(doc).map_err(Into::into))
            .collect()
    }

    pub fn watch_messages(&self, chat: &ChatId) -> Result<Subscription> {
        self.docs().subscribe(Watch::Query(messages_of(chat)))
    }
}
