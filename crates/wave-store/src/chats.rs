//! CRUD operations for [`ChatRecord`] records.

use serde_json::json;
use wave_shared::constants::CHATS_COLLECTION;
use wave_shared::protocol::ChatStatus;
use wave_shared::{ChatId, Timestamp, UserId};

use crate::document::Fields;
use crate::error::Result;
use crate::models::ChatRecord;
use crate::query::{Direction, Query};
use crate::remote::{chat_path, RemoteStore};
use crate::store::{Subscription, Watch};

/// Live query over the chats a user takes part in, newest activity first.
pub fn chats_of(user: &UserId) -> Query {
    Query::collection(CHATS_COLLECTION)
        .array_contains("participants", user.as_str())
        .order_by("lastTimestamp", Direction::Descending)
}

impl RemoteStore {
    pub async fn get_chat(&self, id: &ChatId) -> Result<Option<ChatRecord>> {
        match self.docs().get(&chat_path(id)).await? {
            Some(doc) => Ok(Some(ChatRecord::from_document(&doc)?)),
            None => Ok(None),
        }
    }

    /// Create the record if no record exists for the pair.
    ///
    /// Returns `false` when a record was already there; it is left as is.
    pub async fn create_chat(&self, record: &ChatRecord) -> Result<bool> {
        self.docs()
            .create(&chat_path(&record.id), record.to_fields())
            .await
    }

    pub async fn set_chat_status(&self, id: &ChatId, status: ChatStatus) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("status".into(), json!(status));
        self.docs().update(&chat_path(id), fields).await
    }

    /// Refresh the denormalized preview fields.
    pub async fn touch_last_message(
        &self,
        id: &ChatId,
        preview: &str,
        timestamp: Timestamp,
    ) -> Result<()> {
        let mut fields = Fields::new();
        fields.insert("lastMessage".into(), json!(preview));
        fields.insert("lastTimestamp".into(), json!(timestamp.millis()));
        self.docs().update(&chat_path(id), fields).await
    }

    pub async fn chats_for(&self, user: &UserId) -> Result<Vec<ChatRecord>> {
        let docs = self.docs().query(&chats_of(user)).await?;
        docs.iter()
            .map(|doc| ChatRecord::from_document(doc).map_err(Into::into))
            .collect()
    }

    pub fn watch_chat(&self, id: &ChatId) -> Result<Subscription> {
        self.docs().subscribe(Watch::Document(chat_path(id)))
    }

    pub fn watch_chats_for(&self, user: &UserId) -> Result<Subscription> {
        self.docs().subscribe(Watch::Query(chats_of(user)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;

    fn remote() -> RemoteStore {
        RemoteStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn create_is_idempotent_per_pair() {
        let remote = remote();
        let first = ChatRecord::new_pending("a1".into(), "b2".into(), "Hi", Timestamp(1));
        let racing = ChatRecord::new_pending("b2".into(), "a1".into(), "Hello", Timestamp(2));

        assert!(remote.create_chat(&first).await.unwrap());
        assert!(!remote.create_chat(&racing).await.unwrap());

        let stored = remote.get_chat(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.sender_id, UserId::from("a1"));
        assert_eq!(stored.last_message.as_deref(), Some("Hi"));
    }

    #[tokio::test]
    async fn status_and_preview_updates() {
        let remote = remote();
        let record = ChatRecord::new_pending("a1".into(), "b2".into(), "Hi", Timestamp(1));
        remote.create_chat(&record).await.unwrap();

        remote.set_chat_status(&record.id, ChatStatus::Accepted).await.unwrap();
        remote
            .touch_last_message(&record.id, "How are you?", Timestamp(9))
            .await
            .unwrap();

        let stored = remote.get_chat(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ChatStatus::Accepted);
        assert_eq!(stored.last_message.as_deref(), Some("How are you?"));
        assert_eq!(stored.last_timestamp, Some(Timestamp(9)));
    }

    #[tokio::test]
    async fn chats_for_lists_newest_first() {
        let remote = remote();
        for (other, ts) in [("b2", 1), ("c3", 3), ("d4", 2)] {
            let record = ChatRecord::new_pending("a1".into(), other.into(), "Hi", Timestamp(ts));
            remote.create_chat(&record).await.unwrap();
        }
        let unrelated = ChatRecord::new_pending("x".into(), "y".into(), "Hi", Timestamp(5));
        remote.create_chat(&unrelated).await.unwrap();

        let ids: Vec<_> = remote
            .chats_for(&"a1".into())
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a1_c3", "a1_d4", "a1_b2"]);
    }
}
