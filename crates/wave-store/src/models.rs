//! Domain models persisted in the document store, and their schema codecs.
//!
//! Decoding is strict: a required field that is missing or mistyped yields a
//! [`DecodeError`]. The only substitutions are the protocol defaults
//! documented on each field.

use serde_json::{json, Value};
use wave_shared::constants::{DEFAULT_AVATAR_ID, PLACEHOLDER_DISPLAY_NAME};
use wave_shared::protocol::{ChatStatus, MessageKind};
use wave_shared::{ChatId, DecodeError, MessageId, Timestamp, UserId};

use crate::document::{Document, Fields};

type Decoded<T> = std::result::Result<T, DecodeError>;

fn object(value: Value) -> Fields {
    match value {
        Value::Object(fields) => fields,
        _ => Fields::new(),
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Profile stored at `users/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub roll_number: String,
    /// Defaults to [`DEFAULT_AVATAR_ID`] when absent.
    pub avatar_id: i64,
}

impl User {
    /// Stand-in for a profile that could not be loaded.
    pub fn placeholder(id: UserId) -> Self {
        Self {
            id,
            email: String::new(),
            roll_number: String::new(),
            avatar_id: DEFAULT_AVATAR_ID,
        }
    }

    /// Name shown in chat headers and lists.
    pub fn display_name(&self) -> &str {
        if self.roll_number.is_empty() {
            PLACEHOLDER_DISPLAY_NAME
        } else {
            &self.roll_number
        }
    }

    pub fn to_fields(&self) -> Fields {
        object(json!({
            "email": self.email,
            "rollNumber": self.roll_number,
            "avatarId": self.avatar_id,
        }))
    }

    pub fn from_document(doc: &Document) -> Decoded<Self> {
        Ok(Self {
            id: UserId::new(doc.id()),
            email: doc.str_field("email")?.to_string(),
            roll_number: doc.str_field("rollNumber")?.to_string(),
            avatar_id: doc.opt_i64_field("avatarId")?.unwrap_or(DEFAULT_AVATAR_ID),
        })
    }
}

// ---------------------------------------------------------------------------
// Chat record
// ---------------------------------------------------------------------------

/// Chat record stored at `chats/{chatId}`: the handshake state of one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    pub id: ChatId,
    /// The party that made first contact.
    pub sender_id: UserId,
    pub receiver_id: UserId,
    /// Defaults to `Pending` when absent.
    pub status: ChatStatus,
    pub last_message: Option<String>,
    pub last_timestamp: Option<Timestamp>,
}

impl ChatRecord {
    pub fn new_pending(
        sender_id: UserId,
        receiver_id: UserId,
        opener: &str,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: ChatId::for_pair(&sender_id, &receiver_id),
            sender_id,
            receiver_id,
            status: ChatStatus::Pending,
            last_message: Some(opener.to_string()),
            last_timestamp: Some(timestamp),
        }
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.sender_id == user || &self.receiver_id == user
    }

    /// The other participant, or `None` if `user` is not part of the chat.
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if &self.sender_id == user {
            Some(&self.receiver_id)
        } else if &self.receiver_id == user {
            Some(&self.sender_id)
        } else {
            None
        }
    }

    pub fn to_fields(&self) -> Fields {
        object(json!({
            "participants": [self.sender_id.as_str(), self.receiver_id.as_str()],
            "senderId": self.sender_id.as_str(),
            "receiverId": self.receiver_id.as_str(),
            "status": self.status,
            "lastMessage": self.last_message,
            "lastTimestamp": self.last_timestamp.map(|t| t.millis()),
        }))
    }

    pub fn from_document(doc: &Document) -> Decoded<Self> {
        let sender_id = UserId::new(doc.str_field("senderId")?);
        let receiver_id = UserId::new(doc.str_field("receiverId")?);

        let participants = doc.str_array_field("participants")?;
        let consistent = participants.len() == 2
            && participants.contains(&sender_id.as_str())
            && participants.contains(&receiver_id.as_str());
        if !consistent {
            return Err(doc.invalid("participants", participants.join(",")));
        }

        let id = ChatId::from_raw(doc.id());
        if id != ChatId::for_pair(&sender_id, &receiver_id) {
            return Err(doc.invalid("senderId", format!("{sender_id} does not belong to {id}")));
        }

        let status = doc
            .opt_enum_field::<ChatStatus>("status")?
            .unwrap_or(ChatStatus::Pending);

        Ok(Self {
            id,
            sender_id,
            receiver_id,
            status,
            last_message: doc.opt_str_field("lastMessage")?.map(str::to_string),
            last_timestamp: doc.opt_i64_field("lastTimestamp")?.map(Timestamp),
        })
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A message about to be appended; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub is_first_message: bool,
}

impl NewMessage {
    pub fn text(sender_id: UserId, text: impl Into<String>, is_first_message: bool) -> Self {
        Self {
            sender_id,
            text: text.into(),
            timestamp: Timestamp::now(),
            kind: MessageKind::Text,
            file_url: None,
            file_name: None,
            is_first_message,
        }
    }

    pub fn file(sender_id: UserId, file_name: impl Into<String>, file_url: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            sender_id,
            text: file_name.clone(),
            timestamp: Timestamp::now(),
            kind: MessageKind::File,
            file_url: Some(file_url.into()),
            file_name: Some(file_name),
            is_first_message: false,
        }
    }

    pub fn to_fields(&self) -> Fields {
        let mut fields = object(json!({
            "senderId": self.sender_id.as_str(),
            "text": self.text,
            "timestamp": self.timestamp.millis(),
            "type": self.kind,
            "isFirstMessage": self.is_first_message,
        }));
        if let Some(url) = &self.file_url {
            fields.insert("fileUrl".into(), json!(url));
        }
        if let Some(name) = &self.file_name {
            fields.insert("fileName".into(), json!(name));
        }
        fields
    }

    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            sender_id: self.sender_id,
            text: self.text,
            timestamp: self.timestamp,
            kind: self.kind,
            file_url: self.file_url,
            file_name: self.file_name,
            is_first_message: self.is_first_message,
        }
    }
}

/// Message stored at `chats/{chatId}/messages/{id}`. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub text: String,
    pub timestamp: Timestamp,
    pub kind: MessageKind,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    /// Defaults to `false` when absent.
    pub is_first_message: bool,
}

impl Message {
    pub fn from_document(doc: &Document) -> Decoded<Self> {
        let kind = doc
            .opt_enum_field::<MessageKind>("type")?
            .ok_or_else(|| DecodeError::MissingField {
                path: doc.path.clone(),
                field: "type",
            })?;
        let file_url = doc.opt_str_field("fileUrl")?.map(str::to_string);
        if kind == MessageKind::File && file_url.is_none() {
            return Err(DecodeError::MissingField {
                path: doc.path.clone(),
                field: "fileUrl",
            });
        }

        Ok(Self {
            id: MessageId(doc.id().to_string()),
            sender_id: UserId::new(doc.str_field("senderId")?),
            text: doc.str_field("text")?.to_string(),
            timestamp: Timestamp(doc.i64_field("timestamp")?),
            kind,
            file_url,
            file_name: doc.opt_str_field("fileName")?.map(str::to_string),
            is_first_message: doc.opt_bool_field("isFirstMessage")?.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str, value: Value) -> Document {
        Document::new(path, object(value))
    }

    #[test]
    fn user_avatar_defaults_to_one() {
        let d = doc("users/u1", json!({"email": "u1@wave", "rollNumber": "21CS001"}));
        let user = User::from_document(&d).unwrap();
        assert_eq!(user.id, UserId::from("u1"));
        assert_eq!(user.avatar_id, DEFAULT_AVATAR_ID);
    }

    #[test]
    fn placeholder_display_name() {
        let user = User::placeholder("ghost".into());
        assert_eq!(user.display_name(), PLACEHOLDER_DISPLAY_NAME);
        assert_eq!(user.avatar_id, DEFAULT_AVATAR_ID);
    }

    #[test]
    fn user_without_roll_number_fails() {
        let d = doc("users/u1", json!({"email": "u1@wave"}));
        assert!(matches!(
            User::from_document(&d),
            Err(DecodeError::MissingField { field: "rollNumber", .. })
        ));
    }

    #[test]
    fn chat_record_fields() {
        let record = ChatRecord::new_pending("a1".into(), "b2".into(), "Hi", Timestamp(5));
        assert_eq!(record.id.as_str(), "a1_b2");

        let decoded = ChatRecord::from_document(&doc("chats/a1_b2", Value::Object(record.to_fields()))).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.peer_of(&"a1".into()), Some(&UserId::from("b2")));
        assert_eq!(decoded.peer_of(&"c3".into()), None);
    }

    #[test]
    fn chat_status_defaults_to_pending() {
        let d = doc(
            "chats/a1_b2",
            json!({"senderId": "b2", "receiverId": "a1", "participants": ["b2", "a1"]}),
        );
        let record = ChatRecord::from_document(&d).unwrap();
        assert_eq!(record.status, ChatStatus::Pending);
        assert_eq!(record.sender_id, UserId::from("b2"));
    }

    #[test]
    fn chat_record_rejects_foreign_ids_and_unknown_status() {
        let wrong_pair = doc(
            "chats/a1_b2",
            json!({"senderId": "a1", "receiverId": "c3", "participants": ["a1", "c3"]}),
        );
        assert!(ChatRecord::from_document(&wrong_pair).is_err());

        let bad_status = doc(
            "chats/a1_b2",
            json!({"senderId": "a1", "receiverId": "b2", "participants": ["a1", "b2"], "status": "allowed"}),
        );
        assert!(matches!(
            ChatRecord::from_document(&bad_status),
            Err(DecodeError::InvalidValue { field: "status", .. })
        ));
    }

    #[test]
    fn file_message_fields() {
        let new = NewMessage::file("a1".into(), "notes.pdf", "https://f/notes.pdf");
        let fields = new.to_fields();
        assert_eq!(fields["type"], json!("FILE"));
        assert_eq!(fields["fileName"], json!("notes.pdf"));

        let msg = Message::from_document(&doc("chats/a1_b2/messages/m1", Value::Object(fields))).unwrap();
        assert_eq!(msg.id, MessageId("m1".into()));
        assert_eq!(msg.kind, MessageKind::File);
        assert_eq!(msg.text, "notes.pdf");
        assert!(!msg.is_first_message);
    }

    #[test]
    fn message_flag_defaults_to_false_but_type_is_required() {
        let d = doc(
            "chats/a1_b2/messages/m1",
            json!({"senderId": "a1", "text": "Hi", "timestamp": 1, "type": "TEXT"}),
        );
        assert!(!Message::from_document(&d).unwrap().is_first_message);

        let untyped = doc(
            "chats/a1_b2/messages/m2",
            json!({"senderId": "a1", "text": "Hi", "timestamp": 1}),
        );
        assert!(Message::from_document(&untyped).is_err());
    }
}
