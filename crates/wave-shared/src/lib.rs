//! # wave-shared
//!
//! Types shared by every Wave crate: identifier newtypes, the canonical chat
//! identifier, handshake status values, protocol constants and the error
//! types produced while validating user input or decoding stored documents.

pub mod constants;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{DecodeError, ValidationError};
pub use types::{ChatId, MessageId, Timestamp, UserId};
