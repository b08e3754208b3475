use serde::{Deserialize, Serialize};

use crate::constants::OPENERS;
use crate::error::ValidationError;

/// Consent state of a chat record.
///
/// `Accepted` and `Blocked` are terminal: once the receiver has decided, the
/// status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    Pending,
    Accepted,
    Blocked,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Blocked => "blocked",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ChatStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageKind {
    Text,
    File,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::File => "FILE",
        }
    }
}

/// Resolve user input to the canonical opener it names.
///
/// Surrounding whitespace and ASCII case are ignored, so `" hi "` resolves
/// to `"Hi"`.
pub fn canonical_opener(text: &str) -> Result<&'static str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    OPENERS
        .iter()
        .copied()
        .find(|opener| opener.eq_ignore_ascii_case(trimmed))
        .ok_or(ValidationError::NotAnOpener)
}

/// Validate the text of an ordinary (non-opener) message.
pub fn message_text(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyText)
    } else {
        Ok(trimmed)
    }
}
