use thiserror::Error;
use wave_shared::protocol::ChatStatus;
use wave_shared::ValidationError;
use wave_store::StoreError;

/// A send or decision refused by the handshake rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("Wait for the receiver to accept your request")]
    AwaitReceiver,

    #[error("Accept or block this request before replying")]
    DecisionRequired,

    #[error("This chat is blocked")]
    Blocked,

    #[error("You are not part of this chat")]
    NotParticipant,

    #[error("Only the receiver can accept or block this request")]
    NotReceiver,

    #[error("This request was already {0}")]
    AlreadyDecided(ChatStatus),

    #[error("Send an opener first")]
    NoChat,

    #[error("You can only change your own profile")]
    NotOwner,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error("Network error: {0}")]
    Remote(#[from] StoreError),

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Bad input, fix and resubmit.
    Validation,
    /// Refused by the chat's consent state.
    Authorization,
    /// Backend failure, the same action may be retried.
    Remote,
    Session,
}

/// User-facing message for a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl ChatError {
    pub fn notice(&self) -> Notice {
        let kind = match self {
            Self::Validation(_) => NoticeKind::Validation,
            Self::Authorization(_) => NoticeKind::Authorization,
            Self::Remote(_) => NoticeKind::Remote,
            Self::NotSignedIn | Self::NotFound(_) => NoticeKind::Session,
        };
        Notice {
            kind,
            text: self.to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    pub fn authorization(&self) -> Option<&AuthorizationError> {
        match self {
            Self::Authorization(e) => Some(e),
            _ => None,
        }
    }
}
