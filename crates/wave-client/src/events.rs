use wave_shared::protocol::ChatStatus;
use wave_shared::{ChatId, UserId};

pub const EVENT_MESSAGES: &str = "messages";
pub const EVENT_STATUS_CHANGED: &str = "status-changed";
pub const EVENT_DECISION_REQUESTED: &str = "decision-requested";

/// Something the chat view has to ask the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// The receiver of a pending request must accept or block it.
    DecideRequest { chat: ChatId, sender: UserId },
}

/// Where the view should go after an action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Navigation {
    #[default]
    Stay,
    Leave,
}

/// Change applied to a chat view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Messages { count: usize },
    StatusChanged { status: Option<ChatStatus> },
    DecisionRequested(Prompt),
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Messages { .. } => EVENT_MESSAGES,
            Self::StatusChanged { .. } => EVENT_STATUS_CHANGED,
            Self::DecisionRequested(_) => EVENT_DECISION_REQUESTED,
        }
    }
}
