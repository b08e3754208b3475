//! # wave-client
//!
//! Chat logic of the Wave messenger on top of the hosted-service contracts
//! in `wave-store`:
//!
//! - [`handshake`]: who may message whom before the receiver has consented.
//! - [`channel`]: appending to and following a chat's message log.
//! - [`session`]: one open chat view with its subscriptions and draft.
//! - [`chat_list`]: the signed-in user's chats for the list screen.
//! - [`profiles`]: profile registration, lookup, avatar and search.

pub mod channel;
pub mod chat_list;
pub mod config;
pub mod error;
pub mod events;
pub mod handshake;
pub mod profiles;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;

use tracing_subscriber::{fmt, EnvFilter};

pub use channel::{MessageChannel, MessageStream};
pub use chat_list::{ChatFeed, ChatList, ChatSummary};
pub use config::ClientConfig;
pub use error::{AuthorizationError, ChatError, Notice, NoticeKind, Result};
pub use events::{Navigation, Prompt, SessionEvent};
pub use handshake::{Decision, Handshake, HandshakeState, Parties, Permit};
pub use profiles::Profiles;
pub use session::{ChatSession, ViewState};
pub use state::AppState;

pub const DEFAULT_LOG_FILTER: &str = "wave_client=debug,wave_store=info,warn";

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `fallback`, then
/// [`DEFAULT_LOG_FILTER`]. Calling it again is a no-op.
pub fn init_tracing(fallback: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_LOG_FILTER)));

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting {} client", wave_shared::constants::APP_NAME);
    }
}
