//! One open chat view.
//!
//! A [`ChatSession`] owns the two live subscriptions of the view (the
//! message log and the chat record) together with the view state they feed.
//! Both subscriptions are released exactly once, by [`ChatSession::close`]
//! or by dropping the session, whichever comes first.
//!
//! Sends started with [`ChatSession::submit_detached`] may finish after the
//! view is gone. Their completion checks the view's [`Liveness`] and is
//! discarded once the view has been torn down.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wave_shared::protocol::ChatStatus;
use wave_shared::{ChatId, UserId, ValidationError};
use wave_store::Message;

use crate::channel::{MessageChannel, MessageStream};
use crate::error::{Notice, Result};
use crate::events::{Navigation, Prompt, SessionEvent};
use crate::handshake::{prompt_for, Handshake, HandshakeState, StateWatch};

/// Shared flag telling late completions whether their view still exists.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns whether this call ended it.
    fn end(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// What the chat screen renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    /// Text typed but not sent yet.
    pub draft: String,
    pub messages: Vec<Message>,
    pub state: HandshakeState,
    pub notices: Vec<Notice>,
    pub prompt: Option<Prompt>,
    pub navigation: Navigation,
}

impl ViewState {
    pub fn is_writable(&self) -> bool {
        self.state.is_writable()
    }
}

type SharedView = Arc<Mutex<ViewState>>;

fn update_view(view: &SharedView, liveness: &Liveness, f: impl FnOnce(&mut ViewState)) -> bool {
    if !liveness.is_alive() {
        return false;
    }
    match view.lock() {
        Ok(mut state) => {
            f(&mut state);
            true
        }
        Err(e) => {
            warn!(error = %e, "chat view state poisoned");
            false
        }
    }
}

/// Reflect a finished send in the view: clear the draft it came from, or
/// keep the draft and report the failure.
fn apply_send(view: &SharedView, liveness: &Liveness, chat: &ChatId, sent: &str, result: &Result<Message>) {
    let applied = update_view(view, liveness, |state| match result {
        Ok(_) => {
            if state.draft == sent {
                state.draft.clear();
            }
        }
        Err(e) => state.notices.push(e.notice()),
    });
    if !applied {
        debug!(chat = %chat, "view closed, send completion dropped");
    }
}

enum Incoming {
    Messages(Option<Vec<Message>>),
    State(Option<HandshakeState>),
}

pub struct ChatSession {
    me: UserId,
    peer: UserId,
    chat: ChatId,
    channel: MessageChannel,
    view: SharedView,
    liveness: Liveness,
    messages: Option<MessageStream>,
    status: Option<StateWatch>,
}

impl ChatSession {
    /// Open the chat with `peer`: read its state and start both
    /// subscriptions.
    pub async fn open(channel: MessageChannel, peer: UserId) -> Result<Self> {
        let handshake = channel.handshake().clone();
        let me = handshake.me()?;
        if me == peer {
            return Err(ValidationError::SelfChat.into());
        }
        let chat = ChatId::for_pair(&me, &peer);

        let state = handshake.state(&chat).await?;
        let messages = channel.subscribe(&chat)?;
        let status = match handshake.watch(&chat) {
            Ok(status) => status,
            Err(e) => {
                messages.close();
                return Err(e);
            }
        };

        let view = ViewState {
            prompt: prompt_for(&chat, &state, &me),
            state,
            ..ViewState::default()
        };
        info!(chat = %chat, user = %me, "chat view opened");

        Ok(Self {
            me,
            peer,
            chat,
            channel,
            view: Arc::new(Mutex::new(view)),
            liveness: Liveness::new(),
            messages: Some(messages),
            status: Some(status),
        })
    }

    pub fn chat(&self) -> &ChatId {
        &self.chat
    }

    pub fn peer(&self) -> &UserId {
        &self.peer
    }

    pub fn liveness(&self) -> Liveness {
        self.liveness.clone()
    }

    fn handshake(&self) -> &Handshake {
        self.channel.handshake()
    }

    fn update(&self, f: impl FnOnce(&mut ViewState)) {
        update_view(&self.view, &self.liveness, f);
    }

    /// Snapshot of the current view state.
    pub fn view(&self) -> ViewState {
        self.view.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.update(|v| v.draft = text);
    }

    /// Wait for the next change from either subscription and apply it.
    ///
    /// Returns `None` once the session is closed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        if !self.liveness.is_alive() {
            return None;
        }
        let (Some(messages), Some(status)) = (self.messages.as_mut(), self.status.as_mut()) else {
            return None;
        };

        let incoming = tokio::select! {
            batch = messages.next() => Incoming::Messages(batch),
            state = status.next() => Incoming::State(state),
        };

        match incoming {
            Incoming::Messages(Some(batch)) => {
                let count = batch.len();
                self.update(move |v| v.messages = batch);
                Some(SessionEvent::Messages { count })
            }
            Incoming::State(Some(state)) => {
                let status = state.status();
                let prompt = prompt_for(&self.chat, &state, &self.me);
                let event = match &prompt {
                    Some(p) => SessionEvent::DecisionRequested(p.clone()),
                    None => SessionEvent::StatusChanged { status },
                };
                self.update(move |v| {
                    v.state = state;
                    v.prompt = prompt;
                });
                Some(event)
            }
            Incoming::Messages(None) | Incoming::State(None) => None,
        }
    }

    /// Send the draft. On success the draft is cleared; on failure it is
    /// kept and a notice is added.
    pub async fn submit(&self) -> Result<Message> {
        let draft = self.view().draft;
        let result = self.channel.send_text(&self.peer, &draft).await;
        apply_send(&self.view, &self.liveness, &self.chat, &draft, &result);
        result
    }

    /// Send the draft on a background task.
    pub fn submit_detached(&self) -> JoinHandle<()> {
        let draft = self.view().draft;
        let channel = self.channel.clone();
        let peer = self.peer.clone();
        let chat = self.chat.clone();
        let view = Arc::clone(&self.view);
        let liveness = self.liveness.clone();

        tokio::spawn(async move {
            let result = channel.send_text(&peer, &draft).await;
            apply_send(&view, &liveness, &chat, &draft, &result);
        })
    }

    pub async fn accept(&self) -> Result<ChatStatus> {
        match self.handshake().accept(&self.chat).await {
            Ok(status) => {
                self.update(|v| {
                    v.prompt = None;
                    if let Some(parties) = v.state.parties().cloned() {
                        v.state = HandshakeState::Accepted(parties);
                    }
                });
                Ok(status)
            }
            Err(e) => {
                self.update(|v| v.notices.push(e.notice()));
                Err(e)
            }
        }
    }

    /// Block the request. The blocking side leaves the chat.
    pub async fn block(&self) -> Result<Navigation> {
        match self.handshake().block(&self.chat).await {
            Ok(_) => {
                self.update(|v| {
                    v.prompt = None;
                    if let Some(parties) = v.state.parties().cloned() {
                        v.state = HandshakeState::Blocked(parties);
                    }
                    v.navigation = Navigation::Leave;
                });
                Ok(Navigation::Leave)
            }
            Err(e) => {
                self.update(|v| v.notices.push(e.notice()));
                Err(e)
            }
        }
    }

    pub fn close(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.liveness.end() {
            info!(chat = %self.chat, "chat view closed");
        }
        if let Some(messages) = self.messages.take() {
            messages.close();
        }
        if let Some(status) = self.status.take() {
            status.close();
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wave_store::{Op, StoreError};

    use super::*;
    use crate::error::{ChatError, NoticeKind};
    use crate::testing::World;

    async fn wait_until(session: &mut ChatSession, done: impl Fn(&ViewState) -> bool) {
        for _ in 0..32 {
            if done(&session.view()) {
                return;
            }
            tokio::time::timeout(Duration::from_secs(1), session.next_event())
                .await
                .expect("no session event within a second");
        }
        panic!("view never reached the expected state: {:?}", session.view());
    }

    #[tokio::test]
    async fn receiver_is_asked_to_decide() {
        let world = World::new().await;
        world.client("a1").channel().send_text(&"b2".into(), "Hi").await.unwrap();

        let receiver = world.client("b2").open_chat(&"a1".into()).await.unwrap();
        assert_eq!(
            receiver.view().prompt,
            Some(Prompt::DecideRequest {
                chat: receiver.chat().clone(),
                sender: "a1".into()
            })
        );

        let sender = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        assert_eq!(sender.view().prompt, None);
        assert!(matches!(sender.view().state, HandshakeState::Pending(_)));
        assert!(!sender.view().is_writable());
    }

    #[tokio::test]
    async fn draft_survives_failed_send() {
        let world = World::new().await;
        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();

        session.set_draft("Hi");
        world.mem.fail_ops(&[Op::Get]);
        let err = session.submit().await.unwrap_err();
        assert!(err.is_retryable());

        let view = session.view();
        assert_eq!(view.draft, "Hi");
        assert_eq!(view.notices.len(), 1);
        assert_eq!(view.notices[0].kind, NoticeKind::Remote);

        world.mem.heal();
        session.submit().await.unwrap();
        assert_eq!(session.view().draft, "");
    }

    #[tokio::test]
    async fn rejected_opener_keeps_draft() {
        let world = World::new().await;
        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();

        session.set_draft("yo");
        assert!(matches!(
            session.submit().await,
            Err(ChatError::Validation(ValidationError::NotAnOpener))
        ));
        let view = session.view();
        assert_eq!(view.draft, "yo");
        assert_eq!(view.notices[0].kind, NoticeKind::Validation);
        assert_eq!(world.mem.count("chats"), 0);
    }

    #[tokio::test]
    async fn sender_sees_acceptance_live() {
        let world = World::new().await;
        let mut session = world.client("a1").open_chat(&"b2".into()).await.unwrap();

        session.set_draft("Hi");
        session.submit().await.unwrap();
        wait_until(&mut session, |v| v.messages.len() == 1).await;

        world.mem.emit_listener_error("flaky network");
        let mut receiver = world.client("b2").open_chat(&"a1".into()).await.unwrap();
        receiver.accept().await.unwrap();
        assert_eq!(receiver.view().prompt, None);
        assert!(receiver.view().is_writable());

        wait_until(&mut session, |v| v.is_writable()).await;

        session.set_draft("How are you?");
        session.submit().await.unwrap();
        wait_until(&mut receiver, |v| v.messages.len() == 2).await;
        let last = &receiver.view().messages[1];
        assert_eq!(last.text, "How are you?");
        assert!(!last.is_first_message);
    }

    #[tokio::test]
    async fn blocking_leaves_the_chat() {
        let world = World::new().await;
        let mut sender = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        sender.set_draft("Hi");
        sender.submit().await.unwrap();

        let receiver = world.client("b2").open_chat(&"a1".into()).await.unwrap();
        assert_eq!(receiver.block().await.unwrap(), Navigation::Leave);
        assert_eq!(receiver.view().navigation, Navigation::Leave);

        wait_until(&mut sender, |v| matches!(v.state, HandshakeState::Blocked(_))).await;
        assert_eq!(sender.view().navigation, Navigation::Stay);

        sender.set_draft("please");
        let err = sender.submit().await.unwrap_err();
        assert_eq!(err.notice().kind, NoticeKind::Authorization);
        assert_eq!(sender.view().draft, "please");
        assert_eq!(world.mem.count("chats/a1_b2/messages"), 1);
    }

    #[tokio::test]
    async fn sender_cannot_decide() {
        let world = World::new().await;
        let sender = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        sender.set_draft("Hi");
        sender.submit().await.unwrap();

        assert!(sender.accept().await.is_err());
        assert_eq!(sender.view().notices.len(), 1);
        assert_eq!(sender.view().navigation, Navigation::Stay);
    }

    #[tokio::test]
    async fn subscriptions_released_once_on_every_exit() {
        let world = World::new().await;

        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        assert_eq!(world.mem.listener_count(), 2);
        drop(session);
        assert_eq!(world.mem.listener_count(), 0);

        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        let liveness = session.liveness();
        session.close();
        assert!(!liveness.is_alive());
        assert_eq!(world.mem.listener_count(), 0);

        // failing to open leaves nothing behind
        world.mem.fail_ops(&[Op::Subscribe]);
        assert!(world.client("a1").open_chat(&"b2".into()).await.is_err());
        assert_eq!(world.mem.listener_count(), 0);
        world.mem.heal();

        // nor does failing on the second subscription
        let client = world.client_without_record_watch("a1");
        assert!(matches!(
            client.open_chat(&"b2".into()).await,
            Err(ChatError::Remote(StoreError::Unavailable(_)))
        ));
        assert_eq!(world.mem.listener_count(), 0);
    }

    #[tokio::test]
    async fn late_completion_after_teardown_is_ignored() {
        let world = World::new().await;
        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();
        session.set_draft("Hi");

        let handle = session.submit_detached();
        let view = Arc::clone(&session.view);
        session.close();
        handle.await.unwrap();

        // the send itself still happened
        assert_eq!(world.mem.count("chats/a1_b2/messages"), 1);
        let view = view.lock().unwrap();
        assert_eq!(view.draft, "Hi");
        assert!(view.notices.is_empty());
    }

    #[tokio::test]
    async fn detached_send_updates_live_view() {
        let world = World::new().await;
        let session = world.client("a1").open_chat(&"b2".into()).await.unwrap();

        session.set_draft("hello");
        session.submit_detached().await.unwrap();
        assert_eq!(session.view().draft, "");

        session.set_draft("more");
        session.submit_detached().await.unwrap();
        let view = session.view();
        assert_eq!(view.draft, "more");
        assert_eq!(view.notices[0].text, "Wait for the receiver to accept your request");
    }
}
