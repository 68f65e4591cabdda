//! Reconnecting session event subscriber.
//!
//! A [`SessionSubscriber`] owns one background task per connection. The
//! task opens the stream through an [`EventTransport`], decodes each
//! frame into a [`SessionEvent`] and hands it to a [`SessionEventHandler`].
//! When the stream drops it retries with exponential backoff. After
//! [`BackoffPolicy::max_failures`] consecutive failed opens it gives up,
//! moves to [`SubscriberState::Failed`] and reports the last error.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tavern_core::types::{SessionId, UserId};
use tavern_entity::{ChatMessage, ChatRoom, InitiativeEntry, SessionEvent, SessionSnapshot};

use crate::error::ClientError;
use crate::transport::EventTransport;

/// Connection state as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberState {
    /// Not connected and not trying.
    Idle,
    /// First open in progress.
    Connecting,
    /// Receiving events.
    Open,
    /// Waiting before retry number `attempt`.
    Reconnecting { attempt: u32 },
    /// Gave up after too many consecutive failures.
    Failed,
}

/// Retry timing.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// The delay doubles per failure up to `base * 2^max_exponent`.
    pub max_exponent: u32,
    /// Consecutive failed opens before giving up.
    pub max_failures: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            max_exponent: 5,
            max_failures: 5,
        }
    }
}

impl BackoffPolicy {
    /// Delay after `failures` consecutive failed opens.
    pub fn delay(&self, failures: u32) -> Duration {
        self.base * 2u32.pow(failures.min(self.max_exponent))
    }
}

/// Callbacks for decoded events. Every method defaults to a no-op.
pub trait SessionEventHandler: Send + 'static {
    fn on_connected(&mut self, _session_id: SessionId, _user_id: UserId) {}
    fn on_session_update(&mut self, _session: SessionSnapshot) {}
    fn on_new_message(&mut self, _message: ChatMessage) {}
    fn on_participant_joined(&mut self, _user_id: UserId) {}
    fn on_participant_left(&mut self, _user_id: UserId) {}
    fn on_status_update(&mut self, _user_id: UserId, _is_online: bool, _previous: Option<bool>) {}
    fn on_initiative_update(&mut self, _order: Vec<InitiativeEntry>, _current_turn: Option<usize>) {}
    fn on_chat_rooms_update(&mut self, _rooms: Vec<ChatRoom>) {}
    fn on_room_read(&mut self, _user_id: UserId, _room_id: String, _last_message_id: String) {}
    fn on_webrtc_signal(
        &mut self,
        _signal_type: String,
        _data: Value,
        _from: UserId,
        _target: Option<UserId>,
    ) {
    }
    fn on_user_kicked(&mut self, _target: UserId, _reason: Option<String>) {}
    fn on_state_change(&mut self, _state: &SubscriberState) {}
    fn on_error(&mut self, _error: &ClientError) {}
}

/// Route one event to its handler method.
pub fn dispatch<H: SessionEventHandler + ?Sized>(handler: &mut H, event: SessionEvent) {
    match event {
        SessionEvent::Connected {
            session_id,
            user_id,
            ..
        } => handler.on_connected(session_id, user_id),
        SessionEvent::SessionUpdate { session, .. } => handler.on_session_update(*session),
        SessionEvent::NewMessage { message, .. } => handler.on_new_message(message),
        SessionEvent::ParticipantJoined { user_id, .. } => handler.on_participant_joined(user_id),
        SessionEvent::ParticipantLeft { user_id, .. } => handler.on_participant_left(user_id),
        SessionEvent::ParticipantStatusUpdate {
            user_id,
            is_online,
            previous_status,
            ..
        } => handler.on_status_update(user_id, is_online, previous_status),
        SessionEvent::InitiativeUpdate {
            initiative_order,
            current_turn,
            ..
        } => handler.on_initiative_update(initiative_order, current_turn),
        SessionEvent::ChatRoomsUpdate { chat_rooms, .. } => handler.on_chat_rooms_update(chat_rooms),
        SessionEvent::RoomReadUpdate {
            user_id,
            room_id,
            last_message_id,
            ..
        } => handler.on_room_read(user_id, room_id, last_message_id),
        SessionEvent::WebrtcSignal {
            signal_type,
            data,
            from_user_id,
            target_user_id,
            ..
        } => handler.on_webrtc_signal(signal_type, data, from_user_id, target_user_id),
        SessionEvent::UserKicked {
            target_user_id,
            reason,
            ..
        } => handler.on_user_kicked(target_user_id, reason),
        SessionEvent::Unknown => tracing::trace!("Ignoring unknown event type"),
    }
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Follows one session's event stream.
pub struct SessionSubscriber<T: EventTransport> {
    transport: Arc<T>,
    session_id: SessionId,
    policy: BackoffPolicy,
    state: watch::Sender<SubscriberState>,
    running: Option<Running>,
}

impl<T: EventTransport> SessionSubscriber<T> {
    pub fn new(transport: Arc<T>, session_id: SessionId, policy: BackoffPolicy) -> Self {
        let (state, _) = watch::channel(SubscriberState::Idle);
        Self {
            transport,
            session_id,
            policy,
            state,
            running: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SubscriberState {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<SubscriberState> {
        self.state.subscribe()
    }

    /// Start following the stream. Replaces any previous connection.
    pub async fn connect<H: SessionEventHandler>(&mut self, handler: H) {
        self.disconnect().await;

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            Arc::clone(&self.transport),
            self.session_id,
            self.policy.clone(),
            self.state.clone(),
            cancel.clone(),
            handler,
        ));
        self.running = Some(Running { cancel, task });
    }

    /// Stop following the stream and return to `Idle`. Safe to call
    /// repeatedly.
    pub async fn disconnect(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            if let Err(e) = running.task.await {
                tracing::warn!(error = %e, "Subscriber task ended abnormally");
            }
        }
        self.state.send_replace(SubscriberState::Idle);
    }
}

impl<T: EventTransport> Drop for SessionSubscriber<T> {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

fn set_state<H: SessionEventHandler>(
    state: &watch::Sender<SubscriberState>,
    handler: &mut H,
    next: SubscriberState,
) {
    handler.on_state_change(&next);
    state.send_replace(next);
}

async fn run<T: EventTransport, H: SessionEventHandler>(
    transport: Arc<T>,
    session_id: SessionId,
    policy: BackoffPolicy,
    state: watch::Sender<SubscriberState>,
    cancel: CancellationToken,
    mut handler: H,
) {
    let mut failures: u32 = 0;
    set_state(&state, &mut handler, SubscriberState::Connecting);

    loop {
        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = transport.open(session_id) => opened,
        };

        match opened {
            Ok(mut frames) => {
                failures = 0;
                set_state(&state, &mut handler, SubscriberState::Open);
                tracing::debug!(%session_id, "Event stream open");

                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => return,
                        next = frames.next() => next,
                    };
                    match next {
                        Some(Ok(frame)) => match serde_json::from_str::<SessionEvent>(&frame) {
                            Ok(event) => dispatch(&mut handler, event),
                            Err(e) => tracing::warn!(error = %e, "Undecodable event frame"),
                        },
                        Some(Err(e)) => {
                            tracing::warn!(%session_id, error = %e, "Event stream broke");
                            break;
                        }
                        None => {
                            tracing::debug!(%session_id, "Event stream ended");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(%session_id, failures, error = %e, "Failed to open event stream");
                if failures >= policy.max_failures {
                    set_state(&state, &mut handler, SubscriberState::Failed);
                    handler.on_error(&e);
                    return;
                }
            }
        }

        set_state(
            &state,
            &mut handler,
            SubscriberState::Reconnecting {
                attempt: failures + 1,
            },
        );
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(policy.delay(failures)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::transport::FrameStream;

    enum Script {
        Fail,
        Frames(Vec<String>, bool),
    }

    #[derive(Default)]
    struct FakeTransport {
        script: Mutex<VecDeque<Script>>,
        opens: AtomicUsize,
    }

    impl FakeTransport {
        fn with(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                opens: AtomicUsize::new(0),
            })
        }

        fn opens(&self) -> usize {
            self.opens.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventTransport for FakeTransport {
        async fn open(&self, _session_id: SessionId) -> Result<FrameStream, ClientError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Script::Frames(frames, hold)) => {
                    let frames = stream::iter(frames.into_iter().map(Ok));
                    if hold {
                        Ok(Box::pin(frames.chain(stream::pending())))
                    } else {
                        Ok(Box::pin(frames))
                    }
                }
                Some(Script::Fail) | None => Err(ClientError::Stream("refused".into())),
            }
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl SessionEventHandler for Recorder {
        fn on_connected(&mut self, _session_id: SessionId, _user_id: UserId) {
            self.log.lock().unwrap().push("connected".into());
        }
        fn on_new_message(&mut self, message: ChatMessage) {
            self.log.lock().unwrap().push(format!("message:{}", message.message));
        }
        fn on_error(&mut self, _error: &ClientError) {
            self.log.lock().unwrap().push("error".into());
        }
    }

    fn frame(event: &SessionEvent) -> String {
        serde_json::to_string(event).unwrap()
    }

    async fn wait_for(rx: &mut watch::Receiver<SubscriberState>, want: SubscriberState) {
        rx.wait_for(|state| *state == want).await.unwrap();
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(5), Duration::from_secs(32));
        assert_eq!(policy.delay(9), Duration::from_secs(32));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatches_events_and_skips_unknown() {
        let session = SessionId::new();
        let transport = FakeTransport::with(vec![Script::Frames(
            vec![
                frame(&SessionEvent::connected(session, UserId::new())),
                r#"{"type":"dice_animation"}"#.to_string(),
                "not json".to_string(),
                frame(&SessionEvent::new_message(ChatMessage::system("hi", None))),
            ],
            true,
        )]);
        let recorder = Recorder::default();
        let mut subscriber = SessionSubscriber::new(transport, session, BackoffPolicy::default());
        let mut states = subscriber.watch_state();

        subscriber.connect(recorder.clone()).await;
        wait_for(&mut states, SubscriberState::Open).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(recorder.entries(), vec!["connected", "message:hi"]);
        subscriber.disconnect().await;
        assert_eq!(subscriber.state(), SubscriberState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_failed_opens() {
        let transport = FakeTransport::with(Vec::new());
        let recorder = Recorder::default();
        let mut subscriber =
            SessionSubscriber::new(Arc::clone(&transport), SessionId::new(), BackoffPolicy::default());
        let mut states = subscriber.watch_state();

        subscriber.connect(recorder.clone()).await;
        wait_for(&mut states, SubscriberState::Failed).await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.opens(), 5);
        assert_eq!(recorder.entries(), vec!["error"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_resets_failures() {
        let transport = FakeTransport::with(vec![
            Script::Fail,
            Script::Fail,
            Script::Fail,
            Script::Frames(Vec::new(), false),
            Script::Fail,
            Script::Fail,
            Script::Fail,
            Script::Fail,
            Script::Frames(Vec::new(), true),
        ]);
        let mut subscriber =
            SessionSubscriber::new(Arc::clone(&transport), SessionId::new(), BackoffPolicy::default());
        let mut states = subscriber.watch_state();

        subscriber.connect(Recorder::default()).await;
        tokio::time::sleep(Duration::from_secs(600)).await;

        // Eight failures in total but never five in a row.
        wait_for(&mut states, SubscriberState::Open).await;
        assert_eq!(transport.opens(), 9);
        subscriber.disconnect().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_is_idempotent_and_stops_retries() {
        let transport = FakeTransport::with(Vec::new());
        let mut subscriber =
            SessionSubscriber::new(Arc::clone(&transport), SessionId::new(), BackoffPolicy::default());
        let mut states = subscriber.watch_state();

        subscriber.connect(Recorder::default()).await;
        wait_for(&mut states, SubscriberState::Reconnecting { attempt: 2 }).await;

        subscriber.disconnect().await;
        subscriber.disconnect().await;
        let opens = transport.opens();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(transport.opens(), opens);
        assert_eq!(subscriber.state(), SubscriberState::Idle);
    }
}
