//! Client-side online presence.
//!
//! Belief is driven by user activity. Any pointer, key, click, focus or
//! visible signal marks the user active. A heartbeat ticks every
//! `heartbeat_interval`; on each tick the tracker either reports that
//! the user went idle (once the inactivity threshold passes) or re-sends
//! the online status. Hidden and blur signals are recorded but do not
//! change belief on their own, since a user reading in another window
//! is still present. Stopping the tracker reports offline.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tavern_core::config::PresenceConfig;

use crate::error::ClientError;

/// Where presence reports go.
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    /// Report and wait for the result.
    async fn push(&self, is_online: bool) -> Result<(), ClientError>;

    /// Report without waiting. Used when the page is going away.
    fn notify(&self, is_online: bool);
}

/// Raw activity observed by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivitySignal {
    Pointer,
    Key,
    Click,
    Focus,
    Visible,
    Hidden,
    Blur,
    /// The page is being torn down.
    Unload,
}

impl ActivitySignal {
    fn is_activity(self) -> bool {
        matches!(
            self,
            Self::Pointer | Self::Key | Self::Click | Self::Focus | Self::Visible
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickAction {
    Heartbeat,
    WentOffline,
    Nothing,
}

#[derive(Debug)]
struct PresenceState {
    last_activity: Instant,
    online: bool,
    threshold: Duration,
}

impl PresenceState {
    fn new(now: Instant, threshold: Duration) -> Self {
        Self {
            last_activity: now,
            online: true,
            threshold,
        }
    }

    /// Returns true when the user came back online.
    fn on_activity(&mut self, now: Instant) -> bool {
        self.last_activity = now;
        let came_back = !self.online;
        self.online = true;
        came_back
    }

    fn on_tick(&mut self, now: Instant) -> TickAction {
        let idle = now.saturating_duration_since(self.last_activity) >= self.threshold;
        match (self.online, idle) {
            (true, true) => {
                self.online = false;
                TickAction::WentOffline
            }
            (true, false) => TickAction::Heartbeat,
            (false, _) => TickAction::Nothing,
        }
    }
}

/// Background presence reporter for one session.
pub struct PresenceTracker {
    signals: mpsc::UnboundedSender<ActivitySignal>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PresenceTracker {
    /// Validate `config`, report online and start the heartbeat.
    pub fn start<S: StatusSink>(sink: Arc<S>, config: &PresenceConfig) -> Result<Self, ClientError> {
        config
            .validate()
            .map_err(|e| ClientError::Config(e.message))?;

        let (signals, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            sink,
            config.heartbeat_interval(),
            config.inactivity_threshold(),
            rx,
            cancel.clone(),
        ));

        Ok(Self {
            signals,
            cancel,
            task: Some(task),
        })
    }

    /// Feed one activity signal.
    pub fn signal(&self, signal: ActivitySignal) {
        if self.signals.send(signal).is_err() {
            tracing::debug!(?signal, "Presence tracker already stopped");
        }
    }

    /// Stop the heartbeat and report offline.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Presence task ended abnormally");
        }
    }
}

impl Drop for PresenceTracker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn report<S: StatusSink>(sink: &S, is_online: bool) {
    if let Err(e) = sink.push(is_online).await {
        tracing::warn!(is_online, error = %e, "Status report failed");
    }
}

async fn run<S: StatusSink>(
    sink: Arc<S>,
    interval: Duration,
    threshold: Duration,
    mut signals: mpsc::UnboundedReceiver<ActivitySignal>,
    cancel: CancellationToken,
) {
    let mut state = PresenceState::new(Instant::now(), threshold);
    report(sink.as_ref(), true).await;

    let mut heartbeat = tokio::time::interval_at(Instant::now() + interval, interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = heartbeat.tick() => match state.on_tick(Instant::now()) {
                TickAction::Heartbeat => report(sink.as_ref(), true).await,
                TickAction::WentOffline => {
                    tracing::debug!("User idle, reporting offline");
                    report(sink.as_ref(), false).await;
                }
                TickAction::Nothing => {}
            },
            Some(signal) = signals.recv() => match signal {
                ActivitySignal::Unload => {
                    sink.notify(false);
                    return;
                }
                signal if signal.is_activity() => {
                    if state.on_activity(Instant::now()) {
                        report(sink.as_ref(), true).await;
                    }
                }
                _ => {}
            },
        }
    }

    report(sink.as_ref(), false).await;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        pushed: Mutex<Vec<bool>>,
        notified: Mutex<Vec<bool>>,
    }

    impl RecordingSink {
        fn pushed(&self) -> Vec<bool> {
            self.pushed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn push(&self, is_online: bool) -> Result<(), ClientError> {
            self.pushed.lock().unwrap().push(is_online);
            Ok(())
        }

        fn notify(&self, is_online: bool) {
            self.notified.lock().unwrap().push(is_online);
        }
    }

    fn config() -> PresenceConfig {
        PresenceConfig {
            heartbeat_interval_seconds: 30,
            inactivity_threshold_seconds: 300,
        }
    }

    #[test]
    fn test_state_goes_offline_once_then_recovers() {
        let start = Instant::now();
        let mut state = PresenceState::new(start, Duration::from_secs(300));

        assert_eq!(state.on_tick(start + Duration::from_secs(30)), TickAction::Heartbeat);
        assert_eq!(state.on_tick(start + Duration::from_secs(300)), TickAction::WentOffline);
        assert_eq!(state.on_tick(start + Duration::from_secs(330)), TickAction::Nothing);
        assert!(state.on_activity(start + Duration::from_secs(340)));
        assert!(!state.on_activity(start + Duration::from_secs(341)));
    }

    #[test]
    fn test_rejects_threshold_below_interval() {
        let bad = PresenceConfig {
            heartbeat_interval_seconds: 60,
            inactivity_threshold_seconds: 30,
        };
        let result = PresenceTracker::start(Arc::new(RecordingSink::default()), &bad);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_then_idle_then_stop() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = PresenceTracker::start(Arc::clone(&sink), &config()).unwrap();

        // Initial report plus heartbeats at 30..270s, offline at 300s.
        tokio::time::sleep(Duration::from_secs(301)).await;
        let pushed = sink.pushed();
        assert_eq!(pushed.first(), Some(&true));
        assert_eq!(pushed.last(), Some(&false));
        assert_eq!(pushed.iter().filter(|online| !**online).count(), 1);

        // Quiet while offline.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.pushed().len(), pushed.len());

        tracker.stop().await;
        assert_eq!(sink.pushed().last(), Some(&false));
        assert_eq!(sink.pushed().len(), pushed.len() + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_brings_user_back_and_blur_does_not() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = PresenceTracker::start(Arc::clone(&sink), &config()).unwrap();

        tokio::time::sleep(Duration::from_secs(301)).await;
        let offline_at = sink.pushed().len();

        tracker.signal(ActivitySignal::Blur);
        tracker.signal(ActivitySignal::Hidden);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.pushed().len(), offline_at);

        tracker.signal(ActivitySignal::Key);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.pushed()[offline_at..], [true]);
        tracker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hidden_then_visible_keeps_user_online() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = PresenceTracker::start(Arc::clone(&sink), &config()).unwrap();

        tokio::time::sleep(Duration::from_secs(100)).await;
        tracker.signal(ActivitySignal::Hidden);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(sink.pushed().iter().all(|online| *online));

        // Visible at 110s restarts the idle clock.
        tracker.signal(ActivitySignal::Visible);
        tokio::time::sleep(Duration::from_secs(291)).await;
        assert!(sink.pushed().iter().all(|online| *online));

        // Next tick past 410s is the first one over the threshold.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sink.pushed().last(), Some(&false));
        tracker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unload_notifies_without_waiting() {
        let sink = Arc::new(RecordingSink::default());
        let tracker = PresenceTracker::start(Arc::clone(&sink), &config()).unwrap();

        tracker.signal(ActivitySignal::Unload);
        tokio::time::sleep(Duration::from_millis(10)).await;
        tracker.stop().await;

        assert_eq!(*sink.notified.lock().unwrap(), vec![false]);
        assert_eq!(sink.pushed(), vec![true]);
    }
}
