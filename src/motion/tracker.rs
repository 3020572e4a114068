// src/motion/tracker.rs - Polls the actuator until a move has converged
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::time::sleep;

use super::{MotionKind, MotionStatus, Position, SessionId};
use crate::api::{ActuatorApi, ApiError, PositionReading};
use crate::config::PollProfile;
use crate::panel::Reporter;

/// Anything the tracker can read the current position from.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch_position(&self) -> Result<PositionReading, ApiError>;
}

#[async_trait]
impl<T: ActuatorApi + ?Sized> PositionSource for T {
    async fn fetch_position(&self) -> Result<PositionReading, ApiError> {
        self.position().await
    }
}

/// Cooperative cancellation. Checked before every attempt; in-flight requests are
/// allowed to finish but their results are dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Dispatching,
    AwaitingInitialDelay,
    /// Attempt number, starting at 1.
    Polling(u32),
    Converged,
    TimedOut,
    DispatchFailed,
    Cancelled,
}

/// How a session ended. `attempts` counts position queries, failed ones included.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Converged { attempts: u32, position: Position },
    TimedOut { attempts: u32 },
    DispatchFailed(String),
    /// Superseded by a newer session; nothing was emitted after cancellation.
    Cancelled { attempts: u32 },
}

impl SessionOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            SessionOutcome::Converged { attempts, .. }
            | SessionOutcome::TimedOut { attempts }
            | SessionOutcome::Cancelled { attempts } => *attempts,
            SessionOutcome::DispatchFailed(_) => 0,
        }
    }
}

/// One bounded polling sequence tied to a single motion command.
#[derive(Debug)]
pub struct ConvergenceSession {
    id: SessionId,
    kind: MotionKind,
    expected: Position,
    profile: PollProfile,
    threshold: f64,
    attempts: u32,
    cancel: CancelFlag,
    state: SessionState,
}

impl ConvergenceSession {
    pub fn new(id: SessionId, kind: MotionKind, expected: Position, profile: PollProfile, threshold: f64) -> Self {
        Self {
            id,
            kind,
            expected,
            profile,
            threshold,
            attempts: 0,
            cancel: CancelFlag::new(),
            state: SessionState::Idle,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    pub fn expected(&self) -> Position {
        self.expected
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Handle that lets a newer session supersede this one.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn begin_dispatch(&mut self) {
        self.state = SessionState::Dispatching;
    }

    /// Ends a superseded session without reporting anything.
    pub fn abandon(self) -> SessionOutcome {
        self.cancelled()
    }

    /// The initiating command failed: report it and never start polling.
    /// A session superseded meanwhile stays silent.
    pub fn fail_dispatch(mut self, message: String, reporter: &Reporter) -> SessionOutcome {
        if self.cancel.is_cancelled() {
            tracing::debug!("Session {} dispatch failed after supersession: {}", self.id, message);
            return self.cancelled();
        }
        self.state = SessionState::DispatchFailed;
        tracing::warn!("Session {} ({} move) dispatch failed: {}", self.id, self.kind, message);
        reporter.motion(self.id, MotionStatus::DispatchFailed { kind: self.kind, message: message.clone() });
        SessionOutcome::DispatchFailed(message)
    }

    /// Polls `source` until the reported (x, y) position is within the arrival
    /// threshold of the expected position, or the attempt budget is spent.
    ///
    /// Fetch failures and malformed readings use up their attempt but are
    /// otherwise ignored.
    pub async fn track<S>(mut self, source: &S, reporter: &Reporter) -> SessionOutcome
    where
        S: PositionSource + ?Sized,
    {
        self.state = SessionState::AwaitingInitialDelay;
        sleep(self.profile.initial_delay()).await;

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            let attempt = self.attempts + 1;
            self.state = SessionState::Polling(attempt);

            let fetched = source.fetch_position().await;
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            self.attempts = attempt;

            match fetched {
                Ok(reading) => {
                    let Some(position) = reporter.observe_session(self.id, reading, &self.cancel).await else {
                        return self.cancelled();
                    };
                    let distance = position.planar_distance(&self.expected);
                    tracing::debug!(
                        "Session {} attempt {}/{}: at {} ({:.3} from target)",
                        self.id, attempt, self.profile.max_attempts, position, distance
                    );
                    if distance < self.threshold {
                        if self.cancel.is_cancelled() {
                            return self.cancelled();
                        }
                        self.state = SessionState::Converged;
                        tracing::info!("Session {} ({} move) converged after {} attempts", self.id, self.kind, attempt);
                        reporter.motion(self.id, MotionStatus::Converged(self.kind));
                        return SessionOutcome::Converged { attempts: attempt, position };
                    }
                }
                Err(e) => {
                    tracing::debug!("Session {} attempt {}: position unavailable: {}", self.id, attempt, e);
                }
            }

            if attempt >= self.profile.max_attempts {
                if self.cancel.is_cancelled() {
                    return self.cancelled();
                }
                self.state = SessionState::TimedOut;
                tracing::warn!(
                    "Session {} ({} move) did not converge within {} attempts",
                    self.id, self.kind, attempt
                );
                reporter.motion(self.id, MotionStatus::TimedOut(self.kind));
                return SessionOutcome::TimedOut { attempts: attempt };
            }
            sleep(self.profile.poll_interval()).await;
        }
    }

    fn cancelled(mut self) -> SessionOutcome {
        match self.state {
            SessionState::Polling(attempt) => {
                tracing::debug!("Session {} cancelled during attempt {}", self.id, attempt)
            }
            state => tracing::debug!("Session {} cancelled while {:?} after {} attempts", self.id, state, self.attempts),
        }
        self.state = SessionState::Cancelled;
        SessionOutcome::Cancelled { attempts: self.attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::{event_channel, PanelEvent, PanelStatus};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicU32;

    struct Scripted {
        readings: Mutex<VecDeque<Result<PositionReading, ApiError>>>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(readings: Vec<Result<PositionReading, ApiError>>) -> Self {
            Self { readings: Mutex::new(readings.into()), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl PositionSource for Scripted {
        async fn fetch_position(&self) -> Result<PositionReading, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiError::Malformed("script exhausted".to_string())))
        }
    }

    fn at(x: f64, y: f64) -> Result<PositionReading, ApiError> {
        Ok(PositionReading { x, y, z: Some(0.0) })
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_on_third_attempt() {
        let (tx, _rx) = event_channel();
        let reporter = Reporter::new(tx);
        let source = Scripted::new(vec![at(5.0, 5.0), at(9.0, 19.0), at(10.0, 20.0), at(10.0, 20.0)]);
        let session = ConvergenceSession::new(
            1,
            MotionKind::Absolute,
            Position::new(10.0, 20.0, 0.0),
            PollProfile::new(2000, 1000, 10),
            0.5,
        );
        let outcome = session.track(&source, &reporter).await;
        assert_eq!(outcome, SessionOutcome::Converged { attempts: 3, position: Position::new(10.0, 20.0, 0.0) });
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_strict() {
        let (tx, _rx) = event_channel();
        let reporter = Reporter::new(tx);
        // Exactly 0.5 away is not "arrived".
        let source = Scripted::new(vec![at(0.5, 0.0), at(0.3, 0.3)]);
        let session = ConvergenceSession::new(2, MotionKind::Home, Position::ORIGIN, PollProfile::new(0, 10, 5), 0.5);
        let outcome = session.track(&source, &reporter).await;
        assert!(matches!(outcome, SessionOutcome::Converged { attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_consume_attempts_silently() {
        let (tx, mut rx) = event_channel();
        let reporter = Reporter::new(tx);
        let source = Scripted::new(vec![
            Err(ApiError::NotConnected),
            Err(ApiError::Malformed("[]".to_string())),
            Err(ApiError::Status { status: 500, message: "boom".to_string() }),
        ]);
        let session = ConvergenceSession::new(3, MotionKind::Nudge, Position::new(5.0, 0.0, 0.0), PollProfile::new(500, 1000, 3), 0.5);
        let outcome = session.track(&source, &reporter).await;
        assert_eq!(outcome, SessionOutcome::TimedOut { attempts: 3 });
        drop(reporter);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![PanelEvent::Status {
                session: Some(3),
                status: PanelStatus::Motion(MotionStatus::TimedOut(MotionKind::Nudge)),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_timing() {
        let (tx, _rx) = event_channel();
        let reporter = Reporter::new(tx);
        let source = Scripted::new((0..8).map(|_| at(1.0, 1.0)).collect());
        let session = ConvergenceSession::new(4, MotionKind::Nudge, Position::new(5.0, 0.0, 0.0), PollProfile::new(500, 1000, 8), 0.5);
        let start = tokio::time::Instant::now();
        let outcome = session.track(&source, &reporter).await;
        assert_eq!(outcome, SessionOutcome::TimedOut { attempts: 8 });
        // 500ms grace, then 7 intervals between 8 attempts.
        let elapsed = start.elapsed();
        assert!(elapsed >= std::time::Duration::from_millis(500 + 7 * 1000));
        assert!(elapsed < std::time::Duration::from_millis(500 + 8 * 1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_first_attempt() {
        let (tx, mut rx) = event_channel();
        let reporter = Reporter::new(tx);
        let source = Scripted::new(vec![at(0.0, 0.0)]);
        let session = ConvergenceSession::new(5, MotionKind::Home, Position::ORIGIN, PollProfile::new(2000, 1000, 20), 0.5);
        session.cancel_flag().cancel();
        let outcome = session.track(&source, &reporter).await;
        assert_eq!(outcome, SessionOutcome::Cancelled { attempts: 0 });
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        drop(reporter);
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_fail_dispatch_reports_error() {
        let (tx, mut rx) = event_channel();
        let reporter = Reporter::new(tx);
        let mut session = ConvergenceSession::new(6, MotionKind::Absolute, Position::ORIGIN, PollProfile::new(0, 0, 1), 0.5);
        session.begin_dispatch();
        assert_eq!(session.state, SessionState::Dispatching);
        let outcome = session.fail_dispatch("offline".to_string(), &reporter);
        assert_eq!(outcome, SessionOutcome::DispatchFailed("offline".to_string()));
        let event = rx.try_recv().unwrap();
        match event {
            PanelEvent::Status { status, .. } => assert_eq!(status.to_string(), "Error: offline"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_fail_dispatch_after_supersession_is_silent() {
        let (tx, mut rx) = event_channel();
        let reporter = Reporter::new(tx);
        let mut session = ConvergenceSession::new(7, MotionKind::Absolute, Position::ORIGIN, PollProfile::new(0, 0, 1), 0.5);
        session.begin_dispatch();
        session.cancel_flag().cancel();
        let outcome = session.fail_dispatch("late failure".to_string(), &reporter);
        assert_eq!(outcome, SessionOutcome::Cancelled { attempts: 0 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_script_same_outcome() {
        let script = || Scripted::new(vec![Err(ApiError::NotConnected), at(4.0, 0.0), at(4.9, 0.1), at(5.0, 0.0)]);
        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let (tx, _rx) = event_channel();
            let reporter = Reporter::new(tx);
            let source = script();
            let session = ConvergenceSession::new(8, MotionKind::Nudge, Position::new(5.0, 0.0, 0.0), PollProfile::new(500, 1000, 8), 0.5);
            outcomes.push((session.track(&source, &reporter).await, source.calls.load(Ordering::SeqCst)));
        }
        assert_eq!(outcomes[0], outcomes[1]);
        assert!(matches!(outcomes[0].0, SessionOutcome::Converged { attempts: 3, .. }));
        assert_eq!(outcomes[0].1, 3);
    }
}
