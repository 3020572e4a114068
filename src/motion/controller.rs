// src/motion/controller.rs - Dispatches motion commands and tracks their completion
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::tracker::{CancelFlag, ConvergenceSession, SessionOutcome};
use super::{MotionKind, MotionRequest, MotionStatus, NudgeDirection, Position, SessionId};
use crate::api::{ActuatorApi, ApiError, MoveBody};
use crate::config::MotionConfig;
use crate::panel::Reporter;

/// Owns the single active convergence session for one robot.
///
/// Submitting a new request cancels whatever session is still dispatching or polling, so at most
/// one session writes position and status at a time.
pub struct MotionController {
    actuator: Arc<dyn ActuatorApi>,
    config: MotionConfig,
    reporter: Reporter,
    active: Mutex<Option<(SessionId, CancelFlag)>>,
    next_session: AtomicU64,
}

/// Result of a submission: either already finished (dispatch failed) or a running tracker task.
pub struct SessionHandle {
    id: SessionId,
    kind: MotionKind,
    expected: Position,
    inner: HandleInner,
}

enum HandleInner {
    Finished(SessionOutcome),
    Running(JoinHandle<SessionOutcome>),
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn kind(&self) -> MotionKind {
        self.kind
    }

    pub fn expected(&self) -> Position {
        self.expected
    }

    /// True once the session has reached a terminal outcome.
    pub fn is_finished(&self) -> bool {
        match &self.inner {
            HandleInner::Finished(_) => true,
            HandleInner::Running(handle) => handle.is_finished(),
        }
    }

    pub async fn outcome(self) -> SessionOutcome {
        match self.inner {
            HandleInner::Finished(outcome) => outcome,
            HandleInner::Running(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => SessionOutcome::Cancelled { attempts: 0 },
                Err(e) => std::panic::resume_unwind(e.into_panic()),
            },
        }
    }
}

impl MotionController {
    pub fn new(actuator: Arc<dyn ActuatorApi>, config: MotionConfig, reporter: Reporter) -> Self {
        Self {
            actuator,
            config,
            reporter,
            active: Mutex::new(None),
            next_session: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub async fn position(&self) -> Position {
        self.reporter.last_known().await
    }

    pub async fn move_absolute(&self, target: Position, speed: u8) -> SessionHandle {
        self.submit(MotionRequest::AbsoluteMove { target, speed }).await
    }

    pub async fn move_relative(&self, delta: Position, speed: u8) -> SessionHandle {
        self.submit(MotionRequest::RelativeMove { delta, speed }).await
    }

    pub async fn nudge(&self, direction: NudgeDirection, step: f64, speed: u8) -> SessionHandle {
        self.submit(MotionRequest::Nudge { step: direction.step(step), speed }).await
    }

    pub async fn go_home(&self) -> SessionHandle {
        self.submit(MotionRequest::Home).await
    }

    /// Dispatches `request` and starts tracking it.
    ///
    /// The expected position is fixed from the last known position before the
    /// command goes out, so a stale read can never be mistaken for arrival.
    pub async fn submit(&self, request: MotionRequest) -> SessionHandle {
        let kind = request.kind();
        let id = self.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.reporter.last_known().await;
        let expected = request.expected(&current);

        let mut session = ConvergenceSession::new(
            id,
            kind,
            expected,
            self.config.profile(kind),
            self.config.arrival_threshold,
        );
        self.supersede(id, session.cancel_flag()).await;
        session.begin_dispatch();

        let finished = |outcome| SessionHandle { id, kind, expected, inner: HandleInner::Finished(outcome) };

        if let Err(message) = request.validate() {
            return finished(session.fail_dispatch(message, &self.reporter));
        }

        if session.is_cancelled() {
            return finished(session.abandon());
        }
        self.reporter.target(id, expected);
        self.reporter.motion(id, MotionStatus::Moving(kind));
        tracing::info!("Session {}: {} move towards {}", id, kind, expected);

        // A newer request may have superseded this one while the command was in flight.
        let dispatched = self.dispatch(&request).await;
        if session.is_cancelled() {
            return finished(session.abandon());
        }
        if let Err(e) = dispatched {
            return finished(session.fail_dispatch(e.to_string(), &self.reporter));
        }

        let actuator = self.actuator.clone();
        let reporter = self.reporter.clone();
        let handle = tokio::spawn(async move { session.track(&*actuator, &reporter).await });
        SessionHandle { id, kind, expected, inner: HandleInner::Running(handle) }
    }

    /// Cancels the active session, if any.
    pub async fn cancel_active(&self) -> Option<SessionId> {
        let mut active = self.active.lock().await;
        active.take().map(|(id, flag)| {
            flag.cancel();
            tracing::info!("Session {} cancelled", id);
            id
        })
    }

    async fn supersede(&self, id: SessionId, flag: CancelFlag) {
        let mut active = self.active.lock().await;
        if let Some((previous, previous_flag)) = active.replace((id, flag)) {
            previous_flag.cancel();
            tracing::debug!("Session {} superseded by session {}", previous, id);
        }
    }

    async fn dispatch(&self, request: &MotionRequest) -> Result<(), ApiError> {
        if request.kind().requires_unlock() {
            self.actuator.emergency_unlock().await?;
        }
        match request {
            MotionRequest::AbsoluteMove { target, speed } => {
                self.actuator.move_absolute(&MoveBody::new(*target, *speed)).await
            }
            MotionRequest::RelativeMove { delta, speed } => {
                self.actuator.move_relative(&MoveBody::new(*delta, *speed)).await
            }
            MotionRequest::Nudge { step, speed } => {
                self.actuator.move_relative(&MoveBody::new(*step, *speed)).await
            }
            MotionRequest::Home => self.actuator.find_home().await,
        }
    }
}
