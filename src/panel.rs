//! Operator-facing panel state.
//!
//! Motion sessions and robot actions never write display state directly. They send
//! [`PanelEvent`]s over an unbounded channel, and a single consumer folds them into a
//! [`PanelState`] that front ends observe through a `watch` channel.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;

use crate::api::PositionReading;
use crate::motion::{CancelFlag, MotionStatus, Position, SessionId};

pub type EventSink = mpsc::UnboundedSender<PanelEvent>;
pub type EventStream = mpsc::UnboundedReceiver<PanelEvent>;

/// Creates a connected sink/stream pair.
pub fn event_channel() -> (EventSink, EventStream) {
    mpsc::unbounded_channel()
}

/// Everything the panel can display in its status line.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelStatus {
    Motion(MotionStatus),
    /// The actuator answered a plain position refresh with 503.
    NotConnected,
    Unlocked,
    UnlockFailed,
    Watering,
    WateringComplete,
    WateringFailed,
    Weeding,
    WeedingComplete,
    WeedingFailed,
    PhotoTaken,
    PhotoFailed,
    PhotosCleared,
    ClearPhotosFailed,
}

impl fmt::Display for PanelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PanelStatus::Motion(status) => return status.fmt(f),
            PanelStatus::NotConnected => "Bot not connected",
            PanelStatus::Unlocked => "Unlocked",
            PanelStatus::UnlockFailed => "Unlock failed",
            PanelStatus::Watering => "Watering",
            PanelStatus::WateringComplete => "Watering complete",
            PanelStatus::WateringFailed => "Watering failed",
            PanelStatus::Weeding => "Weeding",
            PanelStatus::WeedingComplete => "Weeding complete",
            PanelStatus::WeedingFailed => "Weeding failed",
            PanelStatus::PhotoTaken => "Photo taken successfully",
            PanelStatus::PhotoFailed => "Photo failed",
            PanelStatus::PhotosCleared => "All photos cleared",
            PanelStatus::ClearPhotosFailed => "Error clearing photos",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEvent {
    /// A position report. `session` is `None` for ordinary refreshes.
    PositionObserved { session: Option<SessionId>, position: Position },
    TargetSet { session: SessionId, target: Position },
    Status { session: Option<SessionId>, status: PanelStatus },
    /// A hard failure that warrants interrupting the operator.
    Alert(String),
}

/// Folded view of the event stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelState {
    pub position: Position,
    pub target: Option<Position>,
    pub status: Option<PanelStatus>,
    pub alert: Option<String>,
    /// Session that produced the most recent motion event.
    pub session: Option<SessionId>,
}

impl PanelState {
    pub fn apply(&mut self, event: &PanelEvent) {
        match event {
            PanelEvent::PositionObserved { session, position } => {
                self.position = *position;
                if session.is_some() {
                    self.session = *session;
                }
            }
            PanelEvent::TargetSet { session, target } => {
                self.target = Some(*target);
                self.session = Some(*session);
            }
            PanelEvent::Status { session, status } => {
                self.status = Some(status.clone());
                if session.is_some() {
                    self.session = *session;
                }
            }
            PanelEvent::Alert(message) => {
                self.alert = Some(message.clone());
            }
        }
    }

    pub fn status_text(&self) -> String {
        self.status.as_ref().map(|s| s.to_string()).unwrap_or_default()
    }
}

/// Write side of the panel: forwards events and keeps the last known position
/// that relative moves are computed from.
#[derive(Clone)]
pub struct Reporter {
    events: EventSink,
    last_known: Arc<RwLock<Position>>,
}

impl Reporter {
    pub fn new(events: EventSink) -> Self {
        Self::with_position(events, Position::ORIGIN)
    }

    pub fn with_position(events: EventSink, position: Position) -> Self {
        Self { events, last_known: Arc::new(RwLock::new(position)) }
    }

    pub async fn last_known(&self) -> Position {
        *self.last_known.read().await
    }

    /// Records a position report and publishes it. Returns the resolved position.
    pub async fn observe(&self, session: Option<SessionId>, reading: PositionReading) -> Position {
        let position = {
            let mut last = self.last_known.write().await;
            let resolved = reading.into_position(&*last);
            *last = resolved;
            resolved
        };
        self.emit(PanelEvent::PositionObserved { session, position });
        position
    }

    /// Like [`Reporter::observe`] for a tracking session. Nothing is recorded once
    /// `cancel` is set; the flag is tested under the write lock.
    pub async fn observe_session(
        &self,
        session: SessionId,
        reading: PositionReading,
        cancel: &CancelFlag,
    ) -> Option<Position> {
        let mut last = self.last_known.write().await;
        if cancel.is_cancelled() {
            return None;
        }
        let position = reading.into_position(&*last);
        *last = position;
        self.emit(PanelEvent::PositionObserved { session: Some(session), position });
        Some(position)
    }

    pub fn target(&self, session: SessionId, target: Position) {
        self.emit(PanelEvent::TargetSet { session, target });
    }

    pub fn status(&self, session: Option<SessionId>, status: PanelStatus) {
        self.emit(PanelEvent::Status { session, status });
    }

    pub fn motion(&self, session: SessionId, status: MotionStatus) {
        self.status(Some(session), PanelStatus::Motion(status));
    }

    pub fn alert(&self, message: impl Into<String>) {
        self.emit(PanelEvent::Alert(message.into()));
    }

    fn emit(&self, event: PanelEvent) {
        // Nobody listening is not an error for the producer.
        let _ = self.events.send(event);
    }
}

/// Spawns the consumer that folds events into a [`PanelState`].
///
/// The task ends once every [`EventSink`] has been dropped.
pub fn spawn_panel(mut events: EventStream) -> (watch::Receiver<PanelState>, JoinHandle<PanelState>) {
    let (state_tx, state_rx) = watch::channel(PanelState::default());
    let handle = tokio::spawn(async move {
        let mut state = PanelState::default();
        while let Some(event) = events.recv().await {
            match &event {
                PanelEvent::Status { status, .. } => tracing::info!("Status: {}", status),
                PanelEvent::Alert(message) => tracing::error!("{}", message),
                PanelEvent::PositionObserved { position, .. } => {
                    tracing::debug!("Position: {}", position)
                }
                PanelEvent::TargetSet { target, .. } => tracing::debug!("Target: {}", target),
            }
            state.apply(&event);
            let _ = state_tx.send(state.clone());
        }
        state
    });
    (state_rx, handle)
}
