// src/motion/status.rs - Status signal produced by motion sessions
use std::fmt;

use super::MotionKind;

/// Identifies one convergence session.
pub type SessionId = u64;

/// Status of a motion session as shown to the operator.
///
/// The wording differs per motion kind; the category (in progress, converged,
/// timed out, dispatch failed) is what callers should match on.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionStatus {
    Moving(MotionKind),
    Converged(MotionKind),
    TimedOut(MotionKind),
    DispatchFailed { kind: MotionKind, message: String },
}

impl MotionStatus {
    pub fn kind(&self) -> MotionKind {
        match self {
            MotionStatus::Moving(kind)
            | MotionStatus::Converged(kind)
            | MotionStatus::TimedOut(kind) => *kind,
            MotionStatus::DispatchFailed { kind, .. } => *kind,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, MotionStatus::Moving(_))
    }
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use MotionKind::*;
        match self {
            MotionStatus::Moving(Absolute) => f.write_str("Moving..."),
            MotionStatus::Moving(Relative) => f.write_str("Moving (relative)..."),
            MotionStatus::Moving(Nudge) => f.write_str("Nudging..."),
            MotionStatus::Moving(Home) => f.write_str("Homing..."),
            MotionStatus::Converged(Absolute | Relative) => f.write_str("Reached target position"),
            MotionStatus::Converged(Nudge) => f.write_str("Nudge complete"),
            MotionStatus::Converged(Home) => f.write_str("Reached home"),
            MotionStatus::TimedOut(Absolute | Relative) => {
                f.write_str("Warning: Final position may not be exact")
            }
            MotionStatus::TimedOut(Nudge) => f.write_str("Nudge timeout"),
            MotionStatus::TimedOut(Home) => f.write_str("Warning: Did not reach home exactly"),
            MotionStatus::DispatchFailed { kind: Absolute | Relative, message } => {
                write!(f, "Error: {}", message)
            }
            MotionStatus::DispatchFailed { kind: Nudge, .. } => f.write_str("Nudge failed"),
            MotionStatus::DispatchFailed { kind: Home, .. } => f.write_str("Home failed"),
        }
    }
}
