// src/motion/request.rs - Motion commands and their expected end positions
use std::fmt;
use std::str::FromStr;

use super::Position;

/// Which kind of motion a session is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionKind {
    Absolute,
    Relative,
    Nudge,
    Home,
}

impl MotionKind {
    pub const ALL: [MotionKind; 4] = [
        MotionKind::Absolute,
        MotionKind::Relative,
        MotionKind::Nudge,
        MotionKind::Home,
    ];

    /// Absolute and relative moves clear the interlock first; nudges and homing do not.
    pub fn requires_unlock(&self) -> bool {
        matches!(self, MotionKind::Absolute | MotionKind::Relative)
    }
}

impl fmt::Display for MotionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionKind::Absolute => "absolute",
            MotionKind::Relative => "relative",
            MotionKind::Nudge => "nudge",
            MotionKind::Home => "home",
        };
        f.write_str(name)
    }
}

/// A command that changes the robot's target position.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionRequest {
    AbsoluteMove { target: Position, speed: u8 },
    RelativeMove { delta: Position, speed: u8 },
    Nudge { step: Position, speed: u8 },
    Home,
}

impl MotionRequest {
    pub fn kind(&self) -> MotionKind {
        match self {
            MotionRequest::AbsoluteMove { .. } => MotionKind::Absolute,
            MotionRequest::RelativeMove { .. } => MotionKind::Relative,
            MotionRequest::Nudge { .. } => MotionKind::Nudge,
            MotionRequest::Home => MotionKind::Home,
        }
    }

    pub fn speed(&self) -> Option<u8> {
        match self {
            MotionRequest::AbsoluteMove { speed, .. }
            | MotionRequest::RelativeMove { speed, .. }
            | MotionRequest::Nudge { speed, .. } => Some(*speed),
            MotionRequest::Home => None,
        }
    }

    /// The position the robot should report once the command has taken effect,
    /// given the last known position.
    pub fn expected(&self, current: &Position) -> Position {
        match self {
            MotionRequest::AbsoluteMove { target, .. } => *target,
            MotionRequest::RelativeMove { delta, .. } => current.offset(delta),
            MotionRequest::Nudge { step, .. } => current.offset(step),
            MotionRequest::Home => Position::ORIGIN,
        }
    }

    /// Speed is a percentage of the actuator's maximum.
    pub fn validate(&self) -> Result<(), String> {
        match self.speed() {
            Some(speed) if !(1..=100).contains(&speed) => {
                Err(format!("speed must be between 1 and 100, got {}", speed))
            }
            _ => Ok(()),
        }
    }
}

/// Jog pad direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    XPlus,
    XMinus,
    YPlus,
    YMinus,
    ZPlus,
    ZMinus,
}

impl NudgeDirection {
    /// Step vector for a jog of `step` units in this direction.
    pub fn step(&self, step: f64) -> Position {
        match self {
            NudgeDirection::XPlus => Position::new(step, 0.0, 0.0),
            NudgeDirection::XMinus => Position::new(-step, 0.0, 0.0),
            NudgeDirection::YPlus => Position::new(0.0, step, 0.0),
            NudgeDirection::YMinus => Position::new(0.0, -step, 0.0),
            NudgeDirection::ZPlus => Position::new(0.0, 0.0, step),
            NudgeDirection::ZMinus => Position::new(0.0, 0.0, -step),
        }
    }
}

impl FromStr for NudgeDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x+" => Ok(NudgeDirection::XPlus),
            "x-" => Ok(NudgeDirection::XMinus),
            "y+" => Ok(NudgeDirection::YPlus),
            "y-" => Ok(NudgeDirection::YMinus),
            "z+" => Ok(NudgeDirection::ZPlus),
            "z-" => Ok(NudgeDirection::ZMinus),
            other => Err(format!("unknown direction '{}', expected one of x+ x- y+ y- z+ z-", other)),
        }
    }
}
