// src/motion/mod.rs - Motion dispatch and convergence tracking

mod position;
mod request;
mod status;
pub mod controller;
pub mod tracker;

pub use controller::{MotionController, SessionHandle};
pub use position::Position;
pub use request::{MotionKind, MotionRequest, NudgeDirection};
pub use status::{MotionStatus, SessionId};
pub use tracker::{CancelFlag, ConvergenceSession, PositionSource, SessionOutcome};
