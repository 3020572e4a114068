//! Farm robot control panel core.
//!
//! Issues motion and action commands to a remote actuator API and tracks each
//! motion until the reported position converges on the expected one.

pub mod api;
pub mod config;
pub mod motion;
pub mod panel;
pub mod robot;
pub mod sim;

pub use api::{ActuatorApi, ApiError, HttpActuator};
pub use config::{Config, ConfigError, MotionConfig, PollProfile};
pub use motion::{
    ConvergenceSession, MotionController, MotionKind, MotionRequest, MotionStatus, NudgeDirection, Position,
    SessionHandle, SessionOutcome,
};
pub use panel::{PanelEvent, PanelState, PanelStatus, Reporter};
pub use robot::{Robot, RobotError};
