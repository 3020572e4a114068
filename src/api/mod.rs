//! Remote actuator API.
//!
//! The actuator executes every motion itself; this crate only issues commands and
//! reads back position. [`ActuatorApi`] is the seam between the two, with
//! [`http::HttpActuator`] as the production implementation.

pub mod http;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpActuator;
pub use models::{ClearPhotosResponse, MoveBody, Photo, PositionReading, WeederBody};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 503-class answer: the actuator is not connected to the control server.
    #[error("Actuator not connected")]
    NotConnected,
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    pub fn is_not_connected(&self) -> bool {
        matches!(self, ApiError::NotConnected)
    }
}

/// Logical operations exposed by the remote actuator.
#[async_trait]
pub trait ActuatorApi: Send + Sync + 'static {
    /// Current position. Accepts any array of at least two numbers.
    async fn position(&self) -> Result<PositionReading, ApiError>;
    async fn emergency_unlock(&self) -> Result<(), ApiError>;
    async fn move_absolute(&self, body: &MoveBody) -> Result<(), ApiError>;
    async fn move_relative(&self, body: &MoveBody) -> Result<(), ApiError>;
    async fn find_home(&self) -> Result<(), ApiError>;
    async fn water_plant(&self) -> Result<(), ApiError>;
    async fn weeder(&self, body: &WeederBody) -> Result<(), ApiError>;
    async fn take_photo(&self) -> Result<Photo, ApiError>;
    async fn clear_photos(&self) -> Result<ClearPhotosResponse, ApiError>;
}
