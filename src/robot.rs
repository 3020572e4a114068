// src/robot.rs - Operator-level view of one robot
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use crate::api::{ActuatorApi, ApiError, ClearPhotosResponse, HttpActuator, Photo, WeederBody};
use crate::config::Config;
use crate::motion::{MotionController, Position};
use crate::panel::{EventSink, PanelStatus, Reporter};

#[derive(Debug, Error)]
pub enum RobotError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("Invalid speed {0}: must be between 1 and 100")]
    InvalidSpeed(u8),
}

/// Ties the actuator API, the motion controller and the panel together.
pub struct Robot {
    actuator: Arc<dyn ActuatorApi>,
    motion: MotionController,
    reporter: Reporter,
}

impl Robot {
    pub fn new(actuator: Arc<dyn ActuatorApi>, config: &Config, events: EventSink) -> Self {
        let reporter = Reporter::new(events);
        let motion = MotionController::new(actuator.clone(), config.motion.clone(), reporter.clone());
        Self { actuator, motion, reporter }
    }

    /// Connects to the HTTP actuator described by `config.api`.
    pub fn connect(config: &Config, events: EventSink) -> Result<Self, RobotError> {
        let actuator = HttpActuator::new(&config.api)?;
        tracing::info!("Using actuator API at {}", config.api.base_url);
        Ok(Self::new(Arc::new(actuator), config, events))
    }

    pub fn motion(&self) -> &MotionController {
        &self.motion
    }

    pub async fn position(&self) -> Position {
        self.reporter.last_known().await
    }

    /// Plain position refresh outside any motion session.
    ///
    /// Only an error answer from the actuator raises an alert. A 503 marks the panel
    /// as not connected; transport failures and short or malformed readings are
    /// logged and leave the last known position untouched.
    pub async fn refresh_position(&self) -> Result<Position, RobotError> {
        let result = match self.actuator.position().await {
            Ok(reading) if reading.z.is_some() => Ok(reading),
            Ok(_) => Err(ApiError::Malformed("expected [x, y, z]".to_string())),
            Err(e) => Err(e),
        };
        match result {
            Ok(reading) => Ok(self.reporter.observe(None, reading).await),
            Err(e) if e.is_not_connected() => {
                tracing::info!("Position unavailable: actuator not connected");
                self.reporter.status(None, PanelStatus::NotConnected);
                Err(e.into())
            }
            Err(e @ (ApiError::Status { .. } | ApiError::Unauthorized(_))) => {
                self.reporter.alert(format!("Error fetching position: {}", e));
                Err(e.into())
            }
            Err(e @ ApiError::Malformed(_)) => {
                tracing::debug!("Ignoring position reading: {}", e);
                Err(e.into())
            }
            Err(e) => {
                tracing::warn!("Error fetching position: {}", e);
                Err(e.into())
            }
        }
    }

    pub async fn unlock(&self) -> Result<(), RobotError> {
        match self.actuator.emergency_unlock().await {
            Ok(()) => {
                self.reporter.status(None, PanelStatus::Unlocked);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Unlock failed: {}", e);
                self.reporter.status(None, PanelStatus::UnlockFailed);
                Err(e.into())
            }
        }
    }

    pub async fn water_plant(&self) -> Result<(), RobotError> {
        self.reporter.status(None, PanelStatus::Watering);
        match self.actuator.water_plant().await {
            Ok(()) => {
                self.reporter.status(None, PanelStatus::WateringComplete);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Watering failed: {}", e);
                self.reporter.status(None, PanelStatus::WateringFailed);
                Err(e.into())
            }
        }
    }

    pub async fn weed(&self, at: Position, working_depth: f64, speed: u8) -> Result<(), RobotError> {
        if !(1..=100).contains(&speed) {
            self.reporter.status(None, PanelStatus::WeedingFailed);
            return Err(RobotError::InvalidSpeed(speed));
        }
        self.reporter.status(None, PanelStatus::Weeding);
        let body = WeederBody { x: at.x, y: at.y, z: at.z, working_depth, speed };
        match self.actuator.weeder(&body).await {
            Ok(()) => {
                self.reporter.status(None, PanelStatus::WeedingComplete);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Weeding failed: {}", e);
                self.reporter.status(None, PanelStatus::WeedingFailed);
                Err(e.into())
            }
        }
    }

    /// Captures a photo. Missing coordinates or timestamp are filled from the
    /// last known position and the local clock.
    pub async fn take_photo(&self) -> Result<Photo, RobotError> {
        match self.actuator.take_photo().await {
            Ok(mut photo) => {
                if photo.coordinates.is_none() {
                    photo.coordinates = Some(self.reporter.last_known().await);
                }
                if photo.created_at.is_none() {
                    photo.created_at = Some(Utc::now());
                }
                tracing::info!("Photo captured: {}", photo.url);
                self.reporter.status(None, PanelStatus::PhotoTaken);
                Ok(photo)
            }
            Err(e) => {
                tracing::warn!("Photo failed: {}", e);
                self.reporter.status(None, PanelStatus::PhotoFailed);
                Err(e.into())
            }
        }
    }

    pub async fn clear_photos(&self) -> Result<ClearPhotosResponse, RobotError> {
        match self.actuator.clear_photos().await {
            Ok(response) => {
                tracing::info!("Cleared {} photos", response.deleted_count);
                self.reporter.status(None, PanelStatus::PhotosCleared);
                Ok(response)
            }
            Err(e) => {
                tracing::warn!("Clearing photos failed: {}", e);
                self.reporter.status(None, PanelStatus::ClearPhotosFailed);
                Err(e.into())
            }
        }
    }
}
