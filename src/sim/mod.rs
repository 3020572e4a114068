//! Simulated actuator, used as a test harness.
//!
//! A kinematic stand-in for the real robot: commanded targets are approached in a
//! straight line at a configurable speed, one tick at a time. Served over HTTP by
//! [`server`], it lets the control panel and its tracker run end to end without
//! hardware.

pub mod server;

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;

use crate::api::{ClearPhotosResponse, MoveBody, Photo, WeederBody};
use crate::motion::Position;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("Actuator not connected")]
    NotConnected,
    #[error("Motion locked: send emergency-unlock first")]
    Locked,
    #[error("Invalid speed {0}: must be between 1 and 100")]
    InvalidSpeed(u8),
}

pub struct SimActuator {
    pub position: Position,
    pub target: Position,
    /// Units per second at 100% speed.
    pub max_speed: f64,
    /// Percentage of `max_speed` for the current move.
    pub speed_percent: u8,
    pub locked: bool,
    pub connected: bool,
    pub farmbot_id: u64,
    photos_taken: u64,
    photos_stored: u64,
    elapsed: Duration,
}

impl SimActuator {
    pub fn new(max_speed: f64) -> Self {
        tracing::info!("Simulated actuator initialized at {}", Position::ORIGIN);
        Self {
            position: Position::ORIGIN,
            target: Position::ORIGIN,
            max_speed,
            speed_percent: 100,
            locked: false,
            connected: true,
            farmbot_id: 1,
            photos_taken: 0,
            photos_stored: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.position != self.target
    }

    /// Advance the simulation clock by `dt`, moving towards the target.
    pub fn step(&mut self, dt: Duration) {
        self.elapsed += dt;
        let dx = self.target.x - self.position.x;
        let dy = self.target.y - self.position.y;
        let dz = self.target.z - self.position.z;
        let remaining = (dx * dx + dy * dy + dz * dz).sqrt();
        if remaining == 0.0 {
            return;
        }
        let travel = self.max_speed * f64::from(self.speed_percent) / 100.0 * dt.as_secs_f64();
        if travel >= remaining {
            self.position = self.target;
            tracing::debug!("t={:.2}s arrived at {}", self.elapsed.as_secs_f64(), self.position);
        } else {
            let k = travel / remaining;
            self.position = Position::new(
                self.position.x + dx * k,
                self.position.y + dy * k,
                self.position.z + dz * k,
            );
        }
    }

    pub fn position(&self) -> Result<Position, SimError> {
        if !self.connected {
            return Err(SimError::NotConnected);
        }
        Ok(self.position)
    }

    pub fn emergency_lock(&mut self) {
        self.locked = true;
        self.target = self.position;
        tracing::warn!("Emergency lock engaged at {}", self.position);
    }

    pub fn emergency_unlock(&mut self) -> Result<(), SimError> {
        self.ensure_connected()?;
        self.locked = false;
        Ok(())
    }

    pub fn move_absolute(&mut self, body: &MoveBody) -> Result<(), SimError> {
        self.begin_move(body.position(), body.speed)
    }

    pub fn move_relative(&mut self, body: &MoveBody) -> Result<(), SimError> {
        let target = self.position.offset(&body.position());
        self.begin_move(target, body.speed)
    }

    pub fn find_home(&mut self) -> Result<(), SimError> {
        self.begin_move(Position::ORIGIN, 100)
    }

    pub fn water_plant(&mut self) -> Result<(), SimError> {
        self.ensure_unlocked()
    }

    /// Drives to the weeding spot at working depth.
    pub fn weeder(&mut self, body: &WeederBody) -> Result<(), SimError> {
        let target = Position::new(body.x, body.y, body.z - body.working_depth);
        self.begin_move(target, body.speed)
    }

    pub fn take_photo(&mut self) -> Result<Photo, SimError> {
        self.ensure_connected()?;
        self.photos_taken += 1;
        self.photos_stored += 1;
        Ok(Photo {
            id: Some(self.photos_taken),
            url: format!("/photos/{}.jpg", uuid::Uuid::new_v4()),
            farmbot_id: Some(self.farmbot_id),
            coordinates: Some(self.position),
            created_at: Some(Utc::now()),
        })
    }

    pub fn clear_photos(&mut self) -> ClearPhotosResponse {
        let deleted_count = std::mem::take(&mut self.photos_stored);
        ClearPhotosResponse {
            message: format!("Successfully deleted {} photos", deleted_count),
            deleted_count,
        }
    }

    fn begin_move(&mut self, target: Position, speed: u8) -> Result<(), SimError> {
        self.ensure_unlocked()?;
        if !(1..=100).contains(&speed) {
            return Err(SimError::InvalidSpeed(speed));
        }
        self.target = target;
        self.speed_percent = speed;
        tracing::info!("Moving from {} to {} at {}%", self.position, target, speed);
        Ok(())
    }

    fn ensure_connected(&self) -> Result<(), SimError> {
        if self.connected { Ok(()) } else { Err(SimError::NotConnected) }
    }

    fn ensure_unlocked(&self) -> Result<(), SimError> {
        self.ensure_connected()?;
        if self.locked { Err(SimError::Locked) } else { Ok(()) }
    }
}
