//! Contains the data models for actuator API requests and responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ApiError;
use crate::motion::Position;

/// A position report as returned by `GET position`: `[x, y, z]`.
///
/// Only x and y are required; some firmware revisions omit z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl PositionReading {
    pub fn from_json(value: &Value) -> Result<Self, ApiError> {
        let items = value
            .as_array()
            .ok_or_else(|| ApiError::Malformed(format!("expected an array, got {}", value)))?;
        if items.len() < 2 {
            return Err(ApiError::Malformed(format!(
                "expected at least 2 coordinates, got {}",
                items.len()
            )));
        }
        let coord = |i: usize| {
            items[i]
                .as_f64()
                .ok_or_else(|| ApiError::Malformed(format!("coordinate {} is not a number: {}", i, items[i])))
        };
        let z = match items.get(2) {
            Some(_) => Some(coord(2)?),
            None => None,
        };
        Ok(Self { x: coord(0)?, y: coord(1)?, z })
    }

    /// Resolve into a full position, keeping `fallback.z` when z was not reported.
    pub fn into_position(self, fallback: &Position) -> Position {
        Position::new(self.x, self.y, self.z.unwrap_or(fallback.z))
    }
}

impl From<Position> for PositionReading {
    fn from(p: Position) -> Self {
        Self { x: p.x, y: p.y, z: Some(p.z) }
    }
}

/// Body of `move-absolute` and `move-relative`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveBody {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "full_speed")]
    pub speed: u8,
}

impl MoveBody {
    pub fn new(p: Position, speed: u8) -> Self {
        Self { x: p.x, y: p.y, z: p.z, speed }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Body of `weeder`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeederBody {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub working_depth: f64,
    #[serde(default = "full_speed")]
    pub speed: u8,
}

fn full_speed() -> u8 {
    100
}

/// A captured photo record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub id: Option<u64>,
    pub url: String,
    #[serde(default)]
    pub farmbot_id: Option<u64>,
    #[serde(default)]
    pub coordinates: Option<Position>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearPhotosResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub deleted_count: u64,
}
