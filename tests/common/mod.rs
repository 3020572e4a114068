// Shared test doubles for the integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use farm_pilot::api::{ActuatorApi, ApiError, ClearPhotosResponse, MoveBody, Photo, PositionReading, WeederBody};
use farm_pilot::config::{MotionConfig, PollProfile};
use farm_pilot::motion::Position;

/// Scripted actuator. Position reads pop from `readings`; once the script runs out
/// the last reading is repeated.
#[derive(Default)]
pub struct MockActuator {
    readings: Mutex<VecDeque<Result<PositionReading, ApiError>>>,
    last: Mutex<Option<PositionReading>>,
    /// Status code returned by every command when set.
    pub fail_commands: Mutex<Option<u16>>,
    /// When set, `move-absolute` answers 500 after this delay.
    pub fail_absolute_after: Mutex<Option<Duration>>,
    pub photo: Mutex<Option<Photo>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_readings(readings: Vec<Result<PositionReading, ApiError>>) -> Self {
        let mock = Self::new();
        *mock.readings.lock().unwrap() = readings.into();
        mock
    }

    pub fn failing(status: u16) -> Self {
        let mock = Self::new();
        *mock.fail_commands.lock().unwrap() = Some(status);
        mock
    }

    pub fn push(&self, reading: Result<PositionReading, ApiError>) {
        self.readings.lock().unwrap().push_back(reading);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn position_reads(&self) -> usize {
        self.calls().iter().filter(|c| c.as_str() == "position").count()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call.into());
        match *self.fail_commands.lock().unwrap() {
            Some(503) => Err(ApiError::NotConnected),
            Some(status) => Err(ApiError::Status { status, message: "actuator busy".to_string() }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ActuatorApi for MockActuator {
    async fn position(&self) -> Result<PositionReading, ApiError> {
        self.calls.lock().unwrap().push("position".to_string());
        let next = self.readings.lock().unwrap().pop_front();
        match next {
            Some(Ok(reading)) => {
                *self.last.lock().unwrap() = Some(reading);
                Ok(reading)
            }
            Some(Err(e)) => Err(e),
            None => self
                .last
                .lock()
                .unwrap()
                .ok_or_else(|| ApiError::Malformed("no reading scripted".to_string())),
        }
    }

    async fn emergency_unlock(&self) -> Result<(), ApiError> {
        self.record("unlock")
    }

    async fn move_absolute(&self, body: &MoveBody) -> Result<(), ApiError> {
        let delay = *self.fail_absolute_after.lock().unwrap();
        if let Some(delay) = delay {
            self.calls.lock().unwrap().push("move_absolute".to_string());
            tokio::time::sleep(delay).await;
            return Err(ApiError::Status { status: 500, message: "late failure".to_string() });
        }
        self.record(format!("move_absolute {} {} {} @{}", body.x, body.y, body.z, body.speed))
    }

    async fn move_relative(&self, body: &MoveBody) -> Result<(), ApiError> {
        self.record(format!("move_relative {} {} {} @{}", body.x, body.y, body.z, body.speed))
    }

    async fn find_home(&self) -> Result<(), ApiError> {
        self.record("find_home")
    }

    async fn water_plant(&self) -> Result<(), ApiError> {
        self.record("water")
    }

    async fn weeder(&self, body: &WeederBody) -> Result<(), ApiError> {
        self.record(format!("weeder {} {} {} depth {}", body.x, body.y, body.z, body.working_depth))
    }

    async fn take_photo(&self) -> Result<Photo, ApiError> {
        self.record("take_photo")?;
        Ok(self.photo.lock().unwrap().clone().unwrap_or(Photo {
            id: None,
            url: "/photos/test.jpg".to_string(),
            farmbot_id: None,
            coordinates: None,
            created_at: None,
        }))
    }

    async fn clear_photos(&self) -> Result<ClearPhotosResponse, ApiError> {
        self.record("clear_photos")?;
        Ok(ClearPhotosResponse { message: "Successfully deleted 3 photos".to_string(), deleted_count: 3 })
    }
}

pub fn at(x: f64, y: f64, z: f64) -> Result<PositionReading, ApiError> {
    Ok(Position::new(x, y, z).into())
}

pub fn unavailable() -> Result<PositionReading, ApiError> {
    Err(ApiError::NotConnected)
}

/// Production thresholds with the stock schedules.
pub fn motion_config() -> MotionConfig {
    MotionConfig::default()
}

/// Short schedules for tests that run on the real clock.
pub fn fast_motion_config() -> MotionConfig {
    MotionConfig {
        absolute: PollProfile::new(20, 20, 50),
        relative: PollProfile::new(20, 20, 50),
        nudge: PollProfile::new(10, 20, 50),
        home: PollProfile::new(20, 20, 100),
        ..MotionConfig::default()
    }
}
