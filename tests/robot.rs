// Integration tests for the operator-level robot actions

mod common;

use std::sync::Arc;

use common::{at, MockActuator};
use farm_pilot::api::{ApiError, Photo, PositionReading};
use farm_pilot::config::Config;
use farm_pilot::motion::Position;
use farm_pilot::panel::{event_channel, spawn_panel, PanelStatus};
use farm_pilot::{Robot, RobotError};
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_refresh_updates_last_known_position() {
    let mock = Arc::new(MockActuator::with_readings(vec![at(12.0, 34.0, -5.0)]));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    let position = robot.refresh_position().await.unwrap();
    assert_eq!(position, Position::new(12.0, 34.0, -5.0));
    assert_eq!(robot.position().await, position);

    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.position, position);
    assert!(state.alert.is_none());
}

#[tokio::test]
async fn test_refresh_not_connected_is_soft() {
    let mock = Arc::new(MockActuator::with_readings(vec![
        at(1.0, 2.0, 3.0),
        Err(ApiError::NotConnected),
    ]));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    robot.refresh_position().await.unwrap();
    let err = robot.refresh_position().await.unwrap_err();
    assert!(matches!(err, RobotError::Api(ApiError::NotConnected)));
    assert_eq!(robot.position().await, Position::new(1.0, 2.0, 3.0));

    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.status, Some(PanelStatus::NotConnected));
    assert_eq!(state.status_text(), "Bot not connected");
    assert!(state.alert.is_none());
}

#[tokio::test]
async fn test_refresh_other_errors_raise_alert() {
    let mock = Arc::new(MockActuator::with_readings(vec![Err(ApiError::Status {
        status: 500,
        message: "boom".to_string(),
    })]));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    assert!(robot.refresh_position().await.is_err());
    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.alert.as_deref(), Some("Error fetching position: Request failed with status 500: boom"));
}

#[tokio::test]
async fn test_refresh_ignores_short_reading() {
    let mock = Arc::new(MockActuator::with_readings(vec![
        at(3.0, 4.0, -1.0),
        Ok(PositionReading { x: 1.0, y: 2.0, z: None }),
    ]));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    robot.refresh_position().await.unwrap();
    let err = robot.refresh_position().await.unwrap_err();
    assert!(matches!(err, RobotError::Api(ApiError::Malformed(_))));
    assert_eq!(robot.position().await, Position::new(3.0, 4.0, -1.0));

    drop(robot);
    let state = panel.await.unwrap();
    assert!(state.alert.is_none());
    assert!(state.status.is_none());
}

#[tokio::test]
async fn test_refresh_unauthorized_raises_alert() {
    let mock = Arc::new(MockActuator::with_readings(vec![Err(ApiError::Unauthorized("Invalid token".to_string()))]));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    assert_err!(robot.refresh_position().await);
    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.alert.as_deref(), Some("Error fetching position: Unauthorized: Invalid token"));
}

#[tokio::test]
async fn test_photo_fills_missing_fields() {
    let mock = Arc::new(MockActuator::with_readings(vec![at(7.0, 8.0, 0.0)]));
    let (tx, _rx) = event_channel();
    let robot = Robot::new(mock, &Config::default(), tx);
    robot.refresh_position().await.unwrap();

    let photo = robot.take_photo().await.unwrap();
    assert_eq!(photo.coordinates, Some(Position::new(7.0, 8.0, 0.0)));
    assert!(photo.created_at.is_some());
}

#[tokio::test]
async fn test_photo_keeps_reported_fields() {
    let mock = Arc::new(MockActuator::new());
    let reported = Photo {
        id: Some(4),
        url: "/photos/4.jpg".to_string(),
        farmbot_id: Some(1),
        coordinates: Some(Position::new(1.0, 1.0, 1.0)),
        created_at: None,
    };
    *mock.photo.lock().unwrap() = Some(reported.clone());
    let (tx, _rx) = event_channel();
    let robot = Robot::new(mock, &Config::default(), tx);

    let photo = robot.take_photo().await.unwrap();
    assert_eq!(photo.id, Some(4));
    assert_eq!(photo.coordinates, reported.coordinates);
}

#[tokio::test]
async fn test_actions_report_status() {
    let mock = Arc::new(MockActuator::new());
    let (tx, rx) = event_channel();
    let (watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock.clone(), &Config::default(), tx);

    assert_ok!(robot.unlock().await);
    assert_ok!(robot.water_plant().await);
    assert_ok!(robot.weed(Position::new(10.0, 10.0, 0.0), 5.0, 80).await);
    let cleared = robot.clear_photos().await.unwrap();
    assert_eq!(cleared.deleted_count, 3);

    assert_eq!(mock.calls(), ["unlock", "water", "weeder 10 10 0 depth 5", "clear_photos"]);
    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.status, Some(PanelStatus::PhotosCleared));
    assert_eq!(*watch.borrow(), state);
}

#[tokio::test]
async fn test_weed_invalid_speed() {
    let mock = Arc::new(MockActuator::new());
    let (tx, mut rx) = event_channel();
    let robot = Robot::new(mock.clone(), &Config::default(), tx);

    let err = robot.weed(Position::ORIGIN, 1.0, 0).await.unwrap_err();
    assert!(matches!(err, RobotError::InvalidSpeed(0)));
    assert!(mock.calls().is_empty());
    let event = rx.recv().await.unwrap();
    assert!(matches!(
        event,
        farm_pilot::PanelEvent::Status { status: PanelStatus::WeedingFailed, .. }
    ));
}

#[tokio::test]
async fn test_failed_actions_report_failure_status() {
    let mock = Arc::new(MockActuator::failing(500));
    let (tx, rx) = event_channel();
    let (_watch, panel) = spawn_panel(rx);
    let robot = Robot::new(mock, &Config::default(), tx);

    assert_err!(robot.water_plant().await);
    assert_err!(robot.take_photo().await);
    assert_err!(robot.clear_photos().await);

    drop(robot);
    let state = panel.await.unwrap();
    assert_eq!(state.status_text(), "Error clearing photos");
}
