//! Defines the Axum routes that expose the simulated actuator.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use super::{SimActuator, SimError};
use crate::api::{MoveBody, WeederBody};
use crate::config::SimConfig;

pub struct SimStateInner {
    pub actuator: Mutex<SimActuator>,
    pub token: Option<String>,
}
pub type SimState = Arc<SimStateInner>;

pub fn sim_state(config: &SimConfig) -> SimState {
    Arc::new(SimStateInner {
        actuator: Mutex::new(SimActuator::new(config.speed)),
        token: config.token.clone(),
    })
}

/// Helper to create a JSON error response with a message and status code
fn json_error(message: &str, status: StatusCode) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn sim_error(e: SimError) -> Response {
    let status = match e {
        SimError::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
        SimError::Locked => StatusCode::LOCKED,
        SimError::InvalidSpeed(_) => StatusCode::BAD_REQUEST,
    };
    json_error(&e.to_string(), status)
}

fn ack(result: Result<(), SimError>, status: &str) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": status }))).into_response(),
        Err(e) => sim_error(e),
    }
}

/// Creates the router with every actuator endpoint under `/api`.
pub fn create_router(state: SimState) -> Router {
    Router::new()
        .route("/api/position/", get(position_handler))
        .route("/api/emergency-lock/", post(lock_handler))
        .route("/api/emergency-unlock/", post(unlock_handler))
        .route("/api/move-absolute/", post(move_absolute_handler))
        .route("/api/move-relative/", post(move_relative_handler))
        .route("/api/find-home/", post(find_home_handler))
        .route("/api/water-plant/", post(water_handler))
        .route("/api/weeder/", post(weeder_handler))
        .route("/api/take-photo/", get(take_photo_handler))
        .route("/api/clear-photos/", post(clear_photos_handler))
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state)
}

/// Rejects requests without the configured bearer token. No token configured means open access.
async fn require_token(State(state): State<SimState>, req: Request, next: Next) -> Response {
    if let Some(expected) = &state.token {
        let presented = req.headers().typed_get::<Authorization<Bearer>>();
        match presented {
            Some(auth) if auth.token() == expected => {}
            _ => return json_error("Invalid token", StatusCode::UNAUTHORIZED),
        }
    }
    next.run(req).await
}

/// Steps the simulation every `tick` until `shutdown` fires.
pub fn spawn_motion_loop(state: SimState, tick: Duration, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Simulation loop shutting down");
                    break;
                }
                _ = interval.tick() => {
                    state.actuator.lock().await.step(tick);
                }
            }
        }
    })
}

/// GET /api/position/ -> [x, y, z]
async fn position_handler(State(state): State<SimState>) -> Response {
    match state.actuator.lock().await.position() {
        Ok(p) => (StatusCode::OK, Json(p.as_array())).into_response(),
        Err(e) => sim_error(e),
    }
}

async fn lock_handler(State(state): State<SimState>) -> Response {
    state.actuator.lock().await.emergency_lock();
    ack(Ok(()), "locked")
}

async fn unlock_handler(State(state): State<SimState>) -> Response {
    ack(state.actuator.lock().await.emergency_unlock(), "unlocked")
}

async fn move_absolute_handler(State(state): State<SimState>, Json(body): Json<MoveBody>) -> Response {
    ack(state.actuator.lock().await.move_absolute(&body), "moving")
}

async fn move_relative_handler(State(state): State<SimState>, Json(body): Json<MoveBody>) -> Response {
    ack(state.actuator.lock().await.move_relative(&body), "moving")
}

async fn find_home_handler(State(state): State<SimState>) -> Response {
    ack(state.actuator.lock().await.find_home(), "finding home")
}

async fn water_handler(State(state): State<SimState>) -> Response {
    ack(state.actuator.lock().await.water_plant(), "watering completed")
}

async fn weeder_handler(State(state): State<SimState>, Json(body): Json<WeederBody>) -> Response {
    ack(state.actuator.lock().await.weeder(&body), "weeding")
}

async fn take_photo_handler(State(state): State<SimState>) -> Response {
    match state.actuator.lock().await.take_photo() {
        Ok(photo) => (StatusCode::OK, Json(photo)).into_response(),
        Err(e) => sim_error(e),
    }
}

async fn clear_photos_handler(State(state): State<SimState>) -> Response {
    let response = state.actuator.lock().await.clear_photos();
    (StatusCode::OK, Json(response)).into_response()
}
