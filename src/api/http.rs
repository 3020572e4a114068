// src/api/http.rs - HTTP client for the actuator control API
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::models::{ClearPhotosResponse, MoveBody, Photo, PositionReading, WeederBody};
use super::{ActuatorApi, ApiError};
use crate::config::ApiConfig;

/// `ActuatorApi` over HTTP. Every request carries the configured bearer token.
#[derive(Clone)]
pub struct HttpActuator {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpActuator {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}/", self.base_url, endpoint)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get(&self, endpoint: &str) -> Result<Response, ApiError> {
        let response = self.authorize(self.client.get(self.url(endpoint))).send().await?;
        check_status(response).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> Result<Response, ApiError> {
        let mut request = self.authorize(self.client.post(self.url(endpoint)));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        check_status(response).await
    }

    /// Fire-and-forget command: the acknowledgement body is ignored.
    async fn command<B: Serialize + ?Sized>(&self, endpoint: &str, body: Option<&B>) -> Result<(), ApiError> {
        tracing::debug!("POST {}", endpoint);
        self.post(endpoint, body).await.map(|_| ())
    }
}

/// Maps non-success answers onto the error taxonomy.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::SERVICE_UNAVAILABLE {
        return Err(ApiError::NotConnected);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(text);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ApiError::Unauthorized(message));
    }
    Err(ApiError::Status { status: status.as_u16(), message })
}

#[async_trait]
impl ActuatorApi for HttpActuator {
    async fn position(&self) -> Result<PositionReading, ApiError> {
        let value: Value = self
            .get("position")
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))?;
        PositionReading::from_json(&value)
    }

    async fn emergency_unlock(&self) -> Result<(), ApiError> {
        self.command::<Value>("emergency-unlock", None).await
    }

    async fn move_absolute(&self, body: &MoveBody) -> Result<(), ApiError> {
        self.command("move-absolute", Some(body)).await
    }

    async fn move_relative(&self, body: &MoveBody) -> Result<(), ApiError> {
        self.command("move-relative", Some(body)).await
    }

    async fn find_home(&self) -> Result<(), ApiError> {
        self.command::<Value>("find-home", None).await
    }

    async fn water_plant(&self) -> Result<(), ApiError> {
        self.command::<Value>("water-plant", None).await
    }

    async fn weeder(&self, body: &WeederBody) -> Result<(), ApiError> {
        self.command("weeder", Some(body)).await
    }

    async fn take_photo(&self) -> Result<Photo, ApiError> {
        self.get("take-photo")
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }

    async fn clear_photos(&self) -> Result<ClearPhotosResponse, ApiError> {
        self.post::<Value>("clear-photos", None)
            .await?
            .json()
            .await
            .map_err(|e| ApiError::Malformed(e.to_string()))
    }
}
