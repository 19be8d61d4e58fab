//! API request handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::FetchError;
use crate::guest::fetcher::GUEST_TOKEN_FIELD;
use crate::observability::metrics;
use crate::platform::PlatformClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<PlatformClient>,
    /// Route guest fetches through the accelerator when one is configured.
    pub use_accelerator: bool,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    code: &'static str,
    message: String,
}

/// JSON error response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    /// Upstream denied every attempt.
    pub fn unavailable() -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code: "UPSTREAM_UNAVAILABLE",
            message: "upstream unavailable, try again later".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::InvalidRequest(message) => Self::bad_request(message),
            other => {
                tracing::error!(error = %other, "Lookup failed");
                Self::unavailable()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiErrorBody {
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// `{}` means exhausted; anything else is served without the guest token.
fn into_payload(mut body: Value) -> Result<Value, ApiError> {
    match body.as_object_mut() {
        Some(map) if map.is_empty() => Err(ApiError::unavailable()),
        Some(map) => {
            map.remove(GUEST_TOKEN_FIELD);
            Ok(body)
        }
        None => Ok(body),
    }
}

fn finish(route: &'static str, start: Instant, result: Result<Value, ApiError>) -> Response {
    let response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => e.into_response(),
    };
    metrics::record_api_request(route, response.status().as_u16(), start);
    response
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn user(State(state): State<AppState>, Path(screen_name): Path<String>) -> Response {
    let start = Instant::now();
    tracing::debug!(screen_name = %screen_name, "User lookup");
    let result = match state.platform.fetch_user(&screen_name, state.use_accelerator).await {
        Ok(body) => into_payload(body),
        Err(e) => Err(ApiError::from(e)),
    };
    finish("user", start, result)
}

pub async fn status(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let start = Instant::now();
    tracing::debug!(status_id = %id, "Status lookup");
    let result = match state.platform.fetch_status(&id).await {
        Ok(body) => into_payload(body),
        Err(e) => Err(ApiError::from(e)),
    };
    finish("status", start, result)
}
