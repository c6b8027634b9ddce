//! HTTP API for the ingestion server
//!
//! - `GET /health` - Liveness and statistics
//! - `GET /status` - Holdings, statistics and persistence state
//! - `POST /camera/frame` / `GET /camera/frames?limit=N`
//! - `POST /audio/frame` / `GET /audio/frames?limit=N`
//! - `POST /text/send` / `POST /text/confirm` / `GET /text/messages?limit=N`

pub mod frames;
pub mod text;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::IngestError;
use crate::service::{HealthReport, IngestService, ServiceStatus};

/// Default number of records returned by the list endpoints
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Ingestion service
    pub service: Arc<IngestService>,
    /// Service configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(service: Arc<IngestService>, config: Arc<Config>) -> Self {
        Self { service, config }
    }
}

/// Build the HTTP API router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - the device may post from any origin
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods(AnyOrigin)
        .allow_headers(AnyOrigin);

    // Full-resolution camera frames arrive as base64 JSON, well above axum's 2 MiB default
    let body_limit = DefaultBodyLimit::max(state.config.limits.max_body_bytes);

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status_handler))
        // Camera
        .route("/camera/frame", post(frames::receive_camera_frame))
        .route("/camera/frames", get(frames::list_camera_frames))
        // Audio
        .route("/audio/frame", post(frames::receive_audio_frame))
        .route("/audio/frames", get(frames::list_audio_frames))
        // Text
        .route("/text/send", post(text::send_text_message))
        .route("/text/confirm", post(text::confirm_text_received))
        .route("/text/messages", get(text::list_text_messages))
        // Middleware
        .layer(body_limit)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Route table, logged at startup
pub fn route_table() -> &'static [(&'static str, &'static str, &'static str)] {
    &[
        ("GET", "/health", "Health check"),
        ("POST", "/camera/frame", "Receive camera frame"),
        ("POST", "/audio/frame", "Receive audio frame"),
        ("POST", "/text/send", "Send text message"),
        ("POST", "/text/confirm", "Confirm text reception"),
        ("GET", "/status", "Get server status"),
        ("GET", "/camera/frames", "Get camera frames list"),
        ("GET", "/audio/frames", "Get audio frames list"),
        ("GET", "/text/messages", "Get text messages list"),
    ]
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}

/// Status endpoint
async fn status_handler(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.service.status())
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Handler result carrying a structured error response
pub type ApiResult<T> = std::result::Result<T, (StatusCode, Json<ErrorResponse>)>;

/// Map ingestion errors to HTTP status codes and structured responses
pub fn map_ingest_error(e: IngestError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        IngestError::Validation(msg) => {
            tracing::warn!(error = %msg, "Rejected invalid request");
            StatusCode::BAD_REQUEST
        }
        IngestError::NotFound(_) => StatusCode::NOT_FOUND,
        IngestError::Persistence(_) | IngestError::Internal(_) => {
            tracing::error!(error = %e, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: e.kind().to_string(),
            message: e.to_string(),
        }),
    )
}

/// Unwrap a buffered request body, turning extractor rejections
/// (oversized or unreadable bodies) into structured error responses
pub(crate) fn read_body(
    body: std::result::Result<Bytes, BytesRejection>,
) -> ApiResult<Bytes> {
    body.map_err(|rejection| {
        let status = rejection.status();
        let error = if status == StatusCode::PAYLOAD_TOO_LARGE {
            "payload_too_large"
        } else {
            "validation"
        };
        let message = rejection.body_text();
        tracing::warn!(status = %status, error = %message, "Rejected request body");
        (
            status,
            Json(ErrorResponse {
                error: error.to_string(),
                message,
            }),
        )
    })
}

/// Convert a handler panic into a 500 response; the server keeps serving
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    map_ingest_error(IngestError::Internal(detail)).into_response()
}

/// Read `?limit=` leniently: missing or unparsable values use the default
pub(crate) fn parse_limit(params: &HashMap<String, String>) -> usize {
    params
        .get("limit")
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIST_LIMIT)
}
