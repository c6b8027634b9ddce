//! Camera and audio frame endpoints

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use super::{map_ingest_error, parse_limit, read_body, ApiResult, AppState};
use crate::model::{AudioFrame, CameraFrame};
use crate::validation::{parse_audio_frame, parse_camera_frame, parse_payload};

/// Acknowledgement for an accepted frame
#[derive(Debug, Serialize)]
pub struct FrameAck {
    pub status: &'static str,
    pub frame_id: u64,
    pub timestamp: String,
}

/// POST /camera/frame
pub async fn receive_camera_frame(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<FrameAck>> {
    let body = read_body(body)?;
    let input = parse_payload(&body)
        .and_then(|payload| parse_camera_frame(&payload))
        .map_err(map_ingest_error)?;

    let frame = state
        .service
        .ingest_camera(input)
        .await
        .map_err(map_ingest_error)?;

    Ok(Json(FrameAck {
        status: "success",
        frame_id: frame.frame_id,
        timestamp: frame.timestamp,
    }))
}

/// POST /audio/frame
pub async fn receive_audio_frame(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<FrameAck>> {
    let body = read_body(body)?;
    let input = parse_payload(&body)
        .and_then(|payload| parse_audio_frame(&payload))
        .map_err(map_ingest_error)?;

    let frame = state
        .service
        .ingest_audio(input)
        .await
        .map_err(map_ingest_error)?;

    Ok(Json(FrameAck {
        status: "success",
        frame_id: frame.frame_id,
        timestamp: frame.timestamp,
    }))
}

/// GET /camera/frames?limit=N
pub async fn list_camera_frames(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<CameraFrame>> {
    Json(state.service.camera_frames(parse_limit(&params)))
}

/// GET /audio/frames?limit=N
pub async fn list_audio_frames(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<AudioFrame>> {
    Json(state.service.audio_frames(parse_limit(&params)))
}
