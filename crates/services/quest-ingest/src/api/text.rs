//! Text message endpoints

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Query, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;

use super::{map_ingest_error, parse_limit, read_body, ApiResult, AppState};
use crate::model::{MessageStatus, TextMessage};
use crate::validation::{parse_payload, parse_text_confirm, parse_text_send};

#[derive(Debug, Serialize)]
pub struct MessageAck {
    pub status: &'static str,
    pub message_id: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmAck {
    pub status: &'static str,
    pub message_id: String,
    pub new_status: MessageStatus,
}

/// POST /text/send
pub async fn send_text_message(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<MessageAck>> {
    let body = read_body(body)?;
    let input = parse_payload(&body)
        .and_then(|payload| parse_text_send(&payload))
        .map_err(map_ingest_error)?;

    let message = state
        .service
        .send_text(input)
        .await
        .map_err(map_ingest_error)?;

    Ok(Json(MessageAck {
        status: "success",
        message_id: message.message_id,
        timestamp: message.timestamp,
    }))
}

/// POST /text/confirm
///
/// Unknown or evicted message ids are reported as 404.
pub async fn confirm_text_received(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ConfirmAck>> {
    let body = read_body(body)?;
    let input = parse_payload(&body)
        .and_then(|payload| parse_text_confirm(&payload))
        .map_err(map_ingest_error)?;

    let transition = state
        .service
        .confirm_text(input)
        .map_err(map_ingest_error)?;

    Ok(Json(ConfirmAck {
        status: "success",
        message_id: transition.message_id,
        new_status: transition.current,
    }))
}

/// GET /text/messages?limit=N
pub async fn list_text_messages(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Vec<TextMessage>> {
    Json(state.service.text_messages(parse_limit(&params)))
}
