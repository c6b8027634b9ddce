//! Request payload validation
//!
//! Payloads arrive as loosely typed JSON objects. Each parser checks the
//! stream's required fields, decodes `data` (base64 string or raw byte
//! array) and produces an input struct ready for the history store. Ids are
//! not assigned here; the store assigns them at append time.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{IngestError, Result};
use crate::model::{expected_frame_len, AudioFormat, MessageStatus, PixelFormat};

/// Loosely typed request payload
pub type Payload = Map<String, Value>;

const CAMERA_REQUIRED: [&str; 4] = ["width", "height", "data", "format"];
const AUDIO_REQUIRED: [&str; 4] = ["sample_rate", "channels", "data", "format"];

/// Validated camera frame, without its id
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrameInput {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Bytes,
    pub timestamp: Option<String>,
}

/// Validated audio frame, without its id
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrameInput {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    pub data: Bytes,
    pub duration_ms: f64,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextSendInput {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextConfirmInput {
    pub message_id: String,
    pub status: MessageStatus,
}

/// Parse a raw request body into a JSON object
pub fn parse_payload(body: &[u8]) -> Result<Payload> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(IngestError::validation("No JSON data received"));
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(IngestError::validation("Request body must be a JSON object")),
        Err(e) => Err(IngestError::validation(format!("Invalid JSON: {}", e))),
    }
}

/// Parse a camera frame payload
///
/// A byte length that does not match `width * height * 3` is logged and
/// tolerated; the frame is still accepted.
pub fn parse_camera_frame(payload: &Payload) -> Result<CameraFrameInput> {
    require_fields("Camera frame", payload, &CAMERA_REQUIRED)?;

    let width = positive_u32(payload, "width")?;
    let height = positive_u32(payload, "height")?;
    let format = PixelFormat::from(string_field(payload, "format")?);
    let data = decode_data(payload)?;
    let timestamp = optional_timestamp(payload)?;

    let expected = expected_frame_len(width, height);
    if data.len() as u64 != expected {
        tracing::warn!(
            width,
            height,
            expected,
            actual = data.len(),
            "Camera frame data size mismatch"
        );
    }

    Ok(CameraFrameInput {
        width,
        height,
        format,
        data,
        timestamp,
    })
}

/// Parse an audio frame payload
pub fn parse_audio_frame(payload: &Payload) -> Result<AudioFrameInput> {
    require_fields("Audio frame", payload, &AUDIO_REQUIRED)?;

    let sample_rate = positive_u32(payload, "sample_rate")?;
    let channels = positive_u32(payload, "channels")?;
    let channels = u16::try_from(channels)
        .map_err(|_| IngestError::validation(format!("channels out of range: {}", channels)))?;
    let format = AudioFormat::from(string_field(payload, "format")?);
    let data = decode_data(payload)?;
    let timestamp = optional_timestamp(payload)?;

    let duration_ms = match payload.get("duration_ms") {
        None | Some(Value::Null) => 0.0,
        Some(value) => value
            .as_f64()
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| {
                IngestError::validation("duration_ms must be a non-negative number")
            })?,
    };

    Ok(AudioFrameInput {
        sample_rate,
        channels,
        format,
        data,
        duration_ms,
        timestamp,
    })
}

/// Parse a text send payload
pub fn parse_text_send(payload: &Payload) -> Result<TextSendInput> {
    match payload.get("content") {
        Some(Value::String(content)) if !content.is_empty() => Ok(TextSendInput {
            content: content.clone(),
        }),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(IngestError::validation("No content provided"))
        }
        Some(_) => Err(IngestError::validation("content must be a string")),
    }
}

/// Parse a text confirmation payload; `status` defaults to `delivered`
pub fn parse_text_confirm(payload: &Payload) -> Result<TextConfirmInput> {
    let message_id = match payload.get("message_id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            return Err(IngestError::validation("No message_id provided"))
        }
        Some(_) => return Err(IngestError::validation("message_id must be a string")),
    };

    let status = match payload.get("status") {
        None | Some(Value::Null) => MessageStatus::Delivered,
        Some(Value::String(s)) => s.parse()?,
        Some(_) => return Err(IngestError::validation("status must be a string")),
    };

    Ok(TextConfirmInput { message_id, status })
}

fn require_fields(what: &str, payload: &Payload, fields: &[&str]) -> Result<()> {
    for field in fields {
        if !payload.contains_key(*field) {
            tracing::error!(field = %field, "{} missing required field", what);
            return Err(IngestError::validation(format!(
                "{} missing required field: {}",
                what, field
            )));
        }
    }
    Ok(())
}

fn positive_u32(payload: &Payload, field: &str) -> Result<u32> {
    payload
        .get(field)
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| IngestError::validation(format!("{} must be a positive integer", field)))
}

fn string_field(payload: &Payload, field: &str) -> Result<String> {
    payload
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| IngestError::validation(format!("{} must be a string", field)))
}

fn optional_timestamp(payload: &Payload) -> Result<Option<String>> {
    match payload.get("timestamp") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(ts)) => Ok(Some(ts.clone())),
        Some(_) => Err(IngestError::validation("timestamp must be a string")),
    }
}

/// Decode `data`: a base64 string, or an array of raw byte values
fn decode_data(payload: &Payload) -> Result<Bytes> {
    match payload.get("data") {
        Some(Value::String(encoded)) => STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(|e| IngestError::validation(format!("data is not valid base64: {}", e))),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
            .collect::<Option<Vec<u8>>>()
            .map(Bytes::from)
            .ok_or_else(|| IngestError::validation("data array must contain byte values 0-255")),
        _ => Err(IngestError::validation(
            "data must be a base64 string or a byte array",
        )),
    }
}
