//! Record types for the three ingestion streams
//!
//! Records are immutable once appended to their history, except for the
//! `status` field of a [`TextMessage`], which the status tracker updates in
//! place.

use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IngestError;

/// The three independent ingestion streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Camera,
    Audio,
    Text,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Camera => "camera",
            StreamKind::Audio => "audio",
            StreamKind::Text => "text",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pixel layout tag of a camera frame
///
/// Unknown tags are kept verbatim so they round-trip to clients unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PixelFormat {
    Rgb,
    Bgr,
    Other(String),
}

impl PixelFormat {
    pub fn as_str(&self) -> &str {
        match self {
            PixelFormat::Rgb => "RGB",
            PixelFormat::Bgr => "BGR",
            PixelFormat::Other(tag) => tag,
        }
    }
}

impl From<String> for PixelFormat {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "RGB" => PixelFormat::Rgb,
            "BGR" => PixelFormat::Bgr,
            _ => PixelFormat::Other(tag),
        }
    }
}

impl From<PixelFormat> for String {
    fn from(format: PixelFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Sample encoding tag of an audio frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AudioFormat {
    Pcm,
    Wav,
    Other(String),
}

impl AudioFormat {
    pub fn as_str(&self) -> &str {
        match self {
            AudioFormat::Pcm => "PCM",
            AudioFormat::Wav => "WAV",
            AudioFormat::Other(tag) => tag,
        }
    }
}

impl From<String> for AudioFormat {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "PCM" => AudioFormat::Pcm,
            "WAV" => AudioFormat::Wav,
            _ => AudioFormat::Other(tag),
        }
    }
}

impl From<AudioFormat> for String {
    fn from(format: AudioFormat) -> Self {
        format.as_str().to_string()
    }
}

/// Delivery status of a text message
///
/// `Sent` is assigned at creation. Confirmations may set any status; the
/// ordering below is only used to classify transitions for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "delivered" => Ok(MessageStatus::Delivered),
            "read" => Ok(MessageStatus::Read),
            other => Err(IngestError::validation(format!(
                "Invalid status '{}': expected one of sent, delivered, read",
                other
            ))),
        }
    }
}

/// One camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraFrame {
    /// ISO 8601 capture timestamp
    pub timestamp: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Raw pixel bytes (base64 on the wire)
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    pub frame_id: u64,
}

impl CameraFrame {
    /// Byte length of a tightly packed 3-channel frame of this size
    pub fn expected_len(&self) -> u64 {
        expected_frame_len(self.width, self.height)
    }

    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Byte length of a tightly packed 3-channel frame
pub fn expected_frame_len(width: u32, height: u32) -> u64 {
    width as u64 * height as u64 * 3
}

/// One audio frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFrame {
    pub timestamp: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub format: AudioFormat,
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
    /// Caller-supplied duration; not derived from `data`
    pub duration_ms: f64,
    pub frame_id: u64,
}

impl AudioFrame {
    pub fn byte_len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// One text message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMessage {
    pub timestamp: String,
    pub message_id: String,
    pub content: String,
    pub status: MessageStatus,
}

impl TextMessage {
    pub fn byte_len(&self) -> u64 {
        self.content.len() as u64
    }
}

/// Message id for the given sequence number (`msg_000042`)
pub fn message_id_for(seq: u64) -> String {
    format!("msg_{:06}", seq)
}

/// Current wall-clock time as an ISO 8601 string
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Serde adapter carrying raw bytes as a standard base64 string
mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_id_format() {
        assert_eq!(message_id_for(0), "msg_000000");
        assert_eq!(message_id_for(42), "msg_000042");
        assert_eq!(message_id_for(1_234_567), "msg_1234567");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("delivered".parse::<MessageStatus>().unwrap(), MessageStatus::Delivered);
        assert_eq!("read".parse::<MessageStatus>().unwrap(), MessageStatus::Read);
        assert!(matches!(
            "seen".parse::<MessageStatus>(),
            Err(IngestError::Validation(_))
        ));
        assert!(MessageStatus::Sent < MessageStatus::Delivered);
        assert!(MessageStatus::Delivered < MessageStatus::Read);
    }

    #[test]
    fn test_format_tags_preserve_unknown() {
        assert_eq!(PixelFormat::from("rgb".to_string()), PixelFormat::Rgb);
        assert_eq!(
            PixelFormat::from("YUV420".to_string()),
            PixelFormat::Other("YUV420".to_string())
        );
        assert_eq!(String::from(PixelFormat::Other("NV12".into())), "NV12");
        assert_eq!(AudioFormat::from("pcm".to_string()).as_str(), "PCM");
    }

    #[test]
    fn test_camera_frame_json_uses_base64() {
        let frame = CameraFrame {
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            width: 1,
            height: 1,
            format: PixelFormat::Rgb,
            data: Bytes::from_static(&[255, 0, 0]),
            frame_id: 7,
        };

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["data"], "/wAA");
        assert_eq!(json["format"], "RGB");
        assert_eq!(json["frame_id"], 7);
        assert_eq!(frame.expected_len(), 3);

        let back: CameraFrame = serde_json::from_value(json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_text_message_status_serializes_lowercase() {
        let msg = TextMessage {
            timestamp: now_timestamp(),
            message_id: message_id_for(3),
            content: "hello".to_string(),
            status: MessageStatus::Sent,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "sent");
        assert_eq!(msg.byte_len(), 5);
    }
}
