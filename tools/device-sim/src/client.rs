//! HTTP client for the quest-ingest server
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> remotemedia_device_sim::Result<()> {
//! use remotemedia_device_sim::DeviceClient;
//!
//! let client = DeviceClient::new("http://localhost:8888")?;
//! client.health().await?;
//! let ack = client.send_text("hello").await?;
//! client.confirm_text(&ack.message_id, "delivered").await?;
//! # Ok(())
//! # }
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::generators::{checkerboard_frame, sine_pcm16, TONE_HZ};

/// Default timeout for ingestion requests
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for the startup health check
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a quest-ingest server
#[derive(Debug, Clone)]
pub struct DeviceClient {
    /// Base URL without trailing slash (e.g. "http://localhost:8888")
    base_url: String,

    client: reqwest::Client,
}

/// Body of `POST /camera/frame`
#[derive(Debug, Clone, Serialize)]
pub struct CameraFramePayload {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Base64-encoded pixel bytes
    pub data: String,
    pub timestamp: String,
}

impl CameraFramePayload {
    /// Checkerboard test pattern in RGB
    pub fn checkerboard(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            format: "RGB".to_string(),
            data: STANDARD.encode(checkerboard_frame(width, height)),
            timestamp: timestamp_now(),
        }
    }
}

/// Body of `POST /audio/frame`
#[derive(Debug, Clone, Serialize)]
pub struct AudioFramePayload {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: String,
    /// Base64-encoded 16-bit PCM
    pub data: String,
    pub duration_ms: f64,
    pub timestamp: String,
}

impl AudioFramePayload {
    /// 440 Hz mono test tone
    pub fn sine(sample_rate: u32, duration_ms: f64) -> Self {
        Self {
            sample_rate,
            channels: 1,
            format: "PCM".to_string(),
            data: STANDARD.encode(sine_pcm16(sample_rate, duration_ms, TONE_HZ)),
            duration_ms,
            timestamp: timestamp_now(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendTextRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ConfirmTextRequest<'a> {
    message_id: &'a str,
    status: &'a str,
}

/// Response from `GET /health`
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
}

/// Response from the frame endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct FrameAck {
    pub status: String,
    pub frame_id: u64,
    pub timestamp: String,
}

/// Response from `POST /text/send`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageAck {
    pub status: String,
    pub message_id: String,
    pub timestamp: String,
}

/// Response from `POST /text/confirm`
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmAck {
    pub status: String,
    pub message_id: String,
    pub new_status: String,
}

impl DeviceClient {
    /// Create a client for `base_url`
    ///
    /// The URL must start with `http://` or `https://`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();

        if base_url.is_empty() {
            return Err(ClientError::Connection(
                "server URL cannot be empty".to_string(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Connection(format!(
                "server URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.url("/health");
        let response = self
            .client
            .get(&url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
            .map_err(|e| connection_error(&url, e))?;
        decode(response).await
    }

    /// POST /camera/frame
    pub async fn send_camera_frame(&self, frame: &CameraFramePayload) -> Result<FrameAck> {
        self.post_json("/camera/frame", frame).await
    }

    /// POST /audio/frame
    pub async fn send_audio_frame(&self, frame: &AudioFramePayload) -> Result<FrameAck> {
        self.post_json("/audio/frame", frame).await
    }

    /// POST /text/send
    pub async fn send_text(&self, content: &str) -> Result<MessageAck> {
        self.post_json("/text/send", &SendTextRequest { content })
            .await
    }

    /// POST /text/confirm
    pub async fn confirm_text(&self, message_id: &str, status: &str) -> Result<ConfirmAck> {
        self.post_json("/text/confirm", &ConfirmTextRequest { message_id, status })
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| connection_error(&url, e))?;
        decode(response).await
    }
}

fn connection_error(url: &str, e: reqwest::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Connection(format!("cannot reach {}: {}", url, e))
    } else {
        ClientError::Http(e)
    }
}

async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::Server {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
}

/// Current UTC time, RFC 3339 with microseconds
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_url() {
        assert!(matches!(
            DeviceClient::new(""),
            Err(ClientError::Connection(_))
        ));
        assert!(matches!(
            DeviceClient::new("localhost:8888"),
            Err(ClientError::Connection(_))
        ));

        let client = DeviceClient::new("http://localhost:8888/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8888");
        assert!(DeviceClient::new("https://quest.example.com").is_ok());
    }

    #[test]
    fn test_camera_payload() {
        let payload = CameraFramePayload::checkerboard(4, 2);
        let decoded = STANDARD.decode(&payload.data).unwrap();
        assert_eq!(decoded.len(), 4 * 2 * 3);
        assert_eq!(payload.format, "RGB");

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["width"], 4);
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_audio_payload() {
        let payload = AudioFramePayload::sine(16000, 100.0);
        assert_eq!(STANDARD.decode(&payload.data).unwrap().len(), 3200);
        assert_eq!(payload.channels, 1);
        assert_eq!(payload.format, "PCM");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        // Grab a free port, then release it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = DeviceClient::new(format!("http://127.0.0.1:{}", port)).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)), "got {:?}", err);
    }
}
