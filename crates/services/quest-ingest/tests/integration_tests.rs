//! Integration tests for the Quest Ingest Server
//!
//! Each test starts the full router on a random local port and talks to it
//! over HTTP.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::oneshot;

use remotemedia_quest_ingest::api::{build_router, AppState};
use remotemedia_quest_ingest::config::Config;
use remotemedia_quest_ingest::persistence::{FileSink, PersistenceSink};
use remotemedia_quest_ingest::IngestService;

/// Server running on a random available port
struct TestServer {
    base_url: String,
    client: reqwest::Client,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    async fn start(service: IngestService) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state = AppState::new(Arc::new(service), Arc::new(Config::default()));
        let router = build_router(state);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            client: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    async fn in_memory() -> Self {
        Self::start(IngestService::default()).await
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn post_raw(&self, path: &str, body: &'static str) -> (StatusCode, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = response.status();
        (status, response.json().await.unwrap())
    }

    async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.unwrap();
        }
    }
}

fn camera_payload(width: u32, height: u32, bytes: usize) -> Value {
    json!({
        "width": width,
        "height": height,
        "format": "RGB",
        "data": STANDARD.encode(vec![128u8; bytes]),
    })
}

fn audio_payload(samples: usize) -> Value {
    json!({
        "sample_rate": 16000,
        "channels": 1,
        "format": "PCM",
        "data": STANDARD.encode(vec![0u8; samples * 2]),
        "duration_ms": samples as f64 * 1000.0 / 16000.0,
    })
}

#[tokio::test]
async fn test_text_send_confirm_list() {
    let server = TestServer::in_memory().await;

    let (status, body) = server.post("/text/send", json!({"content": "hello"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    let message_id = body["message_id"].as_str().unwrap().to_string();
    assert!(body["timestamp"].is_string());

    let (status, body) = server
        .post(
            "/text/confirm",
            json!({"message_id": message_id, "status": "delivered"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message_id"], message_id.as_str());
    assert_eq!(body["new_status"], "delivered");

    let (status, body) = server.get("/text/messages?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let messages = body.as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["message_id"], message_id.as_str());
    assert_eq!(messages[0]["content"], "hello");
    assert_eq!(messages[0]["status"], "delivered");

    server.shutdown().await;
}

#[tokio::test]
async fn test_confirm_defaults_to_delivered_and_allows_read() {
    let server = TestServer::in_memory().await;

    let (_, body) = server.post("/text/send", json!({"content": "ping"})).await;
    let id = body["message_id"].as_str().unwrap().to_string();

    let (_, body) = server.post("/text/confirm", json!({"message_id": id})).await;
    assert_eq!(body["new_status"], "delivered");

    let (_, body) = server
        .post("/text/confirm", json!({"message_id": id, "status": "read"}))
        .await;
    assert_eq!(body["new_status"], "read");

    server.shutdown().await;
}

#[tokio::test]
async fn test_camera_history_keeps_latest_hundred() {
    let server = TestServer::in_memory().await;

    for expected_id in 0..101u64 {
        let (status, body) = server.post("/camera/frame", camera_payload(2, 2, 12)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["frame_id"], expected_id);
    }

    let (_, body) = server.get("/camera/frames?limit=1000").await;
    let frames = body.as_array().unwrap();
    assert_eq!(frames.len(), 100);
    assert_eq!(frames[0]["frame_id"], 1);
    assert_eq!(frames[99]["frame_id"], 100);
    // Listed frames carry their payload as base64
    assert_eq!(frames[0]["data"], STANDARD.encode(vec![128u8; 12]));

    let (_, body) = server.get("/status").await;
    assert_eq!(body["camera_frames"], 100);
    assert_eq!(body["stats"]["camera_frames"], 101);
    assert_eq!(body["stats"]["camera_bytes"], 101 * 12);
    assert_eq!(body["evicted"]["camera"], 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_list_limit_defaults() {
    let server = TestServer::in_memory().await;

    for _ in 0..15 {
        server.post("/audio/frame", audio_payload(160)).await;
    }

    let (_, body) = server.get("/audio/frames").await;
    let frames = body.as_array().unwrap();
    assert_eq!(frames.len(), 10);
    assert_eq!(frames[0]["frame_id"], 5);
    assert_eq!(frames[9]["frame_id"], 14);

    let (_, body) = server.get("/audio/frames?limit=bogus").await;
    assert_eq!(body.as_array().unwrap().len(), 10);

    let (_, body) = server.get("/audio/frames?limit=0").await;
    assert!(body.as_array().unwrap().is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_camera_size_mismatch_is_accepted() {
    let server = TestServer::in_memory().await;

    let (status, body) = server.post("/camera/frame", camera_payload(4, 4, 10)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["frame_id"], 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_camera_accepts_byte_array_data() {
    let server = TestServer::in_memory().await;

    let (status, _) = server
        .post(
            "/camera/frame",
            json!({"width": 1, "height": 1, "format": "BGR", "data": [1, 2, 3]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = server.get("/camera/frames").await;
    assert_eq!(body[0]["format"], "BGR");
    assert_eq!(body[0]["data"], STANDARD.encode([1u8, 2, 3]));

    server.shutdown().await;
}

#[tokio::test]
async fn test_validation_errors() {
    let server = TestServer::in_memory().await;

    let (status, body) = server
        .post("/camera/frame", json!({"width": 2, "height": 2, "format": "RGB"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].as_str().unwrap().contains("data"));

    let (status, _) = server.post_raw("/audio/frame", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server.post("/text/send", json!({"content": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = server
        .post("/text/confirm", json!({"message_id": "msg_000000", "status": "lost"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rejected requests leave no trace
    let (_, body) = server.get("/status").await;
    assert_eq!(body["camera_frames"], 0);
    assert_eq!(body["audio_frames"], 0);
    assert_eq!(body["text_messages"], 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_confirm_unknown_message_is_not_found() {
    let server = TestServer::in_memory().await;

    let (status, body) = server
        .post("/text/confirm", json!({"message_id": "msg_424242"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    server.shutdown().await;
}

#[tokio::test]
async fn test_health_and_status_shape() {
    let server = TestServer::in_memory().await;

    server.post("/text/send", json!({"content": "abc"})).await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert!(body["uptime"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["stats"]["text_messages"], 1);
    assert_eq!(body["stats"]["text_bytes"], 3);
    assert!(body["stats"]["last_text_message"].is_string());
    assert!(body["stats"]["last_camera_frame"].is_null());

    let (status, body) = server.get("/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text_messages"], 1);
    assert_eq!(body["save_data"], false);
    assert_eq!(body["history_capacity"], 100);
    assert_eq!(body["persistence_failures"], 0);

    server.shutdown().await;
}

#[tokio::test]
async fn test_persistence_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let sink: Arc<dyn PersistenceSink> = Arc::new(FileSink::create(dir.path()).unwrap());
    let server = TestServer::start(IngestService::new(100, Some(sink))).await;

    server.post("/camera/frame", camera_payload(8, 8, 8 * 8 * 3)).await;
    server.post("/audio/frame", audio_payload(160)).await;
    server.post("/text/send", json!({"content": "on disk"})).await;

    let (_, body) = server.get("/status").await;
    assert_eq!(body["save_data"], true);
    assert_eq!(body["persistence_failures"], 0);

    let names = |sub: &str| -> Vec<String> {
        std::fs::read_dir(dir.path().join(sub))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect()
    };

    let camera = names("camera");
    assert_eq!(camera.len(), 1);
    assert!(camera[0].starts_with("camera_frame_000000_"));
    assert!(camera[0].ends_with(".jpg"));
    assert!(!camera[0].contains(':'));

    let audio = names("audio");
    assert_eq!(audio.len(), 1);
    assert!(audio[0].ends_with(".wav"));

    let text = names("text");
    assert_eq!(text.len(), 1);
    assert!(text[0].starts_with("text_message_msg_000000_"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_persistence_failure_still_accepts() {
    let dir = tempfile::tempdir().unwrap();
    let sink: Arc<dyn PersistenceSink> = Arc::new(FileSink::create(dir.path()).unwrap());
    let server = TestServer::start(IngestService::new(100, Some(sink))).await;

    // Size mismatch cannot be encoded as JPEG, but the frame is still stored
    let (status, body) = server.post("/camera/frame", camera_payload(8, 8, 5)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");

    let (_, body) = server.get("/status").await;
    assert_eq!(body["camera_frames"], 1);
    assert_eq!(body["persistence_failures"], 1);

    server.shutdown().await;
}
