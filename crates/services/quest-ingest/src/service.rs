//! Ingestion service
//!
//! Owns the three stream histories, the statistics aggregator and the
//! optional persistence sink. Every accepted record follows the same path:
//! append (with eviction) -> statistics -> persistence. Persistence runs
//! on the blocking pool after the history lock has been released, and its
//! failures are logged rather than returned.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{PersistenceError, Result};
use crate::history::{BoundedHistory, DEFAULT_HISTORY_CAPACITY};
use crate::model::{
    message_id_for, now_timestamp, AudioFrame, CameraFrame, MessageStatus, StreamKind, TextMessage,
};
use crate::persistence::PersistenceSink;
use crate::stats::{IngestStats, StatsSnapshot};
use crate::status::{StatusTracker, StatusTransition};
use crate::validation::{AudioFrameInput, CameraFrameInput, TextConfirmInput, TextSendInput};

/// Ingestion service shared by all request handlers
pub struct IngestService {
    camera: BoundedHistory<CameraFrame>,
    audio: BoundedHistory<AudioFrame>,
    text: BoundedHistory<TextMessage>,
    stats: IngestStats,
    sink: Option<Arc<dyn PersistenceSink>>,
    persistence_failures: AtomicU64,
}

impl Default for IngestService {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY, None)
    }
}

impl IngestService {
    /// Create a service keeping `capacity` records per stream
    pub fn new(capacity: usize, sink: Option<Arc<dyn PersistenceSink>>) -> Self {
        Self {
            camera: BoundedHistory::new(StreamKind::Camera, capacity),
            audio: BoundedHistory::new(StreamKind::Audio, capacity),
            text: BoundedHistory::new(StreamKind::Text, capacity),
            stats: IngestStats::new(),
            sink,
            persistence_failures: AtomicU64::new(0),
        }
    }

    pub fn persistence_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Accept a camera frame
    pub async fn ingest_camera(&self, input: CameraFrameInput) -> Result<CameraFrame> {
        let timestamp = input.timestamp.unwrap_or_else(now_timestamp);
        let appended = self.camera.append_with(|frame_id| CameraFrame {
            timestamp,
            width: input.width,
            height: input.height,
            format: input.format,
            data: input.data,
            frame_id,
        });
        let frame = appended.record;

        self.stats.record(StreamKind::Camera, frame.byte_len());

        tracing::info!(
            frame_id = frame.frame_id,
            width = frame.width,
            height = frame.height,
            format = %frame.format.as_str(),
            bytes = frame.byte_len(),
            "Processed camera frame"
        );

        self.persist(StreamKind::Camera, frame.clone(), |sink, frame| {
            sink.write_camera(frame)
        })
        .await;

        Ok(frame)
    }

    /// Accept an audio frame
    pub async fn ingest_audio(&self, input: AudioFrameInput) -> Result<AudioFrame> {
        let timestamp = input.timestamp.unwrap_or_else(now_timestamp);
        let appended = self.audio.append_with(|frame_id| AudioFrame {
            timestamp,
            sample_rate: input.sample_rate,
            channels: input.channels,
            format: input.format,
            data: input.data,
            duration_ms: input.duration_ms,
            frame_id,
        });
        let frame = appended.record;

        self.stats.record(StreamKind::Audio, frame.byte_len());

        tracing::info!(
            frame_id = frame.frame_id,
            sample_rate = frame.sample_rate,
            channels = frame.channels,
            duration_ms = frame.duration_ms,
            bytes = frame.byte_len(),
            "Processed audio frame"
        );

        self.persist(StreamKind::Audio, frame.clone(), |sink, frame| {
            sink.write_audio(frame)
        })
        .await;

        Ok(frame)
    }

    /// Create a text message with status `sent`
    pub async fn send_text(&self, input: TextSendInput) -> Result<TextMessage> {
        let appended = self.text.append_with(|seq| TextMessage {
            timestamp: now_timestamp(),
            message_id: message_id_for(seq),
            content: input.content,
            status: MessageStatus::Sent,
        });
        let message = appended.record;

        self.stats.record(StreamKind::Text, message.byte_len());

        tracing::info!(
            message_id = %message.message_id,
            content = %preview(&message.content, 50),
            "Sent text message"
        );

        self.persist(StreamKind::Text, message.clone(), |sink, message| {
            sink.write_text(message)
        })
        .await;

        Ok(message)
    }

    /// Apply a delivery/read confirmation
    pub fn confirm_text(&self, input: TextConfirmInput) -> Result<StatusTransition> {
        StatusTracker::new(&self.text).update_status(&input.message_id, input.status)
    }

    /// Most recent camera frames, oldest first
    pub fn camera_frames(&self, limit: usize) -> Vec<CameraFrame> {
        self.camera.list(limit)
    }

    pub fn audio_frames(&self, limit: usize) -> Vec<AudioFrame> {
        self.audio.list(limit)
    }

    pub fn text_messages(&self, limit: usize) -> Vec<TextMessage> {
        self.text.list(limit)
    }

    pub fn find_message(&self, message_id: &str) -> Option<TextMessage> {
        self.text.find_by_id(message_id)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Liveness report
    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            timestamp: now_timestamp(),
            uptime: self.stats.uptime_secs(),
            stats: self.stats.snapshot(),
        }
    }

    /// Current holdings, statistics and persistence state
    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            camera_frames: self.camera.len(),
            audio_frames: self.audio.len(),
            text_messages: self.text.len(),
            stats: self.stats.snapshot(),
            save_data: self.persistence_enabled(),
            history_capacity: self.camera.capacity(),
            evicted: EvictionCounts {
                camera: self.camera.evicted_count(),
                audio: self.audio.evicted_count(),
                text: self.text.evicted_count(),
            },
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
        }
    }

    /// Hand a copy of `record` to the sink, if one is configured
    async fn persist<T, F>(&self, stream: StreamKind, record: T, write: F)
    where
        T: Send + 'static,
        F: FnOnce(&dyn PersistenceSink, &T) -> std::result::Result<std::path::PathBuf, PersistenceError>
            + Send
            + 'static,
    {
        let Some(sink) = self.sink.clone() else {
            return;
        };

        let outcome = tokio::task::spawn_blocking(move || write(sink.as_ref(), &record)).await;

        match outcome {
            Ok(Ok(path)) => {
                tracing::debug!(stream = %stream, path = %path.display(), "Persisted record");
            }
            Ok(Err(e)) => {
                self.persistence_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(stream = %stream, error = %e, "Error saving record");
            }
            Err(e) => {
                self.persistence_failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(stream = %stream, error = %e, "Persistence task failed");
            }
        }
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
    pub stats: StatsSnapshot,
}

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    /// Records currently held per stream
    pub camera_frames: usize,
    pub audio_frames: usize,
    pub text_messages: usize,
    pub stats: StatsSnapshot,
    /// Whether persistence is enabled
    pub save_data: bool,
    pub history_capacity: usize,
    pub evicted: EvictionCounts,
    pub persistence_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvictionCounts {
    pub camera: u64,
    pub audio: u64,
    pub text: u64,
}

/// First `max_chars` characters of `content`, with an ellipsis if cut
fn preview(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
