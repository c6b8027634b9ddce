//! Running statistics for accepted records
//!
//! Statistics reflect records accepted into memory, not records durably
//! persisted: a later persistence failure does not roll them back.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Instant;

use crate::model::{now_timestamp, StreamKind};

#[derive(Debug, Clone, Default)]
struct StreamCounters {
    count: u64,
    bytes: u64,
    last_seen: Option<String>,
}

/// Counters for one stream
///
/// Count, bytes and last-seen are updated together under one lock.
#[derive(Debug, Default)]
pub struct StreamStats {
    counters: Mutex<StreamCounters>,
}

impl StreamStats {
    /// Record one accepted record of `bytes` length
    pub fn record(&self, bytes: u64) {
        let now = now_timestamp();
        let mut counters = self.counters.lock();
        counters.count += 1;
        counters.bytes += bytes;
        counters.last_seen = Some(now);
    }

    pub fn count(&self) -> u64 {
        self.counters.lock().count
    }

    pub fn bytes(&self) -> u64 {
        self.counters.lock().bytes
    }

    pub fn last_seen(&self) -> Option<String> {
        self.counters.lock().last_seen.clone()
    }

    fn read(&self) -> StreamCounters {
        self.counters.lock().clone()
    }
}

/// Statistics aggregator for all three streams
pub struct IngestStats {
    camera: StreamStats,
    audio: StreamStats,
    text: StreamStats,
    started_at: Instant,
}

impl Default for IngestStats {
    fn default() -> Self {
        Self::new()
    }
}

impl IngestStats {
    pub fn new() -> Self {
        Self {
            camera: StreamStats::default(),
            audio: StreamStats::default(),
            text: StreamStats::default(),
            started_at: Instant::now(),
        }
    }

    /// Counters for the given stream
    pub fn stream(&self, kind: StreamKind) -> &StreamStats {
        match kind {
            StreamKind::Camera => &self.camera,
            StreamKind::Audio => &self.audio,
            StreamKind::Text => &self.text,
        }
    }

    /// Record one accepted record on a stream
    pub fn record(&self, kind: StreamKind, bytes: u64) {
        self.stream(kind).record(bytes);
    }

    /// Seconds since the aggregator was created
    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Get current statistics snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        let camera = self.camera.read();
        let audio = self.audio.read();
        let text = self.text.read();

        StatsSnapshot {
            camera_frames: camera.count,
            audio_frames: audio.count,
            text_messages: text.count,
            camera_bytes: camera.bytes,
            audio_bytes: audio.bytes,
            text_bytes: text.bytes,
            uptime: self.uptime_secs(),
            last_camera_frame: camera.last_seen,
            last_audio_frame: audio.last_seen,
            last_text_message: text.last_seen,
        }
    }
}

/// Snapshot of current statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// Total camera frames accepted
    pub camera_frames: u64,

    /// Total audio frames accepted
    pub audio_frames: u64,

    /// Total text messages accepted
    pub text_messages: u64,

    /// Cumulative camera payload bytes
    pub camera_bytes: u64,

    /// Cumulative audio payload bytes
    pub audio_bytes: u64,

    /// Cumulative text content bytes (UTF-8)
    pub text_bytes: u64,

    /// Uptime in seconds
    pub uptime: f64,

    pub last_camera_frame: Option<String>,
    pub last_audio_frame: Option<String>,
    pub last_text_message: Option<String>,
}
