//! Periodic producer loops
//!
//! Three independent tasks share one [`DeviceClient`]:
//!
//! - camera: one checkerboard frame per `camera_interval`
//! - audio: one sine-tone frame per `audio_interval`
//! - text: one message per `text_interval`, confirmed `delivered` and then
//!   `read` with `confirm_delay` between steps
//!
//! Failed requests are logged and retried on the next tick. Shutdown is
//! signalled through a `watch` channel and observed between requests.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::client::{
    timestamp_now, AudioFramePayload, CameraFramePayload, DeviceClient, HealthStatus,
};
use crate::error::Result;

/// Simulator timing and frame sizes
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub camera_interval: Duration,
    pub audio_interval: Duration,
    pub text_interval: Duration,
    /// Delay before each text confirmation
    pub confirm_delay: Duration,
    pub frame_width: u32,
    pub frame_height: u32,
    pub sample_rate: u32,
    pub audio_duration_ms: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            camera_interval: Duration::from_secs(1),
            audio_interval: Duration::from_millis(100),
            text_interval: Duration::from_secs(5),
            confirm_delay: Duration::from_millis(500),
            frame_width: 1920,
            frame_height: 1080,
            sample_rate: 16000,
            audio_duration_ms: 100.0,
        }
    }
}

/// Request counters, updated by the producer loops
#[derive(Debug, Default)]
pub struct SimStats {
    camera_sent: AtomicU64,
    camera_failed: AtomicU64,
    audio_sent: AtomicU64,
    audio_failed: AtomicU64,
    text_sent: AtomicU64,
    text_failed: AtomicU64,
    confirmations: AtomicU64,
    confirmations_failed: AtomicU64,
}

/// Point-in-time copy of [`SimStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimStatsSnapshot {
    pub camera_sent: u64,
    pub camera_failed: u64,
    pub audio_sent: u64,
    pub audio_failed: u64,
    pub text_sent: u64,
    pub text_failed: u64,
    pub confirmations: u64,
    pub confirmations_failed: u64,
}

impl SimStatsSnapshot {
    pub fn total_failures(&self) -> u64 {
        self.camera_failed + self.audio_failed + self.text_failed + self.confirmations_failed
    }
}

impl SimStats {
    pub fn snapshot(&self) -> SimStatsSnapshot {
        SimStatsSnapshot {
            camera_sent: self.camera_sent.load(Ordering::Relaxed),
            camera_failed: self.camera_failed.load(Ordering::Relaxed),
            audio_sent: self.audio_sent.load(Ordering::Relaxed),
            audio_failed: self.audio_failed.load(Ordering::Relaxed),
            text_sent: self.text_sent.load(Ordering::Relaxed),
            text_failed: self.text_failed.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
            confirmations_failed: self.confirmations_failed.load(Ordering::Relaxed),
        }
    }
}

/// Simulated device
pub struct Simulator {
    client: Arc<DeviceClient>,
    config: Arc<SimulatorConfig>,
    stats: Arc<SimStats>,
}

impl Simulator {
    pub fn new(client: DeviceClient, config: SimulatorConfig) -> Self {
        Self {
            client: Arc::new(client),
            config: Arc::new(config),
            stats: Arc::new(SimStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SimStats> {
        self.stats.clone()
    }

    /// Verify the server answers `/health`
    pub async fn check_connection(&self) -> Result<HealthStatus> {
        let health = self.client.health().await?;
        tracing::info!(
            server = %self.client.base_url(),
            status = %health.status,
            "Server connection successful"
        );
        Ok(health)
    }

    /// Run the producer loops until `shutdown` turns true (or its sender is dropped)
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> SimStatsSnapshot {
        tracing::info!(
            camera_ms = self.config.camera_interval.as_millis() as u64,
            audio_ms = self.config.audio_interval.as_millis() as u64,
            text_ms = self.config.text_interval.as_millis() as u64,
            "Simulator started, sending test data"
        );

        let tasks = [
            tokio::spawn(camera_loop(
                self.client.clone(),
                self.config.clone(),
                self.stats.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(audio_loop(
                self.client.clone(),
                self.config.clone(),
                self.stats.clone(),
                shutdown.clone(),
            )),
            tokio::spawn(text_loop(
                self.client.clone(),
                self.config.clone(),
                self.stats.clone(),
                shutdown,
            )),
        ];

        for task in tasks {
            if let Err(e) = task.await {
                tracing::error!("Producer task failed: {}", e);
            }
        }

        let summary = self.stats.snapshot();
        tracing::info!(
            camera_frames = summary.camera_sent,
            audio_frames = summary.audio_sent,
            text_messages = summary.text_sent,
            confirmations = summary.confirmations,
            failures = summary.total_failures(),
            "Simulator stopped"
        );
        summary
    }
}

async fn camera_loop(
    client: Arc<DeviceClient>,
    config: Arc<SimulatorConfig>,
    stats: Arc<SimStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    // The pattern never changes; encode it once
    let template = CameraFramePayload::checkerboard(config.frame_width, config.frame_height);

    while !*shutdown.borrow() {
        let frame = CameraFramePayload {
            timestamp: timestamp_now(),
            ..template.clone()
        };

        match client.send_camera_frame(&frame).await {
            Ok(ack) => {
                stats.camera_sent.fetch_add(1, Ordering::Relaxed);
                tracing::info!(frame_id = ack.frame_id, "Camera frame sent");
            }
            Err(e) => {
                stats.camera_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Camera frame send failed");
            }
        }

        if sleep_or_shutdown(&mut shutdown, config.camera_interval).await {
            break;
        }
    }
}

async fn audio_loop(
    client: Arc<DeviceClient>,
    config: Arc<SimulatorConfig>,
    stats: Arc<SimStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    let template = AudioFramePayload::sine(config.sample_rate, config.audio_duration_ms);

    while !*shutdown.borrow() {
        let frame = AudioFramePayload {
            timestamp: timestamp_now(),
            ..template.clone()
        };

        match client.send_audio_frame(&frame).await {
            Ok(ack) => {
                stats.audio_sent.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(frame_id = ack.frame_id, "Audio frame sent");
            }
            Err(e) => {
                stats.audio_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Audio frame send failed");
            }
        }

        if sleep_or_shutdown(&mut shutdown, config.audio_interval).await {
            break;
        }
    }
}

async fn text_loop(
    client: Arc<DeviceClient>,
    config: Arc<SimulatorConfig>,
    stats: Arc<SimStats>,
    mut shutdown: watch::Receiver<bool>,
) {
    while !*shutdown.borrow() {
        let number = stats.text_sent.load(Ordering::Relaxed) + 1;
        let content = format!(
            "Test message #{} - {}",
            number,
            chrono::Local::now().format("%H:%M:%S")
        );

        match client.send_text(&content).await {
            Ok(ack) => {
                stats.text_sent.fetch_add(1, Ordering::Relaxed);
                tracing::info!(message_id = %ack.message_id, "Text message sent");

                for status in ["delivered", "read"] {
                    if sleep_or_shutdown(&mut shutdown, config.confirm_delay).await {
                        return;
                    }
                    match client.confirm_text(&ack.message_id, status).await {
                        Ok(confirm) => {
                            stats.confirmations.fetch_add(1, Ordering::Relaxed);
                            tracing::info!(
                                message_id = %confirm.message_id,
                                status = %confirm.new_status,
                                "Text message confirmed"
                            );
                        }
                        Err(e) => {
                            stats.confirmations_failed.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                message_id = %ack.message_id,
                                status,
                                error = %e,
                                "Text message confirmation failed"
                            );
                        }
                    }
                }
            }
            Err(e) => {
                stats.text_failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Text message send failed");
            }
        }

        if sleep_or_shutdown(&mut shutdown, config.text_interval).await {
            break;
        }
    }
}

/// Sleep for `delay`; returns true if shutdown was requested meanwhile
async fn sleep_or_shutdown(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    let changed = tokio::select! {
        _ = tokio::time::sleep(delay) => None,
        result = shutdown.changed() => Some(result.is_ok()),
    };

    match changed {
        // Sender dropped
        Some(false) => true,
        _ => *shutdown.borrow(),
    }
}
