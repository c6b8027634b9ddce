//! Simulated device binary
//!
//! # Usage
//!
//! ```bash
//! # Stream to a local server until Ctrl+C
//! cargo run -p remotemedia-device-sim
//!
//! # Remote server, stop after 30 seconds, smaller frames
//! cargo run -p remotemedia-device-sim -- \
//!   --server http://192.168.1.20:8888 \
//!   --duration 30 \
//!   --width 640 --height 480
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use remotemedia_device_sim::{DeviceClient, Simulator, SimulatorConfig};

/// Quest Device Simulator
///
/// Streams synthetic camera frames, audio frames and text messages to a
/// quest-ingest server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL
    #[arg(long, default_value = "http://localhost:8888", env = "QUEST_SERVER")]
    server: String,

    /// Stop after this many seconds (runs until Ctrl+C if omitted)
    #[arg(long)]
    duration: Option<u64>,

    /// Camera frame interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    camera_interval_ms: u64,

    /// Audio frame interval in milliseconds
    #[arg(long, default_value_t = 100)]
    audio_interval_ms: u64,

    /// Text message interval in milliseconds
    #[arg(long, default_value_t = 5000)]
    text_interval_ms: u64,

    /// Camera frame width
    #[arg(long, default_value_t = 1920)]
    width: u32,

    /// Camera frame height
    #[arg(long, default_value_t = 1080)]
    height: u32,

    /// Audio sample rate
    #[arg(long, default_value_t = 16000)]
    sample_rate: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Quest device simulator...");

    let client = DeviceClient::new(&args.server)?;
    let config = SimulatorConfig {
        camera_interval: Duration::from_millis(args.camera_interval_ms),
        audio_interval: Duration::from_millis(args.audio_interval_ms),
        text_interval: Duration::from_millis(args.text_interval_ms),
        frame_width: args.width,
        frame_height: args.height,
        sample_rate: args.sample_rate,
        ..SimulatorConfig::default()
    };
    let simulator = Simulator::new(client, config);

    simulator
        .check_connection()
        .await
        .with_context(|| format!("cannot connect to {}, is the server running?", args.server))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let duration = args.duration.map(Duration::from_secs);
    tokio::spawn(async move {
        wait_for_stop(duration).await;
        tracing::info!("Received stop signal, shutting down simulator...");
        let _ = shutdown_tx.send(true);
    });

    simulator.run(shutdown_rx).await;
    Ok(())
}

/// Resolve on Ctrl+C, or after `duration` if set
async fn wait_for_stop(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let timer = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = timer => {},
    }
}
