//! Quest Ingest Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Listen on 0.0.0.0:8888 and save records under ./quest_test_data
//! cargo run -p remotemedia-quest-ingest
//!
//! # Custom port, in-memory only
//! cargo run -p remotemedia-quest-ingest -- --port 9000 --no-save
//!
//! # TOML configuration plus a log file
//! cargo run -p remotemedia-quest-ingest -- --config quest.toml --log-file quest.log
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use remotemedia_quest_ingest::{
    api::{build_router, route_table, AppState},
    config::{resolve_save_data, Config},
    persistence::{FileSink, PersistenceSink},
    IngestService,
};

/// Quest Ingest Server
///
/// Receives camera frames, audio frames and text messages from a headset
/// device (or simulator) over HTTP.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "QUEST_CONFIG")]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Save received records to disk
    #[arg(long)]
    save_data: bool,

    /// Keep records in memory only (overrides --save-data)
    #[arg(long)]
    no_save: bool,

    /// Directory for saved records
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Records kept in memory per stream
    #[arg(long)]
    history_capacity: Option<usize>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration: file, then environment, then flags
    let mut config = Config::load(args.config.as_ref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = args.data_dir {
        config.persistence.data_dir = dir;
    }
    if let Some(capacity) = args.history_capacity {
        config.limits.history_capacity = capacity;
    }
    if let Some(file) = args.log_file {
        config.logging.file = Some(file);
    }
    config.persistence.enabled =
        resolve_save_data(args.save_data, args.no_save, config.persistence.enabled);
    config.validate()?;

    init_tracing(&config)?;

    tracing::info!("Starting Quest Ingest Server...");
    if let Some(path) = args.config.as_ref().filter(|p| !p.exists()) {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
    }

    let sink: Option<Arc<dyn PersistenceSink>> = if config.persistence.enabled {
        let sink = FileSink::create(config.persistence.data_dir.clone()).with_context(|| {
            format!(
                "failed to create data directory {}",
                config.persistence.data_dir.display()
            )
        })?;
        tracing::info!(data_dir = %sink.root().display(), "Data saving enabled");
        Some(Arc::new(sink))
    } else {
        tracing::info!("Data saving disabled");
        None
    };

    let service = Arc::new(IngestService::new(config.limits.history_capacity, sink));
    let config = Arc::new(config);

    tracing::info!(
        "Configuration: port={}, history_capacity={}, save_data={}",
        config.server.port,
        config.limits.history_capacity,
        config.persistence.enabled
    );
    for (method, path, description) in route_table() {
        tracing::info!("  {:<5} {:<16} - {}", method, path, description);
    }

    let state = AppState::new(service, config.clone());
    let router = build_router(state);

    let bind_addr = config.server.bind_address();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("HTTP server listening on {}", bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, initiating graceful shutdown...");
        })
        .await?;

    tracing::info!("Quest Ingest Server shutdown complete");
    Ok(())
}

/// Console logging, plus a plain-text file layer when configured
fn init_tracing(config: &Config) -> Result<()> {
    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
