//! Quest Ingest Server
//!
//! HTTP test server for headset device streams. A device (or the
//! `device-sim` tool) posts camera frames, audio frames and text messages;
//! the server validates them, keeps a bounded in-memory history per stream,
//! tracks text delivery status and optionally writes every record to disk.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     remotemedia-quest-ingest                     │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  ┌──────────────────┐                                            │
//! │  │  HTTP API Server │ ← POST /camera/frame, /audio/frame         │
//! │  │  (axum)          │ ← POST /text/send, /text/confirm           │
//! │  └────────┬─────────┘                                            │
//! │           │ parse_* (validation)                                 │
//! │           ▼                                                      │
//! │  ┌──────────────────┐   ┌──────────────────┐   ┌──────────────┐  │
//! │  │  IngestService   │──▶│  BoundedHistory  │   │ IngestStats  │  │
//! │  │                  │   │  (x3, FIFO)      │   │              │  │
//! │  └────────┬─────────┘   └──────────────────┘   └──────────────┘  │
//! │           │ spawn_blocking                                       │
//! │           ▼                                                      │
//! │  ┌──────────────────────────────────────────────────────────┐    │
//! │  │  PersistenceSink (FileSink: JPEG / WAV / JSON)            │    │
//! │  └──────────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod persistence;
pub mod service;
pub mod stats;
pub mod status;
pub mod validation;

pub use error::{IngestError, PersistenceError, Result};
pub use service::IngestService;
