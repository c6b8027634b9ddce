//! Simulated headset device
//!
//! Produces synthetic camera frames (checkerboard test pattern), audio
//! frames (440 Hz sine) and text messages, and streams them to a
//! quest-ingest server on independent periodic loops. Text messages are
//! confirmed as `delivered` and then `read` shortly after they are sent.

pub mod client;
pub mod error;
pub mod generators;
pub mod simulator;

pub use client::DeviceClient;
pub use error::{ClientError, Result};
pub use simulator::{SimStats, Simulator, SimulatorConfig};
