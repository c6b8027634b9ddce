//! Configuration for the ingestion server
//!
//! Configuration can be loaded from a TOML file and/or environment variables.
//! Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::history::DEFAULT_HISTORY_CAPACITY;

/// Main configuration for the ingestion server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Persistence configuration
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// History limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Write accepted records to disk
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Root directory for saved records
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("quest_test_data")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            data_dir: default_data_dir(),
        }
    }
}

/// History limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Records kept in memory per stream
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Largest accepted request body, in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

/// Room for a 1920x1080 RGB frame as base64 JSON (~8.3 MB) with margin
fn default_max_body_bytes() -> usize {
    32 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env();
        config
    }

    /// Load configuration from file if it exists, then overlay environment variables
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.as_ref().exists() => Self::from_file(p)?,
            // Missing file is reported by the caller once logging is up
            _ => Config::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("QUEST_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("QUEST_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }

        if let Ok(save) = std::env::var("QUEST_SAVE_DATA") {
            if let Some(enabled) = parse_bool(&save) {
                self.persistence.enabled = enabled;
            }
        }
        if let Ok(dir) = std::env::var("QUEST_DATA_DIR") {
            self.persistence.data_dir = PathBuf::from(dir);
        }

        if let Ok(capacity) = std::env::var("QUEST_HISTORY_CAPACITY") {
            if let Ok(c) = capacity.parse() {
                self.limits.history_capacity = c;
            }
        }
        if let Ok(max) = std::env::var("QUEST_MAX_BODY_BYTES") {
            if let Ok(m) = max.parse() {
                self.limits.max_body_bytes = m;
            }
        }

        if let Ok(file) = std::env::var("QUEST_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "limits.history_capacity must be at least 1".to_string(),
            ));
        }
        if self.limits.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_body_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Resolve the persistence flag from `--save-data` / `--no-save`
///
/// `--no-save` always wins; `--save-data` forces persistence on; with
/// neither flag the configured value is kept.
pub fn resolve_save_data(save_data: bool, no_save: bool, configured: bool) -> bool {
    if no_save {
        false
    } else if save_data {
        true
    } else {
        configured
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
