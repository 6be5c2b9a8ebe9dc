//! Configuration system for tessera.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $TESSERA_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/tessera/config.toml
//!   3. ~/.config/tessera/config.toml
//!
//! The chunk bound is not configurable; see `wire::MAX_CHUNK_ENTRIES`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub transport: TransportConfig,
    pub router: RouterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Frames buffered in the in-process channel before senders wait.
    pub channel_capacity: usize,
    /// Largest encoded frame the transport accepts, in bytes.
    pub max_frame_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Incoming transactions that may be open at once on one channel.
    pub max_open_transactions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// tracing-subscriber filter directive. RUST_LOG takes precedence.
    pub filter: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            max_frame_bytes: 1_048_576, // 1 MiB
        }
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_open_transactions: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("tessera")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl TesseraConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::from_toml_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            TesseraConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("TESSERA_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&TesseraConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply TESSERA_* overrides. Values that fail to parse are ignored.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("TESSERA_TRANSPORT__CHANNEL_CAPACITY") {
            if let Ok(n) = v.parse() {
                self.transport.channel_capacity = n;
            }
        }
        if let Some(v) = lookup("TESSERA_TRANSPORT__MAX_FRAME_BYTES") {
            if let Ok(n) = v.parse() {
                self.transport.max_frame_bytes = n;
            }
        }
        if let Some(v) = lookup("TESSERA_ROUTER__MAX_OPEN_TRANSACTIONS") {
            if let Ok(n) = v.parse() {
                self.router.max_open_transactions = n;
            }
        }
        if let Some(v) = lookup("TESSERA_LOGGING__FILTER") {
            self.logging.filter = v;
        }
    }
}
