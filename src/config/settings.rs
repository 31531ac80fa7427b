//! Application settings and configuration management

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Settings {
    /// Directory holding completed cache artifacts
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Maximum number of polls while waiting for an in-flight cache entry
    #[serde(default = "default_await_max_attempts")]
    pub await_max_attempts: u32,
    /// Interval between cache availability polls, in milliseconds
    #[serde(default = "default_await_interval_ms")]
    pub await_interval_ms: u64,
    /// Maximum reconnect attempts for an interrupted remote stream
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
    /// Initial delay before a reconnect attempt, in milliseconds
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Upper bound on the reconnect delay, in milliseconds
    #[serde(default = "default_reconnect_delay_cap_ms")]
    pub reconnect_delay_cap_ms: u64,
}

fn default_cache_dir() -> PathBuf {
    let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("resono").join("tracks")
}

fn default_await_max_attempts() -> u32 {
    50
}

fn default_await_interval_ms() -> u64 {
    500
}

fn default_reconnect_max_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    250
}

fn default_reconnect_delay_cap_ms() -> u64 {
    5_000
}

/// Error types for configuration operations
#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    ParseError(String),
    ValidationError(String),
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "I/O error: {}", e),
            ConfigError::ParseError(s) => write!(f, "Parse error: {}", s),
            ConfigError::ValidationError(s) => write!(f, "Validation error: {}", s),
        }
    }
}

impl Error for ConfigError {}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cache_dir: default_cache_dir(),
            await_max_attempts: default_await_max_attempts(),
            await_interval_ms: default_await_interval_ms(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_delay_cap_ms: default_reconnect_delay_cap_ms(),
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(&self)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config").join("resono").join("config.json")
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "Cache directory cannot be empty".to_string(),
            ));
        }

        if self.await_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "Cache wait must allow at least one attempt".to_string(),
            ));
        }

        if self.await_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Cache wait interval must be non-zero".to_string(),
            ));
        }

        if self.reconnect_base_delay_ms > self.reconnect_delay_cap_ms {
            return Err(ConfigError::ValidationError(
                "Reconnect base delay cannot exceed the delay cap".to_string(),
            ));
        }

        Ok(())
    }
}
