//! Launcher configuration
//!
//! A single TOML file under the platform config directory. Every field has
//! a default, and a missing file is not an error: the launcher runs with
//! defaults unless the user overrides them.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Configuration for the Lacquer launcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// Preferred TCP port for the backend service
    pub backend_port: u16,

    /// Preferred TCP port for the static frontend server (packaged mode)
    pub frontend_port: u16,

    /// Origin of the external frontend dev server (development mode)
    pub dev_frontend_origin: String,

    /// Health endpoint path polled during startup
    pub health_path: String,

    /// Total readiness budget for the backend
    #[serde(with = "duration_millis")]
    pub probe_timeout: Duration,

    /// Delay between readiness poll attempts
    #[serde(with = "duration_millis")]
    pub probe_interval: Duration,

    /// Initial window width in logical pixels
    pub window_width: u32,

    /// Initial window height in logical pixels
    pub window_height: u32,

    /// Default log level when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            backend_port: 8000,
            frontend_port: 5173,
            dev_frontend_origin: "http://localhost:3000".to_string(),
            health_path: "/health".to_string(),
            probe_timeout: Duration::from_secs(20),
            probe_interval: Duration::from_millis(300),
            window_width: 1200,
            window_height: 800,
            log_level: "info".to_string(),
        }
    }
}

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lacquer")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<LauncherConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: LauncherConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load configuration from the default path, falling back to defaults if
/// the file is absent. A malformed file is an error; silently replacing a
/// user's broken config with defaults would mask the mistake.
pub fn load_or_default(path: &Path) -> Result<LauncherConfig, ConfigError> {
    match load_config(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound(_)) => Ok(LauncherConfig::default()),
        Err(e) => Err(e),
    }
}

/// Save configuration to a file
pub fn save_config(path: &Path, config: &LauncherConfig) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConfigError::Invalid(format!("Failed to create config dir: {}", e)))?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write config: {}", e)))?;

    Ok(())
}

// Helper module for Duration serialization as integer milliseconds
mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
