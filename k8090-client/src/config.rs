//! Connection configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via K8090_CONFIG or --config)
//! 3. Environment variables

use k8090_protocol::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default serial read timeout (1 s).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Default wait between sending a command and draining responses.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Default capacity of the notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

fn default_port() -> String {
    if cfg!(windows) {
        "COM3".to_string()
    } else {
        "/dev/ttyACM0".to_string()
    }
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name.
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout in milliseconds, enforced by the transport.
    pub read_timeout_ms: u64,
    /// Wait after each command before draining responses, in milliseconds.
    pub settle_delay_ms: u64,
    /// Capacity of the notification broadcast channel.
    pub event_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: ConnectionConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("K8090_PORT") {
            if !port.is_empty() {
                self.port = port;
            }
        }

        if let Some(baud) = lookup("K8090_BAUD") {
            if let Ok(parsed) = baud.parse() {
                self.baud_rate = parsed;
            }
        }

        if let Some(timeout) = lookup("K8090_READ_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                self.read_timeout_ms = ms;
            }
        }

        if let Some(delay) = lookup("K8090_SETTLE_DELAY_MS") {
            if let Ok(ms) = delay.parse() {
                self.settle_delay_ms = ms;
            }
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "serial port name is empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ValidationError(
                "baud rate must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
        assert_eq!(config.settle_delay(), Duration::from_millis(100));
        assert_eq!(config.event_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config =
            ConnectionConfig::new("/dev/ttyUSB1").with_settle_delay(Duration::from_millis(20));

        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.settle_delay_ms, 20);
        assert_eq!(config.settle_delay(), Duration::from_millis(20));
    }

    #[test]
    fn test_validate() {
        let err = ConnectionConfig::new("  ").validate().unwrap_err();
        assert!(err.to_string().contains("port"));

        let mut config = ConnectionConfig::new("COM1");
        config.baud_rate = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("K8090_PORT", "/dev/ttyACM7"),
            ("K8090_BAUD", "not-a-number"),
            ("K8090_SETTLE_DELAY_MS", "5"),
        ]
        .into_iter()
        .collect();

        let mut config = ConnectionConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, "/dev/ttyACM7");
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.settle_delay_ms, 5);
        assert_eq!(config.read_timeout_ms, 1000);
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k8090.yaml");

        let config = ConnectionConfig::new("/dev/ttyACM3").with_settle_delay(Duration::ZERO);
        std::fs::write(&path, serde_yaml::to_string(&config).unwrap()).unwrap();

        let loaded = ConnectionConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k8090.yaml");
        std::fs::write(&path, "port: /dev/ttyS0\n").unwrap();

        let loaded = ConnectionConfig::from_file(&path).unwrap();
        assert_eq!(loaded.port, "/dev/ttyS0");
        assert_eq!(loaded.baud_rate, 19200);
        assert_eq!(loaded.settle_delay_ms, 100);
    }

    #[test]
    fn test_missing_file() {
        let err = ConnectionConfig::from_file("/nonexistent/k8090.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(..)));
        assert!(err.to_string().contains("k8090.yaml"));
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "baud_rate: [fast]\n").unwrap();

        let err = ConnectionConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(..)));
    }
}
