//! Client error types.

use crate::config::ConfigError;
use k8090_core::CoreError;
use thiserror::Error;

/// Client errors.
///
/// Transport failures are passed through unchanged; the driver never retries.
/// Malformed responses are not errors at this level, they are reported as
/// diagnostics while draining.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("invalid input: {0}")]
    Core(#[from] CoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("connection closed")]
    Closed,
}

impl ClientError {
    /// Returns whether the error was raised before anything was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Core(_) | ClientError::Config(_))
    }

    /// Returns a stable code for display and scripting.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Io(_) => "IO_ERROR",
            ClientError::Serial(_) => "SERIAL_ERROR",
            ClientError::Core(e) => e.error_code(),
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::Closed => "CLOSED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        assert!(ClientError::Core(CoreError::InvalidRelay(9)).is_validation());
        assert!(!ClientError::Closed.is_validation());
        assert!(!ClientError::Io(std::io::Error::other("boom")).is_validation());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ClientError::Core(CoreError::SecondsOutOfRange(70000)).error_code(),
            "RANGE_ERROR"
        );
        assert_eq!(ClientError::Closed.error_code(), "CLOSED");
        assert_eq!(
            ClientError::Io(std::io::Error::other("boom")).error_code(),
            "IO_ERROR"
        );
    }

    #[test]
    fn test_display() {
        let err = ClientError::Core(CoreError::SecondsOutOfRange(70000));
        assert!(err.to_string().contains("70000"));
        assert_eq!(ClientError::Closed.to_string(), "connection closed");
    }
}
