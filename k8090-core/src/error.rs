//! Core error types.

use thiserror::Error;

/// Validation errors. These are raised before any bytes are sent, so neither
/// the mirror nor the board is touched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid relay index: {0} (expected 0-7)")]
    InvalidRelay(usize),

    #[error("invalid button index: {0} (expected 0-7)")]
    InvalidButton(usize),

    #[error("seconds must be an integer, got '{0}'")]
    InvalidSeconds(String),

    #[error("seconds out of range: {0} (expected 0-65535)")]
    SecondsOutOfRange(i64),

    #[error("invalid button mode '{0}': expected momentary, toggle or timed")]
    InvalidButtonMode(String),
}

impl CoreError {
    /// Returns a stable code for display and scripting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidRelay(_) | CoreError::InvalidButton(_) => "INVALID_INDEX",
            CoreError::InvalidSeconds(_) => "TYPE_ERROR",
            CoreError::SecondsOutOfRange(_) => "RANGE_ERROR",
            CoreError::InvalidButtonMode(_) => "VALUE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CoreError::InvalidRelay(9).error_code(), "INVALID_INDEX");
        assert_eq!(CoreError::InvalidButton(8).error_code(), "INVALID_INDEX");
        assert_eq!(
            CoreError::InvalidSeconds("abc".into()).error_code(),
            "TYPE_ERROR"
        );
        assert_eq!(CoreError::SecondsOutOfRange(-1).error_code(), "RANGE_ERROR");
        assert_eq!(
            CoreError::InvalidButtonMode("latch".into()).error_code(),
            "VALUE_ERROR"
        );
    }

    #[test]
    fn test_display() {
        assert!(CoreError::InvalidRelay(12).to_string().contains("12"));
        assert!(CoreError::SecondsOutOfRange(70000)
            .to_string()
            .contains("70000"));
        assert!(CoreError::InvalidButtonMode("latch".into())
            .to_string()
            .contains("latch"));
    }
}
