//! Protocol error types.

use thiserror::Error;

/// Errors raised while decoding packets received from the board.
///
/// None of these are fatal to a connection: the offending packet is dropped
/// and draining continues with the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid frame length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("unknown command byte: {0:#04x}")]
    UnknownCommand(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 7,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('3'));

        let err = ProtocolError::ChecksumMismatch {
            expected: 0xAB,
            actual: 0xCD,
        };
        let msg = err.to_string();
        assert!(msg.contains("0xab"));
        assert!(msg.contains("0xcd"));

        let err = ProtocolError::UnknownCommand(0x99);
        assert!(err.to_string().contains("0x99"));
    }
}
