//! Change events and diagnostics published while draining responses.

use crate::button::ButtonMode;
use crate::state::FirmwareVersion;
use k8090_protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A change in the mirrored device state.
///
/// Only emitted when a field actually changes, so replaying a response
/// yields no events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeviceEvent {
    RelayChanged {
        relay: u8,
        on: bool,
        timer_active: bool,
    },
    ButtonPressed {
        button: u8,
    },
    ButtonReleased {
        button: u8,
    },
    ButtonModeChanged {
        button: u8,
        mode: ButtonMode,
    },
    DelayChanged {
        relay: u8,
        seconds: u16,
    },
    JumperChanged {
        set: bool,
    },
    FirmwareVersion {
        version: FirmwareVersion,
    },
}

/// A non-fatal problem seen on the receive path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A read returned a number of bytes other than one packet.
    MalformedFrame { len: usize },
    ChecksumMismatch { expected: u8, actual: u8 },
    /// The packet was applied but its start/end bytes were wrong.
    BadMarkers { start: u8, end: u8 },
    UnknownResponse { command: u8 },
    /// The transport failed mid-drain; the partial packet was discarded.
    ReadFailed { message: String },
}

impl From<&ProtocolError> for Diagnostic {
    fn from(err: &ProtocolError) -> Self {
        match *err {
            ProtocolError::InvalidLength { actual, .. } => Diagnostic::MalformedFrame { len: actual },
            ProtocolError::ChecksumMismatch { expected, actual } => {
                Diagnostic::ChecksumMismatch { expected, actual }
            }
            ProtocolError::UnknownCommand(command) => Diagnostic::UnknownResponse { command },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedFrame { len } => {
                write!(f, "invalid response: expected 7 bytes, got {}", len)
            }
            Diagnostic::ChecksumMismatch { expected, actual } => write!(
                f,
                "response checksum mismatch: expected {:#04x}, got {:#04x}",
                expected, actual
            ),
            Diagnostic::BadMarkers { start, end } => write!(
                f,
                "response framing bytes are {:#04x}/{:#04x}, expected 0x04/0x0f",
                start, end
            ),
            Diagnostic::UnknownResponse { command } => {
                write!(f, "unknown response command: {:#04x}", command)
            }
            Diagnostic::ReadFailed { message } => write!(f, "read failed: {}", message),
        }
    }
}

/// Everything a subscriber can receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    Event(DeviceEvent),
    Diagnostic(Diagnostic),
}
