//! # k8090-core
//!
//! In-memory mirror of a K8090 relay card.
//!
//! This crate provides:
//! - Relay and button models with constructor-only identity
//! - The device state table and the broadcast button-mode encoding
//! - Response routing: applying decoded packets to the mirror
//! - Change events and non-fatal diagnostics
//! - Validation of user input before anything reaches the wire

pub mod button;
pub mod error;
pub mod events;
pub mod relay;
pub mod router;
pub mod state;

pub use button::{Button, ButtonAction, ButtonMode};
pub use error::CoreError;
pub use events::{DeviceEvent, Diagnostic, Notification};
pub use relay::{parse_seconds, Relay, DEFAULT_DELAY_SECS};
pub use state::{DeviceState, FirmwareVersion, UNKNOWN_FIRMWARE};
