//! # k8090-protocol
//!
//! Wire protocol for the Velleman K8090 / VM8090 eight-channel relay card.
//!
//! This crate provides:
//! - 7-byte packet framing with a two's-complement checksum
//! - Command opcodes (host to board)
//! - Typed decoding of response packets (board to host)

pub mod command;
pub mod error;
pub mod frame;
pub mod response;

pub use command::Command;
pub use error::ProtocolError;
pub use frame::{checksum, Frame, ETX, FRAME_SIZE, STX};
pub use response::Response;

/// Baud rate of the board's USB serial bridge.
pub const DEFAULT_BAUD_RATE: u32 = 19200;

/// Number of relays on the board. There is one button per relay.
pub const CHANNELS: usize = 8;

/// Base year of the firmware version field.
pub const FIRMWARE_BASE_YEAR: u16 = 2000;
