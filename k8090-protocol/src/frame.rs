//! Packet format.
//!
//! Every packet, in both directions, is exactly 7 bytes:
//!
//! ```text
//! +-------+-----+------+--------+--------+-----+-------+
//! |  STX  | CMD | MASK | PARAM1 | PARAM2 | CHK |  ETX  |
//! |  04h  |     |      |        |        |     |  0Fh  |
//! +-------+-----+------+--------+--------+-----+-------+
//! ```
//!
//! `CHK` is the two's complement of `STX + CMD + MASK + PARAM1 + PARAM2`,
//! truncated to one byte. `MASK` is usually a bit field selecting relays or
//! buttons (bit 0 = channel 0); the meaning of the two parameter bytes depends
//! on the command.

use crate::command::Command;
use crate::error::ProtocolError;
use bytes::{Buf, BufMut};

/// Start-of-packet marker.
pub const STX: u8 = 0x04;

/// End-of-packet marker.
pub const ETX: u8 = 0x0F;

/// Size of every packet in bytes.
pub const FRAME_SIZE: usize = 7;

/// Computes the packet checksum over the start marker and the four payload bytes.
pub fn checksum(command: u8, mask: u8, param1: u8, param2: u8) -> u8 {
    STX.wrapping_add(command)
        .wrapping_add(mask)
        .wrapping_add(param1)
        .wrapping_add(param2)
        .wrapping_neg()
}

/// The four payload fields of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Frame {
    pub command: u8,
    pub mask: u8,
    pub param1: u8,
    pub param2: u8,
}

impl Frame {
    /// Creates a frame from raw fields.
    pub fn new(command: u8, mask: u8, param1: u8, param2: u8) -> Self {
        Self {
            command,
            mask,
            param1,
            param2,
        }
    }

    /// Creates a request frame for a known command.
    pub fn request(command: Command, mask: u8, param1: u8, param2: u8) -> Self {
        Self::new(command.opcode(), mask, param1, param2)
    }

    /// Creates a request frame whose parameters carry a big-endian 16-bit value.
    pub fn with_seconds(command: Command, mask: u8, seconds: u16) -> Self {
        let [high, low] = seconds.to_be_bytes();
        Self::request(command, mask, high, low)
    }

    /// Returns the parameters read as a big-endian 16-bit value.
    pub fn seconds(&self) -> u16 {
        u16::from_be_bytes([self.param1, self.param2])
    }

    /// Returns the checksum this frame carries on the wire.
    pub fn checksum(&self) -> u8 {
        checksum(self.command, self.mask, self.param1, self.param2)
    }

    /// Encodes the frame into its 7 wire bytes.
    pub fn encode(&self) -> [u8; FRAME_SIZE] {
        [
            STX,
            self.command,
            self.mask,
            self.param1,
            self.param2,
            self.checksum(),
            ETX,
        ]
    }

    /// Appends the encoded frame to a buffer.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.encode());
    }

    /// Decodes a frame from exactly 7 bytes.
    ///
    /// The start and end markers are not checked here; use
    /// [`Frame::has_markers`] to detect a misaligned packet.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() != FRAME_SIZE {
            return Err(ProtocolError::InvalidLength {
                expected: FRAME_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = buf;
        cursor.advance(1); // STX
        let frame = Self {
            command: cursor.get_u8(),
            mask: cursor.get_u8(),
            param1: cursor.get_u8(),
            param2: cursor.get_u8(),
        };
        let carried = cursor.get_u8();

        let computed = frame.checksum();
        if carried != computed {
            return Err(ProtocolError::ChecksumMismatch {
                expected: computed,
                actual: carried,
            });
        }

        Ok(frame)
    }

    /// Returns true if a 7-byte packet starts with STX and ends with ETX.
    pub fn has_markers(buf: &[u8]) -> bool {
        buf.len() == FRAME_SIZE && buf[0] == STX && buf[FRAME_SIZE - 1] == ETX
    }

    /// Returns the command as a known opcode, if it is one.
    pub fn known_command(&self) -> Option<Command> {
        Command::try_from(self.command).ok()
    }
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cmd={:#04x} mask={:#010b} p1={:#04x} p2={:#04x}",
            self.command, self.mask, self.param1, self.param2
        )
    }
}
