//! Response packets sent from the board to the host.
//!
//! Some responses are answers to queries, others (button and relay status)
//! are sent unsolicited whenever the board's state changes.

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::FIRMWARE_BASE_YEAR;
use serde::{Deserialize, Serialize};

/// Button mode report (answer to 22h).
pub const BUTTON_MODE: u8 = 0x22;
/// Timer delay report, one packet per queried relay (answer to 44h).
pub const TIMER_DELAY: u8 = 0x44;
/// Button pressed/released event.
pub const BUTTON_STATUS: u8 = 0x50;
/// Relay status event (answer to 18h and sent on every relay change).
pub const RELAY_STATUS: u8 = 0x51;
/// Event jumper position (answer to 70h).
pub const JUMPER_STATUS: u8 = 0x70;
/// Firmware version (answer to 71h).
pub const FIRMWARE_VERSION: u8 = 0x71;

/// A decoded response packet. Bit `i` of every bit field refers to channel `i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Buttons in each mode. A button should appear in exactly one field.
    ButtonMode { momentary: u8, toggle: u8, timed: u8 },
    /// Delay in seconds for the relays in `relays`.
    TimerDelay { relays: u8, seconds: u16 },
    /// Buttons currently held down, plus the edges that triggered the event.
    ButtonStatus {
        pressed: u8,
        just_pressed: u8,
        just_released: u8,
    },
    /// Relay state before and after the change, and the running timers.
    RelayStatus {
        previous: u8,
        on: u8,
        timer_active: u8,
    },
    Jumper { set: bool },
    /// Compile date of the firmware as year and week number.
    FirmwareVersion { year: u16, week: u8 },
}

impl Response {
    /// Interprets a checksum-valid frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        let Frame {
            command,
            mask,
            param1,
            param2,
        } = *frame;

        match command {
            BUTTON_MODE => Ok(Response::ButtonMode {
                momentary: mask,
                toggle: param1,
                timed: param2,
            }),
            TIMER_DELAY => Ok(Response::TimerDelay {
                relays: mask,
                seconds: frame.seconds(),
            }),
            BUTTON_STATUS => Ok(Response::ButtonStatus {
                pressed: mask,
                just_pressed: param1,
                just_released: param2,
            }),
            RELAY_STATUS => Ok(Response::RelayStatus {
                previous: mask,
                on: param1,
                timer_active: param2,
            }),
            JUMPER_STATUS => Ok(Response::Jumper { set: param1 >= 1 }),
            FIRMWARE_VERSION => Ok(Response::FirmwareVersion {
                year: FIRMWARE_BASE_YEAR + u16::from(param1),
                week: param2,
            }),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }

    /// Returns the opcode this response is sent with.
    pub fn opcode(&self) -> u8 {
        match self {
            Response::ButtonMode { .. } => BUTTON_MODE,
            Response::TimerDelay { .. } => TIMER_DELAY,
            Response::ButtonStatus { .. } => BUTTON_STATUS,
            Response::RelayStatus { .. } => RELAY_STATUS,
            Response::Jumper { .. } => JUMPER_STATUS,
            Response::FirmwareVersion { .. } => FIRMWARE_VERSION,
        }
    }

    /// Builds the frame the board would send for this response.
    pub fn to_frame(&self) -> Frame {
        let opcode = self.opcode();
        match *self {
            Response::ButtonMode {
                momentary,
                toggle,
                timed,
            } => Frame::new(opcode, momentary, toggle, timed),
            Response::TimerDelay { relays, seconds } => {
                let [high, low] = seconds.to_be_bytes();
                Frame::new(opcode, relays, high, low)
            }
            Response::ButtonStatus {
                pressed,
                just_pressed,
                just_released,
            } => Frame::new(opcode, pressed, just_pressed, just_released),
            Response::RelayStatus {
                previous,
                on,
                timer_active,
            } => Frame::new(opcode, previous, on, timer_active),
            Response::Jumper { set } => Frame::new(opcode, 0, u8::from(set), 0),
            Response::FirmwareVersion { year, week } => {
                let offset = year.saturating_sub(FIRMWARE_BASE_YEAR).min(u16::from(u8::MAX));
                Frame::new(opcode, 0, offset as u8, week)
            }
        }
    }
}
