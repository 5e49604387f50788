//! Command opcodes sent from the host to the board.

use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commands understood by the board.
///
/// Unless noted otherwise `MASK` selects the affected relays and the
/// parameter bytes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Command {
    RelayOn = 0x11,
    RelayOff = 0x12,
    RelayToggle = 0x14,
    /// Answered with a relay status packet (51h).
    QueryRelayStatus = 0x18,
    /// `MASK` = momentary buttons, `PARAM1` = toggle buttons, `PARAM2` = timed buttons.
    SetButtonMode = 0x21,
    QueryButtonMode = 0x22,
    /// `PARAM1:PARAM2` = big-endian delay in seconds, 0 uses the stored delay.
    StartTimer = 0x41,
    /// `PARAM1:PARAM2` = big-endian delay in seconds.
    SetTimerDelay = 0x42,
    /// `PARAM1` bit 0 set queries the remaining time instead of the preset.
    QueryTimerDelay = 0x44,
    FactoryReset = 0x66,
    QueryJumper = 0x70,
    QueryFirmwareVersion = 0x71,
}

impl Command {
    /// All commands, in opcode order.
    pub const ALL: [Command; 12] = [
        Command::RelayOn,
        Command::RelayOff,
        Command::RelayToggle,
        Command::QueryRelayStatus,
        Command::SetButtonMode,
        Command::QueryButtonMode,
        Command::StartTimer,
        Command::SetTimerDelay,
        Command::QueryTimerDelay,
        Command::FactoryReset,
        Command::QueryJumper,
        Command::QueryFirmwareVersion,
    ];

    /// Returns the opcode byte.
    pub fn opcode(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        Command::ALL
            .into_iter()
            .find(|cmd| cmd.opcode() == opcode)
            .ok_or(ProtocolError::UnknownCommand(opcode))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::RelayOn => "RELAY_ON",
            Command::RelayOff => "RELAY_OFF",
            Command::RelayToggle => "RELAY_TOGGLE",
            Command::QueryRelayStatus => "QUERY_RELAY_STATUS",
            Command::SetButtonMode => "SET_BUTTON_MODE",
            Command::QueryButtonMode => "QUERY_BUTTON_MODE",
            Command::StartTimer => "START_TIMER",
            Command::SetTimerDelay => "SET_TIMER_DELAY",
            Command::QueryTimerDelay => "QUERY_TIMER_DELAY",
            Command::FactoryReset => "FACTORY_RESET",
            Command::QueryJumper => "QUERY_JUMPER",
            Command::QueryFirmwareVersion => "QUERY_FIRMWARE_VERSION",
        };
        write!(f, "{}({:#04x})", name, self.opcode())
    }
}
