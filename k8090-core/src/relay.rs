//! Relay model.

use crate::error::CoreError;
use k8090_protocol::CHANNELS;
use serde::{Deserialize, Serialize};

/// Timer delay a board ships with and returns to after a factory reset.
pub const DEFAULT_DELAY_SECS: u16 = 5;

/// Mirrored state of one relay.
///
/// The id is assigned once at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    id: u8,
    delay: u16,
    timer_active: bool,
    status: bool,
}

impl Relay {
    /// Only [`DeviceState`](crate::DeviceState) creates channels, one per id
    /// below [`CHANNELS`].
    pub(crate) fn new(id: u8) -> Self {
        debug_assert!(usize::from(id) < CHANNELS);
        Self {
            id,
            delay: DEFAULT_DELAY_SECS,
            timer_active: false,
            status: false,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// Bit selecting this relay in a mask byte.
    pub fn mask(&self) -> u8 {
        1 << self.id
    }

    /// Timer delay in seconds.
    pub fn delay(&self) -> u16 {
        self.delay
    }

    pub fn timer_active(&self) -> bool {
        self.timer_active
    }

    pub fn is_on(&self) -> bool {
        self.status
    }

    pub(crate) fn set_delay(&mut self, seconds: u16) -> bool {
        std::mem::replace(&mut self.delay, seconds) != seconds
    }

    /// Returns true if either field changed.
    pub(crate) fn set_status(&mut self, on: bool, timer_active: bool) -> bool {
        let changed = self.status != on || self.timer_active != timer_active;
        self.status = on;
        self.timer_active = timer_active;
        changed
    }
}

/// Parses a number of seconds typed by a user.
///
/// Non-integers fail with [`CoreError::InvalidSeconds`]; integers outside
/// 0-65535 fail with [`CoreError::SecondsOutOfRange`].
pub fn parse_seconds(input: &str) -> Result<u16, CoreError> {
    let trimmed = input.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| CoreError::InvalidSeconds(trimmed.to_string()))?;
    u16::try_from(value).map_err(|_| CoreError::SecondsOutOfRange(value))
}
