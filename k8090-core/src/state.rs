//! Device state table.

use crate::button::{Button, ButtonMode};
use crate::error::CoreError;
use crate::events::DeviceEvent;
use crate::relay::Relay;
use crate::router;
use k8090_protocol::{Response, CHANNELS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware version label used before the board has reported one.
pub const UNKNOWN_FIRMWARE: &str = "Unknown";

pub(crate) fn bit(field: u8, index: usize) -> bool {
    field & (1 << index) != 0
}

/// Firmware compile date, reported as year and week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub year: u16,
    pub week: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.year, self.week)
    }
}

/// Mirror of everything the host knows about the board.
///
/// Relays and buttons are fixed-size tables indexed by channel. Device-level
/// fields stay `None` until the board answers the matching query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    relays: [Relay; CHANNELS],
    buttons: [Button; CHANNELS],
    firmware_version: Option<FirmwareVersion>,
    jumper_status: Option<bool>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceState {
    pub fn new() -> Self {
        Self {
            relays: std::array::from_fn(|i| Relay::new(i as u8)),
            buttons: std::array::from_fn(|i| Button::new(i as u8)),
            firmware_version: None,
            jumper_status: None,
        }
    }

    pub fn relays(&self) -> &[Relay; CHANNELS] {
        &self.relays
    }

    pub fn buttons(&self) -> &[Button; CHANNELS] {
        &self.buttons
    }

    pub fn relay(&self, index: usize) -> Result<&Relay, CoreError> {
        self.relays.get(index).ok_or(CoreError::InvalidRelay(index))
    }

    pub fn button(&self, index: usize) -> Result<&Button, CoreError> {
        self.buttons.get(index).ok_or(CoreError::InvalidButton(index))
    }

    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.firmware_version
    }

    /// Firmware version as `YYYY.W`, or `Unknown` before the first report.
    pub fn firmware_label(&self) -> String {
        self.firmware_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| UNKNOWN_FIRMWARE.to_string())
    }

    pub fn jumper_status(&self) -> Option<bool> {
        self.jumper_status
    }

    /// Relays currently on, as a bit field.
    pub fn relays_on(&self) -> u8 {
        self.relays
            .iter()
            .filter(|r| r.is_on())
            .fold(0, |acc, r| acc | r.mask())
    }

    /// Encodes every button's mode into the (momentary, toggle, timed) masks
    /// of a set-button-mode command.
    pub fn button_mode_masks(&self) -> (u8, u8, u8) {
        self.buttons
            .iter()
            .fold((0, 0, 0), |(momentary, toggle, timed), button| {
                match button.mode() {
                    ButtonMode::Momentary => (momentary | button.mask(), toggle, timed),
                    ButtonMode::Toggle => (momentary, toggle | button.mask(), timed),
                    ButtonMode::Timed => (momentary, toggle, timed | button.mask()),
                }
            })
    }

    /// Records a locally requested button mode ahead of broadcasting the table.
    pub fn set_button_mode(&mut self, index: usize, mode: ButtonMode) -> Result<bool, CoreError> {
        let button = self
            .buttons
            .get_mut(index)
            .ok_or(CoreError::InvalidButton(index))?;
        Ok(button.set_mode(mode))
    }

    /// Records a locally requested timer delay.
    pub fn set_relay_delay(&mut self, index: usize, seconds: u16) -> Result<bool, CoreError> {
        let relay = self
            .relays
            .get_mut(index)
            .ok_or(CoreError::InvalidRelay(index))?;
        Ok(relay.set_delay(seconds))
    }

    /// Applies a decoded response and returns the resulting changes.
    pub fn apply(&mut self, response: &Response) -> Vec<DeviceEvent> {
        router::apply(self, response)
    }

    pub(crate) fn relays_mut(&mut self) -> &mut [Relay; CHANNELS] {
        &mut self.relays
    }

    pub(crate) fn buttons_mut(&mut self) -> &mut [Button; CHANNELS] {
        &mut self.buttons
    }

    pub(crate) fn set_firmware_version(&mut self, version: FirmwareVersion) -> bool {
        self.firmware_version.replace(version) != Some(version)
    }

    pub(crate) fn set_jumper_status(&mut self, set: bool) -> bool {
        self.jumper_status.replace(set) != Some(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = DeviceState::new();
        for (i, relay) in state.relays().iter().enumerate() {
            assert_eq!(usize::from(relay.id()), i);
        }
        for (i, button) in state.buttons().iter().enumerate() {
            assert_eq!(usize::from(button.id()), i);
        }
        assert_eq!(state.firmware_version(), None);
        assert_eq!(state.firmware_label(), "Unknown");
        assert_eq!(state.jumper_status(), None);
        assert_eq!(state.relays_on(), 0);
    }

    #[test]
    fn test_channel_masks_cover_every_bit() {
        let state = DeviceState::new();
        let relay_masks: Vec<u8> = state.relays().iter().map(Relay::mask).collect();
        let button_masks: Vec<u8> = state.buttons().iter().map(Button::mask).collect();
        let expected: Vec<u8> = (0..CHANNELS).map(|i| 1u8 << i).collect();
        assert_eq!(relay_masks, expected);
        assert_eq!(button_masks, expected);
    }

    #[test]
    fn test_index_bounds() {
        let state = DeviceState::new();
        assert!(state.relay(7).is_ok());
        assert_eq!(state.relay(8), Err(CoreError::InvalidRelay(8)));
        assert_eq!(state.button(8), Err(CoreError::InvalidButton(8)));
    }

    #[test]
    fn test_default_mode_masks() {
        let state = DeviceState::new();
        assert_eq!(state.button_mode_masks(), (0, 0xff, 0));
    }

    #[test]
    fn test_mode_masks_full_broadcast() {
        let mut state = DeviceState::new();
        state.set_button_mode(3, ButtonMode::Timed).unwrap();
        assert_eq!(state.button_mode_masks(), (0, 0b1111_0111, 0b0000_1000));

        state.set_button_mode(0, ButtonMode::Momentary).unwrap();
        assert_eq!(
            state.button_mode_masks(),
            (0b0000_0001, 0b1111_0110, 0b0000_1000)
        );
    }

    #[test]
    fn test_set_mode_invalid_index() {
        let mut state = DeviceState::new();
        assert_eq!(
            state.set_button_mode(8, ButtonMode::Timed),
            Err(CoreError::InvalidButton(8))
        );
        assert_eq!(state.button_mode_masks(), (0, 0xff, 0));
    }

    #[test]
    fn test_set_relay_delay() {
        let mut state = DeviceState::new();
        assert_eq!(state.set_relay_delay(2, 90), Ok(true));
        assert_eq!(state.relay(2).unwrap().delay(), 90);
        assert_eq!(state.set_relay_delay(2, 90), Ok(false));
        assert_eq!(state.set_relay_delay(9, 1), Err(CoreError::InvalidRelay(9)));
    }

    #[test]
    fn test_firmware_display() {
        let version = FirmwareVersion {
            year: 2024,
            week: 3,
        };
        assert_eq!(version.to_string(), "2024.3");
    }

    #[test]
    fn test_snapshot_json() {
        let state = DeviceState::new();
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["relays"].as_array().unwrap().len(), 8);
        assert_eq!(json["buttons"][0]["mode"], "toggle");
        assert!(json["jumper_status"].is_null());
    }
}
