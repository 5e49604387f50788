//! Button model.

use crate::error::CoreError;
use k8090_protocol::CHANNELS;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a button drives its relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonMode {
    /// Relay is on while the button is held.
    Momentary,
    /// Each press flips the relay.
    #[default]
    Toggle,
    /// A press starts the relay's timer.
    Timed,
}

impl ButtonMode {
    pub const ALL: [ButtonMode; 3] = [ButtonMode::Momentary, ButtonMode::Toggle, ButtonMode::Timed];

    pub fn as_str(self) -> &'static str {
        match self {
            ButtonMode::Momentary => "momentary",
            ButtonMode::Toggle => "toggle",
            ButtonMode::Timed => "timed",
        }
    }
}

impl fmt::Display for ButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ButtonMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ButtonMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| CoreError::InvalidButtonMode(s.to_string()))
    }
}

/// Last edge reported for a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonAction {
    /// No event seen since the connection was opened.
    #[default]
    Inactive,
    Pressed,
    Released,
}

/// Mirrored state of one button.
///
/// The id is assigned once at construction and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    id: u8,
    mode: ButtonMode,
    pressed: bool,
    action: ButtonAction,
}

impl Button {
    /// Only [`DeviceState`](crate::DeviceState) creates channels, one per id
    /// below [`CHANNELS`].
    pub(crate) fn new(id: u8) -> Self {
        debug_assert!(usize::from(id) < CHANNELS);
        Self {
            id,
            mode: ButtonMode::default(),
            pressed: false,
            action: ButtonAction::default(),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn mask(&self) -> u8 {
        1 << self.id
    }

    pub fn mode(&self) -> ButtonMode {
        self.mode
    }

    /// Whether the button is held down right now.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn action(&self) -> ButtonAction {
        self.action
    }

    pub(crate) fn set_mode(&mut self, mode: ButtonMode) -> bool {
        std::mem::replace(&mut self.mode, mode) != mode
    }

    pub(crate) fn set_pressed(&mut self, pressed: bool) {
        self.pressed = pressed;
    }

    pub(crate) fn set_action(&mut self, action: ButtonAction) {
        self.action = action;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let button = Button::new(6);
        assert_eq!(button.id(), 6);
        assert_eq!(button.mask(), 0b0100_0000);
        assert_eq!(button.mode(), ButtonMode::Toggle);
        assert_eq!(button.action(), ButtonAction::Inactive);
        assert!(!button.is_pressed());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("momentary".parse::<ButtonMode>(), Ok(ButtonMode::Momentary));
        assert_eq!("TOGGLE".parse::<ButtonMode>(), Ok(ButtonMode::Toggle));
        assert_eq!(" timed".parse::<ButtonMode>(), Ok(ButtonMode::Timed));
        assert_eq!(
            "latch".parse::<ButtonMode>(),
            Err(CoreError::InvalidButtonMode("latch".to_string()))
        );
    }

    #[test]
    fn test_set_mode_reports_change() {
        let mut button = Button::new(0);
        assert!(!button.set_mode(ButtonMode::Toggle));
        assert!(button.set_mode(ButtonMode::Timed));
        assert_eq!(button.mode(), ButtonMode::Timed);
    }

    #[test]
    fn test_mode_serialization() {
        let json = serde_json::to_string(&ButtonMode::Momentary).unwrap();
        assert_eq!(json, "\"momentary\"");
    }
}
