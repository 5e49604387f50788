//! Response routing.
//!
//! Maps each response packet onto the device mirror. Every bit field is read
//! with bit `i` addressing channel `i` (least significant bit = channel 0).
//! Handlers are pure projections: applying the same packet twice leaves the
//! mirror unchanged and emits no further events.

use crate::button::{ButtonAction, ButtonMode};
use crate::events::DeviceEvent;
use crate::state::{bit, DeviceState, FirmwareVersion};
use k8090_protocol::{Frame, ProtocolError, Response};

/// Decodes a checksum-valid frame and applies it.
///
/// Frames with an unrecognized command byte are returned as
/// [`ProtocolError::UnknownCommand`] and leave the state untouched.
pub fn route(state: &mut DeviceState, frame: &Frame) -> Result<Vec<DeviceEvent>, ProtocolError> {
    let response = Response::from_frame(frame)?;
    Ok(apply(state, &response))
}

/// Applies a decoded response to the mirror.
pub fn apply(state: &mut DeviceState, response: &Response) -> Vec<DeviceEvent> {
    tracing::trace!(?response, "applying response");

    match *response {
        Response::ButtonMode {
            momentary,
            toggle,
            timed,
        } => button_modes(state, momentary, toggle, timed),
        Response::TimerDelay { relays, seconds } => timer_delay(state, relays, seconds),
        Response::ButtonStatus {
            pressed,
            just_pressed,
            just_released,
        } => button_status(state, pressed, just_pressed, just_released),
        Response::RelayStatus {
            on, timer_active, ..
        } => relay_status(state, on, timer_active),
        Response::Jumper { set } => {
            if state.set_jumper_status(set) {
                vec![DeviceEvent::JumperChanged { set }]
            } else {
                Vec::new()
            }
        }
        Response::FirmwareVersion { year, week } => {
            let version = FirmwareVersion { year, week };
            if state.set_firmware_version(version) {
                vec![DeviceEvent::FirmwareVersion { version }]
            } else {
                Vec::new()
            }
        }
    }
}

/// A button listed in several fields takes the first of momentary, toggle,
/// timed. A button listed in none keeps its mode.
fn button_modes(state: &mut DeviceState, momentary: u8, toggle: u8, timed: u8) -> Vec<DeviceEvent> {
    let mut events = Vec::new();
    for (i, button) in state.buttons_mut().iter_mut().enumerate() {
        let mode = if bit(momentary, i) {
            ButtonMode::Momentary
        } else if bit(toggle, i) {
            ButtonMode::Toggle
        } else if bit(timed, i) {
            ButtonMode::Timed
        } else {
            continue;
        };

        if button.set_mode(mode) {
            events.push(DeviceEvent::ButtonModeChanged {
                button: button.id(),
                mode,
            });
        }
    }
    events
}

fn timer_delay(state: &mut DeviceState, relays: u8, seconds: u16) -> Vec<DeviceEvent> {
    state
        .relays_mut()
        .iter_mut()
        .enumerate()
        .filter(|(i, _)| bit(relays, *i))
        .filter_map(|(_, relay)| {
            relay.set_delay(seconds).then(|| DeviceEvent::DelayChanged {
                relay: relay.id(),
                seconds,
            })
        })
        .collect()
}

fn button_status(
    state: &mut DeviceState,
    pressed: u8,
    just_pressed: u8,
    just_released: u8,
) -> Vec<DeviceEvent> {
    let mut events = Vec::new();
    for (i, button) in state.buttons_mut().iter_mut().enumerate() {
        let before = (button.is_pressed(), button.action());
        button.set_pressed(bit(pressed, i));

        let edge = if bit(just_pressed, i) {
            Some(ButtonAction::Pressed)
        } else if bit(just_released, i) {
            Some(ButtonAction::Released)
        } else {
            None
        };

        if let Some(action) = edge {
            button.set_action(action);
        }

        if before == (button.is_pressed(), button.action()) {
            continue;
        }
        // Without an edge the new level decides which event is reported.
        let down = match edge {
            Some(action) => action == ButtonAction::Pressed,
            None => button.is_pressed(),
        };
        let id = button.id();
        events.push(if down {
            DeviceEvent::ButtonPressed { button: id }
        } else {
            DeviceEvent::ButtonReleased { button: id }
        });
    }
    events
}

fn relay_status(state: &mut DeviceState, on_bits: u8, timer_bits: u8) -> Vec<DeviceEvent> {
    state
        .relays_mut()
        .iter_mut()
        .enumerate()
        .filter_map(|(i, relay)| {
            let (on, timer_active) = (bit(on_bits, i), bit(timer_bits, i));
            relay
                .set_status(on, timer_active)
                .then(|| DeviceEvent::RelayChanged {
                    relay: relay.id(),
                    on,
                    timer_active,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn relay_status_frame(on: u8, timers: u8) -> Response {
        Response::RelayStatus {
            previous: 0,
            on,
            timer_active: timers,
        }
    }

    #[test]
    fn test_relay_status_bit_mapping() {
        let mut state = DeviceState::new();
        let events = state.apply(&relay_status_frame(0b0000_0101, 0));

        for (i, relay) in state.relays().iter().enumerate() {
            assert_eq!(relay.is_on(), i == 0 || i == 2, "relay {}", i);
            assert!(!relay.timer_active());
        }
        assert_eq!(
            events,
            vec![
                DeviceEvent::RelayChanged {
                    relay: 0,
                    on: true,
                    timer_active: false
                },
                DeviceEvent::RelayChanged {
                    relay: 2,
                    on: true,
                    timer_active: false
                },
            ]
        );
    }

    #[test]
    fn test_relay_status_idempotent() {
        let mut state = DeviceState::new();
        let response = relay_status_frame(0b1000_0001, 0b0000_0001);

        state.apply(&response);
        let snapshot = state.clone();
        let events = state.apply(&response);

        assert_eq!(state, snapshot);
        assert!(events.is_empty());
    }

    #[test]
    fn test_relay_status_clears_unset_bits() {
        let mut state = DeviceState::new();
        state.apply(&relay_status_frame(0xff, 0xff));
        state.apply(&relay_status_frame(0b0000_0010, 0));

        assert_eq!(state.relays_on(), 0b0000_0010);
        assert!(state.relays().iter().all(|r| !r.timer_active()));
    }

    #[test]
    fn test_button_mode_partial_report() {
        let mut state = DeviceState::new();
        let events = state.apply(&Response::ButtonMode {
            momentary: 0b0000_0001,
            toggle: 0,
            timed: 0,
        });

        assert_eq!(state.button(0).unwrap().mode(), ButtonMode::Momentary);
        for button in &state.buttons()[1..] {
            assert_eq!(button.mode(), ButtonMode::Toggle);
        }
        assert_eq!(
            events,
            vec![DeviceEvent::ButtonModeChanged {
                button: 0,
                mode: ButtonMode::Momentary
            }]
        );
    }

    #[test]
    fn test_button_mode_priority() {
        let mut state = DeviceState::new();
        state.apply(&Response::ButtonMode {
            momentary: 0b0000_0001,
            toggle: 0b0000_0011,
            timed: 0b0000_0111,
        });

        assert_eq!(state.button(0).unwrap().mode(), ButtonMode::Momentary);
        assert_eq!(state.button(1).unwrap().mode(), ButtonMode::Toggle);
        assert_eq!(state.button(2).unwrap().mode(), ButtonMode::Timed);
    }

    #[test]
    fn test_timer_delay_masked() {
        let mut state = DeviceState::new();
        let events = state.apply(&Response::TimerDelay {
            relays: 0b0100_0010,
            seconds: 0x0102,
        });

        assert_eq!(state.relay(1).unwrap().delay(), 258);
        assert_eq!(state.relay(6).unwrap().delay(), 258);
        assert_eq!(state.relay(0).unwrap().delay(), 5);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_button_press_and_release() {
        let mut state = DeviceState::new();

        let events = state.apply(&Response::ButtonStatus {
            pressed: 0b0000_0100,
            just_pressed: 0b0000_0100,
            just_released: 0,
        });
        let button = state.button(2).unwrap();
        assert!(button.is_pressed());
        assert_eq!(button.action(), ButtonAction::Pressed);
        assert_eq!(events, vec![DeviceEvent::ButtonPressed { button: 2 }]);

        let events = state.apply(&Response::ButtonStatus {
            pressed: 0,
            just_pressed: 0,
            just_released: 0b0000_0100,
        });
        let button = state.button(2).unwrap();
        assert!(!button.is_pressed());
        assert_eq!(button.action(), ButtonAction::Released);
        assert_eq!(events, vec![DeviceEvent::ButtonReleased { button: 2 }]);
    }

    #[test]
    fn test_button_status_without_edge_keeps_action() {
        let mut state = DeviceState::new();
        state.apply(&Response::ButtonStatus {
            pressed: 0b0000_0001,
            just_pressed: 0b0000_0001,
            just_released: 0,
        });
        let events = state.apply(&Response::ButtonStatus {
            pressed: 0,
            just_pressed: 0,
            just_released: 0,
        });

        let button = state.button(0).unwrap();
        assert!(!button.is_pressed());
        assert_eq!(button.action(), ButtonAction::Pressed);
        assert_eq!(events, vec![DeviceEvent::ButtonReleased { button: 0 }]);
    }

    #[test]
    fn test_button_level_change_without_edge_is_reported() {
        let mut state = DeviceState::new();
        let events = state.apply(&Response::ButtonStatus {
            pressed: 0b0000_0001,
            just_pressed: 0,
            just_released: 0,
        });

        let button = state.button(0).unwrap();
        assert!(button.is_pressed());
        assert_eq!(button.action(), ButtonAction::Inactive);
        assert_eq!(events, vec![DeviceEvent::ButtonPressed { button: 0 }]);

        // Same report again changes nothing.
        assert!(state
            .apply(&Response::ButtonStatus {
                pressed: 0b0000_0001,
                just_pressed: 0,
                just_released: 0,
            })
            .is_empty());
    }

    #[test]
    fn test_jumper() {
        let mut state = DeviceState::new();
        assert_eq!(
            state.apply(&Response::Jumper { set: true }),
            vec![DeviceEvent::JumperChanged { set: true }]
        );
        assert_eq!(state.jumper_status(), Some(true));
        assert!(state.apply(&Response::Jumper { set: true }).is_empty());
    }

    #[test]
    fn test_firmware_version() {
        let mut state = DeviceState::new();
        state.apply(&Response::FirmwareVersion {
            year: 2024,
            week: 3,
        });
        assert_eq!(state.firmware_label(), "2024.3");
    }

    #[test]
    fn test_route_from_frame() {
        let mut state = DeviceState::new();
        let events = route(&mut state, &Frame::new(0x71, 0, 24, 3)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(state.firmware_label(), "2024.3");
    }

    #[test]
    fn test_route_unknown_command_leaves_state() {
        let mut state = DeviceState::new();
        let before = state.clone();

        let result = route(&mut state, &Frame::new(0x33, 0xff, 0xff, 0xff));
        assert_eq!(result, Err(ProtocolError::UnknownCommand(0x33)));
        assert_eq!(state, before);
    }

    proptest! {
        #[test]
        fn prop_relay_status_is_projection(on: u8, timers: u8) {
            let mut state = DeviceState::new();
            state.apply(&relay_status_frame(on, timers));
            prop_assert_eq!(state.relays_on(), on);
            for (i, relay) in state.relays().iter().enumerate() {
                prop_assert_eq!(relay.timer_active(), timers & (1 << i) != 0);
            }
        }

        #[test]
        fn prop_any_response_idempotent(
            cmd in prop::sample::select(vec![0x22u8, 0x44, 0x50, 0x51, 0x70, 0x71]),
            mask: u8,
            p1: u8,
            p2: u8,
        ) {
            let response = Response::from_frame(&Frame::new(cmd, mask, p1, p2)).unwrap();
            let mut state = DeviceState::new();
            state.apply(&response);
            let snapshot = state.clone();
            let events = state.apply(&response);
            prop_assert_eq!(state, snapshot);
            prop_assert!(events.is_empty());
        }
    }
}
