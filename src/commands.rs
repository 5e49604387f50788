//! Command execution.
//!
//! Channels are numbered 1-8 here, as printed on the board.

use crate::Device;
use colored::Colorize;
use k8090_client::ClientError;
use k8090_core::{parse_seconds, ButtonAction, ButtonMode, CoreError, DeviceState};
use k8090_protocol::CHANNELS;

/// A parsed device operation, shared by one-shot commands and the REPL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Status,
    On(usize),
    Off(usize),
    Toggle(usize),
    Timer(usize, Option<u16>),
    Delay(usize, u16),
    Mode(usize, ButtonMode),
    Version,
    Jumper,
    FactoryReset,
}

/// Converts a 1-8 board label into a library index.
pub fn channel(label: &str) -> Result<usize, Box<dyn std::error::Error>> {
    let n: usize = label
        .trim()
        .parse()
        .map_err(|_| format!("invalid channel '{}': expected 1-{}", label, CHANNELS))?;
    if !(1..=CHANNELS).contains(&n) {
        return Err(format!("invalid channel {}: expected 1-{}", n, CHANNELS).into());
    }
    Ok(n - 1)
}

pub fn timer(relay: &str, seconds: Option<&str>) -> Result<Action, Box<dyn std::error::Error>> {
    let seconds = seconds.map(parse_seconds).transpose()?;
    Ok(Action::Timer(channel(relay)?, seconds))
}

pub fn delay(relay: &str, seconds: &str) -> Result<Action, Box<dyn std::error::Error>> {
    Ok(Action::Delay(channel(relay)?, parse_seconds(seconds)?))
}

pub fn mode(button: &str, mode: &str) -> Result<Action, Box<dyn std::error::Error>> {
    let mode = mode.parse::<ButtonMode>()?;
    Ok(Action::Mode(channel(button)?, mode))
}

/// Formats an error for the terminal, prefixed with its code when it has one.
pub fn describe_error(err: &(dyn std::error::Error + 'static)) -> String {
    let code = if let Some(e) = err.downcast_ref::<ClientError>() {
        Some(e.error_code())
    } else {
        err.downcast_ref::<CoreError>().map(CoreError::error_code)
    };
    match code {
        Some(code) => format!("[{}] {}", code, err),
        None => err.to_string(),
    }
}

/// Executes an action and returns the formatted output.
pub fn execute(device: &mut Device, action: Action) -> Result<String, ClientError> {
    match action {
        Action::Status => {
            device.query_relay_status()?;
            Ok(format_state(device.state()))
        }

        Action::On(relay) => {
            device.relay(relay)?.turn_on()?;
            Ok(format_relay(device, relay))
        }

        Action::Off(relay) => {
            device.relay(relay)?.turn_off()?;
            Ok(format_relay(device, relay))
        }

        Action::Toggle(relay) => {
            device.relay(relay)?.toggle()?;
            Ok(format_relay(device, relay))
        }

        Action::Timer(relay, seconds) => {
            device.relay(relay)?.start_timer(seconds)?;
            Ok(format_relay(device, relay))
        }

        Action::Delay(relay, seconds) => {
            device.relay(relay)?.set_delay(seconds)?;
            Ok(format!(
                "{} relay {} delay to {}s",
                "Set".green(),
                (relay + 1).to_string().cyan(),
                seconds
            ))
        }

        Action::Mode(button, mode) => {
            device.button(button)?.set_mode(mode)?;
            Ok(format!(
                "{} button {} to {}",
                "Set".green(),
                (button + 1).to_string().cyan(),
                mode.as_str().yellow()
            ))
        }

        Action::Version => {
            let version = device.firmware_version()?;
            Ok(format!("Firmware: {}", version.cyan()))
        }

        Action::Jumper => {
            let status = match device.jumper_status()? {
                Some(true) => "set (buttons do not switch relays)".yellow(),
                Some(false) => "not set".green(),
                None => "no answer".red(),
            };
            Ok(format!("Event jumper: {}", status))
        }

        Action::FactoryReset => {
            device.factory_reset()?;
            device.query_button_mode()?;
            device.query_timer_delays(0xff)?;
            Ok(format!(
                "{} button modes and timer delays restored",
                "Reset".green()
            ))
        }
    }
}

fn on_off(on: bool) -> colored::ColoredString {
    if on {
        format!("{:<3}", "ON").green().bold()
    } else {
        format!("{:<3}", "off").dimmed()
    }
}

fn format_relay(device: &Device, index: usize) -> String {
    let relays = device.state().relays();
    let relay = &relays[index];
    let mut line = format!("Relay {}: {}", index + 1, on_off(relay.is_on()));
    if relay.timer_active() {
        line.push_str(&format!(" {}", "(timer)".yellow()));
    }
    line
}

/// Renders the mirror as a two-section table.
pub fn format_state(state: &DeviceState) -> String {
    let mut output = String::new();

    output.push_str(&format!("{}\n", "Relays".bold()));
    for relay in state.relays() {
        let timer = if relay.timer_active() {
            "timer".yellow().to_string()
        } else {
            String::new()
        };
        output.push_str(&format!(
            "  {}  {}  delay {:>5}s  {}\n",
            (relay.id() + 1).to_string().cyan(),
            on_off(relay.is_on()),
            relay.delay(),
            timer
        ));
    }

    output.push_str(&format!("{}\n", "Buttons".bold()));
    for button in state.buttons() {
        let action = match button.action() {
            ButtonAction::Inactive => "-",
            ButtonAction::Pressed => "pressed",
            ButtonAction::Released => "released",
        };
        output.push_str(&format!(
            "  {}  {:<9} {:<7} last: {}\n",
            (button.id() + 1).to_string().cyan(),
            button.mode().as_str(),
            if button.is_pressed() { "down" } else { "up" },
            action
        ));
    }

    output.push_str(&format!("Firmware: {}", state.firmware_label()));
    if let Some(set) = state.jumper_status() {
        output.push_str(&format!("\nEvent jumper: {}", if set { "set" } else { "not set" }));
    }
    output
}
