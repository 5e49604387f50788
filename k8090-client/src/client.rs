//! High-level device API.

use crate::config::ConnectionConfig;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::transport::{SerialTransport, Transport};
use k8090_core::{
    Button, ButtonAction, ButtonMode, CoreError, DeviceState, Notification, Relay,
};
use k8090_protocol::{Command, Frame, CHANNELS};
use tokio::sync::broadcast;

/// A K8090 relay card.
///
/// Each operation writes its command, waits the settle delay and drains every
/// response before returning, so the mirror reflects what the board reported
/// within that window. All operations take `&mut self`: the link is
/// half-duplex and must not be shared between concurrent callers.
pub struct K8090<T: Transport = SerialTransport> {
    conn: Connection<T>,
}

impl K8090<SerialTransport> {
    /// Opens the configured serial port and establishes the baseline state.
    pub fn open(config: ConnectionConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport =
            SerialTransport::open(&config.port, config.baud_rate, config.read_timeout())?;
        tracing::info!("Connected to {} at {} baud", config.port, config.baud_rate);
        Self::with_transport(transport, config)
    }
}

impl<T: Transport> K8090<T> {
    /// Wraps an already open transport.
    ///
    /// Queries relay status, button modes and all timer delays so the mirror
    /// starts from what the board reports.
    pub fn with_transport(transport: T, config: ConnectionConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let mut device = Self {
            conn: Connection::new(transport, config),
        };
        device.query_relay_status()?;
        device.query_button_mode()?;
        device.query_timer_delays(0xff)?;
        Ok(device)
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.conn.config()
    }

    /// The cached mirror. No I/O.
    pub fn state(&self) -> &DeviceState {
        self.conn.state()
    }

    /// Subscribes to change events and receive-path diagnostics.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.conn.subscribe()
    }

    pub fn transport(&self) -> &T {
        self.conn.transport()
    }

    /// Writes a raw command. Responses are picked up by the next sync.
    pub fn send_command(
        &mut self,
        command: Command,
        mask: u8,
        param1: u8,
        param2: u8,
    ) -> Result<(), ClientError> {
        self.conn.send(Frame::request(command, mask, param1, param2))
    }

    /// Drains responses the board has sent since the last operation, such as
    /// button presses and expired timers.
    pub fn sync(&mut self) -> Result<(), ClientError> {
        self.conn.sync()
    }

    fn query(&mut self, command: Command, mask: u8) -> Result<(), ClientError> {
        self.conn.request(Frame::request(command, mask, 0, 0))
    }

    pub fn query_relay_status(&mut self) -> Result<(), ClientError> {
        self.query(Command::QueryRelayStatus, 0)
    }

    pub fn query_button_mode(&mut self) -> Result<(), ClientError> {
        self.query(Command::QueryButtonMode, 0)
    }

    /// Asks for the preset delay of every relay in `mask`.
    pub fn query_timer_delays(&mut self, mask: u8) -> Result<(), ClientError> {
        self.query(Command::QueryTimerDelay, mask)
    }

    pub fn query_jumper(&mut self) -> Result<(), ClientError> {
        self.query(Command::QueryJumper, 0)
    }

    pub fn query_firmware_version(&mut self) -> Result<(), ClientError> {
        self.query(Command::QueryFirmwareVersion, 0)
    }

    /// Restores the board's button modes and timer delays to their defaults.
    ///
    /// The mirror is not touched; query afterwards to observe the reset.
    pub fn factory_reset(&mut self) -> Result<(), ClientError> {
        self.query(Command::FactoryReset, 0)
    }

    /// Queries the board, then returns the version as "YYYY.W", or "Unknown"
    /// if it did not answer.
    pub fn firmware_version(&mut self) -> Result<String, ClientError> {
        self.query_firmware_version()?;
        Ok(self.state().firmware_label())
    }

    /// Queries the board, then returns whether the event jumper is set.
    /// `None` means the board has never answered.
    pub fn jumper_status(&mut self) -> Result<Option<bool>, ClientError> {
        self.query_jumper()?;
        Ok(self.state().jumper_status())
    }

    /// Sends the mode of all eight buttons, as encoded from the mirror.
    pub fn sync_button_mode(&mut self) -> Result<(), ClientError> {
        let (momentary, toggle, timed) = self.state().button_mode_masks();
        self.conn.request(Frame::request(
            Command::SetButtonMode,
            momentary,
            toggle,
            timed,
        ))
    }

    pub fn relay(&mut self, index: usize) -> Result<RelayHandle<'_, T>, ClientError> {
        if index >= CHANNELS {
            return Err(CoreError::InvalidRelay(index).into());
        }
        Ok(RelayHandle {
            device: self,
            index,
        })
    }

    pub fn button(&mut self, index: usize) -> Result<ButtonHandle<'_, T>, ClientError> {
        if index >= CHANNELS {
            return Err(CoreError::InvalidButton(index).into());
        }
        Ok(ButtonHandle {
            device: self,
            index,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.conn.is_closed()
    }

    /// Closes the transport. Dropping the device does the same.
    pub fn close(&mut self) -> Result<(), ClientError> {
        self.conn.close()
    }
}

/// One relay of a [`K8090`].
pub struct RelayHandle<'a, T: Transport> {
    device: &'a mut K8090<T>,
    index: usize,
}

impl<T: Transport> RelayHandle<'_, T> {
    fn mask(&self) -> u8 {
        1 << self.index
    }

    fn command(&mut self, command: Command, seconds: u16) -> Result<(), ClientError> {
        let frame = Frame::with_seconds(command, self.mask(), seconds);
        self.device.conn.request(frame)
    }

    /// The cached relay. No I/O.
    pub fn state(&self) -> &Relay {
        &self.device.state().relays()[self.index]
    }

    pub fn id(&self) -> u8 {
        self.state().id()
    }

    pub fn is_on(&self) -> bool {
        self.state().is_on()
    }

    pub fn timer_active(&self) -> bool {
        self.state().timer_active()
    }

    pub fn delay(&self) -> u16 {
        self.state().delay()
    }

    pub fn turn_on(&mut self) -> Result<(), ClientError> {
        self.command(Command::RelayOn, 0)
    }

    pub fn turn_off(&mut self) -> Result<(), ClientError> {
        self.command(Command::RelayOff, 0)
    }

    pub fn toggle(&mut self) -> Result<(), ClientError> {
        self.command(Command::RelayToggle, 0)
    }

    /// Switches the relay on for `seconds`. With `None` the board uses the
    /// relay's preset delay.
    pub fn start_timer(&mut self, seconds: Option<u16>) -> Result<(), ClientError> {
        self.command(Command::StartTimer, seconds.unwrap_or(0))
    }

    /// Stores a new preset delay locally and on the board.
    ///
    /// The mirror is updated before the write. If the transport fails, the
    /// mirror holds the new delay while the board keeps the old one until the
    /// next [`K8090::query_timer_delays`].
    pub fn set_delay(&mut self, seconds: u16) -> Result<(), ClientError> {
        if self.device.is_closed() {
            return Err(ClientError::Closed);
        }
        self.device
            .conn
            .state_mut()
            .set_relay_delay(self.index, seconds)?;
        self.command(Command::SetTimerDelay, seconds)
    }
}

/// One button of a [`K8090`].
pub struct ButtonHandle<'a, T: Transport> {
    device: &'a mut K8090<T>,
    index: usize,
}

impl<T: Transport> ButtonHandle<'_, T> {
    /// The cached button. No I/O.
    pub fn state(&self) -> &Button {
        &self.device.state().buttons()[self.index]
    }

    pub fn id(&self) -> u8 {
        self.state().id()
    }

    pub fn mode(&self) -> ButtonMode {
        self.state().mode()
    }

    /// Changes this button's mode, then broadcasts the whole mode table.
    ///
    /// The mirror is updated before the write. If the transport fails, the
    /// mirror holds the new mode while the board keeps the old one until the
    /// next [`K8090::query_button_mode`].
    pub fn set_mode(&mut self, mode: ButtonMode) -> Result<(), ClientError> {
        if self.device.is_closed() {
            return Err(ClientError::Closed);
        }
        self.device
            .conn
            .state_mut()
            .set_button_mode(self.index, mode)?;
        self.device.sync_button_mode()
    }

    /// Syncs, then returns whether the button is held down.
    pub fn pressed(&mut self) -> Result<bool, ClientError> {
        self.device.sync()?;
        Ok(self.state().is_pressed())
    }

    /// Syncs, then returns the last edge seen on the button.
    pub fn action(&mut self) -> Result<ButtonAction, ClientError> {
        self.device.sync()?;
        Ok(self.state().action())
    }
}
