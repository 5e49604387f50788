//! In-memory K8090 for tests and dry runs.
//!
//! [`SimulatedBoard`] is a [`Transport`] that behaves like the real card: it
//! parses every packet the host writes and queues the packets the card would
//! answer with. A [`BoardHandle`] shares the same board so the other side of
//! the link can be driven from outside (pressing buttons, expiring timers,
//! injecting garbage).

use crate::transport::Transport;
use k8090_core::{ButtonMode, DEFAULT_DELAY_SECS};
use k8090_protocol::{Command, Frame, Response, CHANNELS, FRAME_SIZE, STX};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// Firmware version reported unless overridden (2012, week 46).
pub const SIMULATED_FIRMWARE: (u16, u8) = (2012, 46);

#[derive(Debug)]
struct Board {
    relays: u8,
    timers: u8,
    delays: [u16; CHANNELS],
    modes: [ButtonMode; CHANNELS],
    pressed: u8,
    jumper: bool,
    firmware: (u16, u8),
    /// Bytes written by the host, not yet parsed.
    inbox: Vec<u8>,
    /// Bytes queued for the host.
    outbox: VecDeque<u8>,
    received: Vec<Frame>,
    closed: bool,
    close_calls: usize,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            relays: 0,
            timers: 0,
            delays: [DEFAULT_DELAY_SECS; CHANNELS],
            modes: [ButtonMode::Toggle; CHANNELS],
            pressed: 0,
            jumper: false,
            firmware: SIMULATED_FIRMWARE,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            received: Vec::new(),
            closed: false,
            close_calls: 0,
        }
    }
}

impl Board {
    fn receive(&mut self, bytes: &[u8]) {
        self.inbox.extend_from_slice(bytes);

        loop {
            // Resynchronize on the start marker.
            match self.inbox.iter().position(|&b| b == STX) {
                Some(0) => {}
                Some(skip) => {
                    self.inbox.drain(..skip);
                }
                None => {
                    self.inbox.clear();
                    return;
                }
            }
            if self.inbox.len() < FRAME_SIZE {
                return;
            }

            let packet: Vec<u8> = self.inbox.drain(..FRAME_SIZE).collect();
            match Frame::decode(&packet) {
                Ok(frame) => {
                    self.received.push(frame);
                    self.execute(frame);
                }
                Err(e) => tracing::trace!("simulated board dropped packet: {}", e),
            }
        }
    }

    fn execute(&mut self, frame: Frame) {
        let Some(command) = frame.known_command() else {
            return;
        };
        let mask = frame.mask;

        match command {
            Command::RelayOn => self.switch(self.relays | mask, self.timers),
            Command::RelayOff => self.switch(self.relays & !mask, self.timers & !mask),
            Command::RelayToggle => {
                let relays = self.relays ^ mask;
                self.switch(relays, self.timers & relays)
            }
            Command::QueryRelayStatus => self.send(Response::RelayStatus {
                previous: self.relays,
                on: self.relays,
                timer_active: self.timers,
            }),
            Command::SetButtonMode => {
                for (i, mode) in self.modes.iter_mut().enumerate() {
                    let bit = 1 << i;
                    if frame.mask & bit != 0 {
                        *mode = ButtonMode::Momentary;
                    } else if frame.param1 & bit != 0 {
                        *mode = ButtonMode::Toggle;
                    } else if frame.param2 & bit != 0 {
                        *mode = ButtonMode::Timed;
                    }
                }
            }
            Command::QueryButtonMode => {
                let (momentary, toggle, timed) = self.mode_masks();
                self.send(Response::ButtonMode {
                    momentary,
                    toggle,
                    timed,
                })
            }
            Command::StartTimer => self.switch(self.relays | mask, self.timers | mask),
            Command::SetTimerDelay => {
                let seconds = frame.seconds();
                for (i, delay) in self.delays.iter_mut().enumerate() {
                    if mask & (1 << i) != 0 {
                        *delay = seconds;
                    }
                }
            }
            Command::QueryTimerDelay => {
                // Time does not run here, so remaining equals preset.
                for i in 0..CHANNELS {
                    let bit = 1 << i;
                    if mask & bit != 0 {
                        self.send(Response::TimerDelay {
                            relays: bit,
                            seconds: self.delays[i],
                        });
                    }
                }
            }
            Command::FactoryReset => {
                self.modes = [ButtonMode::Toggle; CHANNELS];
                self.delays = [DEFAULT_DELAY_SECS; CHANNELS];
            }
            Command::QueryJumper => self.send(Response::Jumper { set: self.jumper }),
            Command::QueryFirmwareVersion => {
                let (year, week) = self.firmware;
                self.send(Response::FirmwareVersion { year, week })
            }
        }
    }

    fn mode_masks(&self) -> (u8, u8, u8) {
        let mut masks = (0u8, 0u8, 0u8);
        for (i, mode) in self.modes.iter().enumerate() {
            let bit = 1 << i;
            match mode {
                ButtonMode::Momentary => masks.0 |= bit,
                ButtonMode::Toggle => masks.1 |= bit,
                ButtonMode::Timed => masks.2 |= bit,
            }
        }
        masks
    }

    /// Every relay change is announced with a status packet.
    fn switch(&mut self, relays: u8, timers: u8) {
        let previous = self.relays;
        self.relays = relays;
        self.timers = timers;
        self.send(Response::RelayStatus {
            previous,
            on: relays,
            timer_active: timers,
        });
    }

    fn send(&mut self, response: Response) {
        self.outbox.extend(response.to_frame().encode());
    }

    fn press(&mut self, index: usize) {
        let bit = 1 << index;
        self.pressed |= bit;
        self.send(Response::ButtonStatus {
            pressed: self.pressed,
            just_pressed: bit,
            just_released: 0,
        });

        if self.jumper {
            return;
        }
        match self.modes[index] {
            ButtonMode::Momentary => self.switch(self.relays | bit, self.timers),
            ButtonMode::Toggle => {
                let relays = self.relays ^ bit;
                self.switch(relays, self.timers & relays)
            }
            ButtonMode::Timed => self.switch(self.relays | bit, self.timers | bit),
        }
    }

    fn release(&mut self, index: usize) {
        let bit = 1 << index;
        self.pressed &= !bit;
        self.send(Response::ButtonStatus {
            pressed: self.pressed,
            just_pressed: 0,
            just_released: bit,
        });

        if !self.jumper && self.modes[index] == ButtonMode::Momentary {
            self.switch(self.relays & !bit, self.timers);
        }
    }
}

/// A simulated board, usable anywhere a [`Transport`] is.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBoard {
    board: Arc<Mutex<Board>>,
}

impl SimulatedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a handle to the same board.
    pub fn handle(&self) -> BoardHandle {
        BoardHandle {
            board: self.board.clone(),
        }
    }
}

impl Transport for SimulatedBoard {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut board = self.board.lock();
        if board.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "simulated board closed",
            ));
        }
        board.receive(bytes);
        Ok(())
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.board.lock().outbox.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut board = self.board.lock();
        let n = buf.len().min(board.outbox.len());
        for (slot, byte) in buf.iter_mut().zip(board.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> io::Result<()> {
        let mut board = self.board.lock();
        board.closed = true;
        board.close_calls += 1;
        Ok(())
    }
}

/// The board's side of a [`SimulatedBoard`].
#[derive(Debug, Clone)]
pub struct BoardHandle {
    board: Arc<Mutex<Board>>,
}

impl BoardHandle {
    /// Presses a button (0-7). Unless the event jumper is set, the relay
    /// reacts according to the button's mode.
    pub fn press(&self, button: usize) {
        if button < CHANNELS {
            self.board.lock().press(button);
        }
    }

    pub fn release(&self, button: usize) {
        if button < CHANNELS {
            self.board.lock().release(button);
        }
    }

    /// Ends a running timer: the relay switches off.
    pub fn expire_timer(&self, relay: usize) {
        if relay >= CHANNELS {
            return;
        }
        let mut board = self.board.lock();
        let bit = 1 << relay;
        if board.timers & bit != 0 {
            let (relays, timers) = (board.relays & !bit, board.timers & !bit);
            board.switch(relays, timers);
        }
    }

    pub fn set_jumper(&self, set: bool) {
        self.board.lock().jumper = set;
    }

    pub fn set_firmware(&self, year: u16, week: u8) {
        self.board.lock().firmware = (year, week);
    }

    /// Queues raw bytes for the host, bypassing the encoder.
    pub fn inject(&self, bytes: &[u8]) {
        self.board.lock().outbox.extend(bytes.iter().copied());
    }

    /// Queues a well-formed response packet for the host.
    pub fn inject_response(&self, response: Response) {
        self.board.lock().send(response);
    }

    pub fn relays(&self) -> u8 {
        self.board.lock().relays
    }

    pub fn timers(&self) -> u8 {
        self.board.lock().timers
    }

    pub fn delay(&self, relay: usize) -> Option<u16> {
        self.board.lock().delays.get(relay).copied()
    }

    pub fn mode(&self, button: usize) -> Option<ButtonMode> {
        self.board.lock().modes.get(button).copied()
    }

    /// Every checksum-valid packet the host has sent, oldest first.
    pub fn received(&self) -> Vec<Frame> {
        self.board.lock().received.clone()
    }

    pub fn clear_received(&self) {
        self.board.lock().received.clear();
    }

    /// Bytes queued for the host and not yet read.
    pub fn pending(&self) -> usize {
        self.board.lock().outbox.len()
    }

    pub fn is_closed(&self) -> bool {
        self.board.lock().closed
    }

    /// Number of times the transport side was closed.
    pub fn close_calls(&self) -> usize {
        self.board.lock().close_calls
    }
}
