//! Connection management.
//!
//! A [`Connection`] owns the transport and the device mirror. Every command is
//! written, then after the settle delay all pending response packets are read
//! and routed into the mirror. Problems on the receive path never fail the
//! call; they are logged and published as [`Diagnostic`]s.

use crate::config::ConnectionConfig;
use crate::error::ClientError;
use crate::transport::Transport;
use k8090_core::router;
use k8090_core::{DeviceEvent, DeviceState, Diagnostic, Notification};
use k8090_protocol::{Frame, FRAME_SIZE};
use std::io;
use tokio::sync::broadcast;

/// A link to one board, with its mirrored state.
pub struct Connection<T: Transport> {
    config: ConnectionConfig,
    transport: T,
    state: DeviceState,
    notifications: broadcast::Sender<Notification>,
    closed: bool,
}

impl<T: Transport> Connection<T> {
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        let (notifications, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            transport,
            state: DeviceState::new(),
            notifications,
            closed: false,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Subscribes to state changes and receive-path diagnostics.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DeviceState {
        &mut self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Writes one packet without waiting for a response.
    pub fn send(&mut self, frame: Frame) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        let bytes = frame.encode();
        tracing::debug!(bytes = %hex::encode(bytes), "tx {}", frame);
        self.transport.write_all(&bytes)?;
        Ok(())
    }

    /// Waits the settle delay, then drains everything the board has sent.
    pub fn sync(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.drain();
        Ok(())
    }

    /// Sends a packet and syncs.
    pub fn request(&mut self, frame: Frame) -> Result<(), ClientError> {
        self.send(frame)?;
        self.sync()
    }

    /// Reads and routes every pending packet. Returns the number of packets
    /// applied to the mirror.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;

        loop {
            match self.transport.bytes_available() {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    self.diagnose(Diagnostic::ReadFailed {
                        message: e.to_string(),
                    });
                    break;
                }
            }

            let packet = match self.read_packet() {
                Ok(packet) => packet,
                Err(e) => {
                    self.diagnose(Diagnostic::ReadFailed {
                        message: e.to_string(),
                    });
                    break;
                }
            };
            if packet.is_empty() {
                // The transport announced bytes it could not deliver.
                break;
            }

            if self.handle_packet(&packet) {
                applied += 1;
            }
        }

        applied
    }

    /// Reads up to one packet. Short reads are retried until the transport
    /// returns nothing or times out.
    fn read_packet(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = [0u8; FRAME_SIZE];
        let mut filled = 0;

        while filled < FRAME_SIZE {
            match self.transport.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(buf[..filled].to_vec())
    }

    fn handle_packet(&mut self, packet: &[u8]) -> bool {
        tracing::debug!(bytes = %hex::encode(packet), "rx {} bytes", packet.len());

        let frame = match Frame::decode(packet) {
            Ok(frame) => frame,
            Err(e) => {
                self.diagnose(Diagnostic::from(&e));
                return false;
            }
        };

        if !Frame::has_markers(packet) {
            self.diagnose(Diagnostic::BadMarkers {
                start: packet[0],
                end: packet[FRAME_SIZE - 1],
            });
        }

        match router::route(&mut self.state, &frame) {
            Ok(events) => {
                for event in events {
                    self.publish(event);
                }
                true
            }
            Err(e) => {
                self.diagnose(Diagnostic::from(&e));
                false
            }
        }
    }

    fn publish(&self, event: DeviceEvent) {
        tracing::debug!(?event, "state changed");
        // No subscribers is fine.
        let _ = self.notifications.send(Notification::Event(event));
    }

    fn diagnose(&self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        let _ = self.notifications.send(Notification::Diagnostic(diagnostic));
    }

    /// Closes the transport. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), ClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.transport.close()?;
        tracing::info!("Connection to {} closed", self.config.port);
        Ok(())
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Error closing connection: {}", e);
        }
    }
}
