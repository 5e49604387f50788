//! Byte transport to the board.

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Raw byte I/O the driver needs from a link to the board.
///
/// Implementations must not reorder bytes. `read` may return fewer bytes than
/// requested, or fail with [`io::ErrorKind::TimedOut`] once the configured
/// read timeout expires.
pub trait Transport: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Number of received bytes waiting to be read.
    fn bytes_available(&mut self) -> io::Result<usize>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Releases the link. Calling it again is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port closed")
}

/// A serial port (USB CDC on the K8090), opened 8N1 without flow control.
pub struct SerialTransport {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialTransport {
    pub fn open(
        name: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, serialport::Error> {
        tracing::debug!("Opening {} at {} baud", name, baud_rate);

        let port = serialport::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        Ok(Self {
            name: name.to_string(),
            port: Some(port),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(not_connected)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        Write::write_all(port, bytes)?;
        port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port()?.bytes_to_read()?;
        Ok(pending as usize)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self.port()?, buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            tracing::debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
