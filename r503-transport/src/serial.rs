//! Serial transport
//!
//! R503 modules speak 8N1 UART at 57600 baud out of the box. Replies arrive
//! as a burst of bytes; a read is considered complete once the line has been
//! idle for the inter-byte timeout.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    Transport,
};

/// Serial transport for R503 modules
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    port: Option<Box<dyn SerialPort>>,
    inter_byte_timeout: Duration,
}

impl SerialTransport {
    /// Default idle gap that ends a read once data has started
    pub const DEFAULT_INTER_BYTE_TIMEOUT: Duration = Duration::from_millis(20);

    /// Create new serial transport
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            port: None,
            inter_byte_timeout: Self::DEFAULT_INTER_BYTE_TIMEOUT,
        }
    }

    /// Set the idle gap that ends a read
    pub fn with_inter_byte_timeout(mut self, timeout: Duration) -> Self {
        self.inter_byte_timeout = timeout;
        self
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    /// Names of the serial ports present on this machine
    pub fn available_ports() -> Result<Vec<String>> {
        Ok(serialport::available_ports()?
            .into_iter()
            .map(|p| p.port_name)
            .collect())
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidBaudRate(self.baud_rate));
        }

        debug!("Opening {} at {} baud...", self.port_name, self.baud_rate);

        let port = serialport::new(self.port_name.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.inter_byte_timeout)
            .open()?;

        debug!("Opened {}", self.port_name);

        self.port = Some(port);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.port_name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        trace!("TX {} bytes: {}", data.len(), hex::encode_upper(data));

        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<BytesMut> {
        let inter_byte_timeout = self.inter_byte_timeout;
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        let deadline = Instant::now() + timeout;
        let mut buf = BytesMut::with_capacity(max_bytes);
        let mut chunk = [0u8; 256];

        while buf.len() < max_bytes {
            let now = Instant::now();
            if now >= deadline {
                break;
            }

            // Wait for the whole timeout until the first byte, then only
            // for the inter-byte gap.
            let wait = if buf.is_empty() {
                deadline - now
            } else {
                inter_byte_timeout.min(deadline - now)
            };
            port.set_timeout(wait)?;

            let want = (max_bytes - buf.len()).min(chunk.len());
            match port.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        if buf.is_empty() {
            trace!("RX nothing within {:?}", timeout);
        } else {
            trace!("RX {} bytes: {}", buf.len(), hex::encode_upper(&buf));
        }

        Ok(buf)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if baud_rate == 0 {
            return Err(Error::InvalidBaudRate(baud_rate));
        }
        if let Some(port) = self.port.as_mut() {
            port.set_baud_rate(baud_rate)?;
        }

        debug!("{} now at {} baud", self.port_name, baud_rate);
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn port_name(&self) -> String {
        self.port_name.clone()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("{} dropped while open", self.port_name);
        }
    }
}
