//! High-level device interface

use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use r503_core::{
    constants::{
        DEFAULT_CHUNK_ACK_WINDOW, DEFAULT_TIMEOUT, DEFAULT_TRANSFER_TIMEOUT,
    },
    Command, Frame, Session,
};
use r503_transport::{SerialTransport, Transport};
use r503_types::PacketSize;

use crate::{
    error::{Error, Result},
    reply::Reply,
};

/// R503 fingerprint module
///
/// High-level interface for one module on one serial link. Every call takes
/// `&mut self`: a command is written, its reply is read, and only then can
/// the next command go out.
///
/// # Examples
///
/// ```no_run
/// use r503::Device;
///
/// fn main() -> r503::Result<()> {
///     let mut device = Device::new("/dev/ttyUSB0", 57_600);
///
///     device.connect()?;
///     println!("Connected!");
///
///     let count = device.template_count()?;
///     println!("Templates: {:?}", count);
///
///     device.disconnect()?;
///     Ok(())
/// }
/// ```
pub struct Device {
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) session: Session,
    pub(crate) timeout: Duration,
    pub(crate) transfer_timeout: Duration,
    pub(crate) chunk_ack_window: Duration,
}

impl Device {
    /// Create a device on a serial port
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self::with_transport(SerialTransport::new(port_name, baud_rate))
    }

    /// Create a device on any transport
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
            session: Session::new(),
            timeout: DEFAULT_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            chunk_ack_window: DEFAULT_CHUNK_ACK_WINDOW,
        }
    }

    /// Set module address (default: 0xFFFFFFFF)
    pub fn with_address(mut self, address: u32) -> Self {
        self.session.set_address(address);
        self
    }

    /// Set handshake password (default: 0)
    pub fn with_password(mut self, password: u32) -> Self {
        self.session.set_password(password);
        self
    }

    /// Set command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout for bulk uploads
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set how long to wait for a rejection after each downloaded chunk
    pub fn with_chunk_ack_window(mut self, window: Duration) -> Self {
        self.chunk_ack_window = window;
        self
    }

    /// Set data packet size, when it is already known
    pub fn with_packet_size(mut self, packet_size: PacketSize) -> Self {
        self.session.set_packet_size(packet_size);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn address(&self) -> u32 {
        self.session.address()
    }

    pub fn packet_size(&self) -> PacketSize {
        self.session.packet_size()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.session.is_connected() && self.transport.is_connected()
    }

    /// Open the link and verify the password
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The port cannot be opened
    /// - The module doesn't respond (`NoResponse`)
    /// - The password is rejected (`AuthenticationFailed`)
    ///
    /// The link is closed again on every error after it was opened.
    pub fn connect(&mut self) -> Result<()> {
        info!("Connecting to {}...", self.transport.port_name());

        self.transport.connect()?;
        self.session.open()?;

        let password = self.session.password();
        let outcome = self.verify_password(password);

        match outcome {
            Ok(Reply::Success(())) => {
                info!(
                    "Connected (address=0x{:08X})",
                    self.session.address()
                );
                Ok(())
            }
            Ok(Reply::Rejected(code)) => {
                warn!("Password rejected: {}", code);
                self.close();
                Err(Error::AuthenticationFailed(code))
            }
            Ok(Reply::NoResponse) => {
                warn!("No reply to password verification");
                self.close();
                Err(Error::NoResponse)
            }
            Err(e) => {
                self.close();
                Err(e)
            }
        }
    }

    /// Close the link
    pub fn disconnect(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            self.session.close();
            return Ok(());
        }

        info!("Disconnecting from {}...", self.transport.port_name());

        self.session.close();
        self.transport.disconnect()?;

        info!("Disconnected");
        Ok(())
    }

    /// Send a command and read its reply with the default timeout
    pub fn send_command(&mut self, command: &Command) -> Result<Reply<Bytes>> {
        self.send_command_with_timeout(command, self.timeout)
    }

    /// Send a command and read its reply
    ///
    /// Exactly one write and one read. Parameters are validated before
    /// anything is written.
    pub fn send_command_with_timeout(
        &mut self,
        command: &Command,
        timeout: Duration,
    ) -> Result<Reply<Bytes>> {
        let frame = command.to_frame(self.session.address())?;
        frame.validate()?;
        self.ensure_connected()?;

        debug!("Sending {}", command.opcode());
        self.write_frame(&frame)?;

        let reply = self.read_reply(timeout)?;
        match &reply {
            Reply::Success(body) => debug!("{} ok ({} bytes)", command.opcode(), body.len()),
            Reply::Rejected(code) => debug!("{} rejected: {}", command.opcode(), code),
            Reply::NoResponse => debug!("{} got no reply", command.opcode()),
        }

        Ok(reply)
    }

    // Helper methods

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        Ok(())
    }

    pub(crate) fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        trace!("Sending: {:?}", frame);

        let data = frame.encode();
        self.transport.send(&data)?;

        Ok(())
    }

    /// One bounded read interpreted as an ack
    pub(crate) fn read_reply(&mut self, timeout: Duration) -> Result<Reply<Bytes>> {
        let buf = self.transport.receive(Frame::MAX_FRAME_SIZE, timeout)?;
        if buf.is_empty() {
            return Ok(Reply::NoResponse);
        }

        let frame = Frame::decode(&buf)?;
        trace!("Received: {:?}", frame);

        self.interpret(&frame)
    }

    /// Turn an ack frame into a reply
    pub(crate) fn interpret(&self, frame: &Frame) -> Result<Reply<Bytes>> {
        if !frame.is_ack() {
            return Err(Error::UnexpectedPacket(format!(
                "expected ACK, got {}",
                frame.packet_type
            )));
        }

        if frame.address != self.session.address() {
            warn!(
                "Reply from address 0x{:08X}, expected 0x{:08X}",
                frame.address,
                self.session.address()
            );
        }

        let code = frame
            .confirmation()
            .ok_or_else(|| Error::UnexpectedPacket("ACK without confirmation code".into()))?;

        if code.is_success() {
            Ok(Reply::Success(frame.body()))
        } else {
            Ok(Reply::Rejected(code))
        }
    }

    fn close(&mut self) {
        self.session.close();
        if let Err(e) = self.transport.disconnect() {
            warn!("Failed to close {}: {}", self.transport.port_name(), e);
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if self.transport.is_connected() {
            debug!("Closing {} on drop", self.transport.port_name());
            self.close();
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use bytes::BytesMut;
    use r503_core::Frame;
    use r503_transport::MemoryTransport;
    use r503_types::ConfirmationCode;

    use super::*;

    pub const ADDRESS: u32 = 0xFFFF_FFFF;

    /// Encoded ack from the default address
    pub fn ack(code: ConfirmationCode, body: &[u8]) -> BytesMut {
        Frame::ack(ADDRESS, code, body).encode()
    }

    pub fn ok(body: &[u8]) -> BytesMut {
        ack(ConfirmationCode::SUCCESS, body)
    }

    /// Device on a memory transport, already past password verification
    pub fn connected() -> (Device, MemoryTransport) {
        let probe = MemoryTransport::new();
        probe.push_response(ok(&[]));

        let mut device = Device::with_transport(probe.clone())
            .with_timeout(Duration::from_millis(10))
            .with_transfer_timeout(Duration::from_millis(10))
            .with_chunk_ack_window(Duration::from_millis(1));
        device.connect().unwrap();
        probe.clear_written();

        (device, probe)
    }

    /// Decode everything written since the last clear
    pub fn sent_frames(probe: &MemoryTransport) -> Vec<Frame> {
        probe
            .written()
            .iter()
            .map(|bytes| Frame::decode_verified(bytes).unwrap())
            .collect()
    }
}
