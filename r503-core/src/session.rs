//! Session state for one module
//!
//! A session tracks:
//! - Module address (frames are stamped with it)
//! - Handshake password
//! - Negotiated data packet size
//! - Connection state

use r503_types::PacketSize;

use crate::{
    constants::{DEFAULT_ADDRESS, DEFAULT_PASSWORD},
    error::{Error, Result},
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport closed
    Disconnected,

    /// Transport open, password not yet verified
    Connected,

    /// Password accepted; ready for commands
    Verified,
}

/// Session owned by a single device handle
#[derive(Debug, Clone)]
pub struct Session {
    address: u32,
    password: u32,
    packet_size: PacketSize,
    state: SessionState,
}

impl Session {
    /// Create a disconnected session with factory defaults
    pub fn new() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            packet_size: PacketSize::default(),
            state: SessionState::Disconnected,
        }
    }

    pub fn address(&self) -> u32 {
        self.address
    }

    pub fn password(&self) -> u32 {
        self.password
    }

    pub fn packet_size(&self) -> PacketSize {
        self.packet_size
    }

    /// Largest data chunk for the negotiated packet size
    pub fn max_payload_size(&self) -> usize {
        self.packet_size.bytes()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self.state, SessionState::Disconnected)
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, SessionState::Verified)
    }

    pub fn set_address(&mut self, address: u32) {
        self.address = address;
    }

    pub fn set_password(&mut self, password: u32) {
        self.password = password;
    }

    pub fn set_packet_size(&mut self, packet_size: PacketSize) {
        self.packet_size = packet_size;
    }

    /// Mark the transport as open
    pub fn open(&mut self) -> Result<()> {
        if self.state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot open from state: {:?}",
                self.state
            )));
        }

        self.state = SessionState::Connected;
        Ok(())
    }

    /// Mark the password as accepted
    pub fn verify(&mut self) -> Result<()> {
        if self.state == SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot verify from state: {:?}",
                self.state
            )));
        }

        self.state = SessionState::Verified;
        Ok(())
    }

    /// Close session; address, password and packet size are kept
    pub fn close(&mut self) {
        self.state = SessionState::Disconnected;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_new() {
        let session = Session::new();
        assert_eq!(session.address(), 0xFFFF_FFFF);
        assert_eq!(session.password(), 0);
        assert_eq!(session.packet_size(), PacketSize::Bytes32);
        assert_eq!(session.max_payload_size(), 32);
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(!session.is_connected());
    }

    #[test]
    fn test_session_open_and_verify() {
        let mut session = Session::new();
        session.open().unwrap();
        assert!(session.is_connected());
        assert!(!session.is_verified());

        session.verify().unwrap();
        assert_eq!(session.state(), SessionState::Verified);

        // Re-verifying after a password change is allowed
        session.verify().unwrap();
    }

    #[test]
    fn test_session_close_keeps_settings() {
        let mut session = Session::new();
        session.set_address(0x1234_5678);
        session.set_packet_size(PacketSize::Bytes128);
        session.open().unwrap();
        session.verify().unwrap();

        session.close();

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(session.address(), 0x1234_5678);
        assert_eq!(session.max_payload_size(), 128);
    }

    #[test]
    fn test_invalid_state_transitions() {
        let mut session = Session::new();

        // Cannot verify without opening
        assert!(session.verify().is_err());

        // Cannot open twice
        session.open().unwrap();
        assert!(session.open().is_err());
    }
}
