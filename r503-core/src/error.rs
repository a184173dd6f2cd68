//! Error types for r503-core

/// Result type alias for r503 protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not even the fixed header fields are present
    #[error("Packet too short: expected at least {expected} bytes, got {actual} bytes")]
    PacketTooShort {
        expected: usize,
        actual: usize,
    },

    /// Fewer bytes than the declared length
    #[error("Truncated frame: declared {expected} bytes, got {actual} bytes")]
    TruncatedFrame {
        expected: usize,
        actual: usize,
    },

    /// Start code is not 0xEF01
    #[error("Invalid header: 0x{0:04X}")]
    InvalidHeader(u16),

    /// Packet identifier outside command/data/ack/end
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Length field cannot describe a valid frame
    #[error("Invalid length field: {0}")]
    InvalidLength(u16),

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown instruction code
    #[error("Unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },

    /// Caller supplied a value the module does not accept
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),
}

impl Error {
    /// True for errors raised while parsing bytes received from the module
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::PacketTooShort { .. }
                | Self::TruncatedFrame { .. }
                | Self::InvalidHeader(_)
                | Self::UnknownPacketType(_)
                | Self::InvalidLength(_)
                | Self::ChecksumMismatch { .. }
        )
    }

    /// True when the request was refused locally and nothing was sent
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_) | Self::PayloadTooLarge { .. }
        )
    }
}
