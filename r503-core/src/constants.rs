//! Protocol constants

use std::time::Duration;

/// Start code carried by every packet (high byte first)
pub const HEADER: u16 = 0xEF01;

/// Broadcast address the module answers to out of the box
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Factory handshake password
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/// Factory serial speed
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Per-command reply timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Reply timeout for bulk uploads
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to listen for a rejection after each downloaded data packet
pub const DEFAULT_CHUNK_ACK_WINDOW: Duration = Duration::from_millis(20);

/// Status reported for a command that got no reply at all.
///
/// Never produced by the module itself; it only exists so a missing reply
/// can be rendered as a number next to real confirmation codes.
pub const NO_RESPONSE_STATUS: u8 = 99;

/// Character buffers used for feature extraction and template merging
pub mod buffers {
    pub const CHAR_BUFFER_1: u8 = 1;
    pub const CHAR_BUFFER_2: u8 = 2;

    /// Highest buffer id accepted during multi-sample enrollment
    pub const MAX_ENROLL_BUFFER: u8 = 6;
}

/// `SetSysPara` register numbers
pub mod sys_param {
    pub const BAUD_RATE: u8 = 4;
    pub const SECURITY_LEVEL: u8 = 5;
    pub const PACKET_SIZE: u8 = 6;

    pub const MIN_SECURITY_LEVEL: u8 = 1;
    pub const MAX_SECURITY_LEVEL: u8 = 5;
}

/// Template index table geometry
pub mod index {
    /// Bytes per index page
    pub const PAGE_LEN: usize = 32;

    /// Slots covered by one page
    pub const SLOTS_PER_PAGE: u16 = 256;

    /// Highest page number `ReadIndexTable` accepts
    pub const MAX_PAGE: u8 = 3;
}

/// Notepad geometry
pub mod notepad {
    pub const PAGE_LEN: usize = 32;
    pub const MAX_PAGE: u8 = 15;
}

/// Aura LED modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedMode {
    Breathing = 0x01,
    Flashing = 0x02,
    On = 0x03,
    Off = 0x04,
    GraduallyOn = 0x05,
    GraduallyOff = 0x06,
}

/// Aura LED colours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LedColor {
    Red = 0x01,
    Blue = 0x02,
    Purple = 0x03,
}
