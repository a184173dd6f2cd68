//! System status and configuration (`ReadSysPara`)

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Multiplier applied to the baud divisor stored on the module
pub const BAUD_UNIT: u32 = 9600;

/// Largest baud divisor the module accepts (115200 baud)
pub const MAX_BAUD_DIVISOR: u32 = 12;

/// Data packet content size
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum PacketSize {
    #[default]
    Bytes32 = 0,
    Bytes64 = 1,
    Bytes128 = 2,
    Bytes256 = 3,
}

impl PacketSize {
    /// Decode the size code reported by the module
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(Self::Bytes32),
            1 => Ok(Self::Bytes64),
            2 => Ok(Self::Bytes128),
            3 => Ok(Self::Bytes256),
            _ => Err(Error::Validation(format!("unknown packet size code {}", code))),
        }
    }

    /// Look up the size for a byte count (32, 64, 128 or 256)
    pub fn from_bytes(bytes: usize) -> Result<Self> {
        match bytes {
            32 => Ok(Self::Bytes32),
            64 => Ok(Self::Bytes64),
            128 => Ok(Self::Bytes128),
            256 => Ok(Self::Bytes256),
            _ => Err(Error::Validation(format!(
                "packet size must be 32, 64, 128 or 256 bytes, got {}",
                bytes
            ))),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn bytes(self) -> usize {
        32 << (self as usize)
    }
}

impl fmt::Display for PacketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.bytes())
    }
}

/// Baud divisor for `baud_rate`, if the module supports that rate
pub fn baud_divisor(baud_rate: u32) -> Option<u8> {
    if baud_rate == 0 || baud_rate % BAUD_UNIT != 0 {
        return None;
    }
    let divisor = baud_rate / BAUD_UNIT;
    (divisor <= MAX_BAUD_DIVISOR).then_some(divisor as u8)
}

bitflags! {
    /// Status register bits
    ///
    /// Bit positions follow the datasheet: bit 0 is `Busy`, bit 1 `Pass`,
    /// bit 2 `PWD`, bit 3 `ImgBufStat`.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u16 {
        /// Module is executing a command
        const BUSY = 1 << 0;
        /// A matching finger was found
        const PASS = 1 << 1;
        /// Handshake password was verified
        const PASSWORD_VERIFIED = 1 << 2;
        /// Image buffer holds a valid image
        const IMAGE_BUFFER_VALID = 1 << 3;
    }
}

/// Basic parameter list returned by `ReadSysPara`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    pub status: StatusRegister,
    pub system_id: u16,
    pub library_capacity: u16,
    /// Security level (1-5)
    pub security_level: u16,
    pub device_address: u32,
    pub packet_size: PacketSize,
    /// Baud rate in bits per second (divisor × 9600)
    pub baud_rate: u32,
}

impl SystemParameters {
    /// Encoded size of the parameter list
    pub const ENCODED_LEN: usize = 16;

    /// Parse the 16-byte parameter list
    ///
    /// ```text
    /// status(2) system_id(2) capacity(2) security(2) address(4) packet_size(2) baud(2)
    /// ```
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(Error::Parse(format!(
                "system parameters need {} bytes, got {}",
                Self::ENCODED_LEN,
                buf.len()
            )));
        }

        Ok(Self {
            status: StatusRegister::from_bits_retain(BigEndian::read_u16(&buf[0..2])),
            system_id: BigEndian::read_u16(&buf[2..4]),
            library_capacity: BigEndian::read_u16(&buf[4..6]),
            security_level: BigEndian::read_u16(&buf[6..8]),
            device_address: BigEndian::read_u32(&buf[8..12]),
            packet_size: PacketSize::from_code(BigEndian::read_u16(&buf[12..14]))?,
            baud_rate: u32::from(BigEndian::read_u16(&buf[14..16])) * BAUD_UNIT,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.status.contains(StatusRegister::BUSY)
    }

    /// Only a hint; always check the reply of the matching command itself.
    pub fn has_match(&self) -> bool {
        self.status.contains(StatusRegister::PASS)
    }

    pub fn password_verified(&self) -> bool {
        self.status.contains(StatusRegister::PASSWORD_VERIFIED)
    }

    pub fn has_valid_image(&self) -> bool {
        self.status.contains(StatusRegister::IMAGE_BUFFER_VALID)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> [u8; 16] {
        [
            0x00, 0x05, // busy + password verified
            0x00, 0x09, // system id
            0x00, 0xC8, // capacity 200
            0x00, 0x03, // security level
            0xFF, 0xFF, 0xFF, 0xFF, // address
            0x00, 0x02, // 128 bytes
            0x00, 0x06, // 57600 baud
        ]
    }

    #[test]
    fn test_parse_system_parameters() {
        let params = SystemParameters::parse(&sample()).unwrap();

        assert_eq!(
            params,
            SystemParameters {
                status: StatusRegister::BUSY | StatusRegister::PASSWORD_VERIFIED,
                system_id: 9,
                library_capacity: 200,
                security_level: 3,
                device_address: 0xFFFF_FFFF,
                packet_size: PacketSize::Bytes128,
                baud_rate: 57_600,
            }
        );
        assert!(params.is_busy());
        assert!(!params.has_match());
        assert!(params.password_verified());
        assert!(!params.has_valid_image());
    }

    #[test]
    fn test_status_bits_are_independent() {
        let mut raw = sample();
        raw[1] = 0b1010;
        let params = SystemParameters::parse(&raw).unwrap();

        assert!(!params.is_busy());
        assert!(params.has_match());
        assert!(!params.password_verified());
        assert!(params.has_valid_image());
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            SystemParameters::parse(&[0u8; 15]),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_packet_size() {
        let mut raw = sample();
        raw[13] = 7;
        assert!(matches!(
            SystemParameters::parse(&raw),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_packet_size_mapping() {
        assert_eq!(PacketSize::from_code(0).unwrap().bytes(), 32);
        assert_eq!(PacketSize::from_code(1).unwrap().bytes(), 64);
        assert_eq!(PacketSize::from_code(2).unwrap().bytes(), 128);
        assert_eq!(PacketSize::from_code(3).unwrap().bytes(), 256);
        assert_eq!(PacketSize::from_bytes(64).unwrap(), PacketSize::Bytes64);
        assert!(PacketSize::from_bytes(100).is_err());
        assert_eq!(PacketSize::default(), PacketSize::Bytes32);
    }

    #[test]
    fn test_baud_divisor() {
        assert_eq!(baud_divisor(9600), Some(1));
        assert_eq!(baud_divisor(57_600), Some(6));
        assert_eq!(baud_divisor(115_200), Some(12));
        assert_eq!(baud_divisor(0), None);
        assert_eq!(baud_divisor(14_400), None);
        assert_eq!(baud_divisor(124_800), None);
    }
}
