//! Protocol frame structure and encoding/decoding

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use r503_types::ConfirmationCode;

use crate::{
    checksum,
    constants::HEADER,
    error::{Error, Result},
    opcode::Opcode,
};

/// Packet identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Command packet (host to module)
    Command = 0x01,

    /// Data packet; never appears alone, always follows a command or ack
    Data = 0x02,

    /// Acknowledge packet (module to host)
    Ack = 0x07,

    /// Last data packet of a transfer
    End = 0x08,
}

impl PacketType {
    pub fn name(self) -> &'static str {
        match self {
            Self::Command => "COMMAND",
            Self::Data => "DATA",
            Self::Ack => "ACK",
            Self::End => "END",
        }
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> u8 {
        packet_type as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::End),
            _ => Err(Error::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Protocol frame
///
/// # Frame Structure
///
/// ```text
/// ┌──────────┬───────────┬───────────┬───────────┬─────────────┬───────────┐
/// │  Header  │  Address  │   Type    │  Length   │   Payload   │ Checksum  │
/// │ 2 bytes  │  4 bytes  │  1 byte   │  2 bytes  │   N bytes   │  2 bytes  │
/// │  0xEF01  │ (BE u32)  │           │ (N + 2)   │             │ (BE u16)  │
/// └──────────┴───────────┴───────────┴───────────┴─────────────┴───────────┘
/// ```
///
/// All multi-byte values are big-endian. The checksum covers type, length and
/// payload. A command payload starts with the opcode; an ack payload starts
/// with the confirmation code.
///
/// # Examples
///
/// ```
/// use r503_core::{Frame, Opcode};
///
/// let frame = Frame::command(0xFFFF_FFFF, Opcode::HandShake, &[]);
/// let encoded = frame.encode();
///
/// let decoded = Frame::decode(&encoded).unwrap();
/// assert_eq!(decoded.opcode(), Some(0x40));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Module address
    pub address: u32,

    /// Packet identifier
    pub packet_type: PacketType,

    /// Packet content (opcode/confirmation code included)
    pub payload: Bytes,

    /// Checksum as carried on the wire
    pub checksum: u16,
}

impl Frame {
    /// Header + address + type + length
    pub const PREAMBLE_SIZE: usize = 9;

    pub const CHECKSUM_SIZE: usize = 2;

    /// Largest payload any packet size allows
    pub const MAX_PAYLOAD_SIZE: usize = 256;

    pub const MAX_FRAME_SIZE: usize =
        Self::PREAMBLE_SIZE + Self::MAX_PAYLOAD_SIZE + Self::CHECKSUM_SIZE;

    /// Create a frame; the checksum is computed from the content
    pub fn new(address: u32, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        let length = (payload.len() + Self::CHECKSUM_SIZE) as u16;
        let checksum = checksum::calculate(packet_type.into(), length, &payload);

        Self {
            address,
            packet_type,
            payload,
            checksum,
        }
    }

    /// Command packet: `opcode ‖ params`
    ///
    /// # Examples
    ///
    /// ```
    /// use r503_core::{Frame, Opcode};
    ///
    /// let frame = Frame::command(0xFFFF_FFFF, Opcode::VfyPwd, &[0, 0, 0, 0]);
    /// assert_eq!(frame.length(), 7);
    /// ```
    pub fn command(address: u32, opcode: Opcode, params: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(1 + params.len());
        payload.put_u8(opcode.into());
        payload.put_slice(params);
        Self::new(address, PacketType::Command, payload.freeze())
    }

    /// Intermediate data packet
    pub fn data(address: u32, chunk: impl Into<Bytes>) -> Self {
        Self::new(address, PacketType::Data, chunk)
    }

    /// Final data packet
    pub fn end(address: u32, chunk: impl Into<Bytes>) -> Self {
        Self::new(address, PacketType::End, chunk)
    }

    /// Acknowledge packet: `code ‖ body`
    pub fn ack(address: u32, code: ConfirmationCode, body: &[u8]) -> Self {
        let mut payload = BytesMut::with_capacity(1 + body.len());
        payload.put_u8(code.value());
        payload.put_slice(body);
        Self::new(address, PacketType::Ack, payload.freeze())
    }

    /// Length field value (payload + checksum)
    pub fn length(&self) -> u16 {
        (self.payload.len() + Self::CHECKSUM_SIZE) as u16
    }

    /// Checksum computed from the frame content
    pub fn expected_checksum(&self) -> u16 {
        checksum::calculate(self.packet_type.into(), self.length(), &self.payload)
    }

    /// Whether the carried checksum matches the content
    pub fn is_checksum_valid(&self) -> bool {
        checksum::verify(
            self.packet_type.into(),
            self.length(),
            &self.payload,
            self.checksum,
        )
    }

    /// Reject frames the module could not accept
    pub fn validate(&self) -> Result<()> {
        if self.payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: self.payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }
        Ok(())
    }

    /// Encode frame to bytes
    ///
    /// The checksum is recomputed from the content.
    ///
    /// # Examples
    ///
    /// ```
    /// use r503_core::{Frame, Opcode};
    ///
    /// let bytes = Frame::command(0xFFFF_FFFF, Opcode::GenImg, &[]).encode();
    /// assert_eq!(&bytes[..], &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]);
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.encoded_len());

        buf.put_u16(HEADER);
        buf.put_u32(self.address);
        buf.put_u8(self.packet_type.into());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.expected_checksum());

        buf
    }

    /// Total size on the wire
    pub fn encoded_len(&self) -> usize {
        Self::PREAMBLE_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }

    /// Decode one frame from the start of `buf`
    ///
    /// Bytes after the frame are ignored. The checksum is kept but not
    /// verified; see [`decode_verified`](Self::decode_verified).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the fixed fields (9 bytes)
    /// - Start code is not 0xEF01
    /// - Packet type is unknown
    /// - Length field is out of range
    /// - Fewer bytes are present than the length field declares
    pub fn decode(buf: &[u8]) -> Result<Self> {
        Self::decode_prefix(buf).map(|(frame, _)| frame)
    }

    /// Decode one frame and check its checksum
    pub fn decode_verified(buf: &[u8]) -> Result<Self> {
        let frame = Self::decode(buf)?;

        if !frame.is_checksum_valid() {
            return Err(Error::ChecksumMismatch {
                expected: frame.expected_checksum(),
                received: frame.checksum,
            });
        }

        Ok(frame)
    }

    /// Split a byte stream holding back-to-back frames
    ///
    /// Every frame must start with the header; a partial trailing frame is an
    /// error.
    pub fn decode_stream(mut buf: &[u8]) -> Result<Vec<Self>> {
        let mut frames = Vec::new();

        while !buf.is_empty() {
            let (frame, consumed) = Self::decode_prefix(buf)?;
            frames.push(frame);
            buf = &buf[consumed..];
        }

        Ok(frames)
    }

    fn decode_prefix(buf: &[u8]) -> Result<(Self, usize)> {
        if buf.len() < Self::PREAMBLE_SIZE {
            return Err(Error::PacketTooShort {
                expected: Self::PREAMBLE_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = buf;
        let header = cursor.get_u16();
        if header != HEADER {
            return Err(Error::InvalidHeader(header));
        }

        let address = cursor.get_u32();
        let packet_type = PacketType::try_from(cursor.get_u8())?;
        let length = cursor.get_u16();

        let max_length = (Self::MAX_PAYLOAD_SIZE + Self::CHECKSUM_SIZE) as u16;
        if !(Self::CHECKSUM_SIZE as u16..=max_length).contains(&length) {
            return Err(Error::InvalidLength(length));
        }

        let total = Self::PREAMBLE_SIZE + usize::from(length);
        if buf.len() < total {
            return Err(Error::TruncatedFrame {
                expected: total,
                actual: buf.len(),
            });
        }

        let payload_len = usize::from(length) - Self::CHECKSUM_SIZE;
        let payload = Bytes::copy_from_slice(&cursor[..payload_len]);
        cursor.advance(payload_len);
        let checksum = cursor.get_u16();

        let frame = Self {
            address,
            packet_type,
            payload,
            checksum,
        };

        Ok((frame, total))
    }

    /// First payload byte of a command frame
    pub fn opcode(&self) -> Option<u8> {
        match self.packet_type {
            PacketType::Command => self.payload.first().copied(),
            _ => None,
        }
    }

    /// First payload byte of an ack frame
    pub fn confirmation(&self) -> Option<ConfirmationCode> {
        match self.packet_type {
            PacketType::Ack => self.payload.first().copied().map(ConfirmationCode::from),
            _ => None,
        }
    }

    /// Payload after the leading opcode/confirmation byte; whole payload for data frames
    pub fn body(&self) -> Bytes {
        match self.packet_type {
            PacketType::Command | PacketType::Ack if !self.payload.is_empty() => {
                self.payload.slice(1..)
            }
            PacketType::Command | PacketType::Ack => Bytes::new(),
            PacketType::Data | PacketType::End => self.payload.clone(),
        }
    }

    pub fn is_ack(&self) -> bool {
        self.packet_type == PacketType::Ack
    }

    pub fn is_end(&self) -> bool {
        self.packet_type == PacketType::End
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("address", &format!("0x{:08X}", self.address))
            .field("packet_type", &self.packet_type)
            .field("length", &self.length())
            .field("checksum", &format!("0x{:04X}", self.checksum))
            .field("payload", &hex::encode_upper(&self.payload[..self.payload.len().min(16)]))
            .finish()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Frame[{}](address=0x{:08X}, len={})",
            self.packet_type,
            self.address,
            self.payload.len()
        )
    }
}
