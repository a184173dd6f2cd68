//! Typed instructions
//!
//! Each variant carries exactly the parameters its instruction takes, so the
//! packed byte layout is decided in one place.

use bytes::{BufMut, Bytes, BytesMut};

use r503_types::{baud_divisor, PacketSize};

use crate::{
    constants::{LedColor, LedMode, index, notepad, sys_param},
    error::{Error, Result},
    frame::Frame,
    opcode::Opcode,
};

/// Register written by `SetSysPara`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemParameter {
    /// Serial speed in baud; 9600 × n for n in 1..=12
    BaudRate(u32),

    /// Matching threshold, 1 (lowest) to 5 (highest)
    SecurityLevel(u8),

    /// Data packet size in bytes: 32, 64, 128 or 256
    PacketSize(u16),
}

impl SystemParameter {
    /// Register number and content byte
    ///
    /// Values outside the allow-list are rejected here, before anything is
    /// written to the wire.
    pub fn encode(self) -> Result<(u8, u8)> {
        match self {
            Self::BaudRate(baud) => baud_divisor(baud)
                .map(|divisor| (sys_param::BAUD_RATE, divisor))
                .ok_or_else(|| {
                    Error::InvalidParameter(format!(
                        "baud rate {} is not 9600 x n for n in 1..=12",
                        baud
                    ))
                }),
            Self::SecurityLevel(level) => {
                if (sys_param::MIN_SECURITY_LEVEL..=sys_param::MAX_SECURITY_LEVEL).contains(&level)
                {
                    Ok((sys_param::SECURITY_LEVEL, level))
                } else {
                    Err(Error::InvalidParameter(format!(
                        "security level {} is outside 1..=5",
                        level
                    )))
                }
            }
            Self::PacketSize(bytes) => PacketSize::from_bytes(usize::from(bytes))
                .map(|size| (sys_param::PACKET_SIZE, size.code()))
                .map_err(|e| Error::InvalidParameter(e.to_string())),
        }
    }
}

/// Instruction with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Capture a finger image into the image buffer
    GenImg,

    /// Like `GenImg`, but reports poor image quality as an error
    GetImageEx,

    /// Extract features from the image buffer into a character buffer
    Img2Tz { buffer: u8 },

    /// Compare character buffers 1 and 2
    Match,

    /// Search the library for the features in `buffer`
    Search { buffer: u8, start: u16, count: u16 },

    /// Merge the character buffers into a template
    RegModel,

    /// Store the template in `buffer` at `location`
    Store { buffer: u8, location: u16 },

    /// Load the template at `location` into `buffer`
    LoadChar { buffer: u8, location: u16 },

    /// Upload the character buffer to the host
    UpChar { buffer: u8 },

    /// Download a template from the host into the character buffer
    DownChar { buffer: u8 },

    /// Upload the image buffer to the host
    UpImage,

    /// Download an image from the host into the image buffer
    DownImage,

    /// Delete `count` templates starting at `location`
    DeletChar { location: u16, count: u16 },

    /// Delete every template
    Empty,

    SetSysPara { parameter: SystemParameter },
    ReadSysPara,

    SetPwd { password: u32 },
    VfyPwd { password: u32 },

    GetRandomCode,

    SetAddr { address: u32 },

    /// Upload the 512-byte information page
    ReadInfPage,

    /// Turn the secondary communication port on or off
    Control { enable: bool },

    WriteNotepad { page: u8, content: [u8; notepad::PAGE_LEN] },
    ReadNotepad { page: u8 },

    TempleteNum,

    /// Read one 32-byte page of the template index table
    ReadIndexTable { page: u8 },

    Cancel,

    AuraLedConfig {
        mode: LedMode,
        speed: u8,
        color: LedColor,
        cycles: u8,
    },

    CheckSensor,
    GetAlgVer,
    GetFwVer,
    ReadProdInfo,
    SoftRst,
    HandShake,
}

impl Command {
    /// Instruction code
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::GenImg => Opcode::GenImg,
            Self::GetImageEx => Opcode::GetImageEx,
            Self::Img2Tz { .. } => Opcode::Img2Tz,
            Self::Match => Opcode::Match,
            Self::Search { .. } => Opcode::Search,
            Self::RegModel => Opcode::RegModel,
            Self::Store { .. } => Opcode::Store,
            Self::LoadChar { .. } => Opcode::LoadChar,
            Self::UpChar { .. } => Opcode::UpChar,
            Self::DownChar { .. } => Opcode::DownChar,
            Self::UpImage => Opcode::UpImage,
            Self::DownImage => Opcode::DownImage,
            Self::DeletChar { .. } => Opcode::DeletChar,
            Self::Empty => Opcode::Empty,
            Self::SetSysPara { .. } => Opcode::SetSysPara,
            Self::ReadSysPara => Opcode::ReadSysPara,
            Self::SetPwd { .. } => Opcode::SetPwd,
            Self::VfyPwd { .. } => Opcode::VfyPwd,
            Self::GetRandomCode => Opcode::GetRandomCode,
            Self::SetAddr { .. } => Opcode::SetAddr,
            Self::ReadInfPage => Opcode::ReadInfPage,
            Self::Control { .. } => Opcode::Control,
            Self::WriteNotepad { .. } => Opcode::WriteNotepad,
            Self::ReadNotepad { .. } => Opcode::ReadNotepad,
            Self::TempleteNum => Opcode::TempleteNum,
            Self::ReadIndexTable { .. } => Opcode::ReadIndexTable,
            Self::Cancel => Opcode::Cancel,
            Self::AuraLedConfig { .. } => Opcode::AuraLedConfig,
            Self::CheckSensor => Opcode::CheckSensor,
            Self::GetAlgVer => Opcode::GetAlgVer,
            Self::GetFwVer => Opcode::GetFwVer,
            Self::ReadProdInfo => Opcode::ReadProdInfo,
            Self::SoftRst => Opcode::SoftRst,
            Self::HandShake => Opcode::HandShake,
        }
    }

    /// Packed parameter bytes (opcode not included)
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for values the module does not accept.
    pub fn params(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(notepad::PAGE_LEN + 1);

        match *self {
            Self::Img2Tz { buffer } | Self::UpChar { buffer } | Self::DownChar { buffer } => {
                buf.put_u8(buffer);
            }
            Self::Search {
                buffer,
                start,
                count,
            } => {
                buf.put_u8(buffer);
                buf.put_u16(start);
                buf.put_u16(count);
            }
            Self::Store { buffer, location } | Self::LoadChar { buffer, location } => {
                buf.put_u8(buffer);
                buf.put_u16(location);
            }
            Self::DeletChar { location, count } => {
                buf.put_u16(location);
                buf.put_u16(count);
            }
            Self::SetSysPara { parameter } => {
                let (register, content) = parameter.encode()?;
                buf.put_u8(register);
                buf.put_u8(content);
            }
            Self::SetPwd { password } | Self::VfyPwd { password } => {
                buf.put_u32(password);
            }
            Self::SetAddr { address } => {
                buf.put_u32(address);
            }
            Self::Control { enable } => {
                buf.put_u8(u8::from(enable));
            }
            Self::WriteNotepad { page, ref content } => {
                check_notepad_page(page)?;
                buf.put_u8(page);
                buf.put_slice(content);
            }
            Self::ReadNotepad { page } => {
                check_notepad_page(page)?;
                buf.put_u8(page);
            }
            Self::ReadIndexTable { page } => {
                if page > index::MAX_PAGE {
                    return Err(Error::InvalidParameter(format!(
                        "index page {} is outside 0..={}",
                        page,
                        index::MAX_PAGE
                    )));
                }
                buf.put_u8(page);
            }
            Self::AuraLedConfig {
                mode,
                speed,
                color,
                cycles,
            } => {
                buf.put_u8(mode as u8);
                buf.put_u8(speed);
                buf.put_u8(color as u8);
                buf.put_u8(cycles);
            }
            Self::GenImg
            | Self::GetImageEx
            | Self::Match
            | Self::RegModel
            | Self::UpImage
            | Self::DownImage
            | Self::Empty
            | Self::ReadSysPara
            | Self::GetRandomCode
            | Self::ReadInfPage
            | Self::TempleteNum
            | Self::Cancel
            | Self::CheckSensor
            | Self::GetAlgVer
            | Self::GetFwVer
            | Self::ReadProdInfo
            | Self::SoftRst
            | Self::HandShake => {}
        }

        Ok(buf.freeze())
    }

    /// Build the command frame for `address`
    pub fn to_frame(&self, address: u32) -> Result<Frame> {
        let params = self.params()?;
        Ok(Frame::command(address, self.opcode(), &params))
    }
}

fn check_notepad_page(page: u8) -> Result<()> {
    if page > notepad::MAX_PAGE {
        return Err(Error::InvalidParameter(format!(
            "notepad page {} is outside 0..={}",
            page,
            notepad::MAX_PAGE
        )));
    }
    Ok(())
}
