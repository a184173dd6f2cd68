//! Instruction codes

use std::fmt;

use crate::error::{Error, Result};

/// Instruction codes
///
/// All instructions from the R503 user manual. Variant names follow the
/// datasheet mnemonics.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Fingerprint processing
    GenImg = 0x01,
    Img2Tz = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegModel = 0x05,
    Store = 0x06,
    LoadChar = 0x07,
    DeletChar = 0x0C,
    Empty = 0x0D,
    GetImageEx = 0x28,
    Cancel = 0x30,

    // Bulk transfer
    UpChar = 0x08,
    DownChar = 0x09,
    UpImage = 0x0A,
    DownImage = 0x0B,
    ReadInfPage = 0x16,

    // System
    SetSysPara = 0x0E,
    ReadSysPara = 0x0F,
    SetPwd = 0x12,
    VfyPwd = 0x13,
    GetRandomCode = 0x14,
    SetAddr = 0x15,
    Control = 0x17,
    WriteNotepad = 0x18,
    ReadNotepad = 0x19,
    TempleteNum = 0x1D,
    ReadIndexTable = 0x1F,

    // Module
    AuraLedConfig = 0x35,
    CheckSensor = 0x36,
    GetAlgVer = 0x39,
    GetFwVer = 0x3A,
    ReadProdInfo = 0x3C,
    SoftRst = 0x3D,
    HandShake = 0x40,
}

impl Opcode {
    /// Instructions followed by data packets from the module
    pub fn is_upload(self) -> bool {
        matches!(self, Self::UpChar | Self::UpImage | Self::ReadInfPage)
    }

    /// Instructions followed by data packets from the host
    pub fn is_download(self) -> bool {
        matches!(self, Self::DownChar | Self::DownImage)
    }

    /// Get instruction name
    pub fn name(self) -> &'static str {
        match self {
            Self::GenImg => "GenImg",
            Self::Img2Tz => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegModel => "RegModel",
            Self::Store => "Store",
            Self::LoadChar => "LoadChar",
            Self::DeletChar => "DeletChar",
            Self::Empty => "Empty",
            Self::GetImageEx => "GetImageEx",
            Self::Cancel => "Cancel",
            Self::UpChar => "UpChar",
            Self::DownChar => "DownChar",
            Self::UpImage => "UpImage",
            Self::DownImage => "DownImage",
            Self::ReadInfPage => "ReadInfPage",
            Self::SetSysPara => "SetSysPara",
            Self::ReadSysPara => "ReadSysPara",
            Self::SetPwd => "SetPwd",
            Self::VfyPwd => "VfyPwd",
            Self::GetRandomCode => "GetRandomCode",
            Self::SetAddr => "SetAddr",
            Self::Control => "Control",
            Self::WriteNotepad => "WriteNotepad",
            Self::ReadNotepad => "ReadNotepad",
            Self::TempleteNum => "TempleteNum",
            Self::ReadIndexTable => "ReadIndexTable",
            Self::AuraLedConfig => "AuraLedConfig",
            Self::CheckSensor => "CheckSensor",
            Self::GetAlgVer => "GetAlgVer",
            Self::GetFwVer => "GetFwVer",
            Self::ReadProdInfo => "ReadProdInfo",
            Self::SoftRst => "SoftRst",
            Self::HandShake => "HandShake",
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        opcode as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::GenImg),
            0x02 => Ok(Self::Img2Tz),
            0x03 => Ok(Self::Match),
            0x04 => Ok(Self::Search),
            0x05 => Ok(Self::RegModel),
            0x06 => Ok(Self::Store),
            0x07 => Ok(Self::LoadChar),
            0x08 => Ok(Self::UpChar),
            0x09 => Ok(Self::DownChar),
            0x0A => Ok(Self::UpImage),
            0x0B => Ok(Self::DownImage),
            0x0C => Ok(Self::DeletChar),
            0x0D => Ok(Self::Empty),
            0x0E => Ok(Self::SetSysPara),
            0x0F => Ok(Self::ReadSysPara),
            0x12 => Ok(Self::SetPwd),
            0x13 => Ok(Self::VfyPwd),
            0x14 => Ok(Self::GetRandomCode),
            0x15 => Ok(Self::SetAddr),
            0x16 => Ok(Self::ReadInfPage),
            0x17 => Ok(Self::Control),
            0x18 => Ok(Self::WriteNotepad),
            0x19 => Ok(Self::ReadNotepad),
            0x1D => Ok(Self::TempleteNum),
            0x1F => Ok(Self::ReadIndexTable),
            0x28 => Ok(Self::GetImageEx),
            0x30 => Ok(Self::Cancel),
            0x35 => Ok(Self::AuraLedConfig),
            0x36 => Ok(Self::CheckSensor),
            0x39 => Ok(Self::GetAlgVer),
            0x3A => Ok(Self::GetFwVer),
            0x3C => Ok(Self::ReadProdInfo),
            0x3D => Ok(Self::SoftRst),
            0x40 => Ok(Self::HandShake),
            _ => Err(Error::UnknownOpcode(value)),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_conversion() {
        assert_eq!(u8::from(Opcode::VfyPwd), 0x13);
        assert_eq!(Opcode::try_from(0x13).unwrap(), Opcode::VfyPwd);
    }

    #[test]
    fn test_all_codes_roundtrip() {
        for code in 0..=u8::MAX {
            if let Ok(opcode) = Opcode::try_from(code) {
                assert_eq!(u8::from(opcode), code);
            }
        }
    }

    #[test]
    fn test_transfer_direction() {
        assert!(Opcode::UpImage.is_upload());
        assert!(Opcode::DownChar.is_download());
        assert!(!Opcode::GenImg.is_upload());
        assert!(!Opcode::UpChar.is_download());
    }

    #[test]
    fn test_unknown_opcode() {
        let result = Opcode::try_from(0x99);
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Opcode::HandShake.to_string(), "HandShake(0x40)");
    }
}
