//! Product information structures (`ReadProdInfo`)

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::error::{Error, Result};

/// Product information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInfo {
    /// Module type, e.g. "R503"
    pub module_type: String,

    /// Module batch number
    pub batch_number: String,

    /// Module serial number
    pub serial_number: String,

    /// Hardware version (major, minor)
    pub hardware_version: (u8, u8),

    /// Sensor type
    pub sensor_type: String,

    pub image_width: u16,
    pub image_height: u16,
    pub template_size: u16,
    pub database_size: u16,
}

impl ProductInfo {
    pub const ENCODED_LEN: usize = 46;

    /// Parse the 46-byte product information block
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::ENCODED_LEN {
            return Err(Error::Parse(format!(
                "product info needs {} bytes, got {}",
                Self::ENCODED_LEN,
                buf.len()
            )));
        }

        Ok(Self {
            module_type: ascii_field(&buf[0..16]),
            batch_number: ascii_field(&buf[16..20]),
            serial_number: ascii_field(&buf[20..28]),
            hardware_version: (buf[28], buf[29]),
            sensor_type: ascii_field(&buf[30..38]),
            image_width: BigEndian::read_u16(&buf[38..40]),
            image_height: BigEndian::read_u16(&buf[40..42]),
            template_size: BigEndian::read_u16(&buf[42..44]),
            database_size: BigEndian::read_u16(&buf[44..46]),
        })
    }
}

/// Fixed-width ASCII field, NUL/space padded
pub fn ascii_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).trim_end().to_string()
}

impl fmt::Display for ProductInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Module[{} SN: {}, HW: {}.{}, sensor: {}, {}x{}, library: {}]",
            self.module_type,
            self.serial_number,
            self.hardware_version.0,
            self.hardware_version.1,
            self.sensor_type,
            self.image_width,
            self.image_height,
            self.database_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encoded() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"R503\0\0\0\0\0\0\0\0\0\0\0\0");
        buf.extend_from_slice(b"B001");
        buf.extend_from_slice(b"00012345");
        buf.extend_from_slice(&[1, 2]);
        buf.extend_from_slice(b"FPC1011 ");
        buf.extend_from_slice(&192u16.to_be_bytes());
        buf.extend_from_slice(&192u16.to_be_bytes());
        buf.extend_from_slice(&1536u16.to_be_bytes());
        buf.extend_from_slice(&200u16.to_be_bytes());
        buf
    }

    #[test]
    fn test_parse_product_info() {
        let info = ProductInfo::parse(&encoded()).unwrap();

        assert_eq!(
            info,
            ProductInfo {
                module_type: "R503".into(),
                batch_number: "B001".into(),
                serial_number: "00012345".into(),
                hardware_version: (1, 2),
                sensor_type: "FPC1011".into(),
                image_width: 192,
                image_height: 192,
                template_size: 1536,
                database_size: 200,
            }
        );
    }

    #[test]
    fn test_display() {
        let info = ProductInfo::parse(&encoded()).unwrap();
        assert_eq!(
            info.to_string(),
            "Module[R503 SN: 00012345, HW: 1.2, sensor: FPC1011, 192x192, library: 200]"
        );
    }

    #[test]
    fn test_parse_too_short() {
        assert!(ProductInfo::parse(&[0u8; 45]).is_err());
    }
}
