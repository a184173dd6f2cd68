//! Confirmation codes returned by the module
//!
//! Every acknowledge packet carries one status byte. `0x00` means the
//! instruction completed; anything else is a device-defined failure category.
//! The text attached to each code only matters for display, so it lives in a
//! [`ConfirmationTable`] that can be replaced by an external JSON mapping.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use crate::error::{Error, Result};

/// Device status byte
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfirmationCode(u8);

impl ConfirmationCode {
    pub const SUCCESS: Self = Self(0x00);
    pub const PACKET_RECEIVE_ERROR: Self = Self(0x01);
    pub const NO_FINGER: Self = Self(0x02);
    pub const ENROLL_FAILED: Self = Self(0x03);
    pub const IMAGE_TOO_DISORDERLY: Self = Self(0x06);
    pub const IMAGE_TOO_SMALL: Self = Self(0x07);
    pub const NO_MATCH: Self = Self(0x08);
    pub const NOT_FOUND: Self = Self(0x09);
    pub const MERGE_FAILED: Self = Self(0x0A);
    pub const LOCATION_OUT_OF_RANGE: Self = Self(0x0B);
    pub const TEMPLATE_READ_ERROR: Self = Self(0x0C);
    pub const TEMPLATE_UPLOAD_FAILED: Self = Self(0x0D);
    pub const DATA_RECEIVE_FAILED: Self = Self(0x0E);
    pub const IMAGE_UPLOAD_FAILED: Self = Self(0x0F);
    pub const DELETE_FAILED: Self = Self(0x10);
    pub const CLEAR_FAILED: Self = Self(0x11);
    pub const WRONG_PASSWORD: Self = Self(0x13);
    pub const NO_VALID_IMAGE: Self = Self(0x15);
    pub const FLASH_WRITE_ERROR: Self = Self(0x18);
    pub const INVALID_REGISTER: Self = Self(0x1A);
    pub const WRONG_NOTEPAD_PAGE: Self = Self(0x1C);
    pub const LIBRARY_FULL: Self = Self(0x1F);
    pub const SENSOR_ABNORMAL: Self = Self(0x29);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Description from the built-in datasheet table
    pub fn description(self) -> &'static str {
        builtin_description(self.0).unwrap_or(RESERVED)
    }
}

impl From<u8> for ConfirmationCode {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<ConfirmationCode> for u8 {
    fn from(code: ConfirmationCode) -> u8 {
        code.0
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.0, self.description())
    }
}

const RESERVED: &str = "reserved";

fn builtin_description(code: u8) -> Option<&'static str> {
    let text = match code {
        0x00 => "command execution complete",
        0x01 => "error when receiving data package",
        0x02 => "no finger on the sensor",
        0x03 => "failed to enroll the finger",
        0x06 => "failed to generate character file due to over-disorderly fingerprint image",
        0x07 => "failed to generate character file due to lack of character points or small image",
        0x08 => "finger does not match",
        0x09 => "failed to find a matching finger",
        0x0A => "failed to combine the character files",
        0x0B => "addressed location is beyond the finger library",
        0x0C => "error when reading template from library or the template is invalid",
        0x0D => "error when uploading template",
        0x0E => "module cannot receive the following data packages",
        0x0F => "error when uploading image",
        0x10 => "failed to delete the template",
        0x11 => "failed to clear the finger library",
        0x13 => "wrong password",
        0x15 => "failed to generate image for lack of valid primary image",
        0x18 => "error when writing flash",
        0x19 => "no definition error",
        0x1A => "invalid register number",
        0x1B => "incorrect configuration of register",
        0x1C => "wrong notepad page number",
        0x1D => "failed to operate the communication port",
        0x1F => "fingerprint library is full",
        0x20 => "address code is incorrect",
        0x21 => "password must be verified",
        0x22 => "fingerprint template is not empty",
        0x23 => "fingerprint template is empty",
        0x24 => "fingerprint library is empty",
        0x25 => "wrong number of enrollment samples",
        0x26 => "timeout",
        0x27 => "fingerprint already exists",
        0x28 => "fingerprint features are associated",
        0x29 => "sensor operation failed",
        _ => return None,
    };
    Some(text)
}

/// Code-to-text mapping used for display
///
/// The default table carries the datasheet wording. A table can also be
/// loaded from the JSON mapping shipped with the vendor tooling, whose keys are
/// decimal code strings:
///
/// ```
/// use r503_types::{ConfirmationCode, ConfirmationTable};
///
/// let table = ConfirmationTable::from_json(r#"{"0": "ok", "1": "packet error"}"#).unwrap();
/// assert_eq!(table.describe(ConfirmationCode::SUCCESS), "ok");
/// assert_eq!(table.describe(ConfirmationCode::new(0x42)), "reserved");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationTable {
    entries: HashMap<u8, String>,
}

impl ConfirmationTable {
    /// Empty table; every lookup yields the reserved text
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Parse a JSON object of `"<code>": "<text>"` pairs
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Same as [`from_json`](Self::from_json) but reads from any reader
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: HashMap<String, String>) -> Result<Self> {
        let mut entries = HashMap::with_capacity(raw.len());

        for (key, text) in raw {
            let code = key
                .trim()
                .parse::<u8>()
                .map_err(|e| Error::Parse(format!("confirmation code key {:?}: {}", key, e)))?;
            entries.insert(code, text);
        }

        Ok(Self { entries })
    }

    /// Insert or replace one entry
    pub fn insert(&mut self, code: ConfirmationCode, text: impl Into<String>) {
        self.entries.insert(code.value(), text.into());
    }

    /// Text for `code`, or "reserved" when the table has no entry
    pub fn describe(&self, code: ConfirmationCode) -> &str {
        self.entries
            .get(&code.value())
            .map(String::as_str)
            .unwrap_or(RESERVED)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ConfirmationTable {
    fn default() -> Self {
        let entries = (0..=u8::MAX)
            .filter_map(|code| builtin_description(code).map(|text| (code, text.to_string())))
            .collect();
        Self { entries }
    }
}
