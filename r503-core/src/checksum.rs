//! Packet checksum
//!
//! From the module datasheet: the arithmetic sum of the package identifier,
//! the package length and all package contents. Overflowing bits are omitted
//! and the result is transferred high byte first.
//!
//! Start code and address are not covered.
//!
//! The sum is commutative, so reordering payload bytes does not change the
//! checksum. That is a property of the wire protocol and is kept as is.

use tracing::trace;

/// Calculate packet checksum
///
/// # Algorithm
///
/// ```text
/// sum = packet_type + length_hi + length_lo + payload[0] + ... + payload[n-1]
/// return sum mod 0x10000
/// ```
///
/// # Examples
///
/// ```
/// use r503_core::checksum;
///
/// // VfyPwd with the default password
/// let checksum = checksum::calculate(0x01, 0x0007, &[0x13, 0, 0, 0, 0]);
/// assert_eq!(checksum, 0x001B);
/// ```
pub fn calculate(packet_type: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();

    let checksum = payload
        .iter()
        .fold(
            u16::from(packet_type)
                .wrapping_add(u16::from(len_hi))
                .wrapping_add(u16::from(len_lo)),
            |sum, &byte| sum.wrapping_add(u16::from(byte)),
        );

    trace!(
        packet_type = packet_type,
        length = length,
        payload_len = payload.len(),
        checksum = format!("0x{:04X}", checksum),
        "Calculated checksum"
    );

    checksum
}

/// Verify checksum
pub fn verify(packet_type: u8, length: u16, payload: &[u8], expected: u16) -> bool {
    calculate(packet_type, length, payload) == expected
}
