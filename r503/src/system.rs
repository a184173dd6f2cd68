//! System, configuration and housekeeping commands

use std::collections::BTreeSet;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use tracing::{debug, info};

use r503_core::{
    constants::{index, notepad},
    Command, IndexPage, LedColor, LedMode, SystemParameter,
};
use r503_types::{ascii_field, PacketSize, ProductInfo, SystemParameters};

use crate::{
    device::Device,
    error::{Error, Result},
    reply::Reply,
};

/// Big-endian u16 at `offset` of a reply body
pub(crate) fn body_u16(body: &Bytes, offset: usize) -> Result<u16> {
    body.get(offset..offset + 2)
        .map(BigEndian::read_u16)
        .ok_or_else(|| short_body(body, offset + 2))
}

pub(crate) fn body_u32(body: &Bytes, offset: usize) -> Result<u32> {
    body.get(offset..offset + 4)
        .map(BigEndian::read_u32)
        .ok_or_else(|| short_body(body, offset + 4))
}

fn short_body(body: &Bytes, needed: usize) -> Error {
    Error::UnexpectedPacket(format!(
        "reply body has {} bytes, needed {}",
        body.len(),
        needed
    ))
}

impl Device {
    /// Verify the handshake password (`VfyPwd`)
    ///
    /// On success the password is remembered in the session.
    pub fn verify_password(&mut self, password: u32) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::VfyPwd { password })?;

        if reply.is_success() {
            self.session.set_password(password);
            self.session.verify()?;
        }

        Ok(reply.discard())
    }

    /// Change the handshake password (`SetPwd`)
    pub fn set_password(&mut self, password: u32) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::SetPwd { password })?;

        if reply.is_success() {
            info!("Password changed");
            self.session.set_password(password);
        }

        Ok(reply.discard())
    }

    /// Change the module address (`SetAddr`)
    ///
    /// Later frames are addressed to the new value.
    pub fn set_address(&mut self, address: u32) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::SetAddr { address })?;

        if reply.is_success() {
            info!("Module address now 0x{:08X}", address);
            self.session.set_address(address);
        }

        Ok(reply.discard())
    }

    /// Check the module is alive (`HandShake`)
    pub fn handshake(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::HandShake)?.discard())
    }

    /// Check the sensor is working (`CheckSensor`)
    pub fn check_sensor(&mut self) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::CheckSensor)?.discard())
    }

    /// Drive the ring LED (`AuraLedConfig`)
    ///
    /// `cycles` only applies to breathing and flashing; 0 repeats forever.
    pub fn led_control(
        &mut self,
        mode: LedMode,
        speed: u8,
        color: LedColor,
        cycles: u8,
    ) -> Result<Reply<()>> {
        let command = Command::AuraLedConfig {
            mode,
            speed,
            color,
            cycles,
        };
        Ok(self.send_command(&command)?.discard())
    }

    /// Read status and basic configuration (`ReadSysPara`)
    pub fn read_system_parameters(&mut self) -> Result<Reply<SystemParameters>> {
        self.send_command(&Command::ReadSysPara)?
            .try_map(|body| Ok(SystemParameters::parse(&body)?))
    }

    /// Adopt the packet size the module reports
    pub fn negotiate_packet_size(&mut self) -> Result<Reply<PacketSize>> {
        let reply = self.read_system_parameters()?.map(|params| params.packet_size);

        if let Reply::Success(packet_size) = reply {
            debug!("Packet size negotiated: {}", packet_size);
            self.session.set_packet_size(packet_size);
        }

        Ok(reply)
    }

    /// Write one system register (`SetSysPara`)
    ///
    /// Values outside the module's allow-list are rejected before anything
    /// is sent. On success the session packet size or the link speed
    /// follows the new setting.
    pub fn set_system_parameter(&mut self, parameter: SystemParameter) -> Result<Reply<()>> {
        let reply = self.send_command(&Command::SetSysPara { parameter })?;

        if reply.is_success() {
            match parameter {
                SystemParameter::BaudRate(baud_rate) => {
                    info!("Switching link to {} baud", baud_rate);
                    self.transport.set_baud_rate(baud_rate)?;
                }
                SystemParameter::PacketSize(bytes) => {
                    let packet_size = PacketSize::from_bytes(usize::from(bytes))?;
                    debug!("Packet size now {}", packet_size);
                    self.session.set_packet_size(packet_size);
                }
                SystemParameter::SecurityLevel(level) => {
                    debug!("Security level now {}", level);
                }
            }
        }

        Ok(reply.discard())
    }

    /// Number of stored templates (`TempleteNum`)
    pub fn template_count(&mut self) -> Result<Reply<u16>> {
        self.send_command(&Command::TempleteNum)?
            .try_map(|body| body_u16(&body, 0))
    }

    /// One page of the template index table (`ReadIndexTable`)
    pub fn read_index_table(&mut self, page: u8) -> Result<Reply<IndexPage>> {
        self.send_command(&Command::ReadIndexTable { page })?
            .try_map(|body| {
                if body.len() < index::PAGE_LEN {
                    return Err(short_body(&body, index::PAGE_LEN));
                }
                Ok(IndexPage::new(page, body.slice(..index::PAGE_LEN)))
            })
    }

    /// Every occupied library location
    ///
    /// Reads the library capacity first, then as many index pages as the
    /// capacity needs.
    pub fn occupied_locations(&mut self) -> Result<Reply<BTreeSet<u16>>> {
        let capacity = match self.read_system_parameters()? {
            Reply::Success(params) => params.library_capacity,
            Reply::Rejected(code) => return Ok(Reply::Rejected(code)),
            Reply::NoResponse => return Ok(Reply::NoResponse),
        };

        let mut occupied = BTreeSet::new();
        for page in 0..page_count(capacity) {
            match self.read_index_table(page)? {
                Reply::Success(index_page) => occupied.extend(
                    index_page
                        .occupied()
                        .into_iter()
                        .filter(|location| *location < capacity),
                ),
                Reply::Rejected(code) => return Ok(Reply::Rejected(code)),
                Reply::NoResponse => return Ok(Reply::NoResponse),
            }
        }

        Ok(Reply::Success(occupied))
    }

    /// First free library location, `None` when the library is full
    pub fn find_free_location(&mut self) -> Result<Reply<Option<u16>>> {
        let capacity = match self.read_system_parameters()? {
            Reply::Success(params) => params.library_capacity,
            Reply::Rejected(code) => return Ok(Reply::Rejected(code)),
            Reply::NoResponse => return Ok(Reply::NoResponse),
        };

        for page in 0..page_count(capacity) {
            match self.read_index_table(page)? {
                Reply::Success(index_page) => {
                    if let Some(location) = index_page.first_free(capacity) {
                        return Ok(Reply::Success(Some(location)));
                    }
                }
                Reply::Rejected(code) => return Ok(Reply::Rejected(code)),
                Reply::NoResponse => return Ok(Reply::NoResponse),
            }
        }

        Ok(Reply::Success(None))
    }

    /// Read a 32-byte notepad page (`ReadNotepad`)
    pub fn read_notepad(&mut self, page: u8) -> Result<Reply<Bytes>> {
        self.send_command(&Command::ReadNotepad { page })?
            .try_map(|body| {
                if body.len() < notepad::PAGE_LEN {
                    return Err(short_body(&body, notepad::PAGE_LEN));
                }
                Ok(body.slice(..notepad::PAGE_LEN))
            })
    }

    /// Write a notepad page (`WriteNotepad`)
    ///
    /// `data` may be shorter than a page; the rest is zero-filled.
    pub fn write_notepad(&mut self, page: u8, data: &[u8]) -> Result<Reply<()>> {
        if data.len() > notepad::PAGE_LEN {
            return Err(r503_core::Error::InvalidParameter(format!(
                "notepad data is {} bytes, page holds {}",
                data.len(),
                notepad::PAGE_LEN
            ))
            .into());
        }

        let mut content = [0u8; notepad::PAGE_LEN];
        content[..data.len()].copy_from_slice(data);

        Ok(self
            .send_command(&Command::WriteNotepad { page, content })?
            .discard())
    }

    /// Random number from the module (`GetRandomCode`)
    pub fn random_code(&mut self) -> Result<Reply<u32>> {
        self.send_command(&Command::GetRandomCode)?
            .try_map(|body| body_u32(&body, 0))
    }

    /// Product information (`ReadProdInfo`)
    pub fn product_info(&mut self) -> Result<Reply<ProductInfo>> {
        self.send_command(&Command::ReadProdInfo)?
            .try_map(|body| Ok(ProductInfo::parse(&body)?))
    }

    /// Algorithm library version (`GetAlgVer`)
    pub fn algorithm_version(&mut self) -> Result<Reply<String>> {
        Ok(self
            .send_command(&Command::GetAlgVer)?
            .map(|body| ascii_field(&body)))
    }

    /// Firmware version (`GetFwVer`)
    pub fn firmware_version(&mut self) -> Result<Reply<String>> {
        Ok(self
            .send_command(&Command::GetFwVer)?
            .map(|body| ascii_field(&body)))
    }

    /// Turn the secondary port on or off (`Control`)
    pub fn control(&mut self, enable: bool) -> Result<Reply<()>> {
        Ok(self.send_command(&Command::Control { enable })?.discard())
    }

    /// Restart the module (`SoftRst`)
    pub fn soft_reset(&mut self) -> Result<Reply<()>> {
        info!("Resetting module...");
        Ok(self.send_command(&Command::SoftRst)?.discard())
    }
}

/// Index pages needed to cover `capacity` slots
fn page_count(capacity: u16) -> u8 {
    let pages = capacity.div_ceil(index::SLOTS_PER_PAGE);
    pages.min(u16::from(index::MAX_PAGE) + 1) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::test_support::*;
    use pretty_assertions::assert_eq;

    use r503_core::{Frame, Opcode};
    use r503_types::{ConfirmationCode, StatusRegister};

    fn system_parameters(capacity: u16, packet_code: u8) -> Vec<u8> {
        let [cap_hi, cap_lo] = capacity.to_be_bytes();
        vec![
            0x00, 0x04, // password verified
            0x00, 0x00, cap_hi, cap_lo, 0x00, 0x03, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, packet_code,
            0x00, 0x06,
        ]
    }

    #[test]
    fn test_read_system_parameters() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&system_parameters(200, 1)));

        let params = device.read_system_parameters().unwrap().success().unwrap();
        assert_eq!(params.library_capacity, 200);
        assert_eq!(params.packet_size, PacketSize::Bytes64);
        assert_eq!(params.baud_rate, 57_600);
        assert_eq!(params.status, StatusRegister::PASSWORD_VERIFIED);
    }

    #[test]
    fn test_negotiate_packet_size() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&system_parameters(200, 3)));

        let reply = device.negotiate_packet_size().unwrap();
        assert_eq!(reply, Reply::Success(PacketSize::Bytes256));
        assert_eq!(device.session().max_payload_size(), 256);
    }

    #[test]
    fn test_set_packet_size_updates_session() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));

        let reply = device
            .set_system_parameter(SystemParameter::PacketSize(128))
            .unwrap();
        assert!(reply.is_success());
        assert_eq!(device.packet_size(), PacketSize::Bytes128);

        let frames = sent_frames(&probe);
        assert_eq!(frames[0].body().as_ref(), &[6, 2]);
    }

    #[test]
    fn test_set_baud_rate_follows_on_link() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));

        device
            .set_system_parameter(SystemParameter::BaudRate(115_200))
            .unwrap();
        assert_eq!(probe.baud_rate(), 115_200);
    }

    #[test]
    fn test_rejected_parameter_keeps_session() {
        let (mut device, probe) = connected();
        probe.push_response(ack(ConfirmationCode::INVALID_REGISTER, &[]));

        let reply = device
            .set_system_parameter(SystemParameter::PacketSize(256))
            .unwrap();
        assert_eq!(reply, Reply::Rejected(ConfirmationCode::INVALID_REGISTER));
        assert_eq!(device.packet_size(), PacketSize::Bytes32);
    }

    #[test]
    fn test_invalid_parameter_sends_nothing() {
        let (mut device, probe) = connected();

        assert!(device
            .set_system_parameter(SystemParameter::SecurityLevel(9))
            .is_err());
        assert!(device.write_notepad(0, &[0; 33]).is_err());
        assert!(device.read_notepad(16).is_err());
        assert!(probe.written().is_empty());
    }

    #[test]
    fn test_set_address_changes_later_frames() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));
        probe.push_response(Frame::ack(0x0000_0001, ConfirmationCode::SUCCESS, &[]).encode());

        assert!(device.set_address(0x0000_0001).unwrap().is_success());
        device.handshake().unwrap();

        let frames = sent_frames(&probe);
        assert_eq!(frames[0].address, ADDRESS);
        assert_eq!(frames[1].address, 0x0000_0001);
    }

    #[test]
    fn test_template_count() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[0x00, 0x2A]));

        assert_eq!(device.template_count().unwrap(), Reply::Success(42));
    }

    #[test]
    fn test_short_body_is_error() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[0x2A]));

        assert!(matches!(
            device.template_count(),
            Err(Error::UnexpectedPacket(_))
        ));
    }

    #[test]
    fn test_find_free_location() {
        let (mut device, probe) = connected();
        let mut page = vec![0u8; 32];
        page[0] = 0b0000_1111;
        probe.push_response(ok(&system_parameters(200, 0)));
        probe.push_response(ok(&page));

        assert_eq!(device.find_free_location().unwrap(), Reply::Success(Some(4)));

        let frames = sent_frames(&probe);
        assert_eq!(frames[1].opcode(), Some(u8::from(Opcode::ReadIndexTable)));
        assert_eq!(frames[1].body().as_ref(), &[0]);
    }

    #[test]
    fn test_occupied_locations_walks_pages() {
        let (mut device, probe) = connected();
        let mut first = vec![0u8; 32];
        first[0] = 0b0000_0001;
        let mut second = vec![0u8; 32];
        second[0] = 0b0000_0010;
        // Beyond capacity 300; must be ignored
        second[31] = 0b1000_0000;

        probe.push_response(ok(&system_parameters(300, 0)));
        probe.push_response(ok(&first));
        probe.push_response(ok(&second));

        let occupied = device.occupied_locations().unwrap().success().unwrap();
        assert_eq!(occupied.into_iter().collect::<Vec<_>>(), vec![0, 257]);
    }

    #[test]
    fn test_full_library() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&system_parameters(256, 0)));
        probe.push_response(ok(&[0xFF; 32]));

        assert_eq!(device.find_free_location().unwrap(), Reply::Success(None));
    }

    #[test]
    fn test_notepad_roundtrip() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));
        let mut page = vec![0u8; 32];
        page[..5].copy_from_slice(b"hello");
        probe.push_response(ok(&page));

        assert!(device.write_notepad(2, b"hello").unwrap().is_success());
        let read = device.read_notepad(2).unwrap().success().unwrap();
        assert_eq!(&read[..5], b"hello");

        let written = sent_frames(&probe);
        assert_eq!(written[0].body().len(), 33);
        assert_eq!(written[0].body()[0], 2);
    }

    #[test]
    fn test_versions_and_random_code() {
        let (mut device, probe) = connected();
        let mut version = vec![0u8; 32];
        version[..6].copy_from_slice(b"V1.2.3");
        probe.push_response(ok(&version));
        probe.push_response(ok(&[0xDE, 0xAD, 0xBE, 0xEF]));

        assert_eq!(
            device.firmware_version().unwrap(),
            Reply::Success("V1.2.3".to_string())
        );
        assert_eq!(device.random_code().unwrap(), Reply::Success(0xDEAD_BEEF));
    }

    #[test]
    fn test_led_control() {
        let (mut device, probe) = connected();
        probe.push_response(ok(&[]));

        device
            .led_control(LedMode::Flashing, 0x10, LedColor::Blue, 5)
            .unwrap();

        let frames = sent_frames(&probe);
        assert_eq!(frames[0].opcode(), Some(0x35));
        assert_eq!(frames[0].body().as_ref(), &[0x02, 0x10, 0x02, 0x05]);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(200), 1);
        assert_eq!(page_count(256), 1);
        assert_eq!(page_count(257), 2);
        assert_eq!(page_count(u16::MAX), 4);
    }
}
