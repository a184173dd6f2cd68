//! Bulk transfers
//!
//! Templates and images move as a run of data packets after an authorizing
//! command. Every packet but the last is `Data`; the last is `End`. Packet
//! content is limited by the negotiated packet size.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use r503_core::{Command, Frame, PacketType};

use crate::{
    device::Device,
    error::{Error, Result},
    reply::Reply,
};

/// Bytes requested per read while an upload is streaming in
const UPLOAD_READ_SIZE: usize = 4096;

/// Split `data` into packet-sized chunks
///
/// # Examples
///
/// ```
/// use r503::transfer::chunk_payload;
///
/// let chunks = chunk_payload(&[0u8; 70], 32);
/// let sizes: Vec<_> = chunks.iter().map(|c| c.len()).collect();
/// assert_eq!(sizes, vec![32, 32, 6]);
/// ```
pub fn chunk_payload(data: &[u8], packet_size: usize) -> Vec<Bytes> {
    data.chunks(packet_size.max(1))
        .map(Bytes::copy_from_slice)
        .collect()
}

/// Concatenate the data carried by a received packet stream
///
/// Acknowledge packets are skipped; reading stops at the first `End` packet.
pub fn reassemble(stream: &[u8]) -> Result<Bytes> {
    let frames = Frame::decode_stream(stream)?;
    concat_data(&frames)
}

fn concat_data(frames: &[Frame]) -> Result<Bytes> {
    let mut data = BytesMut::new();

    for frame in frames {
        match frame.packet_type {
            PacketType::Ack => continue,
            PacketType::Data => data.extend_from_slice(&frame.payload),
            PacketType::End => {
                data.extend_from_slice(&frame.payload);
                break;
            }
            PacketType::Command => {
                return Err(Error::UnexpectedPacket(format!(
                    "{} inside a data stream",
                    frame.packet_type
                )));
            }
        }
    }

    Ok(data.freeze())
}

/// Whether a partially received upload needs no more reads
fn upload_complete(stream: &[u8]) -> bool {
    match Frame::decode_stream(stream) {
        Ok(frames) => match frames.as_slice() {
            [] => false,
            [only] if only.is_ack() => only.confirmation().is_some_and(|code| !code.is_success()),
            [.., last] => last.is_end(),
        },
        Err(_) => false,
    }
}

impl Device {
    /// Send a template into character buffer `buffer` (`DownChar`)
    pub fn download_template(&mut self, buffer: u8, data: &[u8]) -> Result<Reply<()>> {
        self.download(Command::DownChar { buffer }, data)
    }

    /// Send an image into the image buffer (`DownImage`)
    pub fn download_image(&mut self, data: &[u8]) -> Result<Reply<()>> {
        self.download(Command::DownImage, data)
    }

    /// Fetch the template in character buffer `buffer` (`UpChar`)
    pub fn upload_template(&mut self, buffer: u8) -> Result<Reply<Bytes>> {
        self.upload(Command::UpChar { buffer })
    }

    /// Fetch the image buffer (`UpImage`)
    pub fn upload_image(&mut self) -> Result<Reply<Bytes>> {
        self.upload(Command::UpImage)
    }

    /// Fetch the 512-byte information page (`ReadInfPage`)
    pub fn read_info_page(&mut self) -> Result<Reply<Bytes>> {
        self.upload(Command::ReadInfPage)
    }

    fn download(&mut self, command: Command, data: &[u8]) -> Result<Reply<()>> {
        if data.is_empty() {
            return Err(r503_core::Error::InvalidParameter("nothing to download".into()).into());
        }

        let reply = self.send_command(&command)?;
        if !reply.is_success() {
            return Ok(reply.discard());
        }

        let address = self.session.address();
        let chunks = chunk_payload(data, self.session.max_payload_size());
        let last = chunks.len() - 1;

        debug!(
            "Downloading {} bytes in {} packets",
            data.len(),
            chunks.len()
        );

        for (i, chunk) in chunks.into_iter().enumerate() {
            let frame = if i == last {
                Frame::end(address, chunk)
            } else {
                Frame::data(address, chunk)
            };
            self.write_frame(&frame)?;

            // Silence means the module took the packet
            if let Reply::Rejected(code) = self.read_reply(self.chunk_ack_window)? {
                warn!("Download aborted at packet {}: {}", i, code);
                return Ok(Reply::Rejected(code));
            }
        }

        Ok(Reply::Success(()))
    }

    fn upload(&mut self, command: Command) -> Result<Reply<Bytes>> {
        let frame = command.to_frame(self.session.address())?;
        self.ensure_connected()?;

        debug!("Sending {}", command.opcode());
        self.write_frame(&frame)?;

        let mut stream = BytesMut::new();
        loop {
            let chunk = self
                .transport
                .receive(UPLOAD_READ_SIZE, self.transfer_timeout)?;
            if chunk.is_empty() {
                break;
            }
            stream.extend_from_slice(&chunk);
            if upload_complete(&stream) {
                break;
            }
        }

        if stream.is_empty() {
            return Ok(Reply::NoResponse);
        }

        let frames = Frame::decode_stream(&stream)?;
        let Some((first, rest)) = frames.split_first() else {
            return Ok(Reply::NoResponse);
        };

        match self.interpret(first)? {
            Reply::Success(_) => {}
            Reply::Rejected(code) => {
                debug!("{} rejected: {}", command.opcode(), code);
                return Ok(Reply::Rejected(code));
            }
            Reply::NoResponse => return Ok(Reply::NoResponse),
        }

        if !rest.last().is_some_and(Frame::is_end) {
            warn!("Upload ended without an END packet");
        }

        let data = concat_data(rest)?;
        debug!("{} uploaded {} bytes", command.opcode(), data.len());

        Ok(Reply::Success(data))
    }
}
