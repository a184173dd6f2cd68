//! Transport layer for R503-family modules
//!
//! Provides blocking byte-stream access to a module: a serial port for real
//! hardware and a scripted in-memory transport for tests and demos.

pub mod error;
pub mod memory;
pub mod serial;

pub use error::{Error, Result};
pub use memory::MemoryTransport;
pub use serial::SerialTransport;

use std::time::Duration;

use bytes::BytesMut;

/// Byte-stream transport to a module
///
/// The link is half-duplex: callers write one request and then read until
/// the reply is complete or the timeout expires.
pub trait Transport: Send {
    /// Open the link
    fn connect(&mut self) -> Result<()>;

    /// Close the link
    fn disconnect(&mut self) -> Result<()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Write raw bytes
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `max_bytes`
    ///
    /// May return fewer bytes than requested, including none. Never blocks
    /// past `timeout`.
    fn receive(&mut self, max_bytes: usize, timeout: Duration) -> Result<BytesMut>;

    /// Change the line speed of an open link
    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()>;

    /// Port name for logs
    fn port_name(&self) -> String;
}
