//! In-memory transport
//!
//! Plays back scripted replies and records everything written. Handles are
//! cheap to clone and share state, so a test can keep one handle while the
//! device owns another.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::trace;

use crate::{
    error::{Error, Result},
    Transport,
};

#[derive(Debug, Default)]
struct State {
    connected: bool,
    baud_rate: u32,
    responses: VecDeque<Bytes>,
    written: Vec<Bytes>,
}

/// Scripted transport
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    name: String,
    state: Arc<Mutex<State>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(State {
                baud_rate: 57_600,
                ..State::default()
            })),
        }
    }

    /// Queue the bytes returned by the next read
    pub fn push_response(&self, bytes: impl Into<Bytes>) {
        self.state.lock().responses.push_back(bytes.into());
    }

    /// Queue a read that times out with nothing received
    pub fn push_silence(&self) {
        self.push_response(Bytes::new());
    }

    /// Reads still queued
    pub fn pending_responses(&self) -> usize {
        self.state.lock().responses.len()
    }

    /// Every `send` so far, in order
    pub fn written(&self) -> Vec<Bytes> {
        self.state.lock().written.clone()
    }

    pub fn clear_written(&self) {
        self.state.lock().written.clear();
    }

    /// Line speed last configured
    pub fn baud_rate(&self) -> u32 {
        self.state.lock().baud_rate
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.connected {
            return Err(Error::AlreadyConnected);
        }
        state.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        trace!("TX {} bytes: {}", data.len(), hex::encode_upper(data));
        state.written.push(Bytes::copy_from_slice(data));
        Ok(())
    }

    fn receive(&mut self, max_bytes: usize, _timeout: Duration) -> Result<BytesMut> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(Error::NotConnected);
        }

        let Some(mut next) = state.responses.pop_front() else {
            return Ok(BytesMut::new());
        };

        // Hand out at most max_bytes; the rest stays for the next read
        if next.len() > max_bytes {
            let rest = next.split_off(max_bytes);
            state.responses.push_front(rest);
        }

        trace!("RX {} bytes: {}", next.len(), hex::encode_upper(&next));
        Ok(BytesMut::from(next.as_ref()))
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<()> {
        if baud_rate == 0 {
            return Err(Error::InvalidBaudRate(baud_rate));
        }
        self.state.lock().baud_rate = baud_rate;
        Ok(())
    }

    fn port_name(&self) -> String {
        self.name.clone()
    }
}
