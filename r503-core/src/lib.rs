//! # r503-core
//!
//! Core protocol implementation for R503-family fingerprint modules.
//!
//! This crate provides the low-level protocol primitives:
//! - Frame structure and encoding/decoding
//! - Checksum calculation
//! - Instruction codes and typed commands
//! - Template index table decoding
//! - Protocol constants

pub mod checksum;
pub mod command;
pub mod constants;
pub mod error;
pub mod frame;
pub mod index;
pub mod opcode;
pub mod session;

pub use command::{Command, SystemParameter};
pub use constants::{LedColor, LedMode};
pub use error::{Error, Result};
pub use frame::{Frame, PacketType};
pub use index::{available_location, decode_index_page, IndexPage};
pub use opcode::Opcode;
pub use session::{Session, SessionState};
