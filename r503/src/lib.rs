//! # r503
//!
//! Host-side driver for R503-family optical fingerprint modules.
//!
//! ## Features
//!
//! - Type-safe protocol implementation
//! - Blocking API over any byte-stream transport (serial port included)
//! - Chunked template and image transfer
//! - Enrollment with a bounded deadline
//!
//! ## Quick Start
//!
//! ```no_run
//! use r503::{Device, EnrollmentConfig};
//!
//! fn main() -> r503::Result<()> {
//!     let mut device = Device::new("/dev/ttyUSB0", 57_600);
//!     device.connect()?;
//!
//!     let params = device.read_system_parameters()?.into_result()?;
//!     println!("Library capacity: {}", params.library_capacity);
//!
//!     let outcome = device.enroll_next_free(&EnrollmentConfig::default())?;
//!     println!("{:?}", outcome);
//!
//!     device.disconnect()?;
//!     Ok(())
//! }
//! ```

pub mod device;
pub mod enroll;
pub mod error;
pub mod fingerprint;
pub mod reply;
pub mod system;
pub mod transfer;

// Re-exports
pub use device::Device;
pub use enroll::{Clock, EnrollmentConfig, EnrollmentOutcome, EnrollmentStage, SystemClock};
pub use error::{Error, Result};
pub use fingerprint::SearchMatch;
pub use reply::Reply;

// Re-export types
pub use r503_core::{Command, IndexPage, LedColor, LedMode, SystemParameter};
pub use r503_transport::{MemoryTransport, SerialTransport, Transport};
pub use r503_types::{
    ConfirmationCode, ConfirmationTable, PacketSize, ProductInfo, SystemParameters,
};
