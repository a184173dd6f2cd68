//! Type definitions for r503

pub mod confirmation;
pub mod error;
pub mod product_info;
pub mod system;

pub use confirmation::{ConfirmationCode, ConfirmationTable};
pub use error::{Error, Result};
pub use product_info::ProductInfo;
pub use product_info::ascii_field;
pub use system::{baud_divisor, PacketSize, StatusRegister, SystemParameters};
