//! High-level error types

use r503_types::ConfirmationCode;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] r503_core::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] r503_transport::Error),

    #[error("Type error: {0}")]
    Types(#[from] r503_types::Error),

    #[error("Device not connected")]
    NotConnected,

    /// Nothing came back before the timeout
    #[error("No response from module")]
    NoResponse,

    /// Module answered with a non-zero confirmation code
    #[error("Module rejected the command: {0}")]
    Rejected(ConfirmationCode),

    #[error("Password verification failed: {0}")]
    AuthenticationFailed(ConfirmationCode),

    #[error("Unexpected packet from module: {0}")]
    UnexpectedPacket(String),
}

impl Error {
    /// True when the request was refused locally and nothing was sent
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_invalid_input())
    }
}
