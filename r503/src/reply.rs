//! Outcome of a single command

use r503_core::constants::NO_RESPONSE_STATUS;
use r503_types::ConfirmationCode;

use crate::error::{Error, Result};

/// What the module said about a command
///
/// Transport and decode failures are not replies; they surface as `Err` from
/// the device method instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    /// Confirmation code 0 with the decoded body
    Success(T),

    /// Non-zero confirmation code
    Rejected(ConfirmationCode),

    /// Nothing received before the timeout
    NoResponse,
}

impl<T> Reply<T> {
    /// Numeric status: 0, the confirmation code, or 99 for no response
    pub fn status(&self) -> u8 {
        match self {
            Self::Success(_) => ConfirmationCode::SUCCESS.value(),
            Self::Rejected(code) => code.value(),
            Self::NoResponse => NO_RESPONSE_STATUS,
        }
    }

    /// Confirmation code, if the module answered
    pub fn code(&self) -> Option<ConfirmationCode> {
        match self {
            Self::Success(_) => Some(ConfirmationCode::SUCCESS),
            Self::Rejected(code) => Some(*code),
            Self::NoResponse => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::NoResponse)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Self::Success(value) => Reply::Success(f(value)),
            Self::Rejected(code) => Reply::Rejected(code),
            Self::NoResponse => Reply::NoResponse,
        }
    }

    /// Decode the body of a successful reply
    pub fn try_map<U>(self, f: impl FnOnce(T) -> Result<U>) -> Result<Reply<U>> {
        Ok(match self {
            Self::Success(value) => Reply::Success(f(value)?),
            Self::Rejected(code) => Reply::Rejected(code),
            Self::NoResponse => Reply::NoResponse,
        })
    }

    /// Drop the body, keeping the outcome
    pub fn discard(self) -> Reply<()> {
        self.map(|_| ())
    }

    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Treat rejection and silence as errors
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Rejected(code) => Err(Error::Rejected(code)),
            Self::NoResponse => Err(Error::NoResponse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status() {
        assert_eq!(Reply::Success(()).status(), 0);
        assert_eq!(Reply::<()>::Rejected(ConfirmationCode::NO_FINGER).status(), 0x02);
        assert_eq!(Reply::<()>::NoResponse.status(), 99);
    }

    #[test]
    fn test_code() {
        assert_eq!(Reply::Success(1).code(), Some(ConfirmationCode::SUCCESS));
        assert_eq!(Reply::<u8>::NoResponse.code(), None);
    }

    #[test]
    fn test_map_keeps_outcome() {
        assert_eq!(Reply::Success(2).map(|v| v * 2), Reply::Success(4));
        assert_eq!(
            Reply::<u8>::Rejected(ConfirmationCode::NOT_FOUND).map(|v| v * 2),
            Reply::Rejected(ConfirmationCode::NOT_FOUND)
        );
        assert_eq!(Reply::<u8>::NoResponse.discard(), Reply::NoResponse);
    }

    #[test]
    fn test_into_result() {
        assert_eq!(Reply::Success(7).into_result().unwrap(), 7);
        assert!(matches!(
            Reply::<()>::Rejected(ConfirmationCode::WRONG_PASSWORD).into_result(),
            Err(Error::Rejected(code)) if code == ConfirmationCode::WRONG_PASSWORD
        ));
        assert!(matches!(Reply::<()>::NoResponse.into_result(), Err(Error::NoResponse)));
    }
}
