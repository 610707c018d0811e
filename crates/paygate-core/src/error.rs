//! Error types for paygate.
use thiserror::Error;

use crate::constants::{
    CHAIN_DISCONNECTED_CODE, DISCONNECTED_CODE, USER_REJECTED_CODE, USER_REJECTION_SIGNALS,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("empty address")] Empty,
    #[error("missing 0x prefix")] MissingPrefix,
    #[error("invalid length: {0} hex digits")] InvalidLength(usize),
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid checksum")] InvalidChecksum,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")] Empty,
    #[error("negative amount")] Negative,
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("too many decimal places: {got} > {max}")] TooManyDecimals { got: usize, max: u8 },
    #[error("unsupported decimals: {0}")] UnsupportedDecimals(u8),
    #[error("amount is zero")] Zero,
    #[error("amount overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid recipient: {0}")] Recipient(#[from] AddressError),
    #[error("invalid amount: {0}")] Amount(#[from] AmountError),
}

/// Failure reported by an external wallet backend.
///
/// Mirrors the EIP-1193 `ProviderRpcError` shape: an optional numeric code
/// and a free-form message that is surfaced verbatim to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    pub code: Option<i64>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self { code: Some(code), message: message.into() }
    }

    /// The user declined the request in their wallet.
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::with_code(USER_REJECTED_CODE, message)
    }

    /// The backend could not be reached (relay timeout, closed transport).
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self::with_code(DISCONNECTED_CODE, message)
    }

    /// Whether this failure carries a user-cancellation signal.
    pub fn is_user_rejection(&self) -> bool {
        if self.code == Some(USER_REJECTED_CODE) {
            return true;
        }
        let message = self.message.to_ascii_lowercase();
        USER_REJECTION_SIGNALS.iter().any(|signal| message.contains(signal))
    }

    /// Whether the backend reported that it cannot be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self.code, Some(DISCONNECTED_CODE) | Some(CHAIN_DISCONNECTED_CODE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_by_code() {
        assert!(BackendError::user_rejected("nope").is_user_rejection());
    }

    #[test]
    fn rejection_by_message() {
        let e = BackendError::new("MetaMask Tx Signature: User denied transaction signature.");
        assert!(e.is_user_rejection());
        let e = BackendError::new("ACTION_REJECTED");
        assert!(e.is_user_rejection());
    }

    #[test]
    fn plain_failure_is_not_rejection() {
        let e = BackendError::with_code(-32000, "insufficient funds for gas * price + value");
        assert!(!e.is_user_rejection());
        assert!(!e.is_unreachable());
    }

    #[test]
    fn disconnected_is_unreachable() {
        assert!(BackendError::disconnected("relay timeout").is_unreachable());
        assert!(BackendError::with_code(CHAIN_DISCONNECTED_CODE, "wrong chain").is_unreachable());
    }

    #[test]
    fn display_is_message_verbatim() {
        let e = BackendError::with_code(-32603, "Internal JSON-RPC error.");
        assert_eq!(e.to_string(), "Internal JSON-RPC error.");
    }

    #[test]
    fn request_error_from_parts() {
        let e: RequestError = AddressError::Empty.into();
        assert_eq!(e.to_string(), "invalid recipient: empty address");
        let e: RequestError = AmountError::Zero.into();
        assert_eq!(e, RequestError::Amount(AmountError::Zero));
    }
}
