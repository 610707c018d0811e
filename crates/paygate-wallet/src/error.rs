//! Wallet orchestration error types.

use paygate_core::error::{BackendError, RequestError};
use paygate_core::outcome::{FailureCause, PaymentOutcome};
use paygate_core::types::BackendId;
use thiserror::Error;

/// Failure of a [`ConnectorAdapter::connect`](crate::connector::ConnectorAdapter::connect) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// The wallet explicitly declined authorization.
    #[error("user rejected: {0}")]
    UserRejected(String),

    /// The backend cannot be reached at all.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Anything else.
    #[error("{0}")]
    Unknown(String),
}

impl From<BackendError> for ConnectError {
    fn from(err: BackendError) -> Self {
        if err.is_user_rejection() {
            ConnectError::UserRejected(err.message)
        } else if err.is_unreachable() {
            ConnectError::Unavailable(err.message)
        } else {
            ConnectError::Unknown(err.message)
        }
    }
}

/// Every way a payment attempt can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// Detection reported the backend unusable, or it could not be reached.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(BackendId),

    /// The user declined at an approval step.
    #[error("user rejected: {0}")]
    UserRejected(String),

    /// Transport or initialization error before signing.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Signer or broadcast error after connection.
    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    /// Invalid recipient or amount, rejected before any backend call.
    #[error(transparent)]
    MalformedRequest(#[from] RequestError),
}

impl PaymentError {
    /// Classify a connection failure for `backend`.
    pub fn from_connect(backend: BackendId, err: ConnectError) -> Self {
        match err {
            ConnectError::UserRejected(reason) => PaymentError::UserRejected(reason),
            ConnectError::Unavailable(_) => PaymentError::BackendUnavailable(backend),
            ConnectError::Unknown(message) => PaymentError::ConnectionFailed(message),
        }
    }
}

impl From<PaymentError> for PaymentOutcome {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::BackendUnavailable(backend) => PaymentOutcome::Unavailable { backend },
            PaymentError::UserRejected(reason) => PaymentOutcome::Rejected { reason },
            PaymentError::ConnectionFailed(m) => PaymentOutcome::Failed {
                cause: FailureCause::ConnectionFailed(m),
            },
            PaymentError::SubmissionFailed(m) => PaymentOutcome::Failed {
                cause: FailureCause::SubmissionFailed(m),
            },
            PaymentError::MalformedRequest(e) => PaymentOutcome::Failed {
                cause: FailureCause::MalformedRequest(e),
            },
        }
    }
}
