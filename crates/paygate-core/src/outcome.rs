//! Terminal results of a payment attempt.

use serde::Serialize;
use std::fmt;

use crate::error::RequestError;
use crate::registry;
use crate::types::{BackendId, TxRef};

/// Why a payment attempt failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureCause {
    /// The caller supplied an invalid recipient or amount. No backend was contacted.
    MalformedRequest(#[serde(serialize_with = "display")] RequestError),
    /// Transport or initialization error before signing.
    ConnectionFailed(String),
    /// Signer or broadcast error after the connection was established.
    SubmissionFailed(String),
}

fn display<S: serde::Serializer, T: fmt::Display>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::MalformedRequest(e) => write!(f, "malformed request: {e}"),
            FailureCause::ConnectionFailed(m) => write!(f, "connection failed: {m}"),
            FailureCause::SubmissionFailed(m) => write!(f, "{m}"),
        }
    }
}

/// Terminal result of one payment attempt.
///
/// Constructed once per attempt and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Submitted { tx_ref: TxRef },
    Rejected { reason: String },
    Unavailable { backend: BackendId },
    Failed { cause: FailureCause },
}

/// UI message category for an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

impl PaymentOutcome {
    pub fn severity(&self) -> Severity {
        match self {
            PaymentOutcome::Submitted { .. } => Severity::Success,
            PaymentOutcome::Unavailable { .. } => Severity::Info,
            PaymentOutcome::Rejected { .. } => Severity::Warning,
            PaymentOutcome::Failed { .. } => Severity::Error,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self, PaymentOutcome::Submitted { .. })
    }

    pub fn tx_ref(&self) -> Option<&TxRef> {
        match self {
            PaymentOutcome::Submitted { tx_ref } => Some(tx_ref),
            _ => None,
        }
    }

    /// Human-readable message for the user.
    pub fn message(&self) -> String {
        match self {
            PaymentOutcome::Submitted { tx_ref } => format!("Transaction sent! ({tx_ref})"),
            PaymentOutcome::Rejected { reason } => format!("Transaction cancelled: {reason}"),
            PaymentOutcome::Unavailable { backend: BackendId::Injected } => format!(
                "{} is not available. Please install the MetaMask browser extension.",
                registry::descriptor(BackendId::Injected).display_name
            ),
            PaymentOutcome::Unavailable { backend } => format!(
                "{} is not available right now.",
                registry::descriptor(*backend).display_name
            ),
            PaymentOutcome::Failed { cause } => format!("Transaction failed: {cause}"),
        }
    }
}

impl fmt::Display for PaymentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
