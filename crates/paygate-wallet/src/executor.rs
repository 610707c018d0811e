//! Transfer construction and submission.

use tracing::{info, warn};

use paygate_core::outcome::PaymentOutcome;
use paygate_core::traits::Signer;
use paygate_core::types::{PaymentRequest, TransferRequest};

use crate::error::PaymentError;

/// Builds a native-asset transfer and submits it through a connected signer.
///
/// Submission is attempted exactly once. A failed broadcast is reported, never
/// retried: re-sending a signed transfer is left to an explicit new attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentExecutor;

impl PaymentExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Validate `request` and convert its amount to base units.
    pub fn build_transfer(&self, request: &PaymentRequest) -> Result<TransferRequest, PaymentError> {
        Ok(request.validate()?)
    }

    /// Build the transfer for `request` and submit it.
    pub async fn submit(&self, signer: &dyn Signer, request: &PaymentRequest) -> PaymentOutcome {
        match self.build_transfer(request) {
            Ok(transfer) => self.submit_transfer(signer, &transfer).await,
            Err(e) => e.into(),
        }
    }

    /// Submit an already-built transfer and classify the result.
    pub async fn submit_transfer(
        &self,
        signer: &dyn Signer,
        transfer: &TransferRequest,
    ) -> PaymentOutcome {
        match signer.send_transaction(transfer).await {
            Ok(tx_ref) => {
                info!(to = %transfer.to, value = %transfer.value, tx = %tx_ref, "transaction sent");
                PaymentOutcome::Submitted { tx_ref }
            }
            Err(e) if e.is_user_rejection() => {
                warn!(to = %transfer.to, reason = %e, "transaction rejected by user");
                PaymentError::UserRejected(e.message).into()
            }
            Err(e) => {
                warn!(to = %transfer.to, error = %e, code = ?e.code, "transaction failed");
                PaymentError::SubmissionFailed(e.message).into()
            }
        }
    }
}
