//! Trait interfaces for external wallet collaborators.
//!
//! These traits model the objects the orchestration layer calls into:
//! - [`InjectedWallet`]: wallet object injected into the page by an extension
//! - [`SdkClientFactory`] / [`SdkClient`]: vendor SDK that hosts its own provider
//! - [`RelayClientFactory`]: relay provider reached over a pairing service
//! - [`Provider`] / [`EnableableProvider`]: signer-capable providers
//! - [`Signer`]: signs and broadcasts a transfer
//!
//! Every fallible call reports a [`BackendError`]; classification into user
//! rejection, unreachability or plain failure happens on the caller's side.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BackendError;
use crate::types::{AppDescriptor, RelayConfig, TransferRequest, TxRef};

/// Signs and broadcasts transfers for a connected account.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `transfer` and broadcast it. Suspends until the user confirms in
    /// their wallet and the backend accepts the transaction.
    async fn send_transaction(&self, transfer: &TransferRequest) -> Result<TxRef, BackendError>;
}

/// A connected provider able to hand out a signer.
pub trait Provider: Send + Sync {
    /// Derive a signer. Pure: no additional user interaction.
    fn get_signer(&self) -> Result<Arc<dyn Signer>, BackendError>;
}

/// A provider that must be explicitly enabled before it can sign.
///
/// Enabling opens the wallet's approval UI (or a pairing QR code for relays)
/// and resolves with the authorized accounts.
#[async_trait]
pub trait EnableableProvider: Provider {
    async fn enable(&self) -> Result<Vec<String>, BackendError>;
}

/// Wallet object injected into the environment by a browser extension.
#[async_trait]
pub trait InjectedWallet: Send + Sync {
    /// Whether an injected wallet object exists at all.
    fn is_present(&self) -> bool;

    /// Whether the injected object identifies as the expected wallet.
    fn is_expected_wallet(&self) -> bool;

    /// Ask the user to authorize account access.
    async fn request_access(&self) -> Result<Vec<String>, BackendError>;

    /// Wrap the injected object as a signer-capable provider.
    fn as_provider(&self) -> Arc<dyn Provider>;
}

/// Builds SDK clients configured with the application's identity.
#[async_trait]
pub trait SdkClientFactory: Send + Sync {
    /// Construct a client. Local, but may be slow; callers bound it with a timeout.
    async fn create(&self, app: &AppDescriptor) -> Result<Box<dyn SdkClient>, BackendError>;
}

/// A constructed SDK client.
pub trait SdkClient: Send + Sync {
    /// Produce a provider handle, or `None` if the SDK cannot serve one here.
    fn make_provider(&self) -> Option<Arc<dyn EnableableProvider>>;
}

/// Builds relay-based providers.
pub trait RelayClientFactory: Send + Sync {
    fn create(&self, config: &RelayConfig) -> Result<Arc<dyn EnableableProvider>, BackendError>;
}
