//! Connector adapters: one per connection protocol.
//!
//! Each adapter turns its backend's connection dance into a single
//! `connect()` call that suspends until the user approves or rejects in their
//! wallet UI, then derives a signer from the resulting provider. Signer
//! derivation is pure and counts as part of `connect`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use paygate_core::traits::{
    EnableableProvider, InjectedWallet, Provider, RelayClientFactory, SdkClientFactory, Signer,
};
use paygate_core::types::{AppDescriptor, BackendId, RelayConfig};

use crate::error::ConnectError;

/// A live, authorized connection to one backend.
///
/// Produced by [`ConnectorAdapter::connect`] and consumed by a single payment
/// attempt. Deliberately not `Clone`: wallets can revoke authorization out of
/// band, so every attempt connects again.
pub struct ConnectionHandle {
    backend: BackendId,
    accounts: Vec<String>,
    signer: Arc<dyn Signer>,
}

impl ConnectionHandle {
    pub fn new(backend: BackendId, accounts: Vec<String>, signer: Arc<dyn Signer>) -> Self {
        Self {
            backend,
            accounts,
            signer,
        }
    }

    pub fn backend(&self) -> BackendId {
        self.backend
    }

    /// Accounts the wallet authorized, as reported by the backend.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("backend", &self.backend)
            .field("accounts", &self.accounts)
            .finish_non_exhaustive()
    }
}

/// Common connection contract for every backend.
#[async_trait]
pub trait ConnectorAdapter: Send + Sync {
    fn backend(&self) -> BackendId;

    /// Obtain authorization and a signer.
    ///
    /// Fails with [`ConnectError::UserRejected`] when the wallet declines,
    /// [`ConnectError::Unavailable`] when the backend cannot be reached, and
    /// [`ConnectError::Unknown`] otherwise.
    async fn connect(&self) -> Result<ConnectionHandle, ConnectError>;
}

fn derive_signer<P: Provider + ?Sized>(provider: &P) -> Result<Arc<dyn Signer>, ConnectError> {
    provider.get_signer().map_err(ConnectError::from)
}

fn require_accounts(accounts: Vec<String>) -> Result<Vec<String>, ConnectError> {
    if accounts.is_empty() {
        return Err(ConnectError::UserRejected("no accounts authorized".into()));
    }
    Ok(accounts)
}

async fn enable_and_sign(
    backend: BackendId,
    provider: Arc<dyn EnableableProvider>,
) -> Result<ConnectionHandle, ConnectError> {
    let accounts = require_accounts(provider.enable().await?)?;
    let signer = derive_signer(provider.as_ref())?;
    info!(%backend, accounts = accounts.len(), "wallet connected");
    Ok(ConnectionHandle::new(backend, accounts, signer))
}

/// Connects through a wallet object injected by a browser extension.
pub struct InjectedConnector {
    wallet: Arc<dyn InjectedWallet>,
}

impl InjectedConnector {
    pub fn new(wallet: Arc<dyn InjectedWallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl ConnectorAdapter for InjectedConnector {
    fn backend(&self) -> BackendId {
        BackendId::Injected
    }

    async fn connect(&self) -> Result<ConnectionHandle, ConnectError> {
        if !self.wallet.is_present() {
            return Err(ConnectError::Unavailable("no injected wallet found".into()));
        }
        debug!(backend = %BackendId::Injected, "requesting account access");
        let accounts = require_accounts(self.wallet.request_access().await?)?;
        let provider = self.wallet.as_provider();
        let signer = derive_signer(provider.as_ref())?;
        info!(backend = %BackendId::Injected, accounts = accounts.len(), "wallet connected");
        Ok(ConnectionHandle::new(BackendId::Injected, accounts, signer))
    }
}

/// Connects through a vendor SDK that hosts its own provider.
///
/// The client is rebuilt on every connect with the same application
/// descriptor used for detection; enabling its provider is what opens the
/// wallet's approval UI.
pub struct SdkConnector {
    factory: Arc<dyn SdkClientFactory>,
    app: AppDescriptor,
}

impl SdkConnector {
    pub fn new(factory: Arc<dyn SdkClientFactory>, app: AppDescriptor) -> Self {
        Self { factory, app }
    }
}

#[async_trait]
impl ConnectorAdapter for SdkConnector {
    fn backend(&self) -> BackendId {
        BackendId::SdkHosted
    }

    async fn connect(&self) -> Result<ConnectionHandle, ConnectError> {
        let client = self.factory.create(&self.app).await?;
        let provider = client
            .make_provider()
            .ok_or_else(|| ConnectError::Unavailable("sdk did not produce a provider".into()))?;
        debug!(backend = %BackendId::SdkHosted, app = %self.app.app_name, "enabling sdk provider");
        enable_and_sign(BackendId::SdkHosted, provider).await
    }
}

/// Connects to a remote wallet through a relay pairing service.
pub struct RelayConnector {
    factory: Arc<dyn RelayClientFactory>,
    config: RelayConfig,
}

impl RelayConnector {
    pub fn new(factory: Arc<dyn RelayClientFactory>, config: RelayConfig) -> Self {
        Self { factory, config }
    }
}

#[async_trait]
impl ConnectorAdapter for RelayConnector {
    fn backend(&self) -> BackendId {
        BackendId::Relay
    }

    async fn connect(&self) -> Result<ConnectionHandle, ConnectError> {
        if !self.config.has_credential() {
            return Err(ConnectError::Unknown(
                "relay access credential is not configured".into(),
            ));
        }
        let provider = self.factory.create(&self.config)?;
        debug!(backend = %BackendId::Relay, "waiting for relay pairing");
        enable_and_sign(BackendId::Relay, provider).await
    }
}
