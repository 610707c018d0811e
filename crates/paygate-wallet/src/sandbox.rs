//! Scripted in-memory wallet backends.
//!
//! A [`SandboxEnvironment`] describes, per backend, whether it is present and
//! how each step (account access, enable, send) answers. It deserializes from
//! JSON so the CLI can run whole payment flows without a browser, and every
//! call is counted in [`SandboxCalls`] so tests can assert on interactions.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use paygate_core::error::BackendError;
use paygate_core::traits::{
    EnableableProvider, InjectedWallet, Provider, RelayClientFactory, SdkClient,
    SdkClientFactory, Signer,
};
use paygate_core::types::{AppDescriptor, RelayConfig, TransferRequest, TxRef};

use crate::orchestrator::Backends;

/// Account every sandbox wallet authorizes unless the script says otherwise.
pub const SANDBOX_ACCOUNT: &str = "0x00000000000000000000000000000000000000a1";

/// Errors loading a sandbox environment file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SandboxError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// How a scripted approval step answers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Reply {
    #[default]
    Approve,
    /// The user declines (EIP-1193 code 4001).
    Reject { message: String },
    /// Any other backend failure.
    Error {
        #[serde(default)]
        code: Option<i64>,
        message: String,
    },
}

impl Reply {
    fn resolve<T>(&self, value: T) -> Result<T, BackendError> {
        match self {
            Reply::Approve => Ok(value),
            Reply::Reject { message } => Err(BackendError::user_rejected(message.clone())),
            Reply::Error { code: Some(code), message } => {
                Err(BackendError::with_code(*code, message.clone()))
            }
            Reply::Error { code: None, message } => Err(BackendError::new(message.clone())),
        }
    }
}

/// How a scripted signer answers `send_transaction`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SendReply {
    Broadcast { tx_ref: String },
    Reject { message: String },
    Error {
        #[serde(default)]
        code: Option<i64>,
        message: String,
    },
}

impl Default for SendReply {
    fn default() -> Self {
        SendReply::Broadcast {
            tx_ref: format!("0x{}", "ab".repeat(32)),
        }
    }
}

/// Scripted signer behavior.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerScript {
    pub reply: SendReply,
    /// Simulated time the user takes to confirm, in milliseconds.
    pub delay_ms: u64,
}

/// Scripted injected (extension) wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectedScript {
    pub present: bool,
    pub expected_wallet: bool,
    pub accounts: Vec<String>,
    pub access: Reply,
    pub delay_ms: u64,
    pub signer: SignerScript,
}

impl Default for InjectedScript {
    fn default() -> Self {
        Self {
            present: true,
            expected_wallet: true,
            accounts: vec![SANDBOX_ACCOUNT.to_string()],
            access: Reply::Approve,
            delay_ms: 0,
            signer: SignerScript::default(),
        }
    }
}

/// Scripted SDK-hosted wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkScript {
    pub constructible: bool,
    pub provides_provider: bool,
    pub construct_delay_ms: u64,
    pub accounts: Vec<String>,
    pub enable: Reply,
    pub delay_ms: u64,
    pub signer: SignerScript,
}

impl Default for SdkScript {
    fn default() -> Self {
        Self {
            constructible: true,
            provides_provider: true,
            construct_delay_ms: 0,
            accounts: vec![SANDBOX_ACCOUNT.to_string()],
            enable: Reply::Approve,
            delay_ms: 0,
            signer: SignerScript::default(),
        }
    }
}

/// Scripted relay-paired wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayScript {
    /// When false, enabling fails with a disconnected error after `delay_ms`.
    pub reachable: bool,
    pub accounts: Vec<String>,
    pub enable: Reply,
    pub delay_ms: u64,
    pub signer: SignerScript,
}

impl Default for RelayScript {
    fn default() -> Self {
        Self {
            reachable: true,
            accounts: vec![SANDBOX_ACCOUNT.to_string()],
            enable: Reply::Approve,
            delay_ms: 0,
            signer: SignerScript::default(),
        }
    }
}

/// A complete scripted environment: one script per backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxEnvironment {
    pub injected: InjectedScript,
    pub sdk: SdkScript,
    pub relay: RelayScript,
}

impl SandboxEnvironment {
    /// An environment with no extension installed and no SDK provider.
    pub fn bare() -> Self {
        let mut env = Self::default();
        env.injected.present = false;
        env.sdk.provides_provider = false;
        env
    }

    /// Load an environment from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SandboxError> {
        let text = std::fs::read_to_string(path).map_err(|e| SandboxError::Io(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| SandboxError::Parse(e.to_string()))
    }

    /// Build collaborator objects for every backend, sharing one call counter.
    pub fn into_backends(self) -> (Backends, Arc<SandboxCalls>) {
        let calls = Arc::new(SandboxCalls::default());
        let backends = Backends {
            injected: Arc::new(SandboxInjected {
                script: self.injected,
                calls: Arc::clone(&calls),
            }),
            sdk: Arc::new(SandboxSdkFactory {
                script: self.sdk,
                calls: Arc::clone(&calls),
            }),
            relay: Arc::new(SandboxRelayFactory {
                script: self.relay,
                calls: Arc::clone(&calls),
            }),
        };
        (backends, calls)
    }
}

/// Counts of calls made into sandbox backends.
#[derive(Debug, Default)]
pub struct SandboxCalls {
    access_requests: AtomicUsize,
    sdk_constructions: AtomicUsize,
    relay_constructions: AtomicUsize,
    enables: AtomicUsize,
    sends: AtomicUsize,
}

impl SandboxCalls {
    pub fn access_requests(&self) -> usize {
        self.access_requests.load(Ordering::SeqCst)
    }

    pub fn sdk_constructions(&self) -> usize {
        self.sdk_constructions.load(Ordering::SeqCst)
    }

    pub fn relay_constructions(&self) -> usize {
        self.relay_constructions.load(Ordering::SeqCst)
    }

    pub fn enables(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Scripted signer.
pub struct SandboxSigner {
    script: SignerScript,
    calls: Arc<SandboxCalls>,
}

#[async_trait]
impl Signer for SandboxSigner {
    async fn send_transaction(&self, transfer: &TransferRequest) -> Result<TxRef, BackendError> {
        SandboxCalls::bump(&self.calls.sends);
        debug!(to = %transfer.to, value = %transfer.value, "sandbox send_transaction");
        pause(self.script.delay_ms).await;
        match &self.script.reply {
            SendReply::Broadcast { tx_ref } => Ok(TxRef::new(tx_ref.clone())),
            SendReply::Reject { message } => Err(BackendError::user_rejected(message.clone())),
            SendReply::Error { code: Some(code), message } => {
                Err(BackendError::with_code(*code, message.clone()))
            }
            SendReply::Error { code: None, message } => Err(BackendError::new(message.clone())),
        }
    }
}

/// Scripted provider shared by all three backends.
pub struct SandboxProvider {
    reachable: bool,
    accounts: Vec<String>,
    enable: Reply,
    delay_ms: u64,
    signer: SignerScript,
    calls: Arc<SandboxCalls>,
}

impl Provider for SandboxProvider {
    fn get_signer(&self) -> Result<Arc<dyn Signer>, BackendError> {
        Ok(Arc::new(SandboxSigner {
            script: self.signer.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[async_trait]
impl EnableableProvider for SandboxProvider {
    async fn enable(&self) -> Result<Vec<String>, BackendError> {
        SandboxCalls::bump(&self.calls.enables);
        pause(self.delay_ms).await;
        if !self.reachable {
            return Err(BackendError::disconnected("relay connection timed out"));
        }
        self.enable.resolve(self.accounts.clone())
    }
}

/// Scripted injected wallet.
pub struct SandboxInjected {
    script: InjectedScript,
    calls: Arc<SandboxCalls>,
}

impl SandboxInjected {
    pub fn from_env(env: &SandboxEnvironment) -> (Arc<Self>, Arc<SandboxCalls>) {
        let calls = Arc::new(SandboxCalls::default());
        let wallet = Arc::new(Self {
            script: env.injected.clone(),
            calls: Arc::clone(&calls),
        });
        (wallet, calls)
    }
}

#[async_trait]
impl InjectedWallet for SandboxInjected {
    fn is_present(&self) -> bool {
        self.script.present
    }

    fn is_expected_wallet(&self) -> bool {
        self.script.present && self.script.expected_wallet
    }

    async fn request_access(&self) -> Result<Vec<String>, BackendError> {
        SandboxCalls::bump(&self.calls.access_requests);
        pause(self.script.delay_ms).await;
        self.script.access.resolve(self.script.accounts.clone())
    }

    fn as_provider(&self) -> Arc<dyn Provider> {
        Arc::new(SandboxProvider {
            reachable: true,
            accounts: self.script.accounts.clone(),
            enable: Reply::Approve,
            delay_ms: 0,
            signer: self.script.signer.clone(),
            calls: Arc::clone(&self.calls),
        })
    }
}

/// Scripted SDK client.
pub struct SandboxSdkClient {
    provider: Option<Arc<SandboxProvider>>,
}

impl SdkClient for SandboxSdkClient {
    fn make_provider(&self) -> Option<Arc<dyn EnableableProvider>> {
        self.provider
            .as_ref()
            .map(|p| Arc::clone(p) as Arc<dyn EnableableProvider>)
    }
}

/// Scripted SDK client factory.
pub struct SandboxSdkFactory {
    script: SdkScript,
    calls: Arc<SandboxCalls>,
}

impl SandboxSdkFactory {
    pub fn from_env(env: &SandboxEnvironment) -> (Arc<Self>, Arc<SandboxCalls>) {
        let calls = Arc::new(SandboxCalls::default());
        let factory = Arc::new(Self {
            script: env.sdk.clone(),
            calls: Arc::clone(&calls),
        });
        (factory, calls)
    }
}

#[async_trait]
impl SdkClientFactory for SandboxSdkFactory {
    async fn create(&self, app: &AppDescriptor) -> Result<Box<dyn SdkClient>, BackendError> {
        SandboxCalls::bump(&self.calls.sdk_constructions);
        debug!(app = %app.app_name, "sandbox sdk client constructed");
        pause(self.script.construct_delay_ms).await;
        if !self.script.constructible {
            return Err(BackendError::new("sdk failed to initialize"));
        }
        let provider = self.script.provides_provider.then(|| {
            Arc::new(SandboxProvider {
                reachable: true,
                accounts: self.script.accounts.clone(),
                enable: self.script.enable.clone(),
                delay_ms: self.script.delay_ms,
                signer: self.script.signer.clone(),
                calls: Arc::clone(&self.calls),
            })
        });
        Ok(Box::new(SandboxSdkClient { provider }))
    }
}

/// Scripted relay provider factory.
pub struct SandboxRelayFactory {
    script: RelayScript,
    calls: Arc<SandboxCalls>,
}

impl SandboxRelayFactory {
    pub fn from_env(env: &SandboxEnvironment) -> (Arc<Self>, Arc<SandboxCalls>) {
        let calls = Arc::new(SandboxCalls::default());
        let factory = Arc::new(Self {
            script: env.relay.clone(),
            calls: Arc::clone(&calls),
        });
        (factory, calls)
    }
}

impl RelayClientFactory for SandboxRelayFactory {
    fn create(&self, config: &RelayConfig) -> Result<Arc<dyn EnableableProvider>, BackendError> {
        SandboxCalls::bump(&self.calls.relay_constructions);
        debug!(credential_set = config.has_credential(), "sandbox relay provider constructed");
        Ok(Arc::new(SandboxProvider {
            reachable: self.script.reachable,
            accounts: self.script.accounts.clone(),
            enable: self.script.enable.clone(),
            delay_ms: self.script.delay_ms,
            signer: self.script.signer.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}
