//! Availability probes, one per backend.
//!
//! A probe answers "is this backend usable right now?" without any network
//! I/O and never fails: errors and panics inside a probe count as
//! unavailable, since detection is advisory. [`probe_bounded`] adds the
//! timeout the orchestrator applies to every probe.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, warn};

use paygate_core::traits::{InjectedWallet, SdkClientFactory};
use paygate_core::types::{AppDescriptor, BackendId};

/// Side-effect-free availability probe for one backend.
#[async_trait]
pub trait Detector: Send + Sync {
    /// The backend this detector probes.
    fn backend(&self) -> BackendId;

    /// Whether the backend is currently usable. Never panics to the caller.
    async fn probe(&self) -> bool;
}

/// Run `detector.probe()` bounded by `timeout`; a probe that runs over or
/// panics counts as `false`.
pub async fn probe_bounded(detector: &dyn Detector, timeout: Duration) -> bool {
    let probe = AssertUnwindSafe(detector.probe()).catch_unwind();
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(available)) => available,
        Ok(Err(_)) => {
            warn!(backend = %detector.backend(), "probe panicked");
            false
        }
        Err(_) => {
            warn!(backend = %detector.backend(), ?timeout, "probe timed out");
            false
        }
    }
}

/// Probes for an injected wallet that identifies as the expected one.
pub struct InjectedDetector {
    wallet: Arc<dyn InjectedWallet>,
}

impl InjectedDetector {
    pub fn new(wallet: Arc<dyn InjectedWallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl Detector for InjectedDetector {
    fn backend(&self) -> BackendId {
        BackendId::Injected
    }

    async fn probe(&self) -> bool {
        let wallet = &self.wallet;
        match std::panic::catch_unwind(AssertUnwindSafe(|| {
            wallet.is_present() && wallet.is_expected_wallet()
        })) {
            Ok(available) => available,
            Err(_) => {
                warn!(backend = %BackendId::Injected, "injected wallet probe panicked");
                false
            }
        }
    }
}

/// Probes an SDK-hosted wallet by building a client and asking it for a provider.
///
/// Construction is local but still a side effect; nothing is enabled, so no
/// wallet UI opens.
pub struct SdkDetector {
    factory: Arc<dyn SdkClientFactory>,
    app: AppDescriptor,
}

impl SdkDetector {
    pub fn new(factory: Arc<dyn SdkClientFactory>, app: AppDescriptor) -> Self {
        Self { factory, app }
    }
}

#[async_trait]
impl Detector for SdkDetector {
    fn backend(&self) -> BackendId {
        BackendId::SdkHosted
    }

    async fn probe(&self) -> bool {
        let attempt = async {
            let client = self.factory.create(&self.app).await?;
            Ok::<_, paygate_core::error::BackendError>(client.make_provider().is_some())
        };
        match AssertUnwindSafe(attempt).catch_unwind().await {
            Ok(Ok(available)) => available,
            Ok(Err(e)) => {
                debug!(backend = %BackendId::SdkHosted, error = %e, "sdk client unavailable");
                false
            }
            Err(_) => {
                warn!(backend = %BackendId::SdkHosted, "sdk probe panicked");
                false
            }
        }
    }
}

/// Relay wallets live on the far side of a pairing service and have no local
/// presence to test, so they are always reported available. Real
/// unavailability surfaces when connecting.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayDetector;

#[async_trait]
impl Detector for RelayDetector {
    fn backend(&self) -> BackendId {
        BackendId::Relay
    }

    async fn probe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::sandbox::{SandboxEnvironment, SandboxInjected, SandboxSdkFactory};
    use paygate_core::error::BackendError;
    use paygate_core::traits::Provider;

    fn app() -> AppDescriptor {
        OrchestratorConfig::default().app
    }

    struct PanickingWallet;

    #[async_trait]
    impl InjectedWallet for PanickingWallet {
        fn is_present(&self) -> bool {
            panic!("window.ethereum getter threw")
        }
        fn is_expected_wallet(&self) -> bool {
            true
        }
        async fn request_access(&self) -> Result<Vec<String>, BackendError> {
            Ok(vec![])
        }
        fn as_provider(&self) -> Arc<dyn Provider> {
            unreachable!()
        }
    }

    struct ExplodingDetector;

    #[async_trait]
    impl Detector for ExplodingDetector {
        fn backend(&self) -> BackendId {
            BackendId::SdkHosted
        }

        async fn probe(&self) -> bool {
            panic!("detector blew up")
        }
    }

    #[tokio::test]
    async fn injected_present_and_expected() {
        let env = SandboxEnvironment::default();
        let (wallet, _) = SandboxInjected::from_env(&env);
        assert!(InjectedDetector::new(wallet).probe().await);
    }

    #[tokio::test]
    async fn injected_absent() {
        let env = SandboxEnvironment::bare();
        let (wallet, _) = SandboxInjected::from_env(&env);
        assert!(!InjectedDetector::new(wallet).probe().await);
    }

    #[tokio::test]
    async fn injected_other_wallet_is_unavailable() {
        let mut env = SandboxEnvironment::default();
        env.injected.expected_wallet = false;
        let (wallet, _) = SandboxInjected::from_env(&env);
        assert!(!InjectedDetector::new(wallet).probe().await);
    }

    #[tokio::test]
    async fn injected_panic_counts_as_unavailable() {
        let detector = InjectedDetector::new(Arc::new(PanickingWallet));
        assert!(!detector.probe().await);
    }

    #[tokio::test]
    async fn sdk_with_provider_is_available() {
        let env = SandboxEnvironment::default();
        let (factory, calls) = SandboxSdkFactory::from_env(&env);
        assert!(SdkDetector::new(factory, app()).probe().await);
        assert_eq!(calls.sdk_constructions(), 1);
        assert_eq!(calls.enables(), 0);
    }

    #[tokio::test]
    async fn sdk_without_provider_is_unavailable() {
        let mut env = SandboxEnvironment::default();
        env.sdk.provides_provider = false;
        let (factory, _) = SandboxSdkFactory::from_env(&env);
        assert!(!SdkDetector::new(factory, app()).probe().await);
    }

    #[tokio::test]
    async fn sdk_construction_error_is_unavailable() {
        let mut env = SandboxEnvironment::default();
        env.sdk.constructible = false;
        let (factory, _) = SandboxSdkFactory::from_env(&env);
        assert!(!SdkDetector::new(factory, app()).probe().await);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sdk_probe_times_out() {
        let mut env = SandboxEnvironment::default();
        env.sdk.construct_delay_ms = 60_000;
        let (factory, _) = SandboxSdkFactory::from_env(&env);
        let detector = SdkDetector::new(factory, app());
        assert!(!probe_bounded(&detector, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn bounded_probe_absorbs_panics() {
        assert!(!probe_bounded(&ExplodingDetector, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn relay_is_optimistically_available() {
        assert!(RelayDetector.probe().await);
        assert!(probe_bounded(&RelayDetector, Duration::from_millis(10)).await);
    }
}
