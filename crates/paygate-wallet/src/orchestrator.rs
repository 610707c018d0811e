//! The wallet orchestrator: detection snapshot plus payment state machine.
//!
//! One attempt moves through
//! `Idle → Detecting → Ready → Connecting → Connected → Submitting → {Completed, Failed}`.
//! A connection failure returns the session to `Ready`. Every attempt connects
//! afresh; handles are never reused.
//!
//! Detection runs all probes concurrently and publishes the resulting
//! [`AvailabilityState`] only once every probe has settled, so readers see
//! either the previous snapshot or the complete new one. Attempts are
//! serialized through an attempt lane, and each carries a generation token:
//! once the session is closed, a still-running attempt finishes its wallet
//! call on the retired lane but its state transitions become no-ops, and the
//! next attempt starts on a fresh lane without waiting for it.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use paygate_core::outcome::PaymentOutcome;
use paygate_core::registry;
use paygate_core::traits::{InjectedWallet, RelayClientFactory, SdkClientFactory};
use paygate_core::types::{BackendId, PaymentRequest, ProviderDescriptor, TransferRequest};

use crate::config::OrchestratorConfig;
use crate::connector::{ConnectorAdapter, InjectedConnector, RelayConnector, SdkConnector};
use crate::detector::{Detector, InjectedDetector, RelayDetector, SdkDetector, probe_bounded};
use crate::error::PaymentError;
use crate::executor::PaymentExecutor;

/// External wallet collaborators, one per backend.
#[derive(Clone)]
pub struct Backends {
    pub injected: Arc<dyn InjectedWallet>,
    pub sdk: Arc<dyn SdkClientFactory>,
    pub relay: Arc<dyn RelayClientFactory>,
}

/// Phase of the current payment session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Idle,
    Detecting,
    Ready,
    Connecting,
    Connected,
    Submitting,
    Completed,
    Failed,
}

impl AttemptPhase {
    /// No attempt is in flight.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            AttemptPhase::Idle
                | AttemptPhase::Detecting
                | AttemptPhase::Ready
                | AttemptPhase::Completed
                | AttemptPhase::Failed
        )
    }
}

/// Probe result for one backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub checked_at: DateTime<Utc>,
}

/// Result of one complete detection pass. Replaced wholesale on refresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AvailabilityState {
    pass: u64,
    entries: BTreeMap<BackendId, Availability>,
}

impl AvailabilityState {
    /// Sequence number of the detection pass that produced this snapshot.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn get(&self, backend: BackendId) -> Option<Availability> {
        self.entries.get(&backend).copied()
    }

    /// Whether `backend` was found available. Unprobed backends are not.
    pub fn is_available(&self, backend: BackendId) -> bool {
        self.get(backend).is_some_and(|a| a.available)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackendId, Availability)> + '_ {
        self.entries.iter().map(|(id, a)| (*id, *a))
    }
}

/// One row of the backend list shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BackendEntry {
    pub descriptor: ProviderDescriptor,
    pub available: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct AttemptToken(u64);

#[derive(Debug)]
struct Session {
    phase: AttemptPhase,
    generation: u64,
    last_outcome: Option<PaymentOutcome>,
}

/// Facade coordinating detection, connection and submission.
pub struct WalletOrchestrator {
    detectors: Vec<Arc<dyn Detector>>,
    connectors: HashMap<BackendId, Arc<dyn ConnectorAdapter>>,
    executor: PaymentExecutor,
    config: OrchestratorConfig,
    availability: RwLock<Option<Arc<AvailabilityState>>>,
    /// Held for the whole of a detection pass; guards the pass counter.
    detection: tokio::sync::Mutex<u64>,
    /// Lane held for the whole of a payment attempt. Replaced on
    /// `close_session` so abandoned attempts stop blocking new ones.
    attempt_lane: Mutex<Arc<tokio::sync::Mutex<()>>>,
    session: Mutex<Session>,
}

impl WalletOrchestrator {
    /// Build the standard detector and connector for each backend.
    pub fn new(config: OrchestratorConfig, backends: Backends) -> Self {
        let detectors: Vec<Arc<dyn Detector>> = vec![
            Arc::new(InjectedDetector::new(Arc::clone(&backends.injected))),
            Arc::new(SdkDetector::new(Arc::clone(&backends.sdk), config.app.clone())),
            Arc::new(RelayDetector),
        ];
        let connectors: Vec<Arc<dyn ConnectorAdapter>> = vec![
            Arc::new(InjectedConnector::new(backends.injected)),
            Arc::new(SdkConnector::new(backends.sdk, config.app.clone())),
            Arc::new(RelayConnector::new(backends.relay, config.relay.clone())),
        ];
        Self::from_parts(config, detectors, connectors)
    }

    /// Assemble an orchestrator from explicit detectors and connectors.
    ///
    /// A backend with no detector is never gated on availability; one with no
    /// connector always reports `Unavailable`.
    pub fn from_parts(
        config: OrchestratorConfig,
        detectors: Vec<Arc<dyn Detector>>,
        connectors: Vec<Arc<dyn ConnectorAdapter>>,
    ) -> Self {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.backend(), c))
            .collect();
        Self {
            detectors,
            connectors,
            executor: PaymentExecutor::new(),
            config,
            availability: RwLock::new(None),
            detection: tokio::sync::Mutex::new(0),
            attempt_lane: Mutex::new(Arc::new(tokio::sync::Mutex::new(()))),
            session: Mutex::new(Session {
                phase: AttemptPhase::Idle,
                generation: 0,
                last_outcome: None,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run a fresh detection pass and publish its result.
    pub async fn refresh(&self) -> Arc<AvailabilityState> {
        let mut passes = self.detection.lock().await;
        self.detect(&mut passes).await
    }

    /// Backends in display order with their availability.
    ///
    /// Runs detection on first use; afterwards reads the published snapshot
    /// until [`refresh`](Self::refresh) is called. A call made while a pass
    /// is running waits for that pass to settle.
    pub async fn list_backends(&self) -> Vec<BackendEntry> {
        let state = self.ensure_detected().await;
        registry::descriptors()
            .iter()
            .map(|d| BackendEntry {
                descriptor: *d,
                available: state.is_available(d.id),
            })
            .collect()
    }

    /// The last published snapshot, without waiting on a running pass.
    pub fn snapshot(&self) -> Option<Arc<AvailabilityState>> {
        self.availability.read().clone()
    }

    pub fn phase(&self) -> AttemptPhase {
        self.session.lock().phase
    }

    pub fn last_outcome(&self) -> Option<PaymentOutcome> {
        self.session.lock().last_outcome.clone()
    }

    /// Abandon the current session (the selection UI was closed).
    ///
    /// Any attempt still in flight runs to completion, but its outcome is no
    /// longer recorded and its state transitions are ignored. The next `pay`
    /// does not wait for it.
    pub fn close_session(&self) {
        *self.attempt_lane.lock() = Arc::new(tokio::sync::Mutex::new(()));
        let published = self.availability.read().is_some();
        let mut session = self.session.lock();
        session.generation += 1;
        session.phase = if published {
            AttemptPhase::Ready
        } else {
            AttemptPhase::Idle
        };
        session.last_outcome = None;
        debug!(generation = session.generation, "session closed");
    }

    /// Connect to `backend` and submit `request` through it.
    ///
    /// Never fails: every failure is encoded in the returned outcome. An
    /// invalid request is rejected before any backend is contacted.
    pub async fn pay(&self, backend: BackendId, request: PaymentRequest) -> PaymentOutcome {
        let transfer = match self.executor.build_transfer(&request) {
            Ok(transfer) => transfer,
            Err(e) => {
                warn!(%backend, error = %e, "rejecting malformed payment request");
                return e.into();
            }
        };

        let _lane = self.enter_lane().await;
        let token = self.begin_attempt();
        let outcome = self.run_attempt(token, backend, &transfer).await;
        self.finish_attempt(token, &outcome);
        outcome
    }

    /// Run [`pay`](Self::pay) on a detached task.
    ///
    /// Dropping the returned handle does not abort the wallet request.
    pub fn spawn_payment(
        self: &Arc<Self>,
        backend: BackendId,
        request: PaymentRequest,
    ) -> JoinHandle<PaymentOutcome> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.pay(backend, request).await })
    }

    async fn ensure_detected(&self) -> Arc<AvailabilityState> {
        let mut passes = self.detection.lock().await;
        let published = self.availability.read().clone();
        match published {
            Some(state) => state,
            None => self.detect(&mut passes).await,
        }
    }

    async fn detect(&self, passes: &mut u64) -> Arc<AvailabilityState> {
        self.set_settled_phase(AttemptPhase::Detecting);
        *passes += 1;
        let pass = *passes;
        let timeout = self.config.probe_timeout;

        let probes = self.detectors.iter().map(|detector| async move {
            let available = probe_bounded(detector.as_ref(), timeout).await;
            let checked_at = Utc::now();
            (detector.backend(), Availability { available, checked_at })
        });
        let entries: BTreeMap<BackendId, Availability> = join_all(probes).await.into_iter().collect();

        let state = Arc::new(AvailabilityState { pass, entries });
        *self.availability.write() = Some(Arc::clone(&state));
        self.set_settled_phase(AttemptPhase::Ready);

        let available: Vec<BackendId> = state
            .iter()
            .filter(|(_, a)| a.available)
            .map(|(id, _)| id)
            .collect();
        info!(pass, ?available, "detection pass complete");
        state
    }

    async fn run_attempt(
        &self,
        token: AttemptToken,
        backend: BackendId,
        transfer: &TransferRequest,
    ) -> PaymentOutcome {
        let state = self.ensure_detected().await;
        if state.get(backend).is_some_and(|a| !a.available) {
            info!(%backend, "backend not available");
            return PaymentError::BackendUnavailable(backend).into();
        }
        let Some(connector) = self.connectors.get(&backend).cloned() else {
            warn!(%backend, "no connector registered");
            return PaymentError::BackendUnavailable(backend).into();
        };

        self.transition(token, AttemptPhase::Connecting);
        let handle = match AssertUnwindSafe(connector.connect()).catch_unwind().await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                warn!(%backend, error = %e, "connection failed");
                self.transition(token, AttemptPhase::Ready);
                return PaymentError::from_connect(backend, e).into();
            }
            Err(_) => {
                error!(%backend, "backend panicked during connect");
                self.transition(token, AttemptPhase::Ready);
                return PaymentError::ConnectionFailed("backend panicked during connect".into())
                    .into();
            }
        };
        self.transition(token, AttemptPhase::Connected);

        self.transition(token, AttemptPhase::Submitting);
        let submitted = AssertUnwindSafe(self.executor.submit_transfer(handle.signer(), transfer))
            .catch_unwind()
            .await;
        let outcome = submitted.unwrap_or_else(|_| {
            error!(%backend, "backend panicked during submission");
            PaymentError::SubmissionFailed("backend panicked during submission".into()).into()
        });
        self.transition(
            token,
            if outcome.is_submitted() {
                AttemptPhase::Completed
            } else {
                AttemptPhase::Failed
            },
        );
        outcome
    }

    /// Wait for the current attempt lane. A lane retired by `close_session`
    /// while waiting is abandoned for the new one.
    async fn enter_lane(&self) -> OwnedMutexGuard<()> {
        loop {
            let lane = Arc::clone(&*self.attempt_lane.lock());
            let guard = Arc::clone(&lane).lock_owned().await;
            let current = Arc::clone(&*self.attempt_lane.lock());
            if Arc::ptr_eq(&lane, &current) {
                return guard;
            }
        }
    }

    fn begin_attempt(&self) -> AttemptToken {
        let mut session = self.session.lock();
        session.generation += 1;
        AttemptToken(session.generation)
    }

    fn finish_attempt(&self, token: AttemptToken, outcome: &PaymentOutcome) {
        let mut session = self.session.lock();
        if session.generation != token.0 {
            debug!(?outcome, "discarding outcome of abandoned attempt");
            return;
        }
        session.last_outcome = Some(outcome.clone());
    }

    fn transition(&self, token: AttemptToken, phase: AttemptPhase) {
        let mut session = self.session.lock();
        if session.generation != token.0 {
            return;
        }
        debug!(from = ?session.phase, to = ?phase, "attempt transition");
        session.phase = phase;
    }

    /// Detection only moves the phase when no attempt is in flight.
    fn set_settled_phase(&self, phase: AttemptPhase) {
        let mut session = self.session.lock();
        if session.phase.is_settled() {
            session.phase = phase;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{Reply, SandboxCalls, SandboxEnvironment, SendReply};
    use paygate_core::constants::NATIVE_DECIMALS;
    use paygate_core::outcome::FailureCause;
    use paygate_core::types::TxRef;

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn request() -> PaymentRequest {
        PaymentRequest::new(RECIPIENT, "0.01", NATIVE_DECIMALS)
    }

    fn orchestrator(env: SandboxEnvironment) -> (WalletOrchestrator, Arc<SandboxCalls>) {
        let (backends, calls) = env.into_backends();
        let config = OrchestratorConfig::default().with_relay_credential("project-id");
        (WalletOrchestrator::new(config, backends), calls)
    }

    #[tokio::test]
    async fn starts_idle() {
        let (orch, _) = orchestrator(SandboxEnvironment::default());
        assert_eq!(orch.phase(), AttemptPhase::Idle);
        assert!(orch.snapshot().is_none());
    }

    #[tokio::test]
    async fn list_backends_in_registry_order() {
        let (orch, _) = orchestrator(SandboxEnvironment::default());
        let list = orch.list_backends().await;
        let ids: Vec<BackendId> = list.iter().map(|e| e.descriptor.id).collect();
        assert_eq!(ids, BackendId::ALL.to_vec());
        assert!(list.iter().all(|e| e.available));
        assert_eq!(orch.phase(), AttemptPhase::Ready);
    }

    #[tokio::test]
    async fn bare_environment_availability() {
        let (orch, _) = orchestrator(SandboxEnvironment::bare());
        let state = orch.refresh().await;
        assert!(!state.is_available(BackendId::Injected));
        assert!(!state.is_available(BackendId::SdkHosted));
        assert!(state.is_available(BackendId::Relay));
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot() {
        let (orch, _) = orchestrator(SandboxEnvironment::default());
        let first = orch.refresh().await;
        let second = orch.refresh().await;
        assert_eq!(first.pass(), 1);
        assert_eq!(second.pass(), 2);
        assert_eq!(orch.snapshot().unwrap().pass(), 2);
    }

    #[tokio::test]
    async fn successful_payment_completes() {
        let mut env = SandboxEnvironment::default();
        env.injected.signer.reply = SendReply::Broadcast { tx_ref: "0xabc".into() };
        let (orch, calls) = orchestrator(env);
        let outcome = orch.pay(BackendId::Injected, request()).await;
        assert_eq!(outcome, PaymentOutcome::Submitted { tx_ref: TxRef::new("0xabc") });
        assert_eq!(orch.phase(), AttemptPhase::Completed);
        assert_eq!(orch.last_outcome(), Some(outcome));
        assert_eq!(calls.sends(), 1);
    }

    #[tokio::test]
    async fn unavailable_backend_is_not_connected() {
        let (orch, calls) = orchestrator(SandboxEnvironment::bare());
        let outcome = orch.pay(BackendId::Injected, request()).await;
        assert_eq!(outcome, PaymentOutcome::Unavailable { backend: BackendId::Injected });
        assert_eq!(calls.access_requests(), 0);
    }

    #[tokio::test]
    async fn connect_rejection_returns_to_ready() {
        let mut env = SandboxEnvironment::default();
        env.sdk.enable = Reply::Reject { message: "User denied account authorization".into() };
        let (orch, calls) = orchestrator(env);
        let outcome = orch.pay(BackendId::SdkHosted, request()).await;
        assert_eq!(
            outcome,
            PaymentOutcome::Rejected { reason: "User denied account authorization".into() }
        );
        assert_eq!(orch.phase(), AttemptPhase::Ready);
        assert_eq!(calls.sends(), 0);
    }

    #[tokio::test]
    async fn unreachable_relay_is_unavailable() {
        let mut env = SandboxEnvironment::default();
        env.relay.reachable = false;
        let (orch, _) = orchestrator(env);
        let outcome = orch.pay(BackendId::Relay, request()).await;
        assert_eq!(outcome, PaymentOutcome::Unavailable { backend: BackendId::Relay });
    }

    #[tokio::test]
    async fn submission_error_fails_attempt() {
        let mut env = SandboxEnvironment::default();
        env.relay.signer.reply = SendReply::Error {
            code: Some(-32000),
            message: "nonce too low".into(),
        };
        let (orch, calls) = orchestrator(env);
        let outcome = orch.pay(BackendId::Relay, request()).await;
        assert_eq!(
            outcome,
            PaymentOutcome::Failed { cause: FailureCause::SubmissionFailed("nonce too low".into()) }
        );
        assert_eq!(orch.phase(), AttemptPhase::Failed);
        assert_eq!(calls.sends(), 1);
    }

    #[tokio::test]
    async fn missing_relay_credential_fails_connection() {
        let (backends, _) = SandboxEnvironment::default().into_backends();
        let orch = WalletOrchestrator::new(OrchestratorConfig::default(), backends);
        let outcome = orch.pay(BackendId::Relay, request()).await;
        assert!(matches!(
            outcome,
            PaymentOutcome::Failed { cause: FailureCause::ConnectionFailed(_) }
        ));
    }

    #[tokio::test]
    async fn malformed_request_leaves_session_untouched() {
        let (orch, calls) = orchestrator(SandboxEnvironment::default());
        let outcome = orch
            .pay(BackendId::Injected, PaymentRequest::new(RECIPIENT, "-1", 18))
            .await;
        assert!(matches!(
            outcome,
            PaymentOutcome::Failed { cause: FailureCause::MalformedRequest(_) }
        ));
        assert_eq!(orch.phase(), AttemptPhase::Idle);
        assert!(orch.snapshot().is_none());
        assert_eq!(calls.access_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_session_discards_late_outcome() {
        let mut env = SandboxEnvironment::default();
        env.injected.signer.delay_ms = 5_000;
        let (backends, calls) = env.into_backends();
        let orch = Arc::new(WalletOrchestrator::new(OrchestratorConfig::default(), backends));
        orch.refresh().await;

        let handle = orch.spawn_payment(BackendId::Injected, request());
        while calls.sends() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(orch.phase(), AttemptPhase::Submitting);

        orch.close_session();
        assert_eq!(orch.phase(), AttemptPhase::Ready);

        let outcome = handle.await.unwrap();
        assert!(outcome.is_submitted());
        assert_eq!(orch.phase(), AttemptPhase::Ready);
        assert_eq!(orch.last_outcome(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_still_completes_request() {
        let mut env = SandboxEnvironment::default();
        env.injected.signer.delay_ms = 1_000;
        let (backends, calls) = env.into_backends();
        let orch = Arc::new(WalletOrchestrator::new(OrchestratorConfig::default(), backends));

        drop(orch.spawn_payment(BackendId::Injected, request()));
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;

        assert_eq!(calls.sends(), 1);
        assert_eq!(orch.phase(), AttemptPhase::Completed);
        assert!(orch.last_outcome().is_some_and(|o| o.is_submitted()));
    }
}
