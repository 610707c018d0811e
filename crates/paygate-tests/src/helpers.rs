//! Spy detectors and connectors shared by the integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use paygate_core::error::BackendError;
use paygate_core::traits::Signer;
use paygate_core::types::{BackendId, PaymentRequest, TransferRequest, TxRef};
use paygate_wallet::{ConnectError, ConnectionHandle, ConnectorAdapter, Detector};

/// A checksummed recipient used across tests.
pub const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

/// A well-formed payment of 0.01 ETH.
pub fn valid_request() -> PaymentRequest {
    PaymentRequest::new(RECIPIENT, "0.01", 18)
}

/// Detector with a fixed answer, an optional delay, and a probe counter.
pub struct SpyDetector {
    backend: BackendId,
    available: bool,
    delay: Duration,
    probes: AtomicUsize,
}

impl SpyDetector {
    pub fn new(backend: BackendId, available: bool) -> Arc<Self> {
        Self::slow(backend, available, Duration::ZERO)
    }

    pub fn slow(backend: BackendId, available: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            backend,
            available,
            delay,
            probes: AtomicUsize::new(0),
        })
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Detector for SpyDetector {
    fn backend(&self) -> BackendId {
        self.backend
    }

    async fn probe(&self) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.available
    }
}

/// Counts payment attempts between connect and the end of their send,
/// remembering the highest overlap seen.
#[derive(Debug, Default)]
pub struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        let _ = self
            .current
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Most attempts ever in flight at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Signer that returns a fixed result and counts sends.
pub struct SpySigner {
    result: Result<TxRef, BackendError>,
    delay: Duration,
    flight: Arc<InFlight>,
    sends: AtomicUsize,
}

impl SpySigner {
    pub fn new(result: Result<TxRef, BackendError>) -> Arc<Self> {
        Self::tracked(result, Duration::ZERO, InFlight::new())
    }

    fn tracked(
        result: Result<TxRef, BackendError>,
        delay: Duration,
        flight: Arc<InFlight>,
    ) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay,
            flight,
            sends: AtomicUsize::new(0),
        })
    }

    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signer for SpySigner {
    async fn send_transaction(&self, _transfer: &TransferRequest) -> Result<TxRef, BackendError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.flight.exit();
        self.result.clone()
    }
}

/// Connector that records every `connect` and hands out a shared spy signer.
///
/// Every connect enters `flight`; the attempt leaves it when its send
/// returns, or straight away if the connect fails.
pub struct SpyConnector {
    backend: BackendId,
    result: Result<(), ConnectError>,
    delay: Duration,
    flight: Arc<InFlight>,
    signer: Arc<SpySigner>,
    connects: AtomicUsize,
}

impl SpyConnector {
    /// Connects successfully; the signer broadcasts `tx_ref`.
    pub fn broadcasting(backend: BackendId, tx_ref: &str) -> Arc<Self> {
        Self::slow(backend, tx_ref, Duration::ZERO, InFlight::new())
    }

    /// Like [`broadcasting`](Self::broadcasting), but connect and send each
    /// take `delay`, and attempts are recorded in the shared `flight`.
    pub fn slow(
        backend: BackendId,
        tx_ref: &str,
        delay: Duration,
        flight: Arc<InFlight>,
    ) -> Arc<Self> {
        Arc::new(Self {
            backend,
            result: Ok(()),
            delay,
            flight: Arc::clone(&flight),
            signer: SpySigner::tracked(Ok(TxRef::new(tx_ref)), delay, flight),
            connects: AtomicUsize::new(0),
        })
    }

    /// Every connect fails with `err`.
    pub fn failing(backend: BackendId, err: ConnectError) -> Arc<Self> {
        let flight = InFlight::new();
        Arc::new(Self {
            backend,
            result: Err(err),
            delay: Duration::ZERO,
            flight: Arc::clone(&flight),
            signer: SpySigner::tracked(
                Err(BackendError::new("unreachable")),
                Duration::ZERO,
                flight,
            ),
            connects: AtomicUsize::new(0),
        })
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.signer.sends()
    }
}

#[async_trait]
impl ConnectorAdapter for SpyConnector {
    fn backend(&self) -> BackendId {
        self.backend
    }

    async fn connect(&self) -> Result<ConnectionHandle, ConnectError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.flight.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Err(e) = self.result.clone() {
            self.flight.exit();
            return Err(e);
        }
        let signer: Arc<dyn Signer> = Arc::clone(&self.signer) as Arc<dyn Signer>;
        Ok(ConnectionHandle::new(
            self.backend,
            vec!["0xspy".to_string()],
            signer,
        ))
    }
}
