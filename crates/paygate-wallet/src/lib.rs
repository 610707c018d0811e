//! # paygate-wallet — multi-backend wallet orchestration.
//!
//! Detects which wallet backends are usable, connects to the one the user
//! picks, and submits a single native-asset transfer through it.
//!
//! # Modules
//!
//! - [`error`] — `ConnectError` and the `PaymentError` taxonomy
//! - [`config`] — `OrchestratorConfig`
//! - [`detector`] — side-effect-free availability probes
//! - [`connector`] — one `ConnectorAdapter` per connection protocol
//! - [`executor`] — builds and submits the transfer
//! - [`orchestrator`] — `WalletOrchestrator` facade and attempt state machine
//! - [`sandbox`] — scripted in-memory backends

pub mod config;
pub mod connector;
pub mod detector;
pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod sandbox;

// Re-exports for convenient access
pub use config::OrchestratorConfig;
pub use connector::{ConnectionHandle, ConnectorAdapter};
pub use detector::Detector;
pub use error::{ConnectError, PaymentError};
pub use executor::PaymentExecutor;
pub use orchestrator::{
    AttemptPhase, Availability, AvailabilityState, BackendEntry, Backends, WalletOrchestrator,
};
