//! Orchestrator configuration.

use std::time::Duration;

use paygate_core::types::{AppDescriptor, RelayConfig};

/// Default bound on a single availability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration for a [`WalletOrchestrator`](crate::WalletOrchestrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Identity passed to SDK-hosted wallets on every client construction.
    pub app: AppDescriptor,
    /// Relay provider settings.
    pub relay: RelayConfig,
    /// Upper bound on each probe; a probe that exceeds it counts as unavailable.
    pub probe_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            app: AppDescriptor {
                app_name: "MyCryptoApp".to_string(),
                app_logo_url: "https://example.com/logo.png".to_string(),
                dark_mode: false,
            },
            relay: RelayConfig::default(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    /// Set the relay access credential.
    pub fn with_relay_credential(mut self, credential: impl Into<String>) -> Self {
        self.relay.access_credential = credential.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_app_descriptor() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.app.app_name, "MyCryptoApp");
        assert!(!cfg.app.dark_mode);
    }

    #[test]
    fn default_has_no_relay_credential() {
        assert!(!OrchestratorConfig::default().relay.has_credential());
    }

    #[test]
    fn default_probe_timeout() {
        assert_eq!(OrchestratorConfig::default().probe_timeout, DEFAULT_PROBE_TIMEOUT);
    }

    #[test]
    fn relay_credential_builder() {
        let cfg = OrchestratorConfig::default().with_relay_credential("project-id");
        assert_eq!(cfg.relay.access_credential, "project-id");
        assert!(cfg.relay.has_credential());
    }
}
