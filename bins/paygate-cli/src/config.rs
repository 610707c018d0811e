//! CLI configuration loaded from environment variables.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use paygate_core::constants::NATIVE_DECIMALS;
use paygate_wallet::OrchestratorConfig;

#[derive(Clone, Debug)]
pub struct Config {
    /// Payment recipient; may also be given on the command line.
    pub recipient: Option<String>,
    /// Amount in whole asset units, as decimal text.
    pub amount: String,
    /// Decimal places of the asset.
    pub asset_decimals: u8,
    /// SDK application descriptor, relay credential and probe timeout.
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut orchestrator = OrchestratorConfig::default();

        let recipient = lookup("PAYGATE_RECIPIENT").filter(|r| !r.trim().is_empty());

        let amount = lookup("PAYGATE_AMOUNT").unwrap_or_else(|| "0.01".to_string());

        let asset_decimals: u8 = match lookup("PAYGATE_ASSET_DECIMALS") {
            Some(v) => v
                .parse()
                .context("PAYGATE_ASSET_DECIMALS must be an integer between 0 and 255")?,
            None => NATIVE_DECIMALS,
        };

        if let Some(credential) = lookup("PAYGATE_RELAY_CREDENTIAL") {
            orchestrator.relay.access_credential = credential;
        }
        if let Some(name) = lookup("PAYGATE_APP_NAME") {
            orchestrator.app.app_name = name;
        }
        if let Some(url) = lookup("PAYGATE_APP_LOGO_URL") {
            orchestrator.app.app_logo_url = url;
        }
        if let Some(v) = lookup("PAYGATE_DARK_MODE") {
            orchestrator.app.dark_mode = parse_flag(&v).context("PAYGATE_DARK_MODE")?;
        }
        if let Some(v) = lookup("PAYGATE_PROBE_TIMEOUT_MS") {
            let ms: u64 = v
                .parse()
                .context("PAYGATE_PROBE_TIMEOUT_MS must be a positive integer")?;
            if ms == 0 {
                bail!("PAYGATE_PROBE_TIMEOUT_MS must be a positive integer");
            }
            orchestrator.probe_timeout = Duration::from_millis(ms);
        }

        Ok(Config {
            recipient,
            amount,
            asset_decimals,
            orchestrator,
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.recipient, None);
        assert_eq!(config.amount, "0.01");
        assert_eq!(config.asset_decimals, 18);
        assert_eq!(config.orchestrator, OrchestratorConfig::default());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("PAYGATE_RECIPIENT", "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            ("PAYGATE_AMOUNT", "1.5"),
            ("PAYGATE_ASSET_DECIMALS", "6"),
            ("PAYGATE_RELAY_CREDENTIAL", "abc123"),
            ("PAYGATE_APP_NAME", "Shop"),
            ("PAYGATE_DARK_MODE", "true"),
            ("PAYGATE_PROBE_TIMEOUT_MS", "250"),
        ])
        .unwrap();
        assert!(config.recipient.is_some());
        assert_eq!(config.amount, "1.5");
        assert_eq!(config.asset_decimals, 6);
        assert!(config.orchestrator.relay.has_credential());
        assert_eq!(config.orchestrator.app.app_name, "Shop");
        assert!(config.orchestrator.app.dark_mode);
        assert_eq!(config.orchestrator.probe_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_recipient_is_unset() {
        let config = load(&[("PAYGATE_RECIPIENT", "  ")]).unwrap();
        assert_eq!(config.recipient, None);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        assert!(load(&[("PAYGATE_ASSET_DECIMALS", "300")]).is_err());
        assert!(load(&[("PAYGATE_PROBE_TIMEOUT_MS", "0")]).is_err());
        assert!(load(&[("PAYGATE_PROBE_TIMEOUT_MS", "soon")]).is_err());
        assert!(load(&[("PAYGATE_DARK_MODE", "maybe")]).is_err());
    }
}
