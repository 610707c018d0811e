//! Core data types: backend identities, payment requests, and transfers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::amount::Amount;
use crate::error::RequestError;

/// Connection protocol of a supported wallet backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendId {
    /// Wallet object injected into the page by a browser extension.
    Injected,
    /// Wallet reached through a vendor SDK that hosts its own provider.
    SdkHosted,
    /// Remote wallet paired through a relay service (QR code).
    Relay,
}

impl BackendId {
    /// All backends, in display order.
    pub const ALL: [BackendId; 3] = [BackendId::Injected, BackendId::SdkHosted, BackendId::Relay];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendId::Injected => "injected",
            BackendId::SdkHosted => "sdk-hosted",
            BackendId::Relay => "relay",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "injected" | "metamask" => Ok(BackendId::Injected),
            "sdk-hosted" | "sdk" | "coinbase" => Ok(BackendId::SdkHosted),
            "relay" | "walletconnect" => Ok(BackendId::Relay),
            other => Err(format!("unknown backend: {other}")),
        }
    }
}

/// Opaque reference to a backend's icon asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct IconRef(pub &'static str);

/// Static description of a supported wallet backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub id: BackendId,
    pub display_name: &'static str,
    pub icon: IconRef,
}

/// Application identity handed to SDK-hosted wallets when the client is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub app_name: String,
    pub app_logo_url: String,
    pub dark_mode: bool,
}

/// Settings for relay-based providers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Network-access credential for the relay's RPC gateway (e.g. an Infura project id).
    pub access_credential: String,
}

impl RelayConfig {
    pub fn has_credential(&self) -> bool {
        !self.access_credential.trim().is_empty()
    }
}

/// A payment as supplied by the UI collaborator, not yet validated.
///
/// `amount` is decimal text in whole asset units, converted to base units
/// with `asset_decimals` places.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub recipient: String,
    pub amount: String,
    pub asset_decimals: u8,
}

impl PaymentRequest {
    pub fn new(recipient: impl Into<String>, amount: impl Into<String>, asset_decimals: u8) -> Self {
        Self {
            recipient: recipient.into(),
            amount: amount.into(),
            asset_decimals,
        }
    }

    /// Check address and amount well-formedness and build the transfer.
    pub fn validate(&self) -> Result<TransferRequest, RequestError> {
        let to = Address::parse(&self.recipient)?;
        let value = Amount::parse_decimal(&self.amount, self.asset_decimals)?;
        Ok(TransferRequest { to, value })
    }
}

/// A native-asset transfer ready to hand to a signer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: Address,
    pub value: Amount,
}

/// Opaque identifier a backend returns for a broadcast transfer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxRef(pub String);

impl TxRef {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NATIVE_DECIMALS;
    use crate::error::{AddressError, AmountError};

    const RECIPIENT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn backend_id_parses_aliases() {
        assert_eq!("metamask".parse::<BackendId>().unwrap(), BackendId::Injected);
        assert_eq!("Coinbase".parse::<BackendId>().unwrap(), BackendId::SdkHosted);
        assert_eq!("walletconnect".parse::<BackendId>().unwrap(), BackendId::Relay);
        assert!("ledger".parse::<BackendId>().is_err());
    }

    #[test]
    fn backend_id_display_matches_serde() {
        for id in BackendId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{id}\""));
        }
    }

    #[test]
    fn validate_builds_transfer() {
        let req = PaymentRequest::new(RECIPIENT, "0.01", NATIVE_DECIMALS);
        let transfer = req.validate().unwrap();
        assert_eq!(transfer.to.to_string(), RECIPIENT);
        assert_eq!(transfer.value.base_units(), 10_000_000_000_000_000);
    }

    #[test]
    fn validate_rejects_empty_recipient() {
        let req = PaymentRequest::new("", "0.01", NATIVE_DECIMALS);
        assert_eq!(req.validate(), Err(RequestError::Recipient(AddressError::Empty)));
    }

    #[test]
    fn validate_rejects_bad_amount() {
        let req = PaymentRequest::new(RECIPIENT, "abc", NATIVE_DECIMALS);
        assert_eq!(
            req.validate(),
            Err(RequestError::Amount(AmountError::InvalidCharacter('a')))
        );
    }

    #[test]
    fn relay_credential_blank_is_missing() {
        assert!(!RelayConfig::default().has_credential());
        let cfg = RelayConfig { access_credential: "  ".into() };
        assert!(!cfg.has_credential());
    }
}
