//! EVM account addresses.
//!
//! Addresses are 20 bytes written as `0x` followed by 40 hex digits. Parsing
//! accepts all-lowercase and all-uppercase digits as-is; mixed-case input must
//! carry a valid [EIP-55] checksum. Display always renders the checksummed form.
//!
//! [EIP-55]: https://eips.ethereum.org/EIPS/eip-55

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

use crate::constants::ADDRESS_LEN;
use crate::error::AddressError;

/// A 20-byte EVM account address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    pub const ZERO: Self = Self([0u8; ADDRESS_LEN]);

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// Encode as an EIP-55 mixed-case checksummed string.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            if c.is_ascii_alphabetic() && checksum_nibble(&hash, i) >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Parse and validate an address string.
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        let digits = s.strip_prefix("0x").ok_or(AddressError::MissingPrefix)?;

        if let Some(bad) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(AddressError::InvalidCharacter(bad));
        }
        if digits.len() != ADDRESS_LEN * 2 {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| AddressError::InvalidLength(digits.len()))?;
        let address = Self(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(AddressError::InvalidChecksum);
        }

        Ok(address)
    }
}

/// Nibble `index` of the checksum hash, high nibble first.
fn checksum_nibble(hash: &[u8], index: usize) -> u8 {
    let byte = hash[index / 2];
    if index % 2 == 0 { byte >> 4 } else { byte & 0x0f }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Test vectors from EIP-55.
    const CHECKSUMMED: &[&str] = &[
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
        "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
        "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
    ];

    #[test]
    fn eip55_vectors_roundtrip() {
        for s in CHECKSUMMED {
            let addr: Address = s.parse().unwrap();
            assert_eq!(addr.to_checksum(), *s);
        }
    }

    #[test]
    fn lowercase_and_uppercase_accepted() {
        let lower = CHECKSUMMED[0].to_ascii_lowercase();
        let upper = format!("0x{}", CHECKSUMMED[0][2..].to_ascii_uppercase());
        let a: Address = lower.parse().unwrap();
        let b: Address = upper.parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), CHECKSUMMED[0]);
    }

    #[test]
    fn bad_checksum_rejected() {
        // Flip the case of one letter in a valid checksum.
        let bad = "0x5aaeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert_eq!(Address::parse(bad), Err(AddressError::InvalidChecksum));
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(Address::parse(""), Err(AddressError::Empty));
    }

    #[test]
    fn missing_prefix_rejected() {
        let s = &CHECKSUMMED[0][2..];
        assert_eq!(Address::parse(s), Err(AddressError::MissingPrefix));
    }

    #[test]
    fn placeholder_recipient_rejected() {
        assert_eq!(
            Address::parse("RECIPIENT_ADDRESS"),
            Err(AddressError::MissingPrefix)
        );
    }

    #[test]
    fn wrong_length_rejected() {
        assert_eq!(Address::parse("0xabc"), Err(AddressError::InvalidLength(3)));
        let long = format!("{}00", CHECKSUMMED[0].to_ascii_lowercase());
        assert_eq!(Address::parse(&long), Err(AddressError::InvalidLength(42)));
    }

    #[test]
    fn non_hex_rejected() {
        let s = "0xzz00000000000000000000000000000000000000";
        assert_eq!(Address::parse(s), Err(AddressError::InvalidCharacter('z')));
    }

    #[test]
    fn serde_uses_checksum_string() {
        let addr: Address = CHECKSUMMED[1].parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", CHECKSUMMED[1]));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn zero_address_is_well_formed() {
        let addr: Address = "0x0000000000000000000000000000000000000000".parse().unwrap();
        assert_eq!(addr, Address::ZERO);
    }

    proptest! {
        #[test]
        fn checksum_form_always_reparses(bytes in proptest::array::uniform20(any::<u8>())) {
            let addr = Address::from_bytes(bytes);
            let parsed = Address::parse(&addr.to_checksum()).unwrap();
            prop_assert_eq!(parsed, addr);
        }
    }
}
