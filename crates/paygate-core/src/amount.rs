//! Exact decimal amounts in base units.
//!
//! Amounts arrive from the caller as decimal text (`"0.01"`) and are converted
//! to the chain's smallest unit without going through floating point. Trailing
//! fractional zeros are ignored before the precision check, so `"1.50"` parses
//! with 1 decimal place.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_ASSET_DECIMALS;
use crate::error::AmountError;

/// A positive amount in the asset's smallest unit (wei for ETH).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Amount(u128);

impl Amount {
    pub fn from_base_units(units: u128) -> Self {
        Self(units)
    }

    pub fn base_units(&self) -> u128 {
        self.0
    }

    /// Parse decimal text into base units with `decimals` places of precision.
    pub fn parse_decimal(text: &str, decimals: u8) -> Result<Self, AmountError> {
        if decimals > MAX_ASSET_DECIMALS {
            return Err(AmountError::UnsupportedDecimals(decimals));
        }
        if text.is_empty() {
            return Err(AmountError::Empty);
        }
        if text.starts_with('-') {
            return Err(AmountError::Negative);
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(AmountError::Empty);
        }
        if let Some(bad) = whole
            .chars()
            .chain(fraction.chars())
            .find(|c| !c.is_ascii_digit())
        {
            return Err(AmountError::InvalidCharacter(bad));
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > decimals as usize {
            return Err(AmountError::TooManyDecimals {
                got: fraction.len(),
                max: decimals,
            });
        }

        let scale = 10u128.pow(decimals as u32);
        let whole_units = parse_digits(whole)?
            .checked_mul(scale)
            .ok_or(AmountError::Overflow)?;
        let fraction_scale = 10u128.pow((decimals as usize - fraction.len()) as u32);
        let fraction_units = parse_digits(fraction)?
            .checked_mul(fraction_scale)
            .ok_or(AmountError::Overflow)?;
        let units = whole_units
            .checked_add(fraction_units)
            .ok_or(AmountError::Overflow)?;

        if units == 0 {
            return Err(AmountError::Zero);
        }
        Ok(Self(units))
    }

    /// Render as decimal text with `decimals` places, trailing zeros trimmed.
    ///
    /// Precision is capped at [`MAX_ASSET_DECIMALS`], the most `parse_decimal`
    /// accepts.
    pub fn format_decimal(&self, decimals: u8) -> String {
        let decimals = decimals.min(MAX_ASSET_DECIMALS);
        if decimals == 0 {
            return self.0.to_string();
        }
        let scale = 10u128.pow(decimals as u32);
        let whole = self.0 / scale;
        let fraction = self.0 % scale;
        if fraction == 0 {
            return whole.to_string();
        }
        let digits = format!("{:0width$}", fraction, width = decimals as usize);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }
}

fn parse_digits(digits: &str) -> Result<u128, AmountError> {
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| AmountError::Overflow)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
