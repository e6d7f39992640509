//! Money Conversion Module
//!
//! Balances and amounts are stored as `i64` minor units (cents for USD).
//! Client-facing decimal strings are converted here, exactly, through
//! `rust_decimal`; floats are never involved.

use rust_decimal::prelude::*;
use thiserror::Error;

/// The only currency the ledger accepts
pub const SUPPORTED_CURRENCY: &str = "USD";

/// Minor-unit scale of [`SUPPORTED_CURRENCY`]
pub const CURRENCY_DECIMALS: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large, would overflow")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Convert a client decimal string ("100", "12.5", "0.01") to minor units.
///
/// Zero is accepted; opening balances may be empty.
pub fn parse_minor_units(amount_str: &str, decimals: u32) -> Result<i64, MoneyError> {
    let amount_str = amount_str.trim();
    if amount_str.is_empty() {
        return Err(MoneyError::InvalidFormat("empty string".into()));
    }
    if amount_str.starts_with('.') || amount_str.ends_with('.') {
        return Err(MoneyError::InvalidFormat(
            "use 0.5 instead of .5 and 5.0 instead of 5.".into(),
        ));
    }

    let decimal =
        Decimal::from_str(amount_str).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;

    if decimal.is_sign_negative() && !decimal.is_zero() {
        return Err(MoneyError::Negative);
    }

    if decimal.scale() > decimals {
        return Err(MoneyError::PrecisionOverflow {
            provided: decimal.scale(),
            max: decimals,
        });
    }

    let multiplier = Decimal::from(10i64.pow(decimals));
    let scaled = decimal
        .checked_mul(multiplier)
        .ok_or(MoneyError::Overflow)?;

    scaled.trunc().to_i64().ok_or(MoneyError::Overflow)
}

/// Render minor units with the currency's full precision ("1050" -> "10.50").
pub fn format_minor_units(value: i64, decimals: u32) -> String {
    let decimal_value = Decimal::new(value, decimals);
    format!("{:.prec$}", decimal_value, prec = decimals as usize)
}
