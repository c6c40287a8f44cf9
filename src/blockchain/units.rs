// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Unit and amount conversion.
//!
//! Amounts are financial values: every conversion goes through exact
//! integer scaling in base units (wei), never floating point.

use alloy::primitives::U256;

use super::client::ThorError;

/// Decimals of VET and VTHO.
pub const TOKEN_DECIMALS: u8 = 18;

/// Known units and their decimal exponent relative to wei.
const UNITS: &[(&str, u8)] = &[
    ("wei", 0),
    ("kwei", 3),
    ("mwei", 6),
    ("gwei", 9),
    ("szabo", 12),
    ("finney", 15),
    ("ether", 18),
    ("vet", 18),
    ("vtho", 18),
];

/// Decimal exponent of a unit name (case-insensitive).
pub fn unit_decimals(unit: &str) -> Result<u8, ThorError> {
    let wanted = unit.trim().to_ascii_lowercase();
    UNITS
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, decimals)| *decimals)
        .ok_or_else(|| ThorError::InvalidUnit(unit.to_string()))
}

/// Convert a decimal string between two units.
///
/// Fractional digits below one wei are truncated toward zero. The result
/// carries no trailing fractional zeros and no decimal point when integral.
pub fn convert(value: &str, from_unit: &str, to_unit: &str) -> Result<String, ThorError> {
    let from = unit_decimals(from_unit)?;
    let to = unit_decimals(to_unit)?;
    let base = parse_amount(value, from)?;
    Ok(format_amount(base, to))
}

/// Parse a human-readable amount (e.g. "1.5") to base units.
///
/// # Arguments
/// * `amount` - Non-negative decimal string
/// * `decimals` - Number of decimals of the unit `amount` is expressed in
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ThorError> {
    let invalid = |reason: &str| ThorError::InvalidAmount {
        value: amount.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = amount.trim();
    if trimmed.starts_with('-') {
        return Err(invalid("amount must not be negative"));
    }

    let mut parts = trimmed.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or_default();

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("amount is empty"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("amount must be a decimal number"));
    }

    let scale = decimals as usize;
    let kept = &fraction[..fraction.len().min(scale)];
    let digits = format!("{whole}{kept:0<scale$}");

    U256::from_str_radix(&digits, 10).map_err(|_| invalid("amount overflows 256 bits"))
}

/// Format base units as a decimal string in a unit with `decimals` decimals.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        format!("{}.{}", whole, trimmed)
    }
}

/// Parse an amount expressed in `unit` to wei.
pub fn to_wei(amount: &str, unit: &str) -> Result<U256, ThorError> {
    parse_amount(amount, unit_decimals(unit)?)
}

/// Parse a non-negative integer already expressed in base units.
///
/// Accepts decimal or `0x`-prefixed hex.
pub fn parse_base_units(raw: &str) -> Option<U256> {
    let trimmed = raw.trim();
    if let Some(hex) = trimmed.strip_prefix("0x") {
        return U256::from_str_radix(hex, 16).ok();
    }
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    U256::from_str_radix(trimmed, 10).ok()
}
