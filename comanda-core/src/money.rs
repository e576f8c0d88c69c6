//! Money calculation utilities using rust_decimal for precision
//!
//! All monetary arithmetic is done on `Decimal` and rounded to 2 decimal
//! places half-up, then converted back to `f64` for storage/serialization.

use rust_decimal::Decimal;
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert an f64 amount to Decimal, treating non-finite values as zero
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

/// Convert a Decimal back to f64 for storage
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Round to money precision
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounded f64 result of a Decimal computation
pub fn round_f64(value: Decimal) -> f64 {
    to_f64(round_money(value))
}
