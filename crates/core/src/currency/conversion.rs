//! Currency conversion logic.
//!
//! CRITICAL: Rounding strategy for multi-currency:
//! - Local amounts are always rounded to 2 decimal places
//! - Use banker's rounding (round half to even)
//! - Postings carry both the original and the converted amount

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places of every local-currency amount on a posting.
pub const LOCAL_DECIMAL_PLACES: u32 = 2;

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Decimal {
    let converted = amount * rate;
    converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven)
}

/// Converts a foreign amount into local currency, rounded to cents.
#[must_use]
pub fn convert_to_local(amount: Decimal, rate: Decimal) -> Decimal {
    convert_amount(amount, rate, LOCAL_DECIMAL_PLACES)
}

/// Rounds an already-local amount to cents.
#[must_use]
pub fn round_local(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(LOCAL_DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven)
}
