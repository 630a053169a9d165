//! Exchange rate errors.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::Currency;
use thiserror::Error;

/// Errors raised while resolving exchange rates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateError {
    /// No row on or before the date carries the currency.
    #[error("No exchange rate found for {currency} to {local} on or before {date}")]
    NoExchangeRate {
        /// Foreign currency.
        currency: Currency,
        /// Local currency.
        local: Currency,
        /// Requested date.
        date: NaiveDate,
    },

    /// The source returned a non-positive rate.
    #[error("Exchange rate for {currency} on {date} must be positive, got {rate}")]
    InvalidRate {
        /// Foreign currency.
        currency: Currency,
        /// Date of the offending row.
        date: NaiveDate,
        /// Offending rate.
        rate: Decimal,
    },

    /// The rate source itself failed.
    #[error("Rate source error: {0}")]
    Source(String),
}
