//! Ledger generation errors.
//!
//! Every variant names the charge it was raised for so that batch results
//! can be reported per charge.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::{ChargeId, Currency};
use thiserror::Error;

use super::charge::ChargeType;
use crate::currency::RateError;

/// Errors that can occur while generating postings for a charge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    // ========== Configuration Errors ==========
    /// A designated account or tax parameter is not configured.
    #[error("Charge {charge_id}: missing configuration '{field}'")]
    Configuration {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Configuration path of the missing value.
        field: String,
    },

    // ========== Structural Errors ==========
    /// The charge data cannot be posted as given.
    #[error("Charge {charge_id}: {reason}")]
    Structural {
        /// Charge being generated.
        charge_id: ChargeId,
        /// What is wrong with the data.
        reason: String,
    },

    /// No generator handles the charge type.
    #[error("Charge {charge_id}: no generator registered for charge type {charge_type}")]
    UnsupportedChargeType {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Unhandled type.
        charge_type: ChargeType,
    },

    // ========== Currency Errors ==========
    /// No exchange rate on or before the date.
    #[error("Charge {charge_id}: no exchange rate for {currency} on or before {date}")]
    NoExchangeRate {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Foreign currency.
        currency: Currency,
        /// Requested date.
        date: NaiveDate,
    },

    /// The rate source returned a non-positive rate.
    #[error("Charge {charge_id}: invalid exchange rate {rate} for {currency} on {date}")]
    InvalidRate {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Foreign currency.
        currency: Currency,
        /// Row date.
        date: NaiveDate,
        /// Offending rate.
        rate: Decimal,
    },

    /// The rate source failed.
    #[error("Charge {charge_id}: rate source failed: {message}")]
    RateSource {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Source error.
        message: String,
    },

    // ========== Collaborator Errors ==========
    /// The reserve calculator failed.
    #[error("Charge {charge_id}: reserve calculation failed: {message}")]
    ReserveCalculation {
        /// Charge being generated.
        charge_id: ChargeId,
        /// Calculator error.
        message: String,
    },
}

impl GenerationError {
    /// Creates a configuration error.
    pub fn configuration(charge_id: ChargeId, field: impl Into<String>) -> Self {
        Self::Configuration {
            charge_id,
            field: field.into(),
        }
    }

    /// Creates a structural error.
    pub fn structural(charge_id: ChargeId, reason: impl Into<String>) -> Self {
        Self::Structural {
            charge_id,
            reason: reason.into(),
        }
    }

    /// Attaches a charge id to a rate error.
    #[must_use]
    pub fn from_rate(charge_id: ChargeId, err: RateError) -> Self {
        match err {
            RateError::NoExchangeRate { currency, date, .. } => Self::NoExchangeRate {
                charge_id,
                currency,
                date,
            },
            RateError::InvalidRate {
                currency,
                date,
                rate,
            } => Self::InvalidRate {
                charge_id,
                currency,
                date,
                rate,
            },
            RateError::Source(message) => Self::RateSource { charge_id, message },
        }
    }

    /// Charge the error was raised for.
    #[must_use]
    pub const fn charge_id(&self) -> ChargeId {
        match self {
            Self::Configuration { charge_id, .. }
            | Self::Structural { charge_id, .. }
            | Self::UnsupportedChargeType { charge_id, .. }
            | Self::NoExchangeRate { charge_id, .. }
            | Self::InvalidRate { charge_id, .. }
            | Self::RateSource { charge_id, .. }
            | Self::ReserveCalculation { charge_id, .. } => *charge_id,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "CONFIGURATION_ERROR",
            Self::Structural { .. } => "STRUCTURAL_ERROR",
            Self::UnsupportedChargeType { .. } => "UNSUPPORTED_CHARGE_TYPE",
            Self::NoExchangeRate { .. } => "NO_EXCHANGE_RATE",
            Self::InvalidRate { .. } => "INVALID_EXCHANGE_RATE",
            Self::RateSource { .. } => "RATE_SOURCE_ERROR",
            Self::ReserveCalculation { .. } => "RESERVE_CALCULATION_ERROR",
        }
    }

    /// Whether the charge can be skipped and retried once its data or settings
    /// are fixed. Rate errors are not recoverable.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Structural { .. })
    }
}
