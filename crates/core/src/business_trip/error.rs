//! Business trip errors.

use chrono::NaiveDate;
use tally_shared::types::TripId;
use thiserror::Error;

use crate::currency::RateError;

/// Errors raised while summarizing a business trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TripError {
    /// Start or end date is not set.
    #[error("Business trip {trip_id} is missing its {missing} date")]
    MissingDates {
        /// Trip id.
        trip_id: TripId,
        /// Which date is missing.
        missing: &'static str,
    },

    /// The trip ends before it starts.
    #[error("Business trip {trip_id} ends on {end} before it starts on {start}")]
    InvalidDateRange {
        /// Trip id.
        trip_id: TripId,
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },

    /// An expense or allowance rate could not be resolved.
    #[error(transparent)]
    Rate(#[from] RateError),

    /// A required tax parameter is not configured.
    #[error("Missing configuration '{0}'")]
    Configuration(&'static str),
}

impl TripError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingDates { .. } => "TRIP_MISSING_DATES",
            Self::InvalidDateRange { .. } => "TRIP_INVALID_DATE_RANGE",
            Self::Rate(RateError::NoExchangeRate { .. }) => "NO_EXCHANGE_RATE",
            Self::Rate(_) => "RATE_SOURCE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}
