//! Engine error types.

use tally_core::business_trip::TripError;
use tally_core::currency::RateError;
use tally_core::ledger::{BalanceResult, GenerationError, PostingDraft};
use tally_shared::AppError;
use tally_shared::types::{ChargeId, TripId};
use thiserror::Error;

use crate::collaborators::CollaboratorError;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The aggregator does not know the charge.
    #[error("Charge not found: {0}")]
    ChargeNotFound(ChargeId),

    /// The aggregator does not know the business trip.
    #[error("Business trip not found: {0}")]
    TripNotFound(TripId),

    /// Generating the charge's postings failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Summarizing a business trip failed.
    #[error(transparent)]
    Trip(#[from] TripError),

    /// The generated postings do not balance; nothing was persisted.
    #[error("{}", balance.describe())]
    Imbalanced {
        /// Validation outcome.
        balance: Box<BalanceResult>,
        /// The rejected postings.
        postings: Vec<PostingDraft>,
    },

    /// A collaborator failed.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// The batch was cancelled or timed out before the charge started.
    #[error("Charge {0} was not started before the batch stopped")]
    Cancelled(ChargeId),

    /// The task running the charge did not complete.
    #[error("Task for charge {charge_id} failed: {message}")]
    TaskFailed {
        /// Charge id.
        charge_id: ChargeId,
        /// Join error description.
        message: String,
    },
}

impl EngineError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ChargeNotFound(_) => "CHARGE_NOT_FOUND",
            Self::TripNotFound(_) => "TRIP_NOT_FOUND",
            Self::Generation(err) => err.error_code(),
            Self::Trip(err) => err.error_code(),
            Self::Imbalanced { .. } => "IMBALANCED_CHARGE",
            Self::Collaborator(_) => "COLLABORATOR_ERROR",
            Self::Cancelled(_) => "CANCELLED",
            Self::TaskFailed { .. } => "TASK_FAILED",
        }
    }

    /// Whether fixing data or configuration and retrying can succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation(err) => err.is_recoverable(),
            Self::Trip(err) => !matches!(err, TripError::Rate(_)),
            Self::Imbalanced { .. } | Self::Cancelled(_) => true,
            Self::ChargeNotFound(_)
            | Self::TripNotFound(_)
            | Self::Collaborator(_)
            | Self::TaskFailed { .. } => false,
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let message = err.to_string();
        match err {
            EngineError::ChargeNotFound(_) | EngineError::TripNotFound(_) => {
                Self::NotFound(message)
            }
            EngineError::Generation(generation) => match generation {
                GenerationError::Configuration { .. } => Self::Configuration(message),
                GenerationError::Structural { .. }
                | GenerationError::UnsupportedChargeType { .. }
                | GenerationError::InvalidRate { .. } => Self::Validation(message),
                GenerationError::NoExchangeRate { .. } => Self::BusinessRule(message),
                GenerationError::RateSource { .. } | GenerationError::ReserveCalculation { .. } => {
                    Self::ExternalService(message)
                }
            },
            EngineError::Trip(trip) => match trip {
                TripError::MissingDates { .. }
                | TripError::InvalidDateRange { .. }
                | TripError::Rate(RateError::InvalidRate { .. }) => Self::Validation(message),
                TripError::Rate(RateError::NoExchangeRate { .. }) => Self::BusinessRule(message),
                TripError::Rate(RateError::Source(_)) => Self::ExternalService(message),
                TripError::Configuration(_) => Self::Configuration(message),
            },
            EngineError::Imbalanced { .. } => Self::BusinessRule(message),
            EngineError::Collaborator(_) => Self::ExternalService(message),
            EngineError::Cancelled(_) => Self::Cancelled(message),
            EngineError::TaskFailed { .. } => Self::Internal(message),
        }
    }
}
