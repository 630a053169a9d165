//! Collaborator contracts the engine depends on.

use async_trait::async_trait;
use tally_core::business_trip::BusinessTripData;
use tally_core::ledger::{ChargeData, PersistedPosting, PostingDraft};
use tally_shared::types::{ChargeId, TripId};
use thiserror::Error;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Loads everything a generator needs for one charge.
#[async_trait]
pub trait ChargeAggregator: Send + Sync {
    /// Returns the charge with its transactions, documents and sub-records,
    /// or `None` when the charge does not exist.
    async fn charge_data(&self, charge_id: ChargeId) -> Result<Option<ChargeData>, CollaboratorError>;

    /// Returns a business trip with its expenses, or `None` when it does not exist.
    async fn business_trip(
        &self,
        trip_id: TripId,
    ) -> Result<Option<BusinessTripData>, CollaboratorError>;
}

/// Persists generated postings.
#[async_trait]
pub trait PostingStore: Send + Sync {
    /// Replaces the charge's generated postings with `postings`.
    ///
    /// Manually entered postings of the charge are left alone.
    async fn store_postings(
        &self,
        charge_id: ChargeId,
        postings: &[PostingDraft],
    ) -> Result<Vec<PersistedPosting>, CollaboratorError>;

    /// Current postings of the charge, generated and manual.
    async fn stored_postings(
        &self,
        charge_id: ChargeId,
    ) -> Result<Vec<PersistedPosting>, CollaboratorError>;
}
