//! In-memory collaborator implementations.
//!
//! Useful for tests, demos and single-process tools. Every store is guarded
//! by a tokio `RwLock`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_core::business_trip::BusinessTripData;
use tally_core::currency::{ExchangeRateRow, RateError, RateSource};
use tally_core::ledger::{
    ChargeData, PersistedPosting, PostingDraft, Provenance, ReserveCalculationError,
    ReserveCalculator, ReserveKind,
};
use tally_shared::types::{ChargeId, Currency, OwnerId, PostingId, TripId};
use tokio::sync::RwLock;

use crate::collaborators::{ChargeAggregator, CollaboratorError, PostingStore};

/// Charge and trip data held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAggregator {
    charges: RwLock<HashMap<ChargeId, ChargeData>>,
    trips: RwLock<HashMap<TripId, BusinessTripData>>,
}

impl InMemoryAggregator {
    /// Creates an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a charge.
    pub async fn insert_charge(&self, data: ChargeData) {
        self.charges.write().await.insert(data.charge.id, data);
    }

    /// Adds or replaces a business trip.
    pub async fn insert_trip(&self, data: BusinessTripData) {
        self.trips.write().await.insert(data.trip.id, data);
    }
}

#[async_trait]
impl ChargeAggregator for InMemoryAggregator {
    async fn charge_data(&self, charge_id: ChargeId) -> Result<Option<ChargeData>, CollaboratorError> {
        Ok(self.charges.read().await.get(&charge_id).cloned())
    }

    async fn business_trip(
        &self,
        trip_id: TripId,
    ) -> Result<Option<BusinessTripData>, CollaboratorError> {
        Ok(self.trips.read().await.get(&trip_id).cloned())
    }
}

/// Exchange rate rows held in memory.
///
/// Counts source calls so that callers can observe cache behavior.
#[derive(Debug, Default)]
pub struct InMemoryRateSource {
    rows: RwLock<Vec<ExchangeRateRow>>,
    calls: AtomicUsize,
}

impl InMemoryRateSource {
    /// Creates a source with the given rows.
    #[must_use]
    pub fn new(rows: Vec<ExchangeRateRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
            calls: AtomicUsize::new(0),
        }
    }

    /// Adds a row. Resolvers holding cached rates must be invalidated.
    pub async fn ingest(&self, row: ExchangeRateRow) {
        self.rows.write().await.push(row);
    }

    /// Number of `rate_rows` calls served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for InMemoryRateSource {
    async fn rate_rows(
        &self,
        currency: Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExchangeRateRow>, RateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|row| row.date >= from && row.date <= to && row.rate_for(currency).is_some())
            .cloned()
            .collect())
    }
}

/// Persisted postings held in memory.
///
/// Regenerating a charge replaces its generated postings; the replaced ones
/// are kept as history.
#[derive(Debug, Default)]
pub struct InMemoryPostingStore {
    postings: RwLock<HashMap<ChargeId, Vec<PersistedPosting>>>,
    superseded: RwLock<Vec<PersistedPosting>>,
}

impl InMemoryPostingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a manually entered posting.
    pub async fn insert_manual(&self, posting: PostingDraft) -> PersistedPosting {
        let persisted = PersistedPosting {
            id: PostingId::new(),
            posting,
            persisted_at: Utc::now(),
            provenance: Provenance::Manual,
        };
        self.postings
            .write()
            .await
            .entry(persisted.posting.charge_id)
            .or_default()
            .push(persisted.clone());
        persisted
    }

    /// Generated postings replaced by later regenerations.
    pub async fn superseded(&self) -> Vec<PersistedPosting> {
        self.superseded.read().await.clone()
    }
}

#[async_trait]
impl PostingStore for InMemoryPostingStore {
    async fn store_postings(
        &self,
        charge_id: ChargeId,
        postings: &[PostingDraft],
    ) -> Result<Vec<PersistedPosting>, CollaboratorError> {
        if let Some(posting) = postings.iter().find(|posting| posting.charge_id != charge_id) {
            return Err(CollaboratorError(format!(
                "posting for charge {} stored under charge {charge_id}",
                posting.charge_id
            )));
        }

        let persisted_at = Utc::now();
        let persisted: Vec<PersistedPosting> = postings
            .iter()
            .map(|posting| PersistedPosting {
                id: PostingId::new(),
                posting: posting.clone(),
                persisted_at,
                provenance: Provenance::Generated,
            })
            .collect();

        let mut stored = self.postings.write().await;
        let current = stored.entry(charge_id).or_default();
        let (replaced, kept): (Vec<_>, Vec<_>) = current
            .drain(..)
            .partition(|posting| posting.provenance == Provenance::Generated);
        *current = kept;
        current.extend(persisted.iter().cloned());
        drop(stored);

        self.superseded.write().await.extend(replaced);
        Ok(persisted)
    }

    async fn stored_postings(
        &self,
        charge_id: ChargeId,
    ) -> Result<Vec<PersistedPosting>, CollaboratorError> {
        Ok(self
            .postings
            .read()
            .await
            .get(&charge_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Reserve calculator returning configured amounts per kind and year.
#[derive(Debug, Clone, Default)]
pub struct FixedReserveCalculator {
    amounts: HashMap<(ReserveKind, i32), Decimal>,
}

impl FixedReserveCalculator {
    /// Creates a calculator with no amounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the reserve amount of `kind` for `year`.
    #[must_use]
    pub fn with_amount(mut self, kind: ReserveKind, year: i32, amount: Decimal) -> Self {
        self.amounts.insert((kind, year), amount);
        self
    }
}

impl ReserveCalculator for FixedReserveCalculator {
    fn reserve_amount(
        &self,
        kind: ReserveKind,
        _owner_id: OwnerId,
        year: i32,
    ) -> Result<Decimal, ReserveCalculationError> {
        self.amounts
            .get(&(kind, year))
            .copied()
            .ok_or_else(|| ReserveCalculationError(format!("no {kind:?} reserve for {year}")))
    }
}
