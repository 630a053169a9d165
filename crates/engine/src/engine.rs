//! The ledger engine facade.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tally_core::business_trip::{BusinessTripService, BusinessTripSummary, TripError};
use tally_core::currency::{ExchangeRateResolver, RateSource};
use tally_core::ledger::{
    BalanceResult, BalanceValidator, ChargeData, GenerationContext, GenerationError,
    GeneratorRegistry, PersistedPosting, PostingDraft, Provenance, ReserveCalculator,
};
use tally_core::reconciliation::{
    CandidatePosting, ClassifiedPosting, ReconciliationService, ReconciliationSummary,
};
use tally_shared::AppConfig;
use tally_shared::types::{ChargeId, TripId};
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{ChargeAggregator, PostingStore};
use crate::error::EngineError;

/// Reconciliation of one charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeReconciliation {
    /// Charge reconciled.
    pub charge_id: ChargeId,
    /// Every posting with its classification.
    pub results: Vec<ClassifiedPosting>,
    /// Counts per classification.
    pub summary: ReconciliationSummary,
}

/// Generates, validates, persists and reconciles ledger postings.
///
/// Cloning is cheap; clones share collaborators and configuration.
#[derive(Clone)]
pub struct LedgerEngine {
    pub(crate) aggregator: Arc<dyn ChargeAggregator>,
    rate_source: Arc<dyn RateSource>,
    pub(crate) store: Arc<dyn PostingStore>,
    reserves: Arc<dyn ReserveCalculator>,
    registry: Arc<GeneratorRegistry>,
    pub(crate) config: Arc<AppConfig>,
    as_of: Option<NaiveDate>,
}

impl LedgerEngine {
    /// Creates an engine with the standard generator registry.
    #[must_use]
    pub fn new(
        aggregator: Arc<dyn ChargeAggregator>,
        rate_source: Arc<dyn RateSource>,
        store: Arc<dyn PostingStore>,
        reserves: Arc<dyn ReserveCalculator>,
        config: AppConfig,
    ) -> Self {
        Self {
            aggregator,
            rate_source,
            store,
            reserves,
            registry: Arc::new(GeneratorRegistry::standard()),
            config: Arc::new(config),
            as_of: None,
        }
    }

    /// Replaces the generator registry.
    #[must_use]
    pub fn with_registry(mut self, registry: GeneratorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Pins the date generation runs as of. Defaults to today.
    #[must_use]
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Creates a resolver with an empty cache over the engine's rate source.
    #[must_use]
    pub fn new_resolver(&self) -> ExchangeRateResolver {
        ExchangeRateResolver::with_config(
            Arc::clone(&self.rate_source),
            self.config.admin.local_currency,
            &self.config.rates,
        )
    }

    /// Generates draft postings for a charge.
    #[instrument(skip(self))]
    pub async fn generate_for_charge(
        &self,
        charge_id: ChargeId,
    ) -> Result<Vec<PostingDraft>, EngineError> {
        let data = self.load_charge(charge_id).await?;
        self.generate_with(&data, &self.new_resolver()).await
    }

    /// Validates postings against the charge's debits, credits and counterparties.
    #[instrument(skip(self, postings), fields(postings = postings.len()))]
    pub async fn validate_balance(
        &self,
        charge_id: ChargeId,
        postings: &[PostingDraft],
    ) -> Result<BalanceResult, EngineError> {
        let data = self.load_charge(charge_id).await?;
        Ok(self.validate_with(&data, postings))
    }

    /// Generates, validates and persists a charge's postings.
    ///
    /// Unbalanced postings are returned in [`EngineError::Imbalanced`] and
    /// never persisted.
    #[instrument(skip(self))]
    pub async fn close_charge(
        &self,
        charge_id: ChargeId,
    ) -> Result<Vec<PersistedPosting>, EngineError> {
        let data = self.load_charge(charge_id).await?;
        let postings = self.generate_with(&data, &self.new_resolver()).await?;
        let balance = self.validate_with(&data, &postings);
        self.persist(balance, postings).await
    }

    /// Regenerates a charge and classifies the result against its stored
    /// generated postings. Manual postings are not compared.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, charge_id: ChargeId) -> Result<ChargeReconciliation, EngineError> {
        let generated: Vec<CandidatePosting> = self
            .generate_for_charge(charge_id)
            .await?
            .into_iter()
            .map(CandidatePosting::from)
            .collect();
        let stored: Vec<PersistedPosting> = self
            .store
            .stored_postings(charge_id)
            .await?
            .into_iter()
            .filter(|posting| posting.provenance == Provenance::Generated)
            .collect();

        let results = ReconciliationService::reconcile(&generated, &stored);
        let summary = ReconciliationSummary::from_results(&results);
        info!(
            charge_id = %charge_id,
            unchanged = summary.unchanged,
            diff = summary.diff,
            new = summary.new,
            deleted = summary.deleted,
            "Charge reconciled"
        );

        Ok(ChargeReconciliation {
            charge_id,
            results,
            summary,
        })
    }

    /// Summarizes a business trip by category and currency.
    #[instrument(skip(self))]
    pub async fn compute_business_trip_summary(
        &self,
        trip_id: TripId,
    ) -> Result<BusinessTripSummary, EngineError> {
        let data = self
            .aggregator
            .business_trip(trip_id)
            .await?
            .ok_or(EngineError::TripNotFound(trip_id))?;

        let admin = &self.config.admin;
        let mut requirements: BTreeSet<_> = data
            .expenses
            .iter()
            .map(|expense| (expense.currency, expense.value_date))
            .collect();
        if let Some(end_date) = data.trip.end_date {
            requirements.insert((admin.trip_allowances.currency, end_date));
        }

        let rates = self
            .new_resolver()
            .snapshot(requirements)
            .await
            .map_err(TripError::from)?;
        let summary = BusinessTripService::summarize_trip(&data, admin, &rates)?;
        debug!(
            trip_id = %trip_id,
            duration_days = summary.duration_days,
            excess_local = %summary.excess_local,
            "Business trip summarized"
        );
        Ok(summary)
    }

    pub(crate) async fn load_charge(&self, charge_id: ChargeId) -> Result<ChargeData, EngineError> {
        self.aggregator
            .charge_data(charge_id)
            .await?
            .ok_or(EngineError::ChargeNotFound(charge_id))
    }

    /// Prefetches the charge's rates through `resolver` and runs its generator.
    pub(crate) async fn generate_with(
        &self,
        data: &ChargeData,
        resolver: &ExchangeRateResolver,
    ) -> Result<Vec<PostingDraft>, EngineError> {
        let charge_id = data.charge.id;
        let admin = &self.config.admin;

        let rates = resolver
            .snapshot(data.rate_requirements(admin))
            .await
            .map_err(|err| GenerationError::from_rate(charge_id, err))?;
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());
        let ctx = GenerationContext::new(admin, &rates, self.reserves.as_ref(), as_of);

        match self.registry.generate(data, &ctx) {
            Ok(postings) => {
                debug!(
                    charge_id = %charge_id,
                    charge_type = %data.charge.charge_type,
                    postings = postings.len(),
                    "Postings generated"
                );
                Ok(postings)
            }
            Err(err) => {
                warn!(
                    charge_id = %charge_id,
                    error_code = err.error_code(),
                    error = %err,
                    "Ledger generation failed"
                );
                Err(err.into())
            }
        }
    }

    pub(crate) fn validate_with(&self, data: &ChargeData, postings: &[PostingDraft]) -> BalanceResult {
        let validator = BalanceValidator::new(self.config.admin.local_currency);
        let balance = validator.validate(data.charge.id, postings, &data.balance_entities());
        if !balance.is_balanced {
            warn!(charge_id = %data.charge.id, "{}", balance.describe());
        }
        balance
    }

    pub(crate) async fn persist(
        &self,
        balance: BalanceResult,
        postings: Vec<PostingDraft>,
    ) -> Result<Vec<PersistedPosting>, EngineError> {
        if !balance.is_balanced {
            return Err(EngineError::Imbalanced {
                balance: Box::new(balance),
                postings,
            });
        }

        let persisted = self.store.store_postings(balance.charge_id, &postings).await?;
        info!(
            charge_id = %balance.charge_id,
            postings = persisted.len(),
            "Charge ledger persisted"
        );
        Ok(persisted)
    }
}
