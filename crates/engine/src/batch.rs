//! Concurrent batch generation.
//!
//! Each charge runs on its own tokio task; a semaphore bounds how many run at
//! once. All tasks share one rate resolver, so a rate is fetched once per
//! batch. Cancellation and the batch timeout only stop charges that have not
//! acquired a permit yet; charges already running finish.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use tally_core::currency::ExchangeRateResolver;
use tally_core::ledger::{BalanceResult, PersistedPosting, PostingDraft};
use tally_shared::EngineConfig;
use tally_shared::types::ChargeId;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::engine::LedgerEngine;
use crate::error::EngineError;

/// Options for one batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum number of charges processed at once.
    pub concurrency: usize,
    /// Charges not started within this duration are abandoned.
    pub timeout: Option<Duration>,
    /// Cancels charges that have not started yet.
    pub cancel: CancellationToken,
    /// Persist balanced charges.
    pub persist: bool,
}

impl BatchOptions {
    /// Options from the engine configuration, without persistence.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            timeout: config.batch_timeout_secs.map(Duration::from_secs),
            cancel: CancellationToken::new(),
            persist: false,
        }
    }

    /// Sets the concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the batch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses `cancel` to stop the batch.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sets whether balanced charges are persisted.
    #[must_use]
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Result of one charge in a batch.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    /// Charge id.
    pub charge_id: ChargeId,
    /// Generated postings.
    pub postings: Vec<PostingDraft>,
    /// Balance validation of the postings.
    pub balance: BalanceResult,
    /// Persisted postings, when the batch persists.
    pub persisted: Option<Vec<PersistedPosting>>,
}

/// Per-charge results of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per requested charge.
    pub results: BTreeMap<ChargeId, Result<ChargeOutcome, EngineError>>,
}

impl BatchReport {
    /// Charges that completed.
    pub fn succeeded(&self) -> impl Iterator<Item = &ChargeOutcome> {
        self.results.values().filter_map(|result| result.as_ref().ok())
    }

    /// Charges that failed, cancelled ones excluded.
    pub fn failed(&self) -> impl Iterator<Item = (ChargeId, &EngineError)> {
        self.results.iter().filter_map(|(charge_id, result)| match result {
            Err(EngineError::Cancelled(_)) | Ok(_) => None,
            Err(err) => Some((*charge_id, err)),
        })
    }

    /// Charges abandoned by cancellation or timeout.
    #[must_use]
    pub fn abandoned(&self) -> Vec<ChargeId> {
        self.results
            .iter()
            .filter(|(_, result)| matches!(result, Err(EngineError::Cancelled(_))))
            .map(|(charge_id, _)| *charge_id)
            .collect()
    }
}

impl LedgerEngine {
    /// Generates and validates many charges concurrently.
    ///
    /// Errors are reported per charge and never abort the batch.
    #[instrument(skip_all, fields(charges = charge_ids.len(), concurrency = options.concurrency))]
    pub async fn generate_batch(&self, charge_ids: &[ChargeId], options: BatchOptions) -> BatchReport {
        let resolver = self.new_resolver();
        let semaphore = Arc::new(Semaphore::new(options.concurrency.max(1)));
        let deadline = options.timeout.map(|timeout| Instant::now() + timeout);

        let mut pending: BTreeSet<ChargeId> = charge_ids.iter().copied().collect();
        let mut tasks = JoinSet::new();
        for &charge_id in &pending {
            let engine = self.clone();
            let resolver = resolver.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = options.cancel.clone();
            let persist = options.persist;

            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    () = deadline_elapsed(deadline) => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let result = match permit {
                    Some(_permit) => engine.process_charge(charge_id, &resolver, persist).await,
                    None => Err(EngineError::Cancelled(charge_id)),
                };
                (charge_id, result)
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((charge_id, result)) => {
                    pending.remove(&charge_id);
                    report.results.insert(charge_id, result);
                }
                Err(err) => error!(error = %err, "Batch task did not complete"),
            }
        }
        for charge_id in pending {
            report.results.insert(
                charge_id,
                Err(EngineError::TaskFailed {
                    charge_id,
                    message: "task panicked or was aborted".to_string(),
                }),
            );
        }

        info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            abandoned = report.abandoned().len(),
            "Batch finished"
        );
        report
    }

    async fn process_charge(
        &self,
        charge_id: ChargeId,
        resolver: &ExchangeRateResolver,
        persist: bool,
    ) -> Result<ChargeOutcome, EngineError> {
        let data = self.load_charge(charge_id).await?;
        let postings = self.generate_with(&data, resolver).await?;
        let balance = self.validate_with(&data, &postings);

        let persisted = if persist {
            Some(self.persist(balance.clone(), postings.clone()).await?)
        } else {
            None
        };

        Ok(ChargeOutcome {
            charge_id,
            postings,
            balance,
            persisted,
        })
    }
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
