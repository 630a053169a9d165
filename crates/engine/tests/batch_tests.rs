//! Integration tests for batch generation.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use tally_core::business_trip::BusinessTripData;
use tally_core::ledger::{ChargeData, ChargeType};
use tally_engine::{
    BatchOptions, ChargeAggregator, CollaboratorError, EngineError, FixedReserveCalculator,
    InMemoryAggregator, InMemoryPostingStore, InMemoryRateSource, LedgerEngine, PostingStore,
};
use tally_shared::types::{ChargeId, Currency, TripId};
use tokio_util::sync::CancellationToken;

use common::{charge, config, date, harness, rate_rows, transaction, usd_payment};

/// Aggregator that delays every load and records how many run at once.
struct SlowAggregator {
    inner: InMemoryAggregator,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl ChargeAggregator for SlowAggregator {
    async fn charge_data(&self, charge_id: ChargeId) -> Result<Option<ChargeData>, CollaboratorError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.charge_data(charge_id).await
    }

    async fn business_trip(
        &self,
        trip_id: TripId,
    ) -> Result<Option<BusinessTripData>, CollaboratorError> {
        self.inner.business_trip(trip_id).await
    }
}

async fn slow_engine(charges: usize, delay: Duration) -> (LedgerEngine, Arc<SlowAggregator>) {
    common::init_tracing();
    let inner = InMemoryAggregator::new();
    for id in 1..=charges {
        inner.insert_charge(usd_payment(id as u128, true)).await;
    }
    let aggregator = Arc::new(SlowAggregator {
        inner,
        delay,
        in_flight: AtomicUsize::new(0),
        peak: AtomicUsize::new(0),
    });
    let engine = LedgerEngine::new(
        aggregator.clone(),
        Arc::new(InMemoryRateSource::new(rate_rows())),
        Arc::new(InMemoryPostingStore::new()),
        Arc::new(FixedReserveCalculator::new()),
        config(),
    );
    (engine, aggregator)
}

fn ids(range: std::ops::RangeInclusive<u128>) -> Vec<ChargeId> {
    range.map(ChargeId::from_u128).collect()
}

#[tokio::test]
async fn test_batch_reports_every_charge_independently() {
    let h = harness();
    h.aggregator.insert_charge(usd_payment(1, true)).await;
    h.aggregator.insert_charge(usd_payment(2, true)).await;
    h.aggregator.insert_charge(usd_payment(3, false)).await;
    let mut no_rate = ChargeData::new(charge(4, ChargeType::Common));
    no_rate
        .transactions
        .push(transaction(dec!(-5), Currency::Gbp, date(2024, 5, 1)));
    h.aggregator.insert_charge(no_rate).await;

    let report = h
        .engine
        .generate_batch(&ids(1..=5), BatchOptions::default())
        .await;

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.succeeded().count(), 3);
    assert!(report.abandoned().is_empty());

    let unbalanced = report.results[&ChargeId::from_u128(3)].as_ref().unwrap();
    assert!(!unbalanced.balance.is_balanced);
    assert!(unbalanced.persisted.is_none());

    let failed: Vec<_> = report.failed().map(|(id, err)| (id, err.error_code())).collect();
    assert_eq!(
        failed,
        vec![
            (ChargeId::from_u128(4), "NO_EXCHANGE_RATE"),
            (ChargeId::from_u128(5), "CHARGE_NOT_FOUND"),
        ]
    );
}

#[tokio::test]
async fn test_batch_fetches_each_rate_once() {
    let h = harness();
    for id in 1..=4 {
        h.aggregator.insert_charge(usd_payment(id, true)).await;
    }

    let report = h
        .engine
        .generate_batch(&ids(1..=4), BatchOptions::default().with_concurrency(4))
        .await;

    assert_eq!(report.succeeded().count(), 4);
    assert_eq!(h.rates.calls(), 1);
}

#[tokio::test]
async fn test_batch_respects_concurrency_limit() {
    let (engine, aggregator) = slow_engine(6, Duration::from_millis(20)).await;

    let report = engine
        .generate_batch(&ids(1..=6), BatchOptions::default().with_concurrency(2))
        .await;

    assert_eq!(report.succeeded().count(), 6);
    let peak = aggregator.peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 2, "peak concurrency was {peak}");
}

#[tokio::test]
async fn test_cancelled_batch_abandons_unstarted_charges() {
    let h = harness();
    for id in 1..=3 {
        h.aggregator.insert_charge(usd_payment(id, true)).await;
    }
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = h
        .engine
        .generate_batch(&ids(1..=3), BatchOptions::default().with_cancellation(cancel))
        .await;

    assert_eq!(report.abandoned(), ids(1..=3));
    assert!(matches!(
        report.results[&ChargeId::from_u128(1)],
        Err(EngineError::Cancelled(_))
    ));
}

#[tokio::test]
async fn test_timeout_lets_running_charge_finish() {
    let (engine, _) = slow_engine(3, Duration::from_millis(200)).await;

    let report = engine
        .generate_batch(
            &ids(1..=3),
            BatchOptions::default()
                .with_concurrency(1)
                .with_timeout(Duration::from_millis(50)),
        )
        .await;

    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(report.abandoned().len(), 2);
}

#[tokio::test]
async fn test_persisting_batch_stores_only_balanced_charges() {
    let h = harness();
    h.aggregator.insert_charge(usd_payment(1, true)).await;
    h.aggregator.insert_charge(usd_payment(2, false)).await;

    let report = h
        .engine
        .generate_batch(&ids(1..=2), BatchOptions::default().persist(true))
        .await;

    let closed = report.results[&ChargeId::from_u128(1)].as_ref().unwrap();
    assert_eq!(closed.persisted.as_ref().map(Vec::len), Some(2));
    assert!(matches!(
        report.results[&ChargeId::from_u128(2)],
        Err(EngineError::Imbalanced { .. })
    ));

    let stored = h.store.stored_postings(ChargeId::from_u128(1)).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(h.store.stored_postings(ChargeId::from_u128(2)).await.unwrap().is_empty());
}
