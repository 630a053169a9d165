//! Exchange rate resolution with a per-batch cache.
//!
//! The resolver asks a [`RateSource`] for rows and picks the most recent row
//! on or before the requested date. Resolved rates are cached per
//! `(currency, date)` using Moka; concurrent requests for the same key share a
//! single source fetch.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use futures::future::join_all;
use moka::future::Cache;
use rust_decimal::Decimal;
use tally_shared::RateConfig;
use tally_shared::types::Currency;

use super::error::RateError;
use super::exchange::{ExchangeRateRow, resolve_from_rows};
use super::lookup::RateSnapshot;

/// Provider of dated exchange rate rows.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Returns rows for `currency` dated within `from..=to`, in any order.
    async fn rate_rows(
        &self,
        currency: Currency,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExchangeRateRow>, RateError>;
}

/// Cached resolver from foreign currency to local currency.
///
/// Create one per batch; call [`invalidate_all`](Self::invalidate_all) after
/// new rows are ingested.
#[derive(Clone)]
pub struct ExchangeRateResolver {
    source: Arc<dyn RateSource>,
    local_currency: Currency,
    lookback: Option<Days>,
    cache: Cache<(Currency, NaiveDate), Decimal>,
}

impl ExchangeRateResolver {
    /// Creates a resolver with default cache settings.
    #[must_use]
    pub fn new(source: Arc<dyn RateSource>, local_currency: Currency) -> Self {
        Self::with_config(source, local_currency, &RateConfig::default())
    }

    /// Creates a resolver with custom cache capacity and lookback window.
    #[must_use]
    pub fn with_config(
        source: Arc<dyn RateSource>,
        local_currency: Currency,
        config: &RateConfig,
    ) -> Self {
        let cache = Cache::builder().max_capacity(config.cache_capacity).build();

        Self {
            source,
            local_currency,
            lookback: config.lookback_days.map(|days| Days::new(u64::from(days))),
            cache,
        }
    }

    /// The currency every resolved rate converts into.
    #[must_use]
    pub fn local_currency(&self) -> Currency {
        self.local_currency
    }

    /// Rate between two currencies effective on `date`.
    ///
    /// Equal currencies resolve to 1 without touching the source. When `to`
    /// is not the local currency the rate is crossed through local currency.
    pub async fn rate(
        &self,
        from: Currency,
        to: Currency,
        date: NaiveDate,
    ) -> Result<Decimal, RateError> {
        if from == to {
            return Ok(Decimal::ONE);
        }

        let from_local = self.local_rate(from, date).await?;
        if to == self.local_currency {
            return Ok(from_local);
        }

        let to_local = self.local_rate(to, date).await?;
        Ok(from_local / to_local)
    }

    /// Rate of one unit of `currency` in local currency on `date`.
    pub async fn local_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        if currency == self.local_currency {
            return Ok(Decimal::ONE);
        }

        self.cache
            .try_get_with((currency, date), self.fetch(currency, date))
            .await
            .map_err(|err| (*err).clone())
    }

    /// Resolves every requirement concurrently into a snapshot.
    ///
    /// Pairs without a rate are left out of the snapshot so that a charge only
    /// fails on a missing rate it actually uses. Source failures and invalid
    /// rates abort the snapshot.
    pub async fn snapshot<I>(&self, requirements: I) -> Result<RateSnapshot, RateError>
    where
        I: IntoIterator<Item = (Currency, NaiveDate)>,
    {
        let requirements: BTreeSet<(Currency, NaiveDate)> = requirements
            .into_iter()
            .filter(|(currency, _)| *currency != self.local_currency)
            .collect();

        let lookups = requirements.into_iter().map(|(currency, date)| async move {
            (currency, date, self.local_rate(currency, date).await)
        });

        let mut snapshot = RateSnapshot::new(self.local_currency);
        for (currency, date, result) in join_all(lookups).await {
            match result {
                Ok(rate) => snapshot.insert(currency, date, rate),
                Err(RateError::NoExchangeRate { .. }) => {}
                Err(err) => return Err(err),
            }
        }

        Ok(snapshot)
    }

    /// Invalidates all cached rates.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of cached rates.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs cache maintenance tasks so that `entry_count` is up to date.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }

    async fn fetch(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        let from = self
            .lookback
            .and_then(|days| date.checked_sub_days(days))
            .unwrap_or(NaiveDate::MIN);

        let rows = self.source.rate_rows(currency, from, date).await?;
        resolve_from_rows(&rows, currency, self.local_currency, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        rows: Vec<ExchangeRateRow>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateSource for CountingSource {
        async fn rate_rows(
            &self,
            currency: Currency,
            from: NaiveDate,
            to: NaiveDate,
        ) -> Result<Vec<ExchangeRateRow>, RateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .rows
                .iter()
                .filter(|row| row.date >= from && row.date <= to && row.rate_for(currency).is_some())
                .cloned()
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl RateSource for FailingSource {
        async fn rate_rows(
            &self,
            _currency: Currency,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<ExchangeRateRow>, RateError> {
            Err(RateError::Source("connection refused".to_string()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn source() -> Arc<CountingSource> {
        Arc::new(CountingSource {
            rows: vec![
                ExchangeRateRow::new(date(2024, 5, 1))
                    .with_rate(Currency::Usd, dec!(3.70))
                    .with_rate(Currency::Eur, dec!(4.00)),
                ExchangeRateRow::new(date(2024, 5, 6)).with_rate(Currency::Usd, dec!(3.75)),
            ],
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_same_currency_skips_source() {
        let source = source();
        let resolver = ExchangeRateResolver::new(source.clone(), Currency::Ils);

        let rate = resolver
            .rate(Currency::Usd, Currency::Usd, date(2024, 5, 1))
            .await
            .unwrap();

        assert_eq!(rate, Decimal::ONE);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_most_recent_on_or_before() {
        let resolver = ExchangeRateResolver::new(source(), Currency::Ils);

        let saturday = resolver
            .local_rate(Currency::Usd, date(2024, 5, 4))
            .await
            .unwrap();
        let monday = resolver
            .local_rate(Currency::Usd, date(2024, 5, 6))
            .await
            .unwrap();

        assert_eq!(saturday, dec!(3.70));
        assert_eq!(monday, dec!(3.75));
    }

    #[tokio::test]
    async fn test_cross_rate_through_local() {
        let resolver = ExchangeRateResolver::new(source(), Currency::Ils);

        let rate = resolver
            .rate(Currency::Eur, Currency::Usd, date(2024, 5, 1))
            .await
            .unwrap();

        assert_eq!(rate, dec!(4.00) / dec!(3.70));
    }

    #[tokio::test]
    async fn test_no_rate_before_first_row() {
        let resolver = ExchangeRateResolver::new(source(), Currency::Ils);

        let err = resolver
            .local_rate(Currency::Usd, date(2024, 4, 30))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RateError::NoExchangeRate {
                currency: Currency::Usd,
                local: Currency::Ils,
                date: date(2024, 4, 30),
            }
        );
    }

    #[tokio::test]
    async fn test_lookback_window_limits_search() {
        let config = RateConfig {
            lookback_days: Some(3),
            ..RateConfig::default()
        };
        let resolver = ExchangeRateResolver::with_config(source(), Currency::Ils, &config);

        assert!(resolver.local_rate(Currency::Eur, date(2024, 5, 4)).await.is_ok());
        assert!(matches!(
            resolver.local_rate(Currency::Eur, date(2024, 5, 5)).await,
            Err(RateError::NoExchangeRate { .. })
        ));
    }

    #[tokio::test]
    async fn test_cache_hits_and_invalidation() {
        let source = source();
        let resolver = ExchangeRateResolver::new(source.clone(), Currency::Ils);

        for _ in 0..3 {
            resolver
                .local_rate(Currency::Usd, date(2024, 5, 2))
                .await
                .unwrap();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        resolver.run_pending_tasks().await;
        assert_eq!(resolver.entry_count(), 1);

        resolver.invalidate_all();
        resolver
            .local_rate(Currency::Usd, date(2024, 5, 2))
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let source = source();
        let resolver = ExchangeRateResolver::new(source.clone(), Currency::Ils);

        let lookups = (0..16).map(|_| resolver.local_rate(Currency::Usd, date(2024, 5, 3)));
        let rates = join_all(lookups).await;

        assert!(rates.iter().all(|rate| rate == &Ok(dec!(3.70))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_snapshot_skips_missing_rates() {
        let resolver = ExchangeRateResolver::new(source(), Currency::Ils);

        let snapshot = resolver
            .snapshot([
                (Currency::Usd, date(2024, 5, 1)),
                (Currency::Usd, date(2024, 5, 1)),
                (Currency::Ils, date(2024, 5, 1)),
                (Currency::Gbp, date(2024, 5, 1)),
            ])
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_propagates_source_failure() {
        let resolver = ExchangeRateResolver::new(Arc::new(FailingSource), Currency::Ils);

        let err = resolver
            .snapshot([(Currency::Usd, date(2024, 5, 1))])
            .await
            .unwrap_err();

        assert_eq!(err, RateError::Source("connection refused".to_string()));
    }
}
