//! Synchronous rate lookups used by generators.
//!
//! Generators never await. The engine prefetches every `(currency, date)` a
//! charge needs into a [`RateSnapshot`] and hands that to the generator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::Currency;

use super::conversion::convert_to_local;
use super::error::RateError;
use super::exchange::{ExchangeRateRow, resolve_from_rows};

/// Resolves foreign-to-local rates without blocking.
pub trait RateLookup: Send + Sync {
    /// The currency every rate converts into.
    fn local_currency(&self) -> Currency;

    /// Rate of one unit of `currency` in local currency, effective on `date`.
    fn rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError>;

    /// Converts `amount` into local currency, returning `(rate, local_amount)`.
    fn to_local(
        &self,
        amount: Decimal,
        currency: Currency,
        date: NaiveDate,
    ) -> Result<(Decimal, Decimal), RateError> {
        let rate = self.rate(currency, date)?;
        Ok((rate, convert_to_local(amount, rate)))
    }
}

/// Rates resolved ahead of time for exact `(currency, date)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    local_currency: Currency,
    rates: BTreeMap<(Currency, NaiveDate), Decimal>,
}

impl RateSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new(local_currency: Currency) -> Self {
        Self {
            local_currency,
            rates: BTreeMap::new(),
        }
    }

    /// Records a resolved rate.
    pub fn insert(&mut self, currency: Currency, date: NaiveDate, rate: Decimal) {
        self.rates.insert((currency, date), rate);
    }

    /// Number of resolved pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Whether no pair was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl RateLookup for RateSnapshot {
    fn local_currency(&self) -> Currency {
        self.local_currency
    }

    fn rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        if currency == self.local_currency {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(currency, date))
            .copied()
            .ok_or(RateError::NoExchangeRate {
                currency,
                local: self.local_currency,
                date,
            })
    }
}

/// Rates looked up directly from a set of rows, most recent on or before the date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateTable {
    local_currency: Currency,
    rows: Vec<ExchangeRateRow>,
}

impl RateTable {
    /// Creates a table over the given rows.
    #[must_use]
    pub fn new(local_currency: Currency, rows: Vec<ExchangeRateRow>) -> Self {
        Self {
            local_currency,
            rows,
        }
    }
}

impl RateLookup for RateTable {
    fn local_currency(&self) -> Currency {
        self.local_currency
    }

    fn rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, RateError> {
        resolve_from_rows(&self.rows, currency, self.local_currency, date)
    }
}
