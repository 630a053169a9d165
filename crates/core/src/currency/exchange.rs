//! Exchange rate rows as published by a rate source.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::Currency;

use super::error::RateError;

/// One dated row of rates.
///
/// Each rate is the number of local-currency units one unit of the foreign
/// currency buys on `date`. A row may omit currencies that were not published
/// that day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateRow {
    /// Publication date.
    pub date: NaiveDate,
    /// Rates keyed by foreign currency.
    pub rates: BTreeMap<Currency, Decimal>,
}

impl ExchangeRateRow {
    /// Creates an empty row for the given date.
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            rates: BTreeMap::new(),
        }
    }

    /// Adds a rate to the row.
    #[must_use]
    pub fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }

    /// Returns the rate for a currency, if the row carries one.
    #[must_use]
    pub fn rate_for(&self, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).copied()
    }
}

/// Picks the rate from the most recent row dated on or before `date` that
/// carries `currency`. Rows after `date` are never considered.
#[must_use]
pub fn pick_rate(
    rows: &[ExchangeRateRow],
    currency: Currency,
    date: NaiveDate,
) -> Option<(NaiveDate, Decimal)> {
    rows.iter()
        .filter(|row| row.date <= date)
        .filter_map(|row| row.rate_for(currency).map(|rate| (row.date, rate)))
        .max_by_key(|(row_date, _)| *row_date)
}

/// Resolves the rate for `currency` on `date` from `rows`.
///
/// # Errors
///
/// Returns `NoExchangeRate` when no row on or before `date` carries the
/// currency, and `InvalidRate` when the picked rate is not positive.
pub fn resolve_from_rows(
    rows: &[ExchangeRateRow],
    currency: Currency,
    local: Currency,
    date: NaiveDate,
) -> Result<Decimal, RateError> {
    if currency == local {
        return Ok(Decimal::ONE);
    }

    let (row_date, rate) = pick_rate(rows, currency, date).ok_or(RateError::NoExchangeRate {
        currency,
        local,
        date,
    })?;

    if rate <= Decimal::ZERO {
        return Err(RateError::InvalidRate {
            currency,
            date: row_date,
            rate,
        });
    }

    Ok(rate)
}
