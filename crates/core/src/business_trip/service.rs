//! Business trip summary calculation.
//!
//! Expenses are summed per category and currency. Flights and other expenses
//! are fully recognized; accommodation and travel & subsistence are capped by
//! government allowances multiplied by the trip duration. Anything above the
//! cap is excess expenditure, taxed at the configured rate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::AdminConfig;
use tally_shared::types::{Currency, Money};

use super::error::TripError;
use super::types::{
    BusinessTripData, BusinessTripSummary, BusinessTripSummaryRow, DestinationClass, LocalizedExpense, SummaryCategory, TripCategory, TripMeta, TripPolicy,
};
use crate::currency::{RateLookup, round_local};

/// Business trip summary service.
///
/// Stateless; all inputs are passed explicitly.
pub struct BusinessTripService;

impl BusinessTripService {
    /// Inclusive trip duration in days.
    ///
    /// # Errors
    ///
    /// Returns `MissingDates` if either date is unset and `InvalidDateRange`
    /// if the trip ends before it starts.
    pub fn duration_days(trip: &TripMeta) -> Result<i64, TripError> {
        let (start, end) = Self::dates(trip)?;
        Ok((end - start).num_days() + 1)
    }

    fn dates(trip: &TripMeta) -> Result<(NaiveDate, NaiveDate), TripError> {
        let (start, end) = match (trip.start_date, trip.end_date) {
            (Some(start), Some(end)) => (start, end),
            (None, Some(_)) => return Err(Self::missing(trip, "start")),
            (Some(_), None) => return Err(Self::missing(trip, "end")),
            (None, None) => return Err(Self::missing(trip, "start and end")),
        };

        if end < start {
            return Err(TripError::InvalidDateRange {
                trip_id: trip.id,
                start,
                end,
            });
        }

        Ok((start, end))
    }

    fn missing(trip: &TripMeta, missing: &'static str) -> TripError {
        TripError::MissingDates {
            trip_id: trip.id,
            missing,
        }
    }

    /// Resolves the allowance tier, allowance rate and tax rate for a trip.
    pub fn policy(
        trip: &TripMeta,
        admin: &AdminConfig,
        rates: &dyn RateLookup,
    ) -> Result<TripPolicy, TripError> {
        let (_, end) = Self::dates(trip)?;
        let excess_tax_rate = admin
            .excess_expenditure_tax_rate
            .ok_or(TripError::Configuration("excess_expenditure_tax_rate"))?;

        let allowances = &admin.trip_allowances;
        let allowance = match trip.destination {
            DestinationClass::Standard => allowances.standard.clone(),
            DestinationClass::HighCost => allowances.high_cost.clone(),
        };
        let allowance_rate = rates.rate(allowances.currency, end)?;

        Ok(TripPolicy {
            allowance,
            allowance_rate,
            excess_tax_rate,
        })
    }

    /// Converts every expense at its value date.
    pub fn localize(
        data: &BusinessTripData,
        rates: &dyn RateLookup,
    ) -> Result<Vec<LocalizedExpense>, TripError> {
        data.expenses
            .iter()
            .map(|expense| {
                let (_, local_amount) =
                    rates.to_local(expense.amount, expense.currency, expense.value_date)?;
                Ok(LocalizedExpense {
                    category: expense.category,
                    currency: expense.currency,
                    amount: expense.amount,
                    local_amount,
                })
            })
            .collect()
    }

    /// Summarizes a trip end to end: dates, policy, localization, rows.
    pub fn summarize_trip(
        data: &BusinessTripData,
        admin: &AdminConfig,
        rates: &dyn RateLookup,
    ) -> Result<BusinessTripSummary, TripError> {
        let policy = Self::policy(&data.trip, admin, rates)?;
        let expenses = Self::localize(data, rates)?;
        Self::summarize(&data.trip, &expenses, &policy)
    }

    /// Builds the summary from already-localized expenses.
    pub fn summarize(
        trip: &TripMeta,
        expenses: &[LocalizedExpense],
        policy: &TripPolicy,
    ) -> Result<BusinessTripSummary, TripError> {
        let duration = Self::duration_days(trip)?;
        let has_accommodation = expenses
            .iter()
            .any(|expense| expense.category == TripCategory::Accommodation);

        let mut rows = Vec::with_capacity(TripCategory::ALL.len() + 1);
        let mut total = CategoryCollector::default();

        for category in TripCategory::ALL {
            let mut collector = CategoryCollector::default();
            for expense in expenses.iter().filter(|expense| expense.category == category) {
                collector.add(expense);
            }
            if collector.is_empty() {
                continue;
            }

            let cap = Self::cap(category, duration, has_accommodation, policy);
            let row = collector.into_row(category.into(), cap);
            total.absorb(&row);
            rows.push(row);
        }

        let total_row = total.into_total_row();
        let excess_local = total_row.excess_local;
        rows.push(total_row);

        Ok(BusinessTripSummary {
            trip_id: trip.id,
            duration_days: duration,
            rows,
            excess_local,
            excess_tax: Self::excess_tax(excess_local, policy.excess_tax_rate),
        })
    }

    /// Local-currency cap for a category, or `None` when fully recognized.
    #[must_use]
    pub fn cap(
        category: TripCategory,
        duration_days: i64,
        has_accommodation: bool,
        policy: &TripPolicy,
    ) -> Option<Decimal> {
        let allowance = &policy.allowance;
        let foreign_cap = match category {
            TripCategory::Flights | TripCategory::Other => return None,
            TripCategory::Accommodation => {
                let nights = (duration_days - 1).max(1);
                Decimal::from(nights) * allowance.accommodation_per_night
            }
            TripCategory::TravelAndSubsistence => {
                let daily = if has_accommodation {
                    allowance.subsistence_with_accommodation
                } else {
                    allowance.subsistence_without_accommodation
                };
                Decimal::from(duration_days) * daily
            }
        };

        Some(round_local(foreign_cap * policy.allowance_rate))
    }

    /// Tax on excess expenditure: `excess * rate / 100`, rounded to cents.
    #[must_use]
    pub fn excess_tax(excess_local: Decimal, rate: Decimal) -> Decimal {
        round_local(excess_local * rate / Decimal::ONE_HUNDRED)
    }
}

#[derive(Default)]
struct CategoryCollector {
    count: usize,
    totals: BTreeMap<Currency, Decimal>,
    local_total: Decimal,
    taxable: BTreeMap<Currency, Decimal>,
    taxable_local: Decimal,
    excess_local: Decimal,
}

impl CategoryCollector {
    fn add(&mut self, expense: &LocalizedExpense) {
        self.count += 1;
        *self.totals.entry(expense.currency).or_default() += expense.amount;
        self.local_total += expense.local_amount;
    }

    fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn into_row(self, category: SummaryCategory, cap: Option<Decimal>) -> BusinessTripSummaryRow {
        let taxable_local = match cap {
            Some(cap) if self.local_total > cap => cap,
            _ => self.local_total,
        };
        let excess_local = (self.local_total - taxable_local).max(Decimal::ZERO);

        let taxable = if taxable_local == self.local_total {
            self.totals.clone()
        } else {
            let fraction = taxable_local / self.local_total;
            self.totals
                .iter()
                .map(|(currency, amount)| (*currency, round_local(*amount * fraction)))
                .collect()
        };

        BusinessTripSummaryRow {
            category,
            totals: amounts(&self.totals),
            local_total: self.local_total,
            taxable: amounts(&taxable),
            taxable_local,
            excess_local,
        }
    }

    fn absorb(&mut self, row: &BusinessTripSummaryRow) {
        self.count += 1;
        for amount in &row.totals {
            *self.totals.entry(amount.currency).or_default() += amount.amount;
        }
        for amount in &row.taxable {
            *self.taxable.entry(amount.currency).or_default() += amount.amount;
        }
        self.local_total += row.local_total;
        self.taxable_local += row.taxable_local;
        self.excess_local += row.excess_local;
    }

    fn into_total_row(self) -> BusinessTripSummaryRow {
        BusinessTripSummaryRow {
            category: SummaryCategory::Total,
            totals: amounts(&self.totals),
            local_total: self.local_total,
            taxable: amounts(&self.taxable),
            taxable_local: self.taxable_local,
            excess_local: self.excess_local,
        }
    }
}

fn amounts(totals: &BTreeMap<Currency, Decimal>) -> Vec<Money> {
    totals
        .iter()
        .map(|(currency, amount)| Money::new(*amount, *currency))
        .collect()
}
