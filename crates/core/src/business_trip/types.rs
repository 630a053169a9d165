//! Business trip domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::config::DestinationAllowance;
use tally_shared::types::{Currency, EntityId, Money, TripExpenseId, TripId};

/// Expense category on a business trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCategory {
    /// Flights; fully recognized.
    Flights,
    /// Hotels; capped per night.
    Accommodation,
    /// Local travel, meals and per-diem; capped per day.
    TravelAndSubsistence,
    /// Anything else; fully recognized.
    Other,
}

impl TripCategory {
    /// All categories in report order.
    pub const ALL: [Self; 4] = [
        Self::Flights,
        Self::Accommodation,
        Self::TravelAndSubsistence,
        Self::Other,
    ];
}

/// Category tag of a summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryCategory {
    /// Flights row.
    Flights,
    /// Accommodation row.
    Accommodation,
    /// Travel and subsistence row.
    TravelAndSubsistence,
    /// Other expenses row.
    Other,
    /// Sum of all category rows.
    Total,
}

impl From<TripCategory> for SummaryCategory {
    fn from(category: TripCategory) -> Self {
        match category {
            TripCategory::Flights => Self::Flights,
            TripCategory::Accommodation => Self::Accommodation,
            TripCategory::TravelAndSubsistence => Self::TravelAndSubsistence,
            TripCategory::Other => Self::Other,
        }
    }
}

/// Allowance table a destination falls under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationClass {
    /// Regular destinations.
    #[default]
    Standard,
    /// Expensive destinations with higher allowances.
    HighCost,
}

/// Trip metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripMeta {
    /// Trip id.
    pub id: TripId,
    /// Display name.
    pub name: Option<String>,
    /// First day of the trip.
    pub start_date: Option<NaiveDate>,
    /// Last day of the trip.
    pub end_date: Option<NaiveDate>,
    /// Allowance table to apply.
    pub destination: DestinationClass,
}

/// A categorized trip expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripExpense {
    /// Expense id.
    pub id: TripExpenseId,
    /// Category.
    pub category: TripCategory,
    /// Signed amount; positive is money spent, negative a refund.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Value date.
    pub value_date: NaiveDate,
    /// Supplier, if known.
    pub counterparty_id: Option<EntityId>,
    /// Description.
    pub description: Option<String>,
}

/// A trip with its expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessTripData {
    /// Trip metadata.
    pub trip: TripMeta,
    /// Expenses.
    pub expenses: Vec<TripExpense>,
}

/// A trip expense with its local-currency amount already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizedExpense {
    /// Category.
    pub category: TripCategory,
    /// Original currency.
    pub currency: Currency,
    /// Signed amount in `currency`.
    pub amount: Decimal,
    /// Signed amount in local currency.
    pub local_amount: Decimal,
}

/// One row of a business trip summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessTripSummaryRow {
    /// Row category.
    pub category: SummaryCategory,
    /// Foreign totals, ordered by currency.
    pub totals: Vec<Money>,
    /// Local total.
    pub local_total: Decimal,
    /// Taxable foreign totals, ordered by currency.
    pub taxable: Vec<Money>,
    /// Taxable local total.
    pub taxable_local: Decimal,
    /// Local amount above the allowance.
    pub excess_local: Decimal,
}

/// Business trip summary report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessTripSummary {
    /// Trip id.
    pub trip_id: TripId,
    /// Inclusive number of days.
    pub duration_days: i64,
    /// Non-empty category rows followed by the TOTAL row.
    pub rows: Vec<BusinessTripSummaryRow>,
    /// Total excess expenditure in local currency.
    pub excess_local: Decimal,
    /// Tax on the excess expenditure.
    pub excess_tax: Decimal,
}

impl BusinessTripSummary {
    /// Returns the row for a category, if present.
    #[must_use]
    pub fn row(&self, category: SummaryCategory) -> Option<&BusinessTripSummaryRow> {
        self.rows.iter().find(|row| row.category == category)
    }
}

/// Allowance parameters resolved for a single trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripPolicy {
    /// Allowance tier for the trip's destination, in the allowance currency.
    pub allowance: DestinationAllowance,
    /// Allowance currency to local currency rate at the trip end date.
    pub allowance_rate: Decimal,
    /// Excess-expenditure tax rate, as a percentage.
    pub excess_tax_rate: Decimal,
}
