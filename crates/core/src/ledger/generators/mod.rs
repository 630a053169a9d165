//! Ledger posting generators, one per charge type.
//!
//! Generators are pure: they read a charge's aggregated data and a
//! [`GenerationContext`] and return posting drafts. Rates come from a
//! prefetched lookup, so nothing here awaits or touches storage.

pub mod authorities;
pub mod business_trip;
pub mod common;
pub mod conversion;
pub mod registry;
pub mod reserve;
pub mod salary;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::AdminConfig;
use tally_shared::types::{ChargeId, Currency, EntityId};

use super::charge::{ChargeData, ChargeType};
use super::error::GenerationError;
use super::posting::{ConvertedAmount, PostingDraft};
use crate::currency::RateLookup;

pub use authorities::AuthoritiesGenerator;
pub use business_trip::BusinessTripGenerator;
pub use common::CommonGenerator;
pub use conversion::ConversionGenerator;
pub use registry::GeneratorRegistry;
pub use reserve::{ReserveCalculationError, ReserveCalculator, ReserveGenerator, ReserveKind};
pub use salary::SalaryGenerator;

/// Everything a generator may consult besides the charge itself.
#[derive(Clone, Copy)]
pub struct GenerationContext<'a> {
    /// Designated accounts and tax parameters.
    pub admin: &'a AdminConfig,
    /// Prefetched exchange rates.
    pub rates: &'a dyn RateLookup,
    /// Reserve amounts for reserve charges.
    pub reserves: &'a dyn ReserveCalculator,
    /// Date generation runs as of; bounds reserve years.
    pub as_of: NaiveDate,
}

impl<'a> GenerationContext<'a> {
    /// Creates a context.
    #[must_use]
    pub fn new(
        admin: &'a AdminConfig,
        rates: &'a dyn RateLookup,
        reserves: &'a dyn ReserveCalculator,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            admin,
            rates,
            reserves,
            as_of,
        }
    }

    /// The tenant's local currency.
    #[must_use]
    pub fn local_currency(&self) -> Currency {
        self.admin.local_currency
    }

    /// Converts the absolute value of `amount` at the rate effective on `date`.
    pub fn convert(
        &self,
        charge_id: ChargeId,
        amount: Decimal,
        currency: Currency,
        date: NaiveDate,
    ) -> Result<ConvertedAmount, GenerationError> {
        ConvertedAmount::convert(amount, currency, date, self.rates)
            .map_err(|err| GenerationError::from_rate(charge_id, err))
    }

    /// Wraps an amount that is already in local currency.
    #[must_use]
    pub fn local(&self, amount: Decimal) -> ConvertedAmount {
        ConvertedAmount::local(amount, self.local_currency())
    }
}

/// Returns the configured account or a configuration error naming `field`.
pub fn require_account(
    charge_id: ChargeId,
    account: Option<EntityId>,
    field: &str,
) -> Result<EntityId, GenerationError> {
    account.ok_or_else(|| GenerationError::configuration(charge_id, field))
}

/// Turns one charge type's data into postings.
pub trait LedgerGenerator: Send + Sync {
    /// Charge types this generator handles.
    fn charge_types(&self) -> &'static [ChargeType];

    /// Generates postings for the charge.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on missing configuration, malformed data or
    /// an unresolved exchange rate.
    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError>;
}
