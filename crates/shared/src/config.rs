//! Application configuration management.
//!
//! Configuration is layered: `config/default.toml`, then `config/{RUN_MODE}.toml`,
//! then environment variables prefixed with `TALLY__` (e.g. `TALLY__ENGINE__CONCURRENCY`).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{Currency, EntityId};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Batch generation settings.
    pub engine: EngineConfig,
    /// Exchange rate resolution settings.
    pub rates: RateConfig,
    /// Designated accounts and tax parameters.
    pub admin: AdminConfig,
}

/// Batch generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of charges generated concurrently.
    pub concurrency: usize,
    /// Optional batch timeout in seconds. Charges not started before it elapses are abandoned.
    pub batch_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_timeout_secs: None,
        }
    }
}

fn default_concurrency() -> usize {
    8
}

/// Exchange rate resolution settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Maximum number of (currency, date) pairs kept in a resolver cache.
    pub cache_capacity: u64,
    /// How many days back the resolver asks the rate source for. `None` means unbounded.
    pub lookback_days: Option<u32>,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            lookback_days: None,
        }
    }
}

fn default_cache_capacity() -> u64 {
    10_000
}

/// Designated account ids per purpose, plus tax parameters.
///
/// Every account is optional here; generators report a configuration error
/// naming the missing field only when a charge actually needs it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// The tenant's reporting currency.
    pub local_currency: Currency,
    /// Category for bank and card fees.
    pub fee_category: Option<EntityId>,
    /// Category absorbing exchange-rate revaluation differences.
    pub exchange_rate_category: Option<EntityId>,
    /// Tax category used for documents when the charge carries none.
    pub default_tax_category: Option<EntityId>,
    /// Account for VAT paid on expenses.
    pub input_vat_account: Option<EntityId>,
    /// Account for VAT collected on income.
    pub output_vat_account: Option<EntityId>,
    /// Payroll accounts.
    pub salary: SalaryAccounts,
    /// Vacation reserve accounts.
    pub vacation_reserve: ReserveAccounts,
    /// Recovery pay reserve accounts.
    pub recovery_reserve: ReserveAccounts,
    /// Tax category per authority business (authority id -> category id).
    pub authority_categories: BTreeMap<EntityId, EntityId>,
    /// Business trip accounts.
    pub business_trip: BusinessTripAccounts,
    /// Excess-expenditure tax rate, as a percentage.
    pub excess_expenditure_tax_rate: Option<Decimal>,
    /// Government travel allowances.
    pub trip_allowances: TripAllowances,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            local_currency: Currency::Ils,
            fee_category: None,
            exchange_rate_category: None,
            default_tax_category: None,
            input_vat_account: None,
            output_vat_account: None,
            salary: SalaryAccounts::default(),
            vacation_reserve: ReserveAccounts::default(),
            recovery_reserve: ReserveAccounts::default(),
            authority_categories: BTreeMap::new(),
            business_trip: BusinessTripAccounts::default(),
            excess_expenditure_tax_rate: None,
            trip_allowances: TripAllowances::default(),
        }
    }
}

/// Payroll accounts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SalaryAccounts {
    /// Gross salary expense category.
    pub expense: Option<EntityId>,
    /// Employer cost expense category (pension, compensation, social security, study fund).
    pub employer_cost_expense: Option<EntityId>,
    /// Pension fund (receives pension and compensation contributions).
    pub pension_fund: Option<EntityId>,
    /// Study fund.
    pub study_fund: Option<EntityId>,
    /// Income tax authority.
    pub tax_authority: Option<EntityId>,
    /// Social security authority.
    pub social_security_authority: Option<EntityId>,
}

/// Accounts used by a reserve charge.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReserveAccounts {
    /// Reserve expense category.
    pub expense: Option<EntityId>,
    /// Reserve liability account.
    pub liability: Option<EntityId>,
}

/// Business trip accounts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BusinessTripAccounts {
    /// Deductible business trip category.
    pub category: Option<EntityId>,
    /// Non-deductible category receiving excess expenditure.
    pub excess_category: Option<EntityId>,
}

/// Government-defined travel allowances.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TripAllowances {
    /// Currency the allowances are expressed in.
    pub currency: Currency,
    /// Allowances for standard destinations.
    pub standard: DestinationAllowance,
    /// Allowances for high-cost destinations.
    pub high_cost: DestinationAllowance,
}

impl Default for TripAllowances {
    fn default() -> Self {
        Self {
            currency: Currency::Usd,
            standard: DestinationAllowance {
                accommodation_per_night: Decimal::new(183, 0),
                subsistence_with_accommodation: Decimal::new(62, 0),
                subsistence_without_accommodation: Decimal::new(93, 0),
            },
            high_cost: DestinationAllowance {
                accommodation_per_night: Decimal::new(335, 0),
                subsistence_with_accommodation: Decimal::new(83, 0),
                subsistence_without_accommodation: Decimal::new(139, 0),
            },
        }
    }
}

/// Allowance tier for one destination class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DestinationAllowance {
    /// Maximum recognized accommodation cost per night.
    pub accommodation_per_night: Decimal,
    /// Daily travel and subsistence allowance when accommodation expenses exist.
    pub subsistence_with_accommodation: Decimal,
    /// Daily travel and subsistence allowance when no accommodation expenses exist.
    pub subsistence_without_accommodation: Decimal,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("TALLY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Parses configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid configuration.
    pub fn from_toml(document: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
