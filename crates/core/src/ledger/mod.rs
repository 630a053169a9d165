//! Ledger generation.
//!
//! This module turns charges into double-entry postings:
//! - Posting drafts and persisted postings
//! - Aggregated charge data
//! - One generator per charge type, dispatched through a registry
//! - Balance validation of the generated postings
//! - Error types for generation

pub mod balance;
pub mod charge;
pub mod error;
pub mod generators;
pub mod posting;

#[cfg(test)]
mod generators_props;

pub use balance::{BALANCE_EPSILON, BalanceResult, BalanceValidator, CurrencyBalance, EntityBalance};
pub use charge::{
    Charge, ChargeData, ChargeDocument, ChargeTransaction, ChargeType, DocumentDirection,
    DocumentKind, MiscExpense, SalaryComponent, SalaryComponentKind, SalaryRecord,
};
pub use error::GenerationError;
pub use generators::{
    GenerationContext, GeneratorRegistry, LedgerGenerator, ReserveCalculationError,
    ReserveCalculator, ReserveKind,
};
pub use posting::{ConvertedAmount, PersistedPosting, PostingDraft, PostingLeg, Provenance};
