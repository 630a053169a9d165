//! Vacation and recovery reserve charges.
//!
//! The reserve year is read from the charge description. The calculator
//! supplies the year's adjustment; its sign decides whether the liability
//! grows or shrinks.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use tally_shared::config::ReserveAccounts;
use tally_shared::types::OwnerId;
use thiserror::Error;

use super::{GenerationContext, LedgerGenerator, require_account};
use crate::ledger::charge::{ChargeData, ChargeType};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

/// Earliest year a reserve charge may refer to.
pub const MIN_RESERVE_YEAR: i32 = 2000;

/// Which reserve a charge adjusts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReserveKind {
    /// Accrued vacation days.
    Vacation,
    /// Recovery (convalescence) pay.
    Recovery,
}

impl ReserveKind {
    fn from_charge_type(charge_type: ChargeType) -> Option<Self> {
        match charge_type {
            ChargeType::VacationReserve => Some(Self::Vacation),
            ChargeType::RecoveryReserve => Some(Self::Recovery),
            _ => None,
        }
    }

    fn accounts<'a>(self, ctx: &GenerationContext<'a>) -> &'a ReserveAccounts {
        match self {
            Self::Vacation => &ctx.admin.vacation_reserve,
            Self::Recovery => &ctx.admin.recovery_reserve,
        }
    }

    fn field_prefix(self) -> &'static str {
        match self {
            Self::Vacation => "vacation_reserve",
            Self::Recovery => "recovery_reserve",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Vacation => "Vacation reserve",
            Self::Recovery => "Recovery reserve",
        }
    }
}

/// Failure reported by a reserve calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ReserveCalculationError(pub String);

/// Computes the reserve adjustment for a year.
pub trait ReserveCalculator: Send + Sync {
    /// Signed adjustment in local currency; negative releases part of the reserve.
    fn reserve_amount(
        &self,
        kind: ReserveKind,
        owner_id: OwnerId,
        year: i32,
    ) -> Result<Decimal, ReserveCalculationError>;
}

/// Generator for vacation and recovery reserve charges.
pub struct ReserveGenerator;

impl LedgerGenerator for ReserveGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::VacationReserve, ChargeType::RecoveryReserve]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let charge = &data.charge;
        let kind = ReserveKind::from_charge_type(charge.charge_type).ok_or(
            GenerationError::UnsupportedChargeType {
                charge_id: charge.id,
                charge_type: charge.charge_type,
            },
        )?;

        let year = reserve_year(charge.description.as_deref(), ctx.as_of.year()).ok_or_else(|| {
            GenerationError::structural(
                charge.id,
                format!(
                    "description must contain a year between {MIN_RESERVE_YEAR} and {}",
                    ctx.as_of.year()
                ),
            )
        })?;

        let amount = ctx
            .reserves
            .reserve_amount(kind, charge.owner_id, year)
            .map_err(|err| GenerationError::ReserveCalculation {
                charge_id: charge.id,
                message: err.0,
            })?;
        if amount.is_zero() {
            return Ok(Vec::new());
        }

        let accounts = kind.accounts(ctx);
        let prefix = kind.field_prefix();
        let expense = require_account(charge.id, accounts.expense, &format!("{prefix}.expense"))?;
        let liability =
            require_account(charge.id, accounts.liability, &format!("{prefix}.liability"))?;

        let year_end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(|| {
            GenerationError::structural(charge.id, format!("invalid reserve year {year}"))
        })?;
        let (debit, credit) = if amount.is_sign_positive() {
            (expense, liability)
        } else {
            (liability, expense)
        };

        Ok(vec![
            PostingDraft::new(charge, debit, credit, &ctx.local(amount), year_end, year_end)
                .with_description(Some(format!("{} {year}", kind.label()))),
        ])
    }
}

/// Returns the first standalone 4-digit number in `description` that lies in
/// `[MIN_RESERVE_YEAR, max_year]`.
pub fn reserve_year(description: Option<&str>, max_year: i32) -> Option<i32> {
    let description = description?;
    let bytes = description.as_bytes();
    let mut start = 0;

    while start < bytes.len() {
        if !bytes[start].is_ascii_digit() {
            start += 1;
            continue;
        }
        let end = bytes[start..]
            .iter()
            .position(|byte| !byte.is_ascii_digit())
            .map_or(bytes.len(), |offset| start + offset);

        if end - start == 4 {
            let year = description[start..end].parse::<i32>().ok();
            if let Some(year) = year.filter(|year| (MIN_RESERVE_YEAR..=max_year).contains(year)) {
                return Some(year);
            }
        }
        start = end;
    }

    None
}
