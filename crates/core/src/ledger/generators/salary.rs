//! Salary charges.

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use tally_shared::types::EntityId;

use super::common::transaction_postings;
use super::{GenerationContext, LedgerGenerator, require_account};
use crate::ledger::charge::{Charge, ChargeData, ChargeType, SalaryRecord};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

/// Generator for monthly payroll charges.
///
/// Per employee: the gross salary, each employee deduction and each employer
/// contribution become one posting. Payment transactions post like common
/// transactions, settling the employee and the funds.
pub struct SalaryGenerator;

impl LedgerGenerator for SalaryGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::Salary]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let mut postings = Vec::new();
        for record in &data.salaries {
            postings.extend(record_postings(data, record, ctx)?);
        }
        postings.extend(transaction_postings(data, ctx)?);
        Ok(postings)
    }
}

fn record_postings(
    data: &ChargeData,
    record: &SalaryRecord,
    ctx: &GenerationContext<'_>,
) -> Result<Vec<PostingDraft>, GenerationError> {
    let charge = &data.charge;
    let salary = &ctx.admin.salary;
    let value_date = end_of_month(record.month);
    let period = format!("{}-{:02}", record.month.year(), record.month.month());
    let mut postings = Vec::with_capacity(record.components.len() + 1);

    if !record.gross_amount.is_zero() {
        let expense = require_account(charge.id, salary.expense, "salary.expense")?;
        postings.push(
            settle(
                charge,
                expense,
                record.employee_id,
                record.gross_amount,
                value_date,
                ctx,
            )
            .with_description(Some(format!("Salary {period}"))),
        );
    }

    for component in &record.components {
        if component.amount.is_zero() {
            continue;
        }
        let target = require_account(
            charge.id,
            component.kind.target_account(ctx.admin),
            component.kind.target_field(),
        )?;

        let source = if component.kind.is_employer_cost() {
            require_account(
                charge.id,
                salary.employer_cost_expense,
                "salary.employer_cost_expense",
            )?
        } else {
            record.employee_id
        };

        postings.push(
            settle(charge, source, target, component.amount, value_date, ctx)
                .with_description(Some(format!("{:?} {period}", component.kind))),
        );
    }

    Ok(postings)
}

/// Debits `source` and credits `target`; a negative amount (a payroll
/// correction) swaps the two.
fn settle(
    charge: &Charge,
    source: EntityId,
    target: EntityId,
    amount: Decimal,
    value_date: NaiveDate,
    ctx: &GenerationContext<'_>,
) -> PostingDraft {
    let is_correction = amount.is_sign_negative();
    let (debit, credit) = if is_correction {
        (target, source)
    } else {
        (source, target)
    };
    PostingDraft::new(charge, debit, credit, &ctx.local(amount), value_date, value_date)
        .creditor_counterparty(!is_correction)
}

/// Last day of the month containing `date`.
fn end_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(1)))
        .and_then(|next| next.pred_opt())
        .unwrap_or(date)
}
