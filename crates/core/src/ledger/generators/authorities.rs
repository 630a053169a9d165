//! Authorities-expense charges.

use super::common::transaction_postings;
use super::{GenerationContext, LedgerGenerator, require_account};
use crate::ledger::charge::{ChargeData, ChargeType};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

/// Generator for payments to tax and government authorities.
///
/// Each misc-expense record posts between the authority and its tax
/// category; the payment transactions post like common transactions.
pub struct AuthoritiesGenerator;

impl LedgerGenerator for AuthoritiesGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::AuthoritiesExpense]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let charge = &data.charge;
        let authority = match charge.counterparty_id {
            Some(authority) if charge.counterparty_is_authority => authority,
            Some(counterparty) => {
                return Err(GenerationError::structural(
                    charge.id,
                    format!("counterparty {counterparty} is not a tax authority"),
                ));
            }
            None => {
                return Err(GenerationError::structural(
                    charge.id,
                    "authorities charge has no counterparty",
                ));
            }
        };

        let mut postings = transaction_postings(data, ctx)?;

        for expense in &data.misc_expenses {
            if expense.amount.is_zero() {
                continue;
            }
            let category = require_account(
                charge.id,
                expense
                    .tax_category_id
                    .or_else(|| ctx.admin.authority_categories.get(&authority).copied()),
                &format!("authority_categories.{authority}"),
            )?;
            let amount = ctx.convert(charge.id, expense.amount, expense.currency, expense.value_date)?;

            let posting = if expense.amount.is_sign_positive() {
                PostingDraft::new(
                    charge,
                    category,
                    authority,
                    &amount,
                    expense.value_date,
                    expense.invoice_date,
                )
                .creditor_counterparty(true)
            } else {
                PostingDraft::new(
                    charge,
                    authority,
                    category,
                    &amount,
                    expense.value_date,
                    expense.invoice_date,
                )
            };
            postings.push(posting.with_description(expense.description.clone()));
        }

        Ok(postings)
    }
}
