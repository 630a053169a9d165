//! Business trip charges.

use rust_decimal::Decimal;
use tally_shared::types::ChargeId;

use super::common::{revaluation_postings, transaction_postings};
use super::{GenerationContext, LedgerGenerator, require_account};
use crate::business_trip::{BusinessTripService, TripError};
use crate::ledger::charge::{ChargeData, ChargeType};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

const EXCESS_DESCRIPTION: &str = "Business trip excess expenditure";

/// Generator for business trip charges.
///
/// Transactions pay the suppliers; each trip expense books the supplier
/// against the business trip category; the excess expenditure computed by
/// the summary is then moved to the non-deductible category.
pub struct BusinessTripGenerator;

impl LedgerGenerator for BusinessTripGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::BusinessTrip]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let charge = &data.charge;
        let trip = data.business_trip.as_ref().ok_or_else(|| {
            GenerationError::structural(charge.id, "business trip charge has no trip attached")
        })?;

        let mut postings = transaction_postings(data, ctx)?;
        let trip_category =
            require_account(charge.id, ctx.admin.business_trip.category, "business_trip.category")?;

        for expense in &trip.expenses {
            if expense.amount.is_zero() {
                continue;
            }
            let supplier = expense.counterparty_id.or(charge.counterparty_id).ok_or_else(|| {
                GenerationError::structural(
                    charge.id,
                    format!("trip expense {} has no counterparty", expense.id),
                )
            })?;
            let amount = ctx.convert(charge.id, expense.amount, expense.currency, expense.value_date)?;

            let posting = if expense.amount.is_sign_positive() {
                PostingDraft::new(
                    charge,
                    trip_category,
                    supplier,
                    &amount,
                    expense.value_date,
                    expense.value_date,
                )
                .creditor_counterparty(true)
            } else {
                PostingDraft::new(
                    charge,
                    supplier,
                    trip_category,
                    &amount,
                    expense.value_date,
                    expense.value_date,
                )
            };
            postings.push(posting.with_description(expense.description.clone()));
        }

        let summary = BusinessTripService::summarize_trip(trip, ctx.admin, ctx.rates)
            .map_err(|err| trip_error(charge.id, err))?;

        if summary.excess_local > Decimal::ZERO {
            let excess_category = require_account(
                charge.id,
                ctx.admin.business_trip.excess_category,
                "business_trip.excess_category",
            )?;
            let date = trip.trip.end_date.unwrap_or(ctx.as_of);
            postings.push(
                PostingDraft::new(
                    charge,
                    excess_category,
                    trip_category,
                    &ctx.local(summary.excess_local),
                    date,
                    date,
                )
                .with_description(Some(EXCESS_DESCRIPTION.to_string())),
            );
        }

        let revaluations = revaluation_postings(data, &postings, ctx)?;
        postings.extend(revaluations);
        Ok(postings)
    }
}

fn trip_error(charge_id: ChargeId, err: TripError) -> GenerationError {
    match err {
        TripError::Rate(err) => GenerationError::from_rate(charge_id, err),
        TripError::Configuration(field) => GenerationError::configuration(charge_id, field),
        TripError::MissingDates { .. } | TripError::InvalidDateRange { .. } => {
            GenerationError::structural(charge_id, err.to_string())
        }
    }
}
