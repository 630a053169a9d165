//! Currency conversion charges.
//!
//! A conversion moves money between two of the owner's accounts in different
//! currencies: a base leg leaving one account and a quote leg entering the
//! other on the same value date.

use super::{GenerationContext, LedgerGenerator, require_account};
use crate::ledger::charge::{ChargeData, ChargeTransaction, ChargeType};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

const RATE_DIFFERENCE_DESCRIPTION: &str = "Conversion rate difference";

/// Generator for conversion charges.
pub struct ConversionGenerator;

impl LedgerGenerator for ConversionGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::Conversion]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let charge = &data.charge;
        let (base, quote) = conversion_legs(data)?;

        let base_amount = ctx.convert(charge.id, base.amount, base.currency, base.value_date)?;
        let quote_amount = ctx.convert(charge.id, quote.amount, quote.currency, quote.value_date)?;

        let mut postings = vec![
            PostingDraft::new(
                charge,
                quote.account_id,
                base.account_id,
                &base_amount,
                base.value_date,
                base.event_date,
            )
            .with_description(base.description.clone().or_else(|| quote.description.clone()))
            .with_reference(base.reference.clone()),
        ];

        let difference = quote_amount.local_amount - base_amount.local_amount;
        if !difference.is_zero() {
            let exchange_category = require_account(
                charge.id,
                ctx.admin.exchange_rate_category,
                "exchange_rate_category",
            )?;
            let amount = ctx.local(difference);
            // The quote account received more local value than the base leg carried.
            let (debit, credit) = if difference.is_sign_positive() {
                (quote.account_id, exchange_category)
            } else {
                (exchange_category, quote.account_id)
            };
            postings.push(
                PostingDraft::new(charge, debit, credit, &amount, quote.value_date, quote.event_date)
                    .with_description(Some(RATE_DIFFERENCE_DESCRIPTION.to_string())),
            );
        }

        for fee in data.transactions.iter().filter(|transaction| transaction.is_fee) {
            if fee.amount.is_zero() {
                continue;
            }
            let fee_category = require_account(charge.id, ctx.admin.fee_category, "fee_category")?;
            let amount = ctx.convert(charge.id, fee.amount, fee.currency, fee.value_date)?;
            let (debit, credit) = if fee.amount.is_sign_negative() {
                (fee_category, fee.account_id)
            } else {
                (fee.account_id, fee_category)
            };
            postings.push(
                PostingDraft::new(charge, debit, credit, &amount, fee.value_date, fee.event_date)
                    .with_description(fee.description.clone())
                    .with_reference(fee.reference.clone()),
            );
        }

        Ok(postings)
    }
}

/// Splits the non-fee transactions into `(base, quote)`.
///
/// # Errors
///
/// Returns a structural error unless there is exactly one negative (base) and
/// one positive (quote) leg sharing a value date.
pub fn conversion_legs(
    data: &ChargeData,
) -> Result<(&ChargeTransaction, &ChargeTransaction), GenerationError> {
    let charge_id = data.charge.id;
    let legs: Vec<&ChargeTransaction> = data
        .transactions
        .iter()
        .filter(|transaction| !transaction.is_fee)
        .collect();

    if legs.iter().any(|leg| leg.amount.is_zero()) {
        return Err(GenerationError::structural(
            charge_id,
            "conversion leg with zero amount",
        ));
    }

    let bases: Vec<_> = legs.iter().filter(|leg| leg.amount.is_sign_negative()).collect();
    let quotes: Vec<_> = legs.iter().filter(|leg| leg.amount.is_sign_positive()).collect();

    let (base, quote) = match (bases.as_slice(), quotes.as_slice()) {
        ([base], [quote]) => (**base, **quote),
        _ => {
            return Err(GenerationError::structural(
                charge_id,
                format!(
                    "conversion needs exactly one base and one quote leg, found {} base and {} quote",
                    bases.len(),
                    quotes.len()
                ),
            ));
        }
    };

    if base.value_date != quote.value_date {
        return Err(GenerationError::structural(
            charge_id,
            format!(
                "conversion legs have different value dates: {} and {}",
                base.value_date, quote.value_date
            ),
        ));
    }

    Ok((base, quote))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::generators::fixtures::{
        BANK, EXCHANGE_CATEGORY, FEE_CATEGORY, Fixture, USD_BANK, charge, date, transaction,
    };
    use rust_decimal_macros::dec;
    use tally_shared::types::Currency;

    fn conversion(base: rust_decimal::Decimal, quote: rust_decimal::Decimal) -> ChargeData {
        let mut data = ChargeData::new(charge(ChargeType::Conversion));
        let mut sell = transaction(-base, Currency::Usd, date(2024, 5, 1));
        sell.account_id = USD_BANK;
        data.transactions.push(sell);
        data.transactions
            .push(transaction(quote, Currency::Ils, date(2024, 5, 1)));
        data
    }

    #[test]
    fn test_equal_local_value_yields_single_posting() {
        let fixture = Fixture::new();
        let data = conversion(dec!(100), dec!(370));

        let postings = ConversionGenerator.generate(&data, &fixture.context()).unwrap();

        assert_eq!(postings.len(), 1);
        let posting = &postings[0];
        assert_eq!(posting.debit_account_id, BANK);
        assert_eq!(posting.credit_account_id, USD_BANK);
        assert_eq!(posting.currency, Currency::Usd);
        assert_eq!(posting.debit_amount, dec!(100));
        assert_eq!(posting.local_debit_amount, dec!(370.00));
    }

    #[test]
    fn test_rate_difference_posts_to_exchange_category() {
        let fixture = Fixture::new();
        let data = conversion(dec!(100), dec!(365));

        let postings = ConversionGenerator.generate(&data, &fixture.context()).unwrap();

        assert_eq!(postings.len(), 2);
        let difference = &postings[1];
        assert_eq!(difference.debit_account_id, EXCHANGE_CATEGORY);
        assert_eq!(difference.credit_account_id, BANK);
        assert_eq!(difference.local_debit_amount, dec!(5.00));
    }

    #[test]
    fn test_fee_leg_posts_to_fee_category() {
        let fixture = Fixture::new();
        let mut data = conversion(dec!(100), dec!(370));
        let mut fee = transaction(dec!(-3), Currency::Ils, date(2024, 5, 1));
        fee.is_fee = true;
        data.transactions.push(fee);

        let postings = ConversionGenerator.generate(&data, &fixture.context()).unwrap();

        assert_eq!(postings.len(), 2);
        assert_eq!(postings[1].debit_account_id, FEE_CATEGORY);
        assert_eq!(postings[1].credit_account_id, BANK);
    }

    #[test]
    fn test_single_leg_is_structural_error() {
        let fixture = Fixture::new();
        let mut data = conversion(dec!(100), dec!(370));
        data.transactions.pop();

        let err = ConversionGenerator.generate(&data, &fixture.context()).unwrap_err();

        assert_eq!(err.error_code(), "STRUCTURAL_ERROR");
        assert!(err.to_string().contains("found 1 base and 0 quote"));
    }

    #[test]
    fn test_two_positive_legs_is_structural_error() {
        let fixture = Fixture::new();
        let data = conversion(dec!(-100), dec!(370));

        let err = ConversionGenerator.generate(&data, &fixture.context()).unwrap_err();

        assert_eq!(err.error_code(), "STRUCTURAL_ERROR");
        assert!(err.to_string().contains("found 0 base and 2 quote"));
    }

    #[test]
    fn test_three_legs_is_structural_error() {
        let fixture = Fixture::new();
        let mut data = conversion(dec!(100), dec!(370));
        data.transactions
            .push(transaction(dec!(10), Currency::Ils, date(2024, 5, 1)));

        let err = ConversionGenerator.generate(&data, &fixture.context()).unwrap_err();

        assert_eq!(err.error_code(), "STRUCTURAL_ERROR");
    }

    #[test]
    fn test_different_value_dates_is_structural_error() {
        let fixture = Fixture::new();
        let mut data = conversion(dec!(100), dec!(370));
        data.transactions[1].value_date = date(2024, 5, 2);

        let err = ConversionGenerator.generate(&data, &fixture.context()).unwrap_err();

        assert!(err.to_string().contains("different value dates"));
    }
}
