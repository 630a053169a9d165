//! Property-based tests for ledger generators.
//!
//! - Property 1: Balance Integrity
//! - Property 2: Idempotence

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{Currency, EntityId};

use super::balance::BalanceValidator;
use super::charge::{ChargeData, ChargeType, DocumentDirection, DocumentKind};
use super::generators::GeneratorRegistry;
use super::generators::fixtures::{CUSTOMER, Fixture, SUPPLIER, charge, date, document, transaction};

/// Strategy to generate non-zero signed amounts (-10,000.00 to 10,000.00).
fn signed_amount() -> impl Strategy<Value = Decimal> {
    prop_oneof![
        (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2)),
        (1i64..1_000_000i64).prop_map(|cents| Decimal::new(-cents, 2)),
    ]
}

/// Strategy to generate currencies with a rate in the fixture table.
fn currency() -> impl Strategy<Value = Currency> {
    prop_oneof![Just(Currency::Ils), Just(Currency::Usd), Just(Currency::Eur)]
}

fn counterparty() -> impl Strategy<Value = Option<EntityId>> {
    prop_oneof![Just(None), Just(Some(SUPPLIER)), Just(Some(CUSTOMER))]
}

fn common_charge() -> impl Strategy<Value = ChargeData> {
    let transactions = prop::collection::vec(
        (signed_amount(), currency(), counterparty(), any::<bool>()),
        0..8,
    );
    let documents = prop::collection::vec(
        (
            1i64..1_000_000i64,
            0i64..100i64,
            currency(),
            any::<bool>(),
            prop_oneof![
                Just(DocumentKind::Invoice),
                Just(DocumentKind::Receipt),
                Just(DocumentKind::CreditInvoice),
                Just(DocumentKind::Proforma),
            ],
        ),
        0..4,
    );

    (transactions, documents).prop_map(|(transactions, documents)| {
        let mut data = ChargeData::new(charge(ChargeType::Common));
        for (amount, currency, counterparty, is_fee) in transactions {
            let mut item = transaction(amount, currency, date(2024, 5, 1));
            item.counterparty_id = counterparty;
            item.is_fee = is_fee;
            data.transactions.push(item);
        }
        for (cents, vat_percent, currency, is_income, kind) in documents {
            let amount = Decimal::new(cents, 2);
            let direction = if is_income {
                DocumentDirection::Income
            } else {
                DocumentDirection::Expense
            };
            let vat = (amount * Decimal::from(vat_percent) / Decimal::ONE_HUNDRED).round_dp(2);
            data.documents
                .push(document(kind, direction, amount, Some(vat), currency));
        }
        data
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property 1.1: Every generated posting debits and credits the same
    /// amount, in posting currency and in local currency.
    #[test]
    fn prop_generated_postings_balance_per_currency(data in common_charge()) {
        let fixture = Fixture::new();
        let postings = GeneratorRegistry::standard()
            .generate(&data, &fixture.context())
            .unwrap();

        let result = BalanceValidator::new(Currency::Ils).validate(
            data.charge.id,
            &postings,
            &Default::default(),
        );
        prop_assert!(result.currency_imbalances.is_empty(), "{}", result.describe());

        for posting in &postings {
            prop_assert_eq!(posting.total_debit(), posting.total_credit());
            prop_assert_eq!(posting.total_local_debit(), posting.total_local_credit());
            prop_assert!(posting.debit_amount >= Decimal::ZERO);
            prop_assert!(posting.credit_amount >= Decimal::ZERO);
        }
    }

    /// Property 2.1: Generating twice from the same input yields identical drafts.
    #[test]
    fn prop_generation_is_idempotent(data in common_charge()) {
        let fixture = Fixture::new();
        let registry = GeneratorRegistry::standard();

        let first = registry.generate(&data, &fixture.context()).unwrap();
        let second = registry.generate(&data, &fixture.context()).unwrap();

        prop_assert_eq!(first, second);
    }
}
