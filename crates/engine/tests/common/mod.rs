//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::currency::ExchangeRateRow;
use tally_core::ledger::{
    Charge, ChargeData, ChargeDocument, ChargeTransaction, ChargeType, DocumentDirection,
    DocumentKind, ReserveKind,
};
use tally_engine::{
    FixedReserveCalculator, InMemoryAggregator, InMemoryPostingStore, InMemoryRateSource,
    LedgerEngine,
};
use tally_shared::AppConfig;
use tally_shared::types::{ChargeId, Currency, DocumentId, EntityId, OwnerId, TransactionId};

pub const OWNER: OwnerId = OwnerId::from_u128(0x1);
pub const BANK: EntityId = EntityId::from_u128(0x100);
pub const SUPPLIER: EntityId = EntityId::from_u128(0x200);
pub const TAX_CATEGORY: EntityId = EntityId::from_u128(0x300);
pub const FEE_CATEGORY: EntityId = EntityId::from_u128(0x301);
pub const EXCHANGE_CATEGORY: EntityId = EntityId::from_u128(0x302);
pub const VACATION_EXPENSE: EntityId = EntityId::from_u128(0x320);
pub const VACATION_LIABILITY: EntityId = EntityId::from_u128(0x321);
pub const TRIP_CATEGORY: EntityId = EntityId::from_u128(0x340);
pub const TRIP_EXCESS_CATEGORY: EntityId = EntityId::from_u128(0x341);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.engine.concurrency = 2;
    let admin = &mut config.admin;
    admin.fee_category = Some(FEE_CATEGORY);
    admin.exchange_rate_category = Some(EXCHANGE_CATEGORY);
    admin.default_tax_category = Some(TAX_CATEGORY);
    admin.excess_expenditure_tax_rate = Some(dec!(47));
    admin.vacation_reserve.expense = Some(VACATION_EXPENSE);
    admin.vacation_reserve.liability = Some(VACATION_LIABILITY);
    admin.business_trip.category = Some(TRIP_CATEGORY);
    admin.business_trip.excess_category = Some(TRIP_EXCESS_CATEGORY);
    config
}

pub fn rate_rows() -> Vec<ExchangeRateRow> {
    vec![
        ExchangeRateRow::new(date(2024, 4, 30)).with_rate(Currency::Usd, dec!(3.6)),
        ExchangeRateRow::new(date(2024, 5, 1))
            .with_rate(Currency::Usd, dec!(3.7))
            .with_rate(Currency::Eur, dec!(4.0)),
    ]
}

pub struct Harness {
    pub engine: LedgerEngine,
    pub aggregator: Arc<InMemoryAggregator>,
    pub rates: Arc<InMemoryRateSource>,
    pub store: Arc<InMemoryPostingStore>,
}

/// Routes engine logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("tally_engine=debug"))
        .with_test_writer()
        .try_init();
}

pub fn harness() -> Harness {
    init_tracing();
    let aggregator = Arc::new(InMemoryAggregator::new());
    let rates = Arc::new(InMemoryRateSource::new(rate_rows()));
    let store = Arc::new(InMemoryPostingStore::new());
    let reserves =
        FixedReserveCalculator::new().with_amount(ReserveKind::Vacation, 2023, dec!(12000));

    let engine = LedgerEngine::new(
        aggregator.clone(),
        rates.clone(),
        store.clone(),
        Arc::new(reserves),
        config(),
    )
    .with_as_of(date(2024, 12, 31));

    Harness {
        engine,
        aggregator,
        rates,
        store,
    }
}

pub fn charge(id: u128, charge_type: ChargeType) -> Charge {
    let mut charge = Charge::new(ChargeId::from_u128(id), OWNER, charge_type);
    charge.counterparty_id = Some(SUPPLIER);
    charge
}

pub fn transaction(amount: Decimal, currency: Currency, value_date: NaiveDate) -> ChargeTransaction {
    ChargeTransaction {
        id: TransactionId::new(),
        account_id: BANK,
        counterparty_id: None,
        amount,
        currency,
        event_date: value_date,
        value_date,
        is_fee: false,
        description: Some("Card payment".to_string()),
        reference: None,
    }
}

pub fn invoice(amount: Decimal, currency: Currency, issued: NaiveDate) -> ChargeDocument {
    ChargeDocument {
        id: DocumentId::new(),
        kind: DocumentKind::Invoice,
        direction: DocumentDirection::Expense,
        counterparty_id: None,
        amount,
        vat_amount: None,
        currency,
        date: issued,
        serial: Some("INV-1".to_string()),
    }
}

/// A 200 USD card payment on 2024-05-01, optionally with its invoice.
pub fn usd_payment(id: u128, with_invoice: bool) -> ChargeData {
    let mut data = ChargeData::new(charge(id, ChargeType::Common));
    data.transactions
        .push(transaction(dec!(-200), Currency::Usd, date(2024, 5, 1)));
    if with_invoice {
        data.documents
            .push(invoice(dec!(200), Currency::Usd, date(2024, 5, 1)));
    }
    data
}
