//! Shared fixtures for generator tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_shared::AdminConfig;
use tally_shared::types::{
    ChargeId, Currency, DocumentId, EntityId, OwnerId, TransactionId,
};

use super::reserve::{ReserveCalculationError, ReserveCalculator, ReserveKind};
use super::GenerationContext;
use crate::currency::{ExchangeRateRow, RateTable};
use crate::ledger::charge::{
    Charge, ChargeDocument, ChargeTransaction, ChargeType, DocumentDirection, DocumentKind,
};

pub const BANK: EntityId = EntityId::from_u128(0x100);
pub const USD_BANK: EntityId = EntityId::from_u128(0x101);
pub const SUPPLIER: EntityId = EntityId::from_u128(0x200);
pub const CUSTOMER: EntityId = EntityId::from_u128(0x201);
pub const EMPLOYEE: EntityId = EntityId::from_u128(0x202);
pub const AUTHORITY: EntityId = EntityId::from_u128(0x203);
pub const TAX_CATEGORY: EntityId = EntityId::from_u128(0x300);
pub const FEE_CATEGORY: EntityId = EntityId::from_u128(0x301);
pub const EXCHANGE_CATEGORY: EntityId = EntityId::from_u128(0x302);
pub const INPUT_VAT: EntityId = EntityId::from_u128(0x303);
pub const OUTPUT_VAT: EntityId = EntityId::from_u128(0x304);
pub const SALARY_EXPENSE: EntityId = EntityId::from_u128(0x310);
pub const EMPLOYER_COST: EntityId = EntityId::from_u128(0x311);
pub const PENSION_FUND: EntityId = EntityId::from_u128(0x312);
pub const STUDY_FUND: EntityId = EntityId::from_u128(0x313);
pub const TAX_AUTHORITY: EntityId = EntityId::from_u128(0x314);
pub const SOCIAL_SECURITY: EntityId = EntityId::from_u128(0x315);
pub const VACATION_EXPENSE: EntityId = EntityId::from_u128(0x320);
pub const VACATION_LIABILITY: EntityId = EntityId::from_u128(0x321);
pub const RECOVERY_EXPENSE: EntityId = EntityId::from_u128(0x322);
pub const RECOVERY_LIABILITY: EntityId = EntityId::from_u128(0x323);
pub const AUTHORITY_CATEGORY: EntityId = EntityId::from_u128(0x330);
pub const TRIP_CATEGORY: EntityId = EntityId::from_u128(0x340);
pub const TRIP_EXCESS_CATEGORY: EntityId = EntityId::from_u128(0x341);

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn admin() -> AdminConfig {
    let mut admin = AdminConfig {
        fee_category: Some(FEE_CATEGORY),
        exchange_rate_category: Some(EXCHANGE_CATEGORY),
        default_tax_category: Some(TAX_CATEGORY),
        input_vat_account: Some(INPUT_VAT),
        output_vat_account: Some(OUTPUT_VAT),
        excess_expenditure_tax_rate: Some(dec!(47)),
        ..AdminConfig::default()
    };
    admin.salary.expense = Some(SALARY_EXPENSE);
    admin.salary.employer_cost_expense = Some(EMPLOYER_COST);
    admin.salary.pension_fund = Some(PENSION_FUND);
    admin.salary.study_fund = Some(STUDY_FUND);
    admin.salary.tax_authority = Some(TAX_AUTHORITY);
    admin.salary.social_security_authority = Some(SOCIAL_SECURITY);
    admin.vacation_reserve.expense = Some(VACATION_EXPENSE);
    admin.vacation_reserve.liability = Some(VACATION_LIABILITY);
    admin.recovery_reserve.expense = Some(RECOVERY_EXPENSE);
    admin.recovery_reserve.liability = Some(RECOVERY_LIABILITY);
    admin.authority_categories.insert(AUTHORITY, AUTHORITY_CATEGORY);
    admin.business_trip.category = Some(TRIP_CATEGORY);
    admin.business_trip.excess_category = Some(TRIP_EXCESS_CATEGORY);
    admin
}

pub fn rates() -> RateTable {
    RateTable::new(
        Currency::Ils,
        vec![
            ExchangeRateRow::new(date(2024, 4, 30)).with_rate(Currency::Usd, dec!(3.6)),
            ExchangeRateRow::new(date(2024, 5, 1))
                .with_rate(Currency::Usd, dec!(3.7))
                .with_rate(Currency::Eur, dec!(4.0)),
        ],
    )
}

/// Reserve calculator returning fixed amounts per kind.
pub struct FixedReserves {
    pub vacation: Decimal,
    pub recovery: Decimal,
}

impl ReserveCalculator for FixedReserves {
    fn reserve_amount(
        &self,
        kind: ReserveKind,
        _owner_id: OwnerId,
        _year: i32,
    ) -> Result<Decimal, ReserveCalculationError> {
        Ok(match kind {
            ReserveKind::Vacation => self.vacation,
            ReserveKind::Recovery => self.recovery,
        })
    }
}

pub struct Fixture {
    pub admin: AdminConfig,
    pub rates: RateTable,
    pub reserves: FixedReserves,
    pub as_of: NaiveDate,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            admin: admin(),
            rates: rates(),
            reserves: FixedReserves {
                vacation: dec!(12000),
                recovery: dec!(-800),
            },
            as_of: date(2024, 12, 31),
        }
    }

    pub fn context(&self) -> GenerationContext<'_> {
        GenerationContext::new(&self.admin, &self.rates, &self.reserves, self.as_of)
    }
}

pub fn charge(charge_type: ChargeType) -> Charge {
    let mut charge = Charge::new(ChargeId::from_u128(1), OwnerId::from_u128(2), charge_type);
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

pub fn document(
    kind: DocumentKind,
    direction: DocumentDirection,
    amount: Decimal,
    vat_amount: Option<Decimal>,
    currency: Currency,
) -> ChargeDocument {
    ChargeDocument {
        id: DocumentId::new(),
        kind,
        direction,
        counterparty_id: None,
        amount,
        vat_amount,
        currency,
        date: date(2024, 5, 1),
        serial: Some("INV-1".to_string()),
    }
}
