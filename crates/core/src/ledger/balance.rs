//! Balance validation for generated postings.
//!
//! Two checks, both within [`BALANCE_EPSILON`]:
//! - per currency, the posting totals debit and credit the same amount
//!   (foreign amounts grouped by posting currency, local amounts under the
//!   local currency);
//! - every tracked counterparty's local debits equal its local credits.
//!
//! Nothing is corrected automatically; an imbalance is reported with the
//! deltas and the accounts involved.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ChargeId, Currency, EntityId};

use super::posting::PostingDraft;

/// Largest tolerated difference between debits and credits (0.005).
pub const BALANCE_EPSILON: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

/// Debit and credit sums for one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyBalance {
    /// Currency of the sums.
    pub currency: Currency,
    /// Total debit amount.
    pub debit_sum: Decimal,
    /// Total credit amount.
    pub credit_sum: Decimal,
    /// `debit_sum - credit_sum`.
    pub delta: Decimal,
}

impl CurrencyBalance {
    fn new(currency: Currency) -> Self {
        Self {
            currency,
            debit_sum: Decimal::ZERO,
            credit_sum: Decimal::ZERO,
            delta: Decimal::ZERO,
        }
    }

    fn add(&mut self, debit: Decimal, credit: Decimal) {
        self.debit_sum += debit;
        self.credit_sum += credit;
        self.delta = self.debit_sum - self.credit_sum;
    }
}

/// Local-currency position of one counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBalance {
    /// The counterparty.
    pub entity_id: EntityId,
    /// Total local debits.
    pub debit_sum: Decimal,
    /// Total local credits.
    pub credit_sum: Decimal,
    /// `debit_sum - credit_sum`.
    pub delta: Decimal,
}

impl EntityBalance {
    fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            debit_sum: Decimal::ZERO,
            credit_sum: Decimal::ZERO,
            delta: Decimal::ZERO,
        }
    }

    /// Adds a debit amount.
    fn add_debit(&mut self, amount: Decimal) {
        self.debit_sum += amount;
        self.delta = self.debit_sum - self.credit_sum;
    }

    /// Adds a credit amount.
    fn add_credit(&mut self, amount: Decimal) {
        self.credit_sum += amount;
        self.delta = self.debit_sum - self.credit_sum;
    }
}

/// Outcome of validating a charge's postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResult {
    /// Charge validated.
    pub charge_id: ChargeId,
    /// Whether every check passed.
    pub is_balanced: bool,
    /// Sums for every currency seen, local currency included.
    pub currency_totals: Vec<CurrencyBalance>,
    /// Currencies whose sums differ by more than the epsilon.
    pub currency_imbalances: Vec<CurrencyBalance>,
    /// Counterparties whose local position does not net to zero.
    pub entity_imbalances: Vec<EntityBalance>,
    /// Accounts taking part in any imbalance.
    pub involved_entities: BTreeSet<EntityId>,
}

impl BalanceResult {
    /// Human-readable summary of the imbalances.
    #[must_use]
    pub fn describe(&self) -> String {
        if self.is_balanced {
            return format!("charge {} is balanced", self.charge_id);
        }

        let mut message = format!("charge {} is unbalanced:", self.charge_id);
        for imbalance in &self.currency_imbalances {
            let _ = write!(
                message,
                " {} debit {} credit {} (delta {});",
                imbalance.currency, imbalance.debit_sum, imbalance.credit_sum, imbalance.delta
            );
        }
        for imbalance in &self.entity_imbalances {
            let _ = write!(
                message,
                " entity {} delta {};",
                imbalance.entity_id, imbalance.delta
            );
        }
        message
    }
}

/// Validates that generated postings balance.
#[derive(Debug, Clone, Copy)]
pub struct BalanceValidator {
    local_currency: Currency,
    epsilon: Decimal,
}

impl BalanceValidator {
    /// Creates a validator with the standard epsilon.
    #[must_use]
    pub fn new(local_currency: Currency) -> Self {
        Self {
            local_currency,
            epsilon: BALANCE_EPSILON,
        }
    }

    /// Validates `postings`, tracking the local position of `tracked_entities`.
    #[must_use]
    pub fn validate(
        &self,
        charge_id: ChargeId,
        postings: &[PostingDraft],
        tracked_entities: &BTreeSet<EntityId>,
    ) -> BalanceResult {
        let mut totals: BTreeMap<Currency, CurrencyBalance> = BTreeMap::new();
        let mut positions: BTreeMap<EntityId, EntityBalance> = tracked_entities
            .iter()
            .map(|entity| (*entity, EntityBalance::new(*entity)))
            .collect();

        for posting in postings {
            if posting.currency != self.local_currency {
                totals
                    .entry(posting.currency)
                    .or_insert_with(|| CurrencyBalance::new(posting.currency))
                    .add(posting.total_debit(), posting.total_credit());
            }
            totals
                .entry(self.local_currency)
                .or_insert_with(|| CurrencyBalance::new(self.local_currency))
                .add(posting.total_local_debit(), posting.total_local_credit());

            for (account, _, local_amount) in posting.debit_legs() {
                if let Some(position) = positions.get_mut(&account) {
                    position.add_debit(local_amount);
                }
            }
            for (account, _, local_amount) in posting.credit_legs() {
                if let Some(position) = positions.get_mut(&account) {
                    position.add_credit(local_amount);
                }
            }
        }

        let currency_imbalances: Vec<CurrencyBalance> = totals
            .values()
            .filter(|balance| balance.delta.abs() > self.epsilon)
            .cloned()
            .collect();
        let entity_imbalances: Vec<EntityBalance> = positions
            .into_values()
            .filter(|position| position.delta.abs() > self.epsilon)
            .collect();

        let mut involved_entities = BTreeSet::new();
        for imbalance in &currency_imbalances {
            postings
                .iter()
                .filter(|posting| {
                    imbalance.currency == self.local_currency || posting.currency == imbalance.currency
                })
                .for_each(|posting| collect_accounts(posting, &mut involved_entities));
        }
        for imbalance in &entity_imbalances {
            involved_entities.insert(imbalance.entity_id);
            postings
                .iter()
                .filter(|posting| posting.touches(imbalance.entity_id))
                .for_each(|posting| collect_accounts(posting, &mut involved_entities));
        }

        BalanceResult {
            charge_id,
            is_balanced: currency_imbalances.is_empty() && entity_imbalances.is_empty(),
            currency_totals: totals.into_values().collect(),
            currency_imbalances,
            entity_imbalances,
            involved_entities,
        }
    }
}

fn collect_accounts(posting: &PostingDraft, accounts: &mut BTreeSet<EntityId>) {
    accounts.extend(posting.debit_legs().map(|(account, _, _)| account));
    accounts.extend(posting.credit_legs().map(|(account, _, _)| account));
}
