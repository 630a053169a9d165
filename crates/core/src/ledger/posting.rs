//! Ledger postings.
//!
//! A posting records one debit and one credit of the same amount, each
//! optionally split with a secondary leg (e.g. VAT). Amounts are always
//! non-negative; direction is carried by which side an account sits on.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{ChargeId, Currency, EntityId, OwnerId, PostingId};

use crate::currency::{RateError, RateLookup};

use super::charge::Charge;

/// A secondary debit or credit split off a posting side.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostingLeg {
    /// Account the leg posts to.
    pub account_id: EntityId,
    /// Amount in the posting currency.
    pub amount: Decimal,
    /// Amount in local currency.
    pub local_amount: Decimal,
}

/// An amount resolved into local currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertedAmount {
    /// Original currency.
    pub currency: Currency,
    /// Non-negative amount in `currency`.
    pub amount: Decimal,
    /// Amount in local currency, rounded to cents.
    pub local_amount: Decimal,
    /// Rate applied (1 for local currency).
    pub rate: Decimal,
}

impl ConvertedAmount {
    /// Wraps an amount already in local currency.
    #[must_use]
    pub fn local(amount: Decimal, currency: Currency) -> Self {
        let amount = amount.abs();
        Self {
            currency,
            amount,
            local_amount: amount,
            rate: Decimal::ONE,
        }
    }

    /// Converts the absolute value of `amount` at the rate effective on `date`.
    pub fn convert(
        amount: Decimal,
        currency: Currency,
        date: NaiveDate,
        rates: &dyn RateLookup,
    ) -> Result<Self, RateError> {
        let amount = amount.abs();
        let (rate, local_amount) = rates.to_local(amount, currency, date)?;
        Ok(Self {
            currency,
            amount,
            local_amount,
            rate,
        })
    }
}

/// A generated, not yet persisted, ledger posting.
///
/// Field order doubles as the canonical sort order used by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostingDraft {
    /// Charge the posting belongs to.
    pub charge_id: ChargeId,
    /// Business owning the books.
    pub owner_id: OwnerId,
    /// Value date.
    pub value_date: NaiveDate,
    /// Invoice (event) date.
    pub invoice_date: NaiveDate,
    /// Posting currency.
    pub currency: Currency,
    /// Primary debit account.
    pub debit_account_id: EntityId,
    /// Primary credit account.
    pub credit_account_id: EntityId,
    /// Primary debit amount in posting currency.
    pub debit_amount: Decimal,
    /// Primary credit amount in posting currency.
    pub credit_amount: Decimal,
    /// Primary debit amount in local currency.
    pub local_debit_amount: Decimal,
    /// Primary credit amount in local currency.
    pub local_credit_amount: Decimal,
    /// Optional second debit leg.
    pub secondary_debit: Option<PostingLeg>,
    /// Optional second credit leg.
    pub secondary_credit: Option<PostingLeg>,
    /// Rate applied to reach local amounts.
    pub currency_rate: Decimal,
    /// Free-text description.
    pub description: Option<String>,
    /// External reference (e.g. document serial).
    pub reference: Option<String>,
    /// Whether the counterparty sits on the credit side.
    pub is_creditor_counterparty: bool,
}

impl PostingDraft {
    /// Creates a posting moving `amount` from `credit_account_id` to `debit_account_id`.
    #[must_use]
    pub fn new(
        charge: &Charge,
        debit_account_id: EntityId,
        credit_account_id: EntityId,
        amount: &ConvertedAmount,
        value_date: NaiveDate,
        invoice_date: NaiveDate,
    ) -> Self {
        Self {
            charge_id: charge.id,
            owner_id: charge.owner_id,
            value_date,
            invoice_date,
            currency: amount.currency,
            debit_account_id,
            credit_account_id,
            debit_amount: amount.amount,
            credit_amount: amount.amount,
            local_debit_amount: amount.local_amount,
            local_credit_amount: amount.local_amount,
            secondary_debit: None,
            secondary_credit: None,
            currency_rate: amount.rate,
            description: None,
            reference: None,
            is_creditor_counterparty: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Sets the reference.
    #[must_use]
    pub fn with_reference(mut self, reference: Option<String>) -> Self {
        self.reference = reference;
        self
    }

    /// Marks the credit side as the counterparty.
    #[must_use]
    pub fn creditor_counterparty(mut self, is_creditor: bool) -> Self {
        self.is_creditor_counterparty = is_creditor;
        self
    }

    /// Moves part of the primary debit onto a secondary debit leg.
    #[must_use]
    pub fn split_debit(mut self, account_id: EntityId, amount: Decimal, local_amount: Decimal) -> Self {
        self.debit_amount -= amount;
        self.local_debit_amount -= local_amount;
        self.secondary_debit = Some(PostingLeg {
            account_id,
            amount,
            local_amount,
        });
        self
    }

    /// Moves part of the primary credit onto a secondary credit leg.
    #[must_use]
    pub fn split_credit(mut self, account_id: EntityId, amount: Decimal, local_amount: Decimal) -> Self {
        self.credit_amount -= amount;
        self.local_credit_amount -= local_amount;
        self.secondary_credit = Some(PostingLeg {
            account_id,
            amount,
            local_amount,
        });
        self
    }

    /// Total debited in posting currency.
    #[must_use]
    pub fn total_debit(&self) -> Decimal {
        self.debit_amount + self.secondary_debit.as_ref().map_or(Decimal::ZERO, |leg| leg.amount)
    }

    /// Total credited in posting currency.
    #[must_use]
    pub fn total_credit(&self) -> Decimal {
        self.credit_amount + self.secondary_credit.as_ref().map_or(Decimal::ZERO, |leg| leg.amount)
    }

    /// Total debited in local currency.
    #[must_use]
    pub fn total_local_debit(&self) -> Decimal {
        self.local_debit_amount
            + self
                .secondary_debit
                .as_ref()
                .map_or(Decimal::ZERO, |leg| leg.local_amount)
    }

    /// Total credited in local currency.
    #[must_use]
    pub fn total_local_credit(&self) -> Decimal {
        self.local_credit_amount
            + self
                .secondary_credit
                .as_ref()
                .map_or(Decimal::ZERO, |leg| leg.local_amount)
    }

    /// The counterparty account of this posting.
    #[must_use]
    pub fn counterparty_id(&self) -> EntityId {
        if self.is_creditor_counterparty {
            self.credit_account_id
        } else {
            self.debit_account_id
        }
    }

    /// Every debit leg as `(account, amount, local_amount)`.
    pub fn debit_legs(&self) -> impl Iterator<Item = (EntityId, Decimal, Decimal)> + '_ {
        std::iter::once((self.debit_account_id, self.debit_amount, self.local_debit_amount)).chain(
            self.secondary_debit
                .iter()
                .map(|leg| (leg.account_id, leg.amount, leg.local_amount)),
        )
    }

    /// Every credit leg as `(account, amount, local_amount)`.
    pub fn credit_legs(&self) -> impl Iterator<Item = (EntityId, Decimal, Decimal)> + '_ {
        std::iter::once((self.credit_account_id, self.credit_amount, self.local_credit_amount)).chain(
            self.secondary_credit
                .iter()
                .map(|leg| (leg.account_id, leg.amount, leg.local_amount)),
        )
    }

    /// Whether `account_id` appears on any leg.
    #[must_use]
    pub fn touches(&self, account_id: EntityId) -> bool {
        self.debit_legs()
            .chain(self.credit_legs())
            .any(|(account, _, _)| account == account_id)
    }
}

/// Where a persisted posting came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Written by a generator.
    Generated,
    /// Entered by hand.
    Manual,
}

/// A posting as stored by the posting store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedPosting {
    /// Store-assigned id.
    pub id: PostingId,
    /// Posting content.
    pub posting: PostingDraft,
    /// When the store accepted the posting.
    pub persisted_at: DateTime<Utc>,
    /// Origin of the posting.
    pub provenance: Provenance,
}
