//! Common and financial charges.
//!
//! One posting per transaction, one per ledger-relevant document, and an
//! exchange-rate revaluation for counterparties whose foreign position
//! nets out while their local position does not. Other generators reuse the
//! transaction and revaluation helpers.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_shared::types::{Currency, EntityId};

use super::{GenerationContext, LedgerGenerator, require_account};
use crate::ledger::charge::{
    Charge, ChargeData, ChargeDocument, ChargeTransaction, ChargeType, DocumentDirection,
    DocumentKind,
};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

const REVALUATION_DESCRIPTION: &str = "Exchange rate revaluation";

/// Generator for common and financial charges.
pub struct CommonGenerator;

impl LedgerGenerator for CommonGenerator {
    fn charge_types(&self) -> &'static [ChargeType] {
        &[ChargeType::Common, ChargeType::Financial]
    }

    fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let mut postings = transaction_postings(data, ctx)?;
        postings.extend(document_postings(data, ctx)?);
        let revaluations = revaluation_postings(data, &postings, ctx)?;
        postings.extend(revaluations);
        Ok(postings)
    }
}

/// Postings for every non-zero transaction of the charge.
pub fn transaction_postings(
    data: &ChargeData,
    ctx: &GenerationContext<'_>,
) -> Result<Vec<PostingDraft>, GenerationError> {
    data.transactions
        .iter()
        .filter(|transaction| !transaction.amount.is_zero())
        .map(|transaction| transaction_posting(&data.charge, transaction, ctx))
        .collect()
}

/// Posts a single transaction against its counterparty, or the fee category for fees.
///
/// Outflows debit the counterparty and credit the bank; inflows the reverse.
pub fn transaction_posting(
    charge: &Charge,
    transaction: &ChargeTransaction,
    ctx: &GenerationContext<'_>,
) -> Result<PostingDraft, GenerationError> {
    let amount = ctx.convert(
        charge.id,
        transaction.amount,
        transaction.currency,
        transaction.value_date,
    )?;

    let other = if transaction.is_fee {
        require_account(charge.id, ctx.admin.fee_category, "fee_category")?
    } else {
        transaction_counterparty(charge, transaction, ctx)?
    };

    let bank = transaction.account_id;
    let is_outflow = transaction.amount.is_sign_negative();
    let (debit, credit) = if is_outflow { (other, bank) } else { (bank, other) };

    Ok(PostingDraft::new(
        charge,
        debit,
        credit,
        &amount,
        transaction.value_date,
        transaction.event_date,
    )
    .with_description(transaction.description.clone())
    .with_reference(transaction.reference.clone())
    .creditor_counterparty(!transaction.is_fee && !is_outflow))
}

fn transaction_counterparty(
    charge: &Charge,
    transaction: &ChargeTransaction,
    ctx: &GenerationContext<'_>,
) -> Result<EntityId, GenerationError> {
    if let Some(counterparty) = transaction.counterparty_id.or(charge.counterparty_id) {
        return Ok(counterparty);
    }

    if charge.charge_type == ChargeType::Financial {
        return require_account(
            charge.id,
            charge.tax_category_id.or(ctx.admin.default_tax_category),
            "default_tax_category",
        );
    }

    Err(GenerationError::structural(
        charge.id,
        format!("transaction {} has no counterparty", transaction.id),
    ))
}

/// Documents that produce postings.
///
/// Invoices, invoice-receipts and credit invoices always count. Receipts
/// only count when no invoice-type document is attached, so a receipt for
/// an invoiced sale is not booked twice.
pub fn ledger_documents(data: &ChargeData) -> impl Iterator<Item = &ChargeDocument> {
    let has_invoice = data.documents.iter().any(|document| document.kind.is_invoice());
    data.documents.iter().filter(move |document| match document.kind {
        DocumentKind::Invoice | DocumentKind::InvoiceReceipt | DocumentKind::CreditInvoice => true,
        DocumentKind::Receipt => !has_invoice,
        DocumentKind::Proforma | DocumentKind::Other => false,
    })
}

/// Postings for every ledger-relevant document.
pub fn document_postings(
    data: &ChargeData,
    ctx: &GenerationContext<'_>,
) -> Result<Vec<PostingDraft>, GenerationError> {
    ledger_documents(data)
        .filter(|document| !document.amount.is_zero())
        .map(|document| document_posting(&data.charge, document, ctx))
        .collect()
}

fn document_posting(
    charge: &Charge,
    document: &ChargeDocument,
    ctx: &GenerationContext<'_>,
) -> Result<PostingDraft, GenerationError> {
    let tax_category = require_account(
        charge.id,
        charge.tax_category_id.or(ctx.admin.default_tax_category),
        "default_tax_category",
    )?;
    let counterparty = document
        .counterparty_id
        .or(charge.counterparty_id)
        .ok_or_else(|| {
            GenerationError::structural(
                charge.id,
                format!("document {} has no counterparty", document.id),
            )
        })?;

    let gross = ctx.convert(charge.id, document.amount, document.currency, document.date)?;
    let vat = match document.vat_amount.filter(|vat| !vat.is_zero()) {
        Some(vat) => {
            check_vat(charge, document, vat)?;
            Some(ctx.convert(charge.id, vat, document.currency, document.date)?)
        }
        None => None,
    };

    // An expense credit note is booked like income, and vice versa.
    let is_credit = document.kind == DocumentKind::CreditInvoice;
    let debits_category = (document.direction == DocumentDirection::Expense) != is_credit;

    let posting = if debits_category {
        PostingDraft::new(charge, tax_category, counterparty, &gross, document.date, document.date)
            .creditor_counterparty(true)
    } else {
        PostingDraft::new(charge, counterparty, tax_category, &gross, document.date, document.date)
    };

    let posting = match vat {
        None => posting,
        Some(vat) => {
            let (field, account) = match document.direction {
                DocumentDirection::Expense => ("input_vat_account", ctx.admin.input_vat_account),
                DocumentDirection::Income => ("output_vat_account", ctx.admin.output_vat_account),
            };
            let vat_account = require_account(charge.id, account, field)?;
            if debits_category {
                posting.split_debit(vat_account, vat.amount, vat.local_amount)
            } else {
                posting.split_credit(vat_account, vat.amount, vat.local_amount)
            }
        }
    };

    Ok(posting.with_reference(document.serial.clone()))
}

/// VAT must share the document amount's sign and may not exceed it.
fn check_vat(
    charge: &Charge,
    document: &ChargeDocument,
    vat: Decimal,
) -> Result<(), GenerationError> {
    if vat.is_sign_negative() != document.amount.is_sign_negative() {
        return Err(GenerationError::structural(
            charge.id,
            format!("document {} has VAT of the opposite sign", document.id),
        ));
    }
    if vat.abs() > document.amount.abs() {
        return Err(GenerationError::structural(
            charge.id,
            format!(
                "document {} VAT {} exceeds its amount {}",
                document.id, vat, document.amount
            ),
        ));
    }
    Ok(())
}

/// Revaluation postings for counterparties left with a pure rate difference.
///
/// A counterparty qualifies when it has foreign-currency postings whose
/// foreign amounts net to zero in every currency while its local amounts do
/// not. The local difference moves to the exchange-rate category.
pub fn revaluation_postings(
    data: &ChargeData,
    postings: &[PostingDraft],
    ctx: &GenerationContext<'_>,
) -> Result<Vec<PostingDraft>, GenerationError> {
    let charge = &data.charge;
    let local = ctx.local_currency();
    let mut revaluations = Vec::new();

    for entity in data.balance_entities() {
        let position = EntityPosition::collect(entity, postings, local);
        let Some(value_date) = position.last_value_date else {
            continue;
        };
        if position.foreign.is_empty()
            || position.foreign.values().any(|net| !net.is_zero())
            || position.local_net.is_zero()
        {
            continue;
        }

        let exchange_category = require_account(
            charge.id,
            ctx.admin.exchange_rate_category,
            "exchange_rate_category",
        )?;
        let amount = ctx.local(position.local_net);

        // Debits exceed credits: credit the counterparty back.
        let posting = if position.local_net.is_sign_positive() {
            PostingDraft::new(charge, exchange_category, entity, &amount, value_date, value_date)
                .creditor_counterparty(true)
        } else {
            PostingDraft::new(charge, entity, exchange_category, &amount, value_date, value_date)
        };

        revaluations.push(posting.with_description(Some(REVALUATION_DESCRIPTION.to_string())));
    }

    Ok(revaluations)
}

struct EntityPosition {
    local_net: Decimal,
    foreign: BTreeMap<Currency, Decimal>,
    last_value_date: Option<NaiveDate>,
}

impl EntityPosition {
    fn collect(entity: EntityId, postings: &[PostingDraft], local: Currency) -> Self {
        let mut position = Self {
            local_net: Decimal::ZERO,
            foreign: BTreeMap::new(),
            last_value_date: None,
        };

        for posting in postings.iter().filter(|posting| posting.touches(entity)) {
            let debits = posting.debit_legs();
            let credits = posting.credit_legs().map(|(account, amount, local_amount)| {
                (account, -amount, -local_amount)
            });

            for (account, amount, local_amount) in debits.chain(credits) {
                if account != entity {
                    continue;
                }
                position.local_net += local_amount;
                if posting.currency != local {
                    *position.foreign.entry(posting.currency).or_default() += amount;
                }
            }

            position.last_value_date = position.last_value_date.max(Some(posting.value_date));
        }

        position
    }
}
