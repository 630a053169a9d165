//! Charges and the aggregated data generators consume.
//!
//! A charge groups the transactions, documents and payroll or expense records
//! that together describe one economic event.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::AdminConfig;
use tally_shared::types::{
    ChargeId, Currency, DocumentId, EntityId, MiscExpenseId, OwnerId, TransactionId,
};

use crate::business_trip::BusinessTripData;

/// How a charge is turned into postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargeType {
    /// Ordinary purchase or sale.
    Common,
    /// Bank interest, fees and similar financial charges.
    Financial,
    /// Currency conversion between two own accounts.
    Conversion,
    /// Monthly payroll.
    Salary,
    /// Business trip.
    BusinessTrip,
    /// Annual recovery pay reserve.
    RecoveryReserve,
    /// Annual vacation reserve.
    VacationReserve,
    /// Payments to tax authorities.
    AuthoritiesExpense,
}

impl ChargeType {
    /// Stable code used in logs and error messages.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Financial => "financial",
            Self::Conversion => "conversion",
            Self::Salary => "salary",
            Self::BusinessTrip => "business_trip",
            Self::RecoveryReserve => "recovery_reserve",
            Self::VacationReserve => "vacation_reserve",
            Self::AuthoritiesExpense => "authorities_expense",
        }
    }
}

impl fmt::Display for ChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Charge header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charge {
    /// Charge id.
    pub id: ChargeId,
    /// Business owning the books.
    pub owner_id: OwnerId,
    /// Generator selector.
    pub charge_type: ChargeType,
    /// User description; reserve charges carry their year here.
    pub description: Option<String>,
    /// Main counterparty of the charge.
    pub counterparty_id: Option<EntityId>,
    /// Whether the counterparty is a tax authority.
    pub counterparty_is_authority: bool,
    /// Tax category assigned to the charge.
    pub tax_category_id: Option<EntityId>,
}

impl Charge {
    /// Creates a bare charge header.
    #[must_use]
    pub fn new(id: ChargeId, owner_id: OwnerId, charge_type: ChargeType) -> Self {
        Self {
            id,
            owner_id,
            charge_type,
            description: None,
            counterparty_id: None,
            counterparty_is_authority: false,
            tax_category_id: None,
        }
    }
}

/// A bank or card movement.
///
/// Negative amounts leave the owner's account; positive amounts enter it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeTransaction {
    /// Transaction id.
    pub id: TransactionId,
    /// Owner's bank or card account.
    pub account_id: EntityId,
    /// Other side of the movement, if known.
    pub counterparty_id: Option<EntityId>,
    /// Signed amount.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Date the movement happened.
    pub event_date: NaiveDate,
    /// Date the bank settled it.
    pub value_date: NaiveDate,
    /// Bank or card fee.
    pub is_fee: bool,
    /// Bank description.
    pub description: Option<String>,
    /// Bank reference.
    pub reference: Option<String>,
}

/// Kind of accounting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Tax invoice.
    Invoice,
    /// Payment receipt.
    Receipt,
    /// Combined invoice and receipt.
    InvoiceReceipt,
    /// Credit note reversing an invoice.
    CreditInvoice,
    /// Quote; never posted.
    Proforma,
    /// Anything else; never posted.
    Other,
}

impl DocumentKind {
    /// Whether the document is an invoice of some sort.
    #[must_use]
    pub const fn is_invoice(self) -> bool {
        matches!(self, Self::Invoice | Self::InvoiceReceipt | Self::CreditInvoice)
    }
}

/// Whether the owner paid or got paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentDirection {
    /// The owner is the debtor.
    Expense,
    /// The owner is the creditor.
    Income,
}

/// An accounting document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeDocument {
    /// Document id.
    pub id: DocumentId,
    /// Kind of document.
    pub kind: DocumentKind,
    /// Expense or income.
    pub direction: DocumentDirection,
    /// The party other than the owner.
    pub counterparty_id: Option<EntityId>,
    /// Gross amount, VAT included.
    pub amount: Decimal,
    /// VAT part of `amount`.
    pub vat_amount: Option<Decimal>,
    /// Document currency.
    pub currency: Currency,
    /// Document date.
    pub date: NaiveDate,
    /// Serial number.
    pub serial: Option<String>,
}

/// A payroll component taken from a salary record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryComponentKind {
    /// Pension withheld from the employee.
    EmployeePension,
    /// Pension paid by the employer.
    EmployerPension,
    /// Severance compensation paid by the employer.
    EmployerCompensation,
    /// Study fund withheld from the employee.
    EmployeeStudyFund,
    /// Study fund paid by the employer.
    EmployerStudyFund,
    /// Income tax withheld.
    IncomeTax,
    /// Social security withheld from the employee.
    EmployeeSocialSecurity,
    /// Social security paid by the employer.
    EmployerSocialSecurity,
}

impl SalaryComponentKind {
    /// Whether the employer bears the cost.
    #[must_use]
    pub const fn is_employer_cost(self) -> bool {
        matches!(
            self,
            Self::EmployerPension
                | Self::EmployerCompensation
                | Self::EmployerStudyFund
                | Self::EmployerSocialSecurity
        )
    }

    /// Configuration path of the account receiving the component.
    #[must_use]
    pub const fn target_field(self) -> &'static str {
        match self {
            Self::EmployeePension | Self::EmployerPension | Self::EmployerCompensation => {
                "salary.pension_fund"
            }
            Self::EmployeeStudyFund | Self::EmployerStudyFund => "salary.study_fund",
            Self::IncomeTax => "salary.tax_authority",
            Self::EmployeeSocialSecurity | Self::EmployerSocialSecurity => {
                "salary.social_security_authority"
            }
        }
    }

    /// Account receiving the component.
    #[must_use]
    pub fn target_account(self, admin: &AdminConfig) -> Option<EntityId> {
        match self {
            Self::EmployeePension | Self::EmployerPension | Self::EmployerCompensation => {
                admin.salary.pension_fund
            }
            Self::EmployeeStudyFund | Self::EmployerStudyFund => admin.salary.study_fund,
            Self::IncomeTax => admin.salary.tax_authority,
            Self::EmployeeSocialSecurity | Self::EmployerSocialSecurity => {
                admin.salary.social_security_authority
            }
        }
    }
}

/// A single payroll component amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryComponent {
    /// Component kind.
    pub kind: SalaryComponentKind,
    /// Amount in local currency.
    pub amount: Decimal,
}

/// One employee's payroll for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRecord {
    /// Employee business.
    pub employee_id: EntityId,
    /// Any day in the salary month.
    pub month: NaiveDate,
    /// Gross salary in local currency.
    pub gross_amount: Decimal,
    /// Deductions and employer contributions.
    pub components: Vec<SalaryComponent>,
}

/// A manually recorded expense, typically against a tax authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscExpense {
    /// Record id.
    pub id: MiscExpenseId,
    /// Signed amount; positive is an expense.
    pub amount: Decimal,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Value date.
    pub value_date: NaiveDate,
    /// Date of the underlying invoice or assessment.
    pub invoice_date: NaiveDate,
    /// Category override.
    pub tax_category_id: Option<EntityId>,
    /// Description.
    pub description: Option<String>,
}

/// Everything a generator needs for one charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeData {
    /// Charge header.
    pub charge: Charge,
    /// Bank and card movements.
    pub transactions: Vec<ChargeTransaction>,
    /// Accounting documents.
    pub documents: Vec<ChargeDocument>,
    /// Payroll records.
    pub salaries: Vec<SalaryRecord>,
    /// Misc expenses.
    pub misc_expenses: Vec<MiscExpense>,
    /// Business trip attached to the charge.
    pub business_trip: Option<BusinessTripData>,
}

impl ChargeData {
    /// Creates charge data with no attached records.
    #[must_use]
    pub fn new(charge: Charge) -> Self {
        Self {
            charge,
            transactions: Vec::new(),
            documents: Vec::new(),
            salaries: Vec::new(),
            misc_expenses: Vec::new(),
            business_trip: None,
        }
    }

    /// Every foreign `(currency, date)` pair a generator may convert at.
    #[must_use]
    pub fn rate_requirements(&self, admin: &AdminConfig) -> BTreeSet<(Currency, NaiveDate)> {
        let local = admin.local_currency;
        let mut requirements = BTreeSet::new();

        for transaction in &self.transactions {
            requirements.insert((transaction.currency, transaction.value_date));
        }
        for document in &self.documents {
            requirements.insert((document.currency, document.date));
        }
        for expense in &self.misc_expenses {
            requirements.insert((expense.currency, expense.value_date));
        }
        if let Some(trip) = &self.business_trip {
            for expense in &trip.expenses {
                requirements.insert((expense.currency, expense.value_date));
            }
            if let Some(end_date) = trip.trip.end_date {
                requirements.insert((admin.trip_allowances.currency, end_date));
            }
        }

        requirements.retain(|(currency, _)| *currency != local);
        requirements
    }

    /// Counterparties whose local position must net to zero once the charge is complete.
    #[must_use]
    pub fn balance_entities(&self) -> BTreeSet<EntityId> {
        let mut entities: BTreeSet<EntityId> = self.charge.counterparty_id.into_iter().collect();

        entities.extend(
            self.transactions
                .iter()
                .filter(|transaction| !transaction.is_fee)
                .filter_map(|transaction| transaction.counterparty_id),
        );
        entities.extend(
            self.documents
                .iter()
                .filter(|document| document.kind != DocumentKind::Proforma)
                .filter_map(|document| document.counterparty_id),
        );
        entities.extend(self.salaries.iter().map(|record| record.employee_id));
        if let Some(trip) = &self.business_trip {
            entities.extend(trip.expenses.iter().filter_map(|expense| expense.counterparty_id));
        }

        entities
    }
}
