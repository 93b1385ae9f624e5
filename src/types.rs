//! Core types and data structures for the demo ledger

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::validation;

/// Currencies the demo company trades in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US dollars - foreign customers and vendors
    Usd,
    /// Indian rupees - domestic customers, vendors and the bank account
    Inr,
}

impl Currency {
    /// ISO code as stored in the sheets
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validation::validate_currency(s)?;
        match s.trim() {
            "USD" => Ok(Currency::Usd),
            _ => Ok(Currency::Inr),
        }
    }
}

/// Whether an entity buys from or sells to the company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Customer,
    Vendor,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "Customer",
            EntityType::Vendor => "Vendor",
        }
    }
}

impl FromStr for EntityType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Customer" => Ok(EntityType::Customer),
            "Vendor" => Ok(EntityType::Vendor),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown entity type '{}'",
                other
            ))),
        }
    }
}

/// A customer or vendor from the entity master
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (e.g. `C001`, `V014`)
    pub id: String,
    /// Registered legal name
    pub legal_name: String,
    /// Customer or vendor
    pub entity_type: EntityType,
    /// Industry, used to choose invoice service descriptions
    pub industry: Option<String>,
    /// Billing currency
    pub currency: Currency,
    /// GSTIN, EIN or similar
    pub tax_id: String,
    pub address_line1: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    /// Typical invoice/bill value in the entity's currency
    pub average_transaction_value: Option<f64>,
    /// Free-form terms such as `Net 30`
    pub payment_terms: Option<String>,
    /// Whether the entity bills on a recurring schedule
    pub is_recurring: bool,
}

impl Entity {
    /// Days between document date and due date derived from payment terms
    pub fn due_days(&self) -> i64 {
        match &self.payment_terms {
            Some(terms) if terms.contains("Net 15") => 15,
            _ => 30,
        }
    }

    /// Single-line address, skipping empty parts
    pub fn formatted_address(&self, include_zip: bool) -> String {
        let mut parts = vec![&self.address_line1, &self.city, &self.state];
        if include_zip {
            parts.push(&self.zip);
        }
        parts
            .into_iter()
            .filter_map(|p| p.as_deref())
            .filter(|p| !p.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One line on an invoice or bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    /// Unit rate
    pub rate: BigDecimal,
    /// Line amount before tax
    pub amount: BigDecimal,
    /// Revenue or expense account the line posts to
    pub account: String,
}

/// Indirect tax regime applied to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxType {
    /// Integrated GST on INR documents
    Igst,
    /// US state sales tax on USD documents
    SalesTax,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::Igst => "IGST",
            TaxType::SalesTax => "Sales Tax",
        }
    }
}

impl FromStr for TaxType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "IGST" => Ok(TaxType::Igst),
            "Sales Tax" => Ok(TaxType::SalesTax),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown tax type '{}'",
                other
            ))),
        }
    }
}

/// Spread of a document's total over a multi-month service period.
///
/// Used for deferred revenue on invoices and prepaid expenses on bills.
/// Recognition progress is only ever initialised here; later monthly
/// recognition belongs to downstream processes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionSchedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Calendar months touched by the period, both endpoints included
    pub period_months: u32,
    pub monthly_amount: BigDecimal,
    pub recognized_to_date: BigDecimal,
    pub remaining_balance: BigDecimal,
}

/// Customer invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// `INV-YYYYMM-NNNN`
    pub id: String,
    pub date: NaiveDate,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_address: String,
    pub customer_tax_id: String,
    pub currency: Currency,
    /// INR per unit of `currency` (1 for INR documents)
    pub exchange_rate: BigDecimal,
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub subtotal: BigDecimal,
    pub tax_type: TaxType,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    pub notes: String,
    /// Present when revenue recognition is spread over the service period
    pub deferral: Option<RecognitionSchedule>,
    pub status: String,
    pub pdf_generated: bool,
    pub pdf_path: Option<String>,
    pub email_sent: bool,
}

impl Invoice {
    pub fn is_deferred(&self) -> bool {
        self.deferral.is_some()
    }

    /// Check line-item, tax and total arithmetic
    pub fn validate(&self) -> LedgerResult<()> {
        if self.line_items.is_empty() || self.line_items.len() > 3 {
            return Err(LedgerError::Validation(format!(
                "Invoice {} must have between 1 and 3 line items, found {}",
                self.id,
                self.line_items.len()
            )));
        }
        for item in &self.line_items {
            validation::validate_amount_positive(&item.amount, "Line item amount")?;
        }
        validation::validate_line_items_sum(&self.line_items, &self.subtotal)?;
        validation::validate_tax_calculation(&self.subtotal, &self.tax_rate, &self.tax_amount)?;
        validation::validate_total_amount(
            &self.subtotal,
            &self.tax_amount,
            &BigDecimal::from(0),
            &self.total_amount,
        )?;
        Ok(())
    }
}

/// Tax deducted at source on a vendor bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TdsDeduction {
    /// Income-tax act section, e.g. `194I`
    pub section: String,
    pub rate: BigDecimal,
    pub amount: BigDecimal,
}

/// Vendor bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// `BILL-YYYYMM-NNNN`
    pub id: String,
    pub date: NaiveDate,
    pub vendor_id: String,
    pub vendor_name: String,
    pub vendor_address: String,
    pub vendor_tax_id: String,
    pub currency: Currency,
    pub exchange_rate: BigDecimal,
    pub due_date: NaiveDate,
    pub line_items: Vec<LineItem>,
    pub subtotal: BigDecimal,
    pub tax_type: TaxType,
    pub tax_rate: BigDecimal,
    pub tax_amount: BigDecimal,
    pub total_amount: BigDecimal,
    /// Withholding, INR vendors in TDS categories only
    pub tds: Option<TdsDeduction>,
    /// Amount actually paid to the vendor
    pub net_payable: BigDecimal,
    pub notes: String,
    pub status: String,
    /// Present when the service period starts after the bill date
    pub prepaid: Option<RecognitionSchedule>,
    pub pdf_generated: bool,
    pub pdf_path: Option<String>,
    pub email_sent: bool,
}

impl Bill {
    /// Expense category of the first line
    pub fn expense_account(&self) -> &str {
        self.line_items
            .first()
            .map(|item| item.account.as_str())
            .unwrap_or_default()
    }

    pub fn tds_amount(&self) -> BigDecimal {
        self.tds
            .as_ref()
            .map(|t| t.amount.clone())
            .unwrap_or_else(|| BigDecimal::from(0))
    }

    pub fn is_prepaid(&self) -> bool {
        self.prepaid.is_some()
    }

    /// Check line-item, tax, TDS and net payable arithmetic
    pub fn validate(&self) -> LedgerResult<()> {
        if self.line_items.is_empty() || self.line_items.len() > 2 {
            return Err(LedgerError::Validation(format!(
                "Bill {} must have 1 or 2 line items, found {}",
                self.id,
                self.line_items.len()
            )));
        }
        for item in &self.line_items {
            validation::validate_amount_positive(&item.amount, "Line item amount")?;
        }
        validation::validate_line_items_sum(&self.line_items, &self.subtotal)?;
        validation::validate_tax_calculation(&self.subtotal, &self.tax_rate, &self.tax_amount)?;
        validation::validate_total_amount(
            &self.subtotal,
            &self.tax_amount,
            &BigDecimal::from(0),
            &self.total_amount,
        )?;
        if let Some(tds) = &self.tds {
            validation::validate_tds_calculation(&self.subtotal, &tds.rate, &tds.amount)?;
        }
        validation::validate_net_payable(&self.total_amount, &self.tds_amount(), &self.net_payable)?;
        Ok(())
    }
}

/// Direction of a bank movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Money in from a customer
    Receipt,
    /// Money out to a vendor (or an orphaned debit)
    Payment,
    /// Opening balance entry
    Opening,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receipt => "Receipt",
            TransactionType::Payment => "Payment",
            TransactionType::Opening => "Opening",
        }
    }

    /// Whether the movement increases the balance
    pub fn is_inflow(&self) -> bool {
        matches!(self, TransactionType::Receipt | TransactionType::Opening)
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Receipt" => Ok(TransactionType::Receipt),
            "Payment" => Ok(TransactionType::Payment),
            "Opening" => Ok(TransactionType::Opening),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// Whether a bank row ties back to an invoice or bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    Matched,
    Unmatched,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Matched => "Matched",
            ReconciliationStatus::Unmatched => "Unmatched",
        }
    }
}

impl FromStr for ReconciliationStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Matched" => Ok(ReconciliationStatus::Matched),
            "Unmatched" => Ok(ReconciliationStatus::Unmatched),
            other => Err(LedgerError::InvalidRecord(format!(
                "unknown reconciliation status '{}'",
                other
            ))),
        }
    }
}

/// One row of the bank account statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// `TXN` followed by an 8 digit sequence
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Invoice or bill id for matched rows
    pub reference: Option<String>,
    pub entity_name: String,
    pub transaction_type: TransactionType,
    /// Always INR, the bank account currency
    pub currency: Currency,
    pub debit: BigDecimal,
    pub credit: BigDecimal,
    pub running_balance: BigDecimal,
    pub bank_account: String,
    pub status: ReconciliationStatus,
    pub notes: String,
}

/// Fixed monthly charge billed on a rotating schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringScheduleEntry {
    /// Expense category, e.g. `Rent Expense`
    pub category: String,
    pub amount: BigDecimal,
    /// Nominal day of month the charge falls due
    pub day_of_month: u32,
}

/// Errors that can occur while generating or validating records
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("No customers available for invoicing")]
    NoCustomers,
    #[error("No vendors available for billing")]
    NoVendors,
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for generation and validation
pub type LedgerResult<T> = Result<T, LedgerError>;
