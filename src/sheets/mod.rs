//! Tabular sheets backing the demo ledger.
//!
//! Every table is a named sheet with a fixed column layout. Rows travel
//! between the store and the domain types as [`Row`] values: string cells
//! keyed by column name, converted through [`SheetRecord`].

pub mod records;

pub use records::SheetRecord;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::traits::SheetStore;
use crate::types::{LedgerError, LedgerResult};

const ENTITY_COLUMNS: &[&str] = &[
    "Entity_ID",
    "Entity_Type",
    "Legal_Name",
    "Industry",
    "Currency",
    "Tax_ID",
    "Address_Line1",
    "City",
    "State",
    "ZIP",
    "Average_Transaction_Value",
    "Payment_Terms",
    "Is_Recurring",
];

const INVOICE_COLUMNS: &[&str] = &[
    "Invoice_ID",
    "Invoice_Date",
    "Customer_ID",
    "Customer_Name",
    "Customer_Address",
    "Customer_Tax_ID",
    "Currency",
    "Exchange_Rate",
    "Due_Date",
    "Line_Item_Count",
    "Line_Item_1_Description",
    "Line_Item_1_Quantity",
    "Line_Item_1_Rate",
    "Line_Item_1_Amount",
    "Line_Item_1_Account",
    "Line_Item_2_Description",
    "Line_Item_2_Quantity",
    "Line_Item_2_Rate",
    "Line_Item_2_Amount",
    "Line_Item_2_Account",
    "Line_Item_3_Description",
    "Line_Item_3_Quantity",
    "Line_Item_3_Rate",
    "Line_Item_3_Amount",
    "Line_Item_3_Account",
    "Subtotal",
    "Tax_Type",
    "Tax_Rate",
    "Tax_Amount",
    "Total_Amount",
    "Notes",
    "PDF_Generated",
    "PDF_Path",
    "Email_Sent",
    "Status",
    "Is_Deferred",
    "Deferral_Start_Date",
    "Deferral_End_Date",
    "Deferral_Period_Months",
    "Monthly_Recognition_Amount",
    "Recognized_To_Date",
    "Remaining_Deferred_Balance",
];

const BILL_COLUMNS: &[&str] = &[
    "Bill_ID",
    "Bill_Date",
    "Vendor_ID",
    "Vendor_Name",
    "Vendor_Address",
    "Vendor_Tax_ID",
    "Currency",
    "Exchange_Rate",
    "Due_Date",
    "Line_Item_Count",
    "Line_Item_1_Description",
    "Line_Item_1_Quantity",
    "Line_Item_1_Rate",
    "Line_Item_1_Amount",
    "Line_Item_1_Account",
    "Line_Item_2_Description",
    "Line_Item_2_Quantity",
    "Line_Item_2_Rate",
    "Line_Item_2_Amount",
    "Line_Item_2_Account",
    "Subtotal",
    "Tax_Type",
    "Tax_Rate",
    "Tax_Amount",
    "Total_Amount",
    "TDS_Applicable",
    "TDS_Section",
    "TDS_Rate",
    "TDS_Amount",
    "Net_Payable",
    "Notes",
    "PDF_Generated",
    "PDF_Path",
    "Email_Sent",
    "Status",
    "Is_Prepaid",
    "Prepaid_Start_Date",
    "Prepaid_End_Date",
    "Amortization_Period_Months",
    "Monthly_Amortization_Amount",
    "Amortized_To_Date",
    "Remaining_Prepaid_Balance",
];

const BANK_COLUMNS: &[&str] = &[
    "Transaction_ID",
    "Transaction_Date",
    "Description",
    "Reference_Number",
    "Entity_Name",
    "Transaction_Type",
    "Currency",
    "Debit",
    "Credit",
    "Running_Balance",
    "Bank_Account",
    "Reconciliation_Status",
    "Notes",
];

const RECURRING_COLUMNS: &[&str] = &["Expense_Category", "Amount", "Day_Of_Month"];

/// The sheets making up the ledger workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sheet {
    Entities,
    Invoices,
    Bills,
    BankTransactions,
    RecurringSchedule,
}

impl Sheet {
    /// Every sheet, in workbook order
    pub const ALL: [Sheet; 5] = [
        Sheet::Entities,
        Sheet::Invoices,
        Sheet::Bills,
        Sheet::BankTransactions,
        Sheet::RecurringSchedule,
    ];

    /// Sheet name as it appears in the workbook
    pub fn name(&self) -> &'static str {
        match self {
            Sheet::Entities => "Entities",
            Sheet::Invoices => "Invoices_Master",
            Sheet::Bills => "Bills_Master",
            Sheet::BankTransactions => "Bank_Transactions",
            Sheet::RecurringSchedule => "Recurring_Schedule",
        }
    }

    /// Column headers in sheet order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Sheet::Entities => ENTITY_COLUMNS,
            Sheet::Invoices => INVOICE_COLUMNS,
            Sheet::Bills => BILL_COLUMNS,
            Sheet::BankTransactions => BANK_COLUMNS,
            Sheet::RecurringSchedule => RECURRING_COLUMNS,
        }
    }

    /// Column holding the row identifier, if the sheet has one
    pub fn id_column(&self) -> Option<&'static str> {
        match self {
            Sheet::Entities => Some("Entity_ID"),
            Sheet::Invoices => Some("Invoice_ID"),
            Sheet::Bills => Some("Bill_ID"),
            Sheet::BankTransactions => Some("Transaction_ID"),
            Sheet::RecurringSchedule => None,
        }
    }
}

impl fmt::Display for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Sheet {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sheet::ALL
            .into_iter()
            .find(|sheet| sheet.name() == s)
            .ok_or_else(|| StoreError::SheetNotFound(s.to_string()))
    }
}

/// One sheet row: cell text keyed by column name.
///
/// Blank cells read back as missing, so optional fields survive a round
/// trip through stores that cannot tell the two apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a header and positional values
    pub fn from_values<H: AsRef<str>, V: Into<String>>(
        headers: &[H],
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let cells = headers
            .iter()
            .zip(values)
            .map(|(h, v)| (h.as_ref().to_string(), v.into()))
            .collect();
        Self { cells }
    }

    /// Set a cell
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.cells.insert(column.to_string(), value.into());
    }

    /// Set a cell, leaving it blank for `None`
    pub fn set_opt<T: ToString>(&mut self, column: &str, value: Option<T>) {
        let text = value.map(|v| v.to_string()).unwrap_or_default();
        self.set(column, text);
    }

    /// Trimmed cell text, `None` when missing or blank
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Cell values in `columns` order, blank where missing
    pub fn values_for<H: AsRef<str>>(&self, columns: &[H]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.cells.get(c.as_ref()).cloned().unwrap_or_default())
            .collect()
    }

    /// Required text cell
    pub fn text(&self, column: &str) -> LedgerResult<String> {
        self.get(column)
            .map(str::to_string)
            .ok_or_else(|| missing(column))
    }

    /// Optional text cell
    pub fn opt_text(&self, column: &str) -> Option<String> {
        self.get(column).map(str::to_string)
    }

    /// Required date cell; accepts `YYYY-MM-DD` with an optional time suffix
    pub fn date(&self, column: &str) -> LedgerResult<NaiveDate> {
        self.opt_date(column)?.ok_or_else(|| missing(column))
    }

    /// Optional date cell
    pub fn opt_date(&self, column: &str) -> LedgerResult<Option<NaiveDate>> {
        self.get(column)
            .map(|text| {
                let day = text.get(..10).unwrap_or(text);
                NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| invalid(column, text, e))
            })
            .transpose()
    }

    /// Required decimal cell
    pub fn decimal(&self, column: &str) -> LedgerResult<BigDecimal> {
        self.opt_decimal(column)?.ok_or_else(|| missing(column))
    }

    /// Optional decimal cell
    pub fn opt_decimal(&self, column: &str) -> LedgerResult<Option<BigDecimal>> {
        self.get(column)
            .map(|text| {
                BigDecimal::from_str(&text.replace(',', "")).map_err(|e| invalid(column, text, e))
            })
            .transpose()
    }

    /// Decimal cell defaulting to zero when blank
    pub fn decimal_or_zero(&self, column: &str) -> LedgerResult<BigDecimal> {
        Ok(self.opt_decimal(column)?.unwrap_or_else(|| BigDecimal::from(0)))
    }

    /// Optional float cell
    pub fn opt_f64(&self, column: &str) -> LedgerResult<Option<f64>> {
        self.get(column)
            .map(|text| text.replace(',', "").parse::<f64>().map_err(|e| invalid(column, text, e)))
            .transpose()
    }

    /// Optional whole-number cell; tolerates a `.0` suffix
    pub fn opt_u32(&self, column: &str) -> LedgerResult<Option<u32>> {
        self.get(column)
            .map(|text| {
                text.trim_end_matches(".0")
                    .parse::<u32>()
                    .map_err(|e| invalid(column, text, e))
            })
            .transpose()
    }

    /// Boolean cell; blank reads as `false`
    pub fn flag(&self, column: &str) -> bool {
        matches!(
            self.get(column).map(str::to_ascii_lowercase).as_deref(),
            Some("true" | "yes" | "1")
        )
    }
}

fn missing(column: &str) -> LedgerError {
    LedgerError::InvalidRecord(format!("missing value for {}", column))
}

fn invalid(column: &str, text: &str, err: impl fmt::Display) -> LedgerError {
    LedgerError::InvalidRecord(format!("invalid {} '{}': {}", column, text, err))
}

/// Errors raised by sheet stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Result type for sheet store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Load every parseable record of a sheet.
///
/// Rows that fail to parse are skipped with a warning so one bad row
/// cannot stop a run.
pub async fn load_records<R: SheetRecord>(store: &dyn SheetStore) -> StoreResult<Vec<R>> {
    let rows = store.read_sheet(R::SHEET).await?;
    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match R::from_row(row) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(
                sheet = %R::SHEET,
                row = index + 2,
                error = %err,
                "skipping malformed row"
            ),
        }
    }
    tracing::debug!(sheet = %R::SHEET, loaded = records.len(), total = rows.len(), "loaded records");
    Ok(records)
}

/// Append records to their sheet
pub async fn append_records<R: SheetRecord + Sync>(
    store: &dyn SheetStore,
    records: &[R],
) -> StoreResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    let rows: Vec<Row> = records.iter().map(SheetRecord::to_row).collect();
    store.append_rows(R::SHEET, &rows).await
}

/// Raw identifier cells of a sheet, in stored order.
///
/// Sequence recovery works from these rather than parsed records, so a
/// row with a broken amount still counts toward the next id.
pub async fn load_ids(store: &dyn SheetStore, sheet: Sheet) -> StoreResult<Vec<String>> {
    let Some(column) = sheet.id_column() else {
        return Ok(Vec::new());
    };
    let rows = store.read_sheet(sheet).await?;
    Ok(rows
        .iter()
        .filter_map(|row| row.get(column).map(str::to_string))
        .collect())
}
