//! PDF rendering for invoices, bills and bank statements.
//!
//! Documents are laid out as Typst source through askama templates and
//! compiled with the `typst` command line tool. Every value reaches the
//! template as a quoted Typst string literal, so free text from the
//! sheets cannot inject markup.

use askama::Template;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use crate::reconciliation::BankStatement;
use crate::traits::DocumentRenderer;
use crate::types::*;
use crate::utils::dates::format_indian_date;
use crate::utils::money::{format_amount, format_money};

/// Legal name of the issuing company
pub const COMPANY_NAME: &str = "Acme Technologies Private Limited";
/// Name used in email subjects
pub const COMPANY_SHORT_NAME: &str = "Acme Technologies";
pub const COMPANY_ADDRESS: &str = "123 Tech Park, Whitefield, Bangalore, KA 560066";
pub const COMPANY_GSTIN: &str = "29AABCA1234F1ZV";

const BANK_NAME: &str = "HDFC Bank";
const MASKED_ACCOUNT_NUMBER: &str = "XXXX XXXX 5678";
const BANK_IFSC: &str = "HDFC0001234";

/// A document that can be rendered to PDF
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    Invoice(&'a Invoice),
    Bill(&'a Bill),
    Statement(&'a BankStatement),
}

impl Document<'_> {
    /// Short kind name used in logs and file names
    pub fn kind(&self) -> &'static str {
        match self {
            Document::Invoice(_) => "invoice",
            Document::Bill(_) => "bill",
            Document::Statement(_) => "statement",
        }
    }

    /// PDF file name for the document
    pub fn file_name(&self) -> String {
        match self {
            Document::Invoice(invoice) => format!("{}.pdf", invoice.id),
            Document::Bill(bill) => format!("{}.pdf", bill.id),
            Document::Statement(statement) => format!(
                "Statement_{}_{}.pdf",
                statement.period_start.format("%Y%m%d"),
                statement.period_end.format("%Y%m%d")
            ),
        }
    }

    /// Typst source for the document
    pub fn to_typst(&self) -> Result<String, RenderError> {
        let source = match self {
            Document::Invoice(invoice) => invoice_template(invoice).render()?,
            Document::Bill(bill) => bill_template(bill).render()?,
            Document::Statement(statement) => statement_template(statement).render()?,
        };
        Ok(source)
    }
}

/// Quote text as a Typst string literal
pub fn typst_string(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => {}
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

struct ItemView {
    description: String,
    quantity: String,
    rate: String,
    amount: String,
}

struct SummaryRow {
    label: String,
    value: String,
    strong: bool,
}

impl SummaryRow {
    fn new(label: &str, value: String) -> Self {
        Self {
            label: typst_string(label),
            value: typst_string(&value),
            strong: false,
        }
    }

    fn strong(mut self) -> Self {
        self.strong = true;
        self
    }
}

#[derive(Template)]
#[template(path = "document.typ", escape = "none")]
struct DocumentTemplate {
    company_name: String,
    company_address: String,
    company_tax_id: String,
    title: String,
    number: String,
    date: String,
    due_date: String,
    party_label: String,
    party_name: String,
    party_address: String,
    party_tax_id: String,
    items: Vec<ItemView>,
    summary: Vec<SummaryRow>,
    notes: String,
}

struct StatementRowView {
    date: String,
    description: String,
    reference: String,
    debit: String,
    credit: String,
    balance: String,
}

#[derive(Template)]
#[template(path = "statement.typ", escape = "none")]
struct StatementTemplate {
    bank_name: String,
    account_holder: String,
    account_number: String,
    ifsc: String,
    period: String,
    opening_balance: String,
    closing_balance: String,
    total_credits: String,
    total_debits: String,
    rows: Vec<StatementRowView>,
}

fn item_views(items: &[LineItem], currency: Currency) -> Vec<ItemView> {
    items
        .iter()
        .map(|item| ItemView {
            description: typst_string(&item.description),
            quantity: typst_string(&item.quantity.to_string()),
            rate: typst_string(&format_money(&item.rate, currency)),
            amount: typst_string(&format_money(&item.amount, currency)),
        })
        .collect()
}

/// `IGST @ 18%`
fn tax_label(tax_type: TaxType, rate: &BigDecimal) -> String {
    let percent = (rate * BigDecimal::from(100))
        .with_scale_round(2, RoundingMode::HalfUp)
        .to_string();
    let percent = percent.trim_end_matches('0').trim_end_matches('.');
    format!("{} @ {}%", tax_type.as_str(), percent)
}

fn invoice_template(invoice: &Invoice) -> DocumentTemplate {
    let currency = invoice.currency;
    let mut summary = vec![
        SummaryRow::new("Subtotal", format_money(&invoice.subtotal, currency)),
        SummaryRow::new(
            &tax_label(invoice.tax_type, &invoice.tax_rate),
            format_money(&invoice.tax_amount, currency),
        ),
        SummaryRow::new("Total", format_money(&invoice.total_amount, currency)).strong(),
    ];
    if let Some(deferral) = &invoice.deferral {
        summary.push(SummaryRow::new(
            "Monthly recognition",
            format!(
                "{} x {} months",
                format_money(&deferral.monthly_amount, currency),
                deferral.period_months
            ),
        ));
    }

    DocumentTemplate {
        company_name: typst_string(COMPANY_NAME),
        company_address: typst_string(COMPANY_ADDRESS),
        company_tax_id: typst_string(COMPANY_GSTIN),
        title: typst_string("TAX INVOICE"),
        number: typst_string(&invoice.id),
        date: typst_string(&format_indian_date(invoice.date)),
        due_date: typst_string(&format_indian_date(invoice.due_date)),
        party_label: typst_string("Bill To"),
        party_name: typst_string(&invoice.customer_name),
        party_address: typst_string(&invoice.customer_address),
        party_tax_id: typst_string(&invoice.customer_tax_id),
        items: item_views(&invoice.line_items, currency),
        summary,
        notes: typst_string(&invoice.notes),
    }
}

fn bill_template(bill: &Bill) -> DocumentTemplate {
    let currency = bill.currency;
    let mut summary = vec![
        SummaryRow::new("Subtotal", format_money(&bill.subtotal, currency)),
        SummaryRow::new(
            &tax_label(bill.tax_type, &bill.tax_rate),
            format_money(&bill.tax_amount, currency),
        ),
        SummaryRow::new("Total", format_money(&bill.total_amount, currency)).strong(),
    ];
    if let Some(tds) = &bill.tds {
        summary.push(SummaryRow::new(
            &format!("Less TDS u/s {}", tds.section),
            format_money(&tds.amount, currency),
        ));
        summary.push(SummaryRow::new("Net Payable", format_money(&bill.net_payable, currency)).strong());
    }

    DocumentTemplate {
        company_name: typst_string(&bill.vendor_name),
        company_address: typst_string(&bill.vendor_address),
        company_tax_id: typst_string(&bill.vendor_tax_id),
        title: typst_string("BILL"),
        number: typst_string(&bill.id),
        date: typst_string(&format_indian_date(bill.date)),
        due_date: typst_string(&format_indian_date(bill.due_date)),
        party_label: typst_string("Billed To"),
        party_name: typst_string(COMPANY_NAME),
        party_address: typst_string(COMPANY_ADDRESS),
        party_tax_id: typst_string(COMPANY_GSTIN),
        items: item_views(&bill.line_items, currency),
        summary,
        notes: typst_string(&bill.notes),
    }
}

fn statement_template(statement: &BankStatement) -> StatementTemplate {
    let rows = statement
        .transactions
        .iter()
        .map(|txn| StatementRowView {
            date: typst_string(&format_indian_date(txn.date)),
            description: typst_string(&txn.description),
            reference: typst_string(txn.reference.as_deref().unwrap_or("-")),
            debit: typst_string(&format_amount(&txn.debit)),
            credit: typst_string(&format_amount(&txn.credit)),
            balance: typst_string(&format_amount(&txn.running_balance)),
        })
        .collect();

    StatementTemplate {
        bank_name: typst_string(BANK_NAME),
        account_holder: typst_string(COMPANY_NAME),
        account_number: typst_string(MASKED_ACCOUNT_NUMBER),
        ifsc: typst_string(BANK_IFSC),
        period: typst_string(&statement.period_label()),
        opening_balance: typst_string(&format_money(&statement.opening_balance, Currency::Inr)),
        closing_balance: typst_string(&format_money(&statement.closing_balance, Currency::Inr)),
        total_credits: typst_string(&format_money(&statement.total_credits, Currency::Inr)),
        total_debits: typst_string(&format_money(&statement.total_debits, Currency::Inr)),
        rows,
    }
}

/// Renders documents by compiling Typst source with the `typst` CLI
#[derive(Debug, Clone)]
pub struct TypstRenderer {
    typst_bin: String,
}

impl TypstRenderer {
    pub fn new(typst_bin: impl Into<String>) -> Self {
        Self {
            typst_bin: typst_bin.into(),
        }
    }

    async fn compile(&self, source: &str) -> Result<Vec<u8>, RenderError> {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let work_dir = std::env::temp_dir().join(format!("demo-ledger-typst-{}", suffix));
        fs::create_dir(&work_dir).await?;

        let result = self.compile_in(&work_dir, source).await;
        let _ = fs::remove_dir_all(&work_dir).await;
        result
    }

    async fn compile_in(&self, work_dir: &Path, source: &str) -> Result<Vec<u8>, RenderError> {
        let input_path = work_dir.join("input.typ");
        let output_path = work_dir.join("output.pdf");
        fs::write(&input_path, source).await?;

        let output = Command::new(&self.typst_bin)
            .arg("compile")
            .arg(&input_path)
            .arg(&output_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    RenderError::Unavailable(format!("typst binary `{}` not found", self.typst_bin))
                } else {
                    RenderError::Io(err)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(RenderError::Compile(if stderr.is_empty() {
                format!("typst exited with {}", output.status)
            } else {
                stderr
            }));
        }

        Ok(fs::read(&output_path).await?)
    }
}

impl Default for TypstRenderer {
    fn default() -> Self {
        Self::new("typst")
    }
}

#[async_trait]
impl DocumentRenderer for TypstRenderer {
    async fn render(&self, document: &Document<'_>) -> Result<Vec<u8>, RenderError> {
        let source = document.to_typst()?;
        debug!(kind = document.kind(), bytes = source.len(), "Compiling Typst source");
        self.compile(&source).await
    }
}

/// Render `document` and write it under `dir`, returning the file path
pub async fn render_to_file(
    renderer: &dyn DocumentRenderer,
    document: &Document<'_>,
    dir: &Path,
) -> Result<PathBuf, RenderError> {
    let bytes = renderer.render(document).await?;
    fs::create_dir_all(dir).await?;
    let path = dir.join(document.file_name());
    fs::write(&path, bytes).await?;
    Ok(path)
}

/// Errors raised while rendering documents
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
    #[error("Typst compilation failed: {0}")]
    Compile(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_invoice() -> Invoice {
        let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        Invoice {
            id: "INV-202601-0001".to_string(),
            date,
            customer_id: "C001".to_string(),
            customer_name: "Globex \"Intl\" Corp".to_string(),
            customer_address: "1 MG Road, Bangalore".to_string(),
            customer_tax_id: "29ABCDE1234F1Z5".to_string(),
            currency: Currency::Inr,
            exchange_rate: BigDecimal::from(1),
            due_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            line_items: vec![LineItem {
                description: "Technical Consulting Services".to_string(),
                quantity: 1,
                rate: dec("100000.00"),
                amount: dec("100000.00"),
                account: "Sales".to_string(),
            }],
            subtotal: dec("100000.00"),
            tax_type: TaxType::Igst,
            tax_rate: dec("0.18"),
            tax_amount: dec("18000.00"),
            total_amount: dec("118000.00"),
            notes: "Payment due as per terms.".to_string(),
            deferral: None,
            status: "Sent".to_string(),
            pdf_generated: false,
            pdf_path: None,
            email_sent: false,
        }
    }

    #[test]
    fn test_typst_string_escaping() {
        assert_eq!(typst_string("plain"), "\"plain\"");
        assert_eq!(typst_string("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(typst_string("a\\b"), "\"a\\\\b\"");
        assert_eq!(typst_string("#set page()"), "\"#set page()\"");
    }

    #[test]
    fn test_invoice_source_contains_figures() {
        let invoice = sample_invoice();
        let source = Document::Invoice(&invoice).to_typst().unwrap();
        assert!(source.contains("\"INV-202601-0001\""));
        assert!(source.contains("\"Globex \\\"Intl\\\" Corp\""));
        assert!(source.contains("\"₹118,000.00\""));
        assert!(source.contains("\"IGST @ 18%\""));
    }

    #[test]
    fn test_file_names() {
        let invoice = sample_invoice();
        assert_eq!(Document::Invoice(&invoice).file_name(), "INV-202601-0001.pdf");
        assert_eq!(Document::Invoice(&invoice).kind(), "invoice");
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let invoice = sample_invoice();
        let renderer = TypstRenderer::new("definitely-not-a-typst-binary");
        let result = renderer.render(&Document::Invoice(&invoice)).await;
        assert!(matches!(result, Err(RenderError::Unavailable(_))));

        let dir = std::env::temp_dir().join(format!("demo-ledger-render-{}", std::process::id()));
        let written = render_to_file(&renderer, &Document::Invoice(&invoice), &dir).await;
        assert!(matches!(written, Err(RenderError::Unavailable(_))));
        assert!(!dir.join("INV-202601-0001.pdf").exists());
    }
}
