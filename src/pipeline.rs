//! Weekly run orchestration.
//!
//! A run loads the reference sheets, generates the week's invoices, bills
//! and bank transactions, appends them to the store, and then renders and
//! emails whatever the configured collaborators allow. Each phase records
//! its failure in the [`RunSummary`] and the run carries on with the
//! phases that do not depend on it.

use bigdecimal::BigDecimal;
use chrono::{Datelike, Local, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::generator::{BillGenerator, InvoiceGenerator};
use crate::mail::{EmailAttachment, EmailMessage, SmtpMailer};
use crate::reconciliation::{BankStatement, BankTransactionGenerator, ReconciliationSummary};
use crate::render::{render_to_file, Document, RenderError, TypstRenderer};
use crate::sheets::{append_records, load_ids, load_records, Sheet};
use crate::traits::{DocumentRenderer, Mailer, SheetStore};
use crate::types::*;
use crate::utils::csv_store::CsvStore;
use crate::utils::dates::mondays_in_range;
use crate::utils::ids::run_id;

/// Outcome of one weekly run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub invoices_generated: usize,
    pub bills_generated: usize,
    pub transactions_generated: usize,
    pub pdfs_generated: usize,
    pub emails_sent: usize,
    pub bank_statement_sent: bool,
    /// Bank balance after the week's transactions
    pub ending_balance: Option<BigDecimal>,
    pub errors: Vec<String>,
}

impl RunSummary {
    fn new(run_id: String, run_date: NaiveDate) -> Self {
        Self {
            run_id,
            run_date,
            invoices_generated: 0,
            bills_generated: 0,
            transactions_generated: 0,
            pdfs_generated: 0,
            emails_sent: 0,
            bank_statement_sent: false,
            ending_balance: None,
            errors: Vec::new(),
        }
    }

    /// True when no phase recorded an error
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, phase: &str, err: impl std::fmt::Display) {
        let message = format!("{}: {}", phase, err);
        warn!(error = %message, "Phase failed");
        self.errors.push(message);
    }
}

/// A rendered PDF waiting to be emailed
struct RenderedPdf {
    path: PathBuf,
    bytes: Vec<u8>,
}

/// Runs the weekly generation against a store and optional collaborators
pub struct Pipeline {
    store: Arc<dyn SheetStore>,
    renderer: Option<Arc<dyn DocumentRenderer>>,
    mailer: Option<Arc<dyn Mailer>>,
    config: AppConfig,
}

impl Pipeline {
    /// Pipeline over `store` with rendering and email disabled
    pub fn new(store: Arc<dyn SheetStore>, config: AppConfig) -> Self {
        Self {
            store,
            renderer: None,
            mailer: None,
            config,
        }
    }

    /// Pipeline wired from configuration: CSV sheets in the data
    /// directory, Typst rendering when enabled, SMTP when configured.
    pub fn from_config(config: AppConfig) -> Self {
        let store = Arc::new(CsvStore::new(config.data.dir.clone()));
        let mut pipeline = Self::new(store, config);

        if pipeline.config.render.enabled {
            pipeline.renderer = Some(Arc::new(TypstRenderer::new(
                pipeline.config.render.typst_bin.clone(),
            )));
        }

        if pipeline.config.email.is_configured() {
            match SmtpMailer::new(&pipeline.config.email) {
                Ok(mailer) => pipeline.mailer = Some(Arc::new(mailer)),
                Err(err) => warn!(error = %err, "Email disabled"),
            }
        } else {
            info!("Email not configured, skipping delivery");
        }
        pipeline
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run every Monday in `[from, to]` in order
    pub async fn backfill(&self, from: NaiveDate, to: NaiveDate) -> Vec<RunSummary> {
        let mondays = mondays_in_range(from, to);
        info!(from = %from, to = %to, runs = mondays.len(), "Starting backfill");
        let mut summaries = Vec::with_capacity(mondays.len());
        for monday in mondays {
            summaries.push(self.run(monday).await);
        }
        summaries
    }

    /// Generate, persist, render and deliver one week's data
    pub async fn run(&self, run_date: NaiveDate) -> RunSummary {
        let mut summary = RunSummary::new(run_id(Local::now().naive_local()), run_date);
        if run_date.weekday() != Weekday::Mon {
            warn!(run_date = %run_date, weekday = ?run_date.weekday(), "Run date is not a Monday");
        }
        info!(run_id = %summary.run_id, run_date = %run_date, "Starting weekly run");

        let store = self.store.as_ref();
        let pipeline = &self.config.pipeline;
        let exchange_rate = pipeline.exchange_rate();

        let (entities, schedule) = match self.load_reference(&mut summary).await {
            Some(reference) => reference,
            None => {
                self.send_summary(&mut summary).await;
                return summary;
            }
        };

        let invoices = match load_ids(store, Sheet::Invoices).await {
            Ok(prior_ids) => InvoiceGenerator::new(&entities, exchange_rate.clone())
                .generate_weekly_invoices(run_date, &prior_ids, pipeline.invoices_per_week)
                .map_err(|err| summary.record("Invoice generation failed", err))
                .ok(),
            Err(err) => {
                summary.record("Loading invoice ids failed", err);
                None
            }
        };
        if let Some(invoices) = &invoices {
            summary.invoices_generated = invoices.len();
            info!(count = invoices.len(), "Generated invoices");
        }

        let bills = match load_ids(store, Sheet::Bills).await {
            Ok(prior_ids) => BillGenerator::new(&entities, schedule, exchange_rate.clone())
                .generate_weekly_bills(run_date, &prior_ids, pipeline.bills_per_week)
                .map_err(|err| summary.record("Bill generation failed", err))
                .ok(),
            Err(err) => {
                summary.record("Loading bill ids failed", err);
                None
            }
        };
        if let Some(bills) = &bills {
            summary.bills_generated = bills.len();
            info!(count = bills.len(), "Generated bills");
        }

        let mut bank_history = None;
        if let (Some(invoices), Some(bills)) = (&invoices, &bills) {
            bank_history = self
                .generate_bank(&mut summary, run_date, invoices, bills)
                .await;
        } else {
            warn!("Skipping bank transactions, documents were not generated");
        }

        if let Some(invoices) = &invoices {
            self.persist(&mut summary, invoices).await;
        }
        if let Some(bills) = &bills {
            self.persist(&mut summary, bills).await;
        }
        if let Some((new_transactions, _)) = &bank_history {
            self.persist(&mut summary, new_transactions).await;
        }

        let mut documents: Vec<(Document<'_>, RenderedPdf)> = Vec::new();
        if let Some(renderer) = &self.renderer {
            let targets = invoices
                .iter()
                .flatten()
                .map(Document::Invoice)
                .chain(bills.iter().flatten().map(Document::Bill));
            for document in targets {
                match self.render(&mut summary, renderer.as_ref(), &document).await {
                    Ok(Some(pdf)) => documents.push((document, pdf)),
                    Ok(None) => {}
                    Err(RenderError::Unavailable(reason)) => {
                        warn!(reason = %reason, "PDF rendering unavailable, skipping documents");
                        break;
                    }
                    Err(_) => {}
                }
            }
        }

        if let Some(recipient) = self.document_recipient() {
            for (document, pdf) in documents {
                let message = match document {
                    Document::Invoice(invoice) => EmailMessage::invoice(recipient, invoice),
                    Document::Bill(bill) => EmailMessage::bill(recipient, bill),
                    Document::Statement(statement) => EmailMessage::statement(recipient, statement),
                };
                let attachment = EmailAttachment::pdf(document.file_name(), pdf.bytes);
                if self.deliver(&mut summary, message.with_attachment(attachment)).await {
                    debug!(path = %pdf.path.display(), "Emailed document");
                }
            }
        }

        if let Some((_, history)) = &bank_history {
            if run_date.iso_week().week() % 2 == 0 {
                self.send_statement(&mut summary, run_date, history).await;
            } else {
                debug!("Odd ISO week, no bank statement");
            }
        }

        self.send_summary(&mut summary).await;
        info!(
            run_id = %summary.run_id,
            invoices = summary.invoices_generated,
            bills = summary.bills_generated,
            transactions = summary.transactions_generated,
            pdfs = summary.pdfs_generated,
            emails = summary.emails_sent,
            errors = summary.errors.len(),
            "Weekly run finished"
        );
        summary
    }

    async fn load_reference(
        &self,
        summary: &mut RunSummary,
    ) -> Option<(Vec<Entity>, Vec<RecurringScheduleEntry>)> {
        let entities: Vec<Entity> = match load_records(self.store.as_ref()).await {
            Ok(entities) => entities,
            Err(err) => {
                summary.record("Loading entities failed", err);
                return None;
            }
        };
        let schedule: Vec<RecurringScheduleEntry> = match load_records(self.store.as_ref()).await {
            Ok(schedule) => schedule,
            Err(err) => {
                warn!(error = %err, "Recurring schedule unavailable, using defaults");
                Vec::new()
            }
        };
        info!(
            entities = entities.len(),
            schedule = schedule.len(),
            "Loaded reference data"
        );
        Some((entities, schedule))
    }

    /// Returns the week's new transactions and the full bank history
    async fn generate_bank(
        &self,
        summary: &mut RunSummary,
        run_date: NaiveDate,
        new_invoices: &[Invoice],
        new_bills: &[Bill],
    ) -> Option<(Vec<BankTransaction>, Vec<BankTransaction>)> {
        let store = self.store.as_ref();
        let loaded = async {
            let invoices: Vec<Invoice> = load_records(store).await?;
            let bills: Vec<Bill> = load_records(store).await?;
            let prior: Vec<BankTransaction> = load_records(store).await?;
            let prior_ids = load_ids(store, Sheet::BankTransactions).await?;
            Ok::<_, crate::sheets::StoreError>((invoices, bills, prior, prior_ids))
        }
        .await;
        let (mut invoices, mut bills, prior, prior_ids) = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                summary.record("Loading bank history failed", err);
                return None;
            }
        };
        invoices.extend_from_slice(new_invoices);
        bills.extend_from_slice(new_bills);

        let generator = BankTransactionGenerator::new(
            self.config.pipeline.exchange_rate(),
            self.config.pipeline.anomaly_rate,
        );
        match generator.generate_weekly_statement(run_date, &invoices, &bills, &prior, &prior_ids) {
            Ok(run) => {
                let reconciliation = ReconciliationSummary::from_transactions(&run.transactions);
                info!(
                    count = run.transactions.len(),
                    matched = reconciliation.matched,
                    unmatched = reconciliation.unmatched,
                    "Generated bank transactions"
                );
                summary.transactions_generated = run.transactions.len();
                summary.ending_balance = Some(run.ending_balance.clone());

                let mut history = prior;
                history.extend_from_slice(&run.transactions);
                Some((run.transactions, history))
            }
            Err(err) => {
                summary.record("Bank transaction generation failed", err);
                None
            }
        }
    }

    async fn persist<R: crate::sheets::SheetRecord + Sync>(
        &self,
        summary: &mut RunSummary,
        records: &[R],
    ) {
        match append_records(self.store.as_ref(), records).await {
            Ok(written) => info!(sheet = %R::SHEET, rows = written, "Persisted rows"),
            Err(err) => summary.record(&format!("Writing {} failed", R::SHEET), err),
        }
    }

    /// Render a document into the PDF directory.
    ///
    /// `Unavailable` is passed back so the caller can stop trying; other
    /// failures are recorded and reported as `Ok(None)`.
    async fn render(
        &self,
        summary: &mut RunSummary,
        renderer: &dyn DocumentRenderer,
        document: &Document<'_>,
    ) -> Result<Option<RenderedPdf>, RenderError> {
        let pdf_dir = self.config.output.pdf_dir();
        let rendered = render_to_file(renderer, document, &pdf_dir).await;
        let path = match rendered {
            Ok(path) => path,
            Err(RenderError::Unavailable(reason)) => return Err(RenderError::Unavailable(reason)),
            Err(err) => {
                summary.record(&format!("Rendering {} failed", document.file_name()), err);
                return Ok(None);
            }
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                summary.pdfs_generated += 1;
                debug!(kind = document.kind(), path = %path.display(), "Rendered PDF");
                Ok(Some(RenderedPdf { path, bytes }))
            }
            Err(err) => {
                summary.record(&format!("Reading {} failed", path.display()), err);
                Ok(None)
            }
        }
    }

    async fn send_statement(
        &self,
        summary: &mut RunSummary,
        run_date: NaiveDate,
        history: &[BankTransaction],
    ) {
        let Some(statement) = BankStatement::biweekly(history, run_date) else {
            info!("No bank activity in the statement period");
            return;
        };
        let (Some(renderer), Some(recipient)) = (&self.renderer, self.document_recipient()) else {
            debug!("Statement delivery not configured");
            return;
        };

        let document = Document::Statement(&statement);
        let pdf = match self.render(summary, renderer.as_ref(), &document).await {
            Ok(Some(pdf)) => pdf,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "Bank statement not rendered");
                return;
            }
        };
        let message = EmailMessage::statement(recipient, &statement)
            .with_attachment(EmailAttachment::pdf(document.file_name(), pdf.bytes));
        if self.deliver(summary, message).await {
            summary.bank_statement_sent = true;
            info!(period = %statement.period_label(), "Bank statement sent");
        }
    }

    async fn send_summary(&self, summary: &mut RunSummary) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        let Some(recipient) = self.config.email.summary_recipient() else {
            return;
        };
        let message = EmailMessage::summary(recipient, summary);
        match mailer.send(message).await {
            Ok(()) => info!(to = %recipient, "Run summary sent"),
            Err(err) => summary.record("Sending run summary failed", err),
        }
    }

    fn document_recipient(&self) -> Option<&str> {
        self.mailer.as_ref()?;
        self.config.email.recipient.as_deref()
    }

    async fn deliver(&self, summary: &mut RunSummary, message: EmailMessage) -> bool {
        let Some(mailer) = &self.mailer else {
            return false;
        };
        let subject = message.subject.clone();
        match mailer.send(message).await {
            Ok(()) => {
                summary.emails_sent += 1;
                true
            }
            Err(err) => {
                summary.record(&format!("Sending '{}' failed", subject), err);
                false
            }
        }
    }
}
