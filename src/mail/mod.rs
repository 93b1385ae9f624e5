//! Outbound email for generated documents and run summaries.
//!
//! Messages are plain text with an optional PDF attachment and go out
//! through [`SmtpMailer`]. [`RecordingMailer`] keeps them in memory
//! instead, for tests and dry runs.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::pipeline::RunSummary;
use crate::reconciliation::BankStatement;
use crate::render::{COMPANY_NAME, COMPANY_SHORT_NAME};
use crate::traits::Mailer;
use crate::types::{Bill, Invoice};
use crate::utils::money::format_amount;

const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Email service errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    Build(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    Send(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    /// SMTP settings are incomplete.
    #[error("Email is not configured: {0}")]
    NotConfigured(String),
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl EmailAttachment {
    /// PDF attachment
    pub fn pdf(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes,
        }
    }
}

/// A plain-text message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<EmailAttachment>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    /// Attach a file
    #[must_use]
    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Invoice sent to the customer contact
    pub fn invoice(to: &str, invoice: &Invoice) -> Self {
        let subject = format!("Invoice {} from {}", invoice.id, COMPANY_SHORT_NAME);
        let body = format!(
            "Dear {customer},\n\n\
             Please find attached Invoice {id} for {currency} {amount}.\n\n\
             Payment Terms: Net 30\n\
             Due Date: {due}\n\n\
             Thank you for your business.\n\n\
             Best regards,\n\
             {company}",
            customer = invoice.customer_name,
            id = invoice.id,
            currency = invoice.currency,
            amount = format_amount(&invoice.total_amount),
            due = invoice.due_date.format("%Y-%m-%d"),
            company = COMPANY_NAME,
        );
        Self::new(to, subject, body)
    }

    /// Vendor bill notification for accounts payable
    pub fn bill(to: &str, bill: &Bill) -> Self {
        let subject = format!("Bill {} - {}", bill.id, bill.vendor_name);
        let body = format!(
            "Bill Notification\n\n\
             Bill ID: {id}\n\
             Vendor: {vendor}\n\
             Amount: {currency} {amount}\n\n\
             Please find attached bill for your records.\n\n\
             {company}",
            id = bill.id,
            vendor = bill.vendor_name,
            currency = bill.currency,
            amount = format_amount(&bill.total_amount),
            company = COMPANY_NAME,
        );
        Self::new(to, subject, body)
    }

    /// Biweekly bank statement
    pub fn statement(to: &str, statement: &BankStatement) -> Self {
        let period = statement.period_label();
        let subject = format!("Bank Statement - {}", period);
        let body = format!(
            "Bank Statement\n\n\
             Please find attached the bank statement for the period: {period}\n\n\
             This statement includes all transactions processed during the above period.\n\n\
             {company}",
            period = period,
            company = COMPANY_NAME,
        );
        Self::new(to, subject, body)
    }

    /// Run summary for the operator
    pub fn summary(to: &str, summary: &RunSummary) -> Self {
        let status = if summary.errors.is_empty() {
            "SUCCESS"
        } else {
            "COMPLETED WITH ERRORS"
        };
        let subject = format!("Pipeline Summary - {}", summary.run_date.format("%Y-%m-%d"));

        let mut body = format!(
            "Demo Ledger - Weekly Run Summary\n\n\
             Status: {status}\n\
             Run ID: {run_id}\n\
             Run Date: {run_date}\n\n\
             RESULTS:\n  \
             Invoices Generated: {invoices}\n  \
             Bills Generated: {bills}\n  \
             Bank Transactions: {transactions}\n  \
             PDFs Generated: {pdfs}\n  \
             Emails Sent: {emails}",
            status = status,
            run_id = summary.run_id,
            run_date = summary.run_date.format("%Y-%m-%d"),
            invoices = summary.invoices_generated,
            bills = summary.bills_generated,
            transactions = summary.transactions_generated,
            pdfs = summary.pdfs_generated,
            emails = summary.emails_sent,
        );
        if summary.bank_statement_sent {
            body.push_str("\n  Bank Statement: Sent (biweekly)");
        }
        if !summary.errors.is_empty() {
            body.push_str("\n\nERRORS:");
            for error in &summary.errors {
                body.push_str("\n  - ");
                body.push_str(error);
            }
        }
        body.push_str("\n\n---\nThis is an automated message from the demo ledger pipeline.");
        Self::new(to, subject, body)
    }
}

/// Sends mail through an SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Creates a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::NotConfigured`] when the host or sender is
    /// missing, and [`MailError::InvalidAddress`] for a bad sender.
    pub fn new(config: &EmailConfig) -> Result<Self, MailError> {
        let host = config
            .smtp_host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| MailError::NotConfigured("smtp_host is not set".to_string()))?;
        let from_email = config
            .from_email
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| MailError::NotConfigured("from_email is not set".to_string()))?;

        let from = format!("{} <{}>", config.from_name, from_email)
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidAddress(format!("{e}")))?;

        let relay = if config.smtp_port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        };
        let builder = relay
            .map_err(|e| MailError::Send(e.to_string()))?
            .port(config.smtp_port);

        let builder = match (&config.smtp_username, &config.smtp_password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        info!(smtp_host = %host, smtp_port = config.smtp_port, "Email service configured");
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build(&self, message: EmailMessage) -> Result<Message, MailError> {
        let to = message
            .to
            .parse::<Mailbox>()
            .map_err(|e| MailError::InvalidAddress(format!("{e}")))?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject);

        let built = match message.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| MailError::Build(e.to_string()))?;
                builder.multipart(
                    MultiPart::mixed()
                        .singlepart(SinglePart::plain(message.body))
                        .singlepart(
                            Attachment::new(attachment.filename).body(attachment.bytes, content_type),
                        ),
                )
            }
            None => builder.header(ContentType::TEXT_PLAIN).body(message.body),
        };
        built.map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let recipient = message.to.clone();
        let subject = message.subject.clone();
        let email = self.build(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        debug!(to = %recipient, subject = %subject, "Email sent");
        Ok(())
    }
}

/// Mailer that keeps messages in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages delivered so far
    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        if !message.to.contains('@') {
            return Err(MailError::InvalidAddress(message.to));
        }
        self.sent.lock().await.push(message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    fn summary(errors: Vec<String>) -> RunSummary {
        RunSummary {
            run_id: "RUN-202601051000".to_string(),
            run_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            invoices_generated: 2,
            bills_generated: 4,
            transactions_generated: 3,
            pdfs_generated: 0,
            emails_sent: 0,
            bank_statement_sent: false,
            ending_balance: Some(BigDecimal::from(25_000_000)),
            errors,
        }
    }

    #[test]
    fn test_summary_message() {
        let message = EmailMessage::summary("ops@example.com", &summary(vec![]));
        assert_eq!(message.subject, "Pipeline Summary - 2026-01-05");
        assert!(message.body.contains("Status: SUCCESS"));
        assert!(message.body.contains("Bills Generated: 4"));
        assert!(!message.body.contains("ERRORS"));

        let failed = EmailMessage::summary(
            "ops@example.com",
            &summary(vec!["bank: no vendors".to_string()]),
        );
        assert!(failed.body.contains("COMPLETED WITH ERRORS"));
        assert!(failed.body.contains("  - bank: no vendors"));
    }

    #[test]
    fn test_smtp_mailer_requires_host() {
        let err = SmtpMailer::new(&EmailConfig::default()).err().unwrap();
        assert!(matches!(err, MailError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_smtp_mailer_builds_multipart_message() {
        let config = EmailConfig {
            smtp_host: Some("localhost".to_string()),
            smtp_port: 1025,
            from_email: Some("ledger@example.com".to_string()),
            ..EmailConfig::default()
        };
        let mailer = SmtpMailer::new(&config).unwrap();
        let message = EmailMessage::new("ap@example.com", "Bill", "body")
            .with_attachment(EmailAttachment::pdf("BILL-202601-0001.pdf", b"%PDF-1.7".to_vec()));

        let formatted = String::from_utf8(mailer.build(message).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: Bill"));
        assert!(formatted.contains("BILL-202601-0001.pdf"));

        let bad = EmailMessage::new("not an address", "Bill", "body");
        assert!(matches!(mailer.build(bad), Err(MailError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_recording_mailer_keeps_messages() {
        let mailer = RecordingMailer::new();
        mailer
            .send(EmailMessage::new("ap@example.com", "Hello", "body"))
            .await
            .unwrap();
        assert!(mailer.send(EmailMessage::new("nobody", "Hello", "body")).await.is_err());

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Hello");
    }
}
