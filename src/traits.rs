//! Traits for the collaborators a pipeline run talks to

use async_trait::async_trait;

use crate::mail::{EmailMessage, MailError};
use crate::render::{Document, RenderError};
use crate::sheets::{Row, Sheet, StoreResult};

/// Tabular storage abstraction for the ledger workbook
///
/// The pipeline works against any backend that can list the rows of a
/// sheet and append new ones (CSV files, in-memory tables, a spreadsheet
/// service). Rows are never updated or deleted.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Read every row of a sheet, in stored order
    async fn read_sheet(&self, sheet: Sheet) -> StoreResult<Vec<Row>>;

    /// Append rows to the end of a sheet, returning how many were written
    async fn append_rows(&self, sheet: Sheet, rows: &[Row]) -> StoreResult<usize>;
}

/// Turns a document into printable bytes
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render a document to PDF bytes
    async fn render(&self, document: &Document<'_>) -> Result<Vec<u8>, RenderError>;
}

/// Outbound email delivery
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}
