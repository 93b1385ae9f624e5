//! # Demo Ledger
//!
//! Weekly, deterministic demo data for an Indian software company's books:
//! customer invoices, vendor bills and the bank transactions that settle
//! them, with GST, TDS and revenue/expense recognition schedules.
//!
//! ## Features
//!
//! - **Invoices**: weighted customer selection, industry line-item templates,
//!   IGST for INR customers and US sales tax for USD customers
//! - **Bills**: rotating recurring expenses plus one-time charges, with TDS
//!   withholding for INR vendors
//! - **Bank transactions**: receipts, 25th-of-month payment runs, unmatched
//!   anomalies and running balances
//! - **Sheet storage**: trait-based tabular store with CSV and in-memory backends
//! - **Documents**: Typst PDF rendering and SMTP delivery
//!
//! Generation is seeded from the run date, so re-running a week against the
//! same tables yields the same documents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demo_ledger::{AppConfig, MemoryStore, Pipeline};
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn run() {
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = Pipeline::new(store, AppConfig::default());
//! let summary = pipeline.run(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()).await;
//! println!("{} invoices", summary.invoices_generated);
//! # }
//! ```

pub mod config;
pub mod generator;
pub mod mail;
pub mod pipeline;
pub mod reconciliation;
pub mod render;
pub mod sheets;
pub mod tax;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use generator::{BillGenerator, InvoiceGenerator};
pub use pipeline::{Pipeline, RunSummary};
pub use reconciliation::{BankStatement, BankTransactionGenerator};
pub use tax::*;
pub use traits::*;
pub use types::*;
pub use utils::{CsvStore, MemoryStore};
