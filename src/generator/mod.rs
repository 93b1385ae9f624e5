//! Document generators for customer invoices and vendor bills.
//!
//! Both generators are synchronous and seed their own random stream from
//! the run date, so a week's documents depend only on the run date, the
//! entity master and the prior table.

pub mod bill;
pub mod invoice;

pub use bill::{default_recurring_schedule, BillGenerator};
pub use invoice::InvoiceGenerator;
