//! Utility modules

pub mod csv_store;
pub mod dates;
pub mod ids;
pub mod memory_storage;
pub mod money;
pub mod random;
pub mod service_period;
pub mod validation;

pub use csv_store::CsvStore;
pub use memory_storage::MemoryStore;
pub use validation::*;
