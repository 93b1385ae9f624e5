//! In-memory sheet store for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::sheets::{Row, Sheet, SheetRecord, StoreResult};
use crate::traits::SheetStore;

/// In-memory sheet store for tests and demos
///
/// Clones share the same tables, so a test can hand one clone to the
/// pipeline and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sheets: Arc<RwLock<HashMap<Sheet, Vec<Row>>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to their sheet
    pub async fn seed<R: SheetRecord>(&self, records: &[R]) {
        let rows = records.iter().map(SheetRecord::to_row);
        self.sheets
            .write()
            .await
            .entry(R::SHEET)
            .or_default()
            .extend(rows);
    }

    /// Append raw rows to a sheet
    pub async fn seed_rows(&self, sheet: Sheet, rows: Vec<Row>) {
        self.sheets.write().await.entry(sheet).or_default().extend(rows);
    }

    /// Number of rows currently in a sheet
    pub async fn row_count(&self, sheet: Sheet) -> usize {
        self.sheets.read().await.get(&sheet).map_or(0, Vec::len)
    }

    /// Clear all data
    pub async fn clear(&self) {
        self.sheets.write().await.clear();
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn read_sheet(&self, sheet: Sheet) -> StoreResult<Vec<Row>> {
        Ok(self.sheets.read().await.get(&sheet).cloned().unwrap_or_default())
    }

    async fn append_rows(&self, sheet: Sheet, rows: &[Row]) -> StoreResult<usize> {
        self.sheets
            .write()
            .await
            .entry(sheet)
            .or_default()
            .extend_from_slice(rows);
        Ok(rows.len())
    }
}
