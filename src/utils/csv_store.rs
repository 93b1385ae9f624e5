//! Sheet store backed by one CSV file per sheet

use async_trait::async_trait;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::sheets::{Row, Sheet, StoreResult};
use crate::traits::SheetStore;

/// Sheet store keeping `<Sheet_Name>.csv` files in a data directory
///
/// A sheet without a file reads as empty. The first append creates the
/// file with the sheet's standard header; later appends follow whatever
/// header the file already has, so hand-edited column orders survive.
#[derive(Debug, Clone)]
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Data directory holding the sheet files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a sheet
    pub fn path_for(&self, sheet: Sheet) -> PathBuf {
        self.dir.join(format!("{}.csv", sheet.name()))
    }

    fn read_header(path: &Path) -> StoreResult<Option<StringRecord>> {
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let header = reader.headers()?.clone();
        Ok(if header.is_empty() { None } else { Some(header) })
    }
}

#[async_trait]
impl SheetStore for CsvStore {
    async fn read_sheet(&self, sheet: Sheet) -> StoreResult<Vec<Row>> {
        let path = self.path_for(sheet);
        if !path.exists() {
            tracing::debug!(sheet = %sheet, path = %path.display(), "sheet file missing, reading as empty");
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new().flexible(true).from_path(&path)?;
        let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(Row::from_values(&header, record.iter().map(str::to_string)));
        }
        Ok(rows)
    }

    async fn append_rows(&self, sheet: Sheet, rows: &[Row]) -> StoreResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(sheet);

        let (header, file, write_header) = match Self::read_header(&path)? {
            Some(existing) => {
                let header: Vec<String> = existing.iter().map(|h| h.trim().to_string()).collect();
                let file = OpenOptions::new().append(true).open(&path)?;
                (header, file, false)
            }
            None => {
                let header = sheet.columns().iter().map(|c| c.to_string()).collect();
                (header, File::create(&path)?, true)
            }
        };

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if write_header {
            writer.write_record(&header)?;
        }
        for row in rows {
            writer.write_record(row.values_for(&header))?;
        }
        writer.flush()?;

        tracing::debug!(sheet = %sheet, rows = rows.len(), path = %path.display(), "appended rows");
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("demo-ledger-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn schedule_row(category: &str, amount: &str) -> Row {
        let mut row = Row::new();
        row.set("Expense_Category", category);
        row.set("Amount", amount);
        row.set("Day_Of_Month", "1");
        row
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let store = CsvStore::new(scratch_dir("missing"));
        assert!(store.read_sheet(Sheet::Bills).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_append_writes_standard_header() {
        let dir = scratch_dir("header");
        let store = CsvStore::new(&dir);
        store
            .append_rows(Sheet::RecurringSchedule, &[schedule_row("Office Rent", "75000.00")])
            .await
            .unwrap();

        let text = fs::read_to_string(store.path_for(Sheet::RecurringSchedule)).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Expense_Category,Amount,Day_Of_Month"));
        assert_eq!(lines.next(), Some("Office Rent,75000.00,1"));

        let rows = store.read_sheet(Sheet::RecurringSchedule).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Amount"), Some("75000.00"));
        let _ = fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_append_follows_existing_header_order() {
        let dir = scratch_dir("reorder");
        fs::create_dir_all(&dir).unwrap();
        let store = CsvStore::new(&dir);
        fs::write(
            store.path_for(Sheet::RecurringSchedule),
            "Amount,Expense_Category\n1000.00,Internet Expense\n",
        )
        .unwrap();

        store
            .append_rows(Sheet::RecurringSchedule, &[schedule_row("Office Rent", "75000.00")])
            .await
            .unwrap();

        let text = fs::read_to_string(store.path_for(Sheet::RecurringSchedule)).unwrap();
        assert_eq!(text.lines().last(), Some("75000.00,Office Rent"));

        let rows = store.read_sheet(Sheet::RecurringSchedule).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("Expense_Category"), Some("Office Rent"));
        assert_eq!(rows[1].get("Day_Of_Month"), None);
        let _ = fs::remove_dir_all(dir);
    }
}
