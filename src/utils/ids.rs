//! Document identifiers and sequence recovery

use chrono::{NaiveDate, NaiveDateTime};

use crate::types::{LedgerError, LedgerResult};

/// Prefix of customer invoice ids
pub const INVOICE_PREFIX: &str = "INV";
/// Prefix of vendor bill ids
pub const BILL_PREFIX: &str = "BILL";
/// Prefix of bank transaction ids
pub const TRANSACTION_PREFIX: &str = "TXN";

/// `PREFIX-YYYYMM-NNNN`
pub fn document_id(prefix: &str, date: NaiveDate, sequence: u32) -> String {
    format!("{}-{}-{:04}", prefix, date.format("%Y%m"), sequence)
}

/// `INV-YYYYMM-NNNN`
pub fn invoice_id(date: NaiveDate, sequence: u32) -> String {
    document_id(INVOICE_PREFIX, date, sequence)
}

/// `BILL-YYYYMM-NNNN`
pub fn bill_id(date: NaiveDate, sequence: u32) -> String {
    document_id(BILL_PREFIX, date, sequence)
}

/// `TXN` followed by an 8 digit sequence
pub fn transaction_id(sequence: u32) -> String {
    format!("{}{:08}", TRANSACTION_PREFIX, sequence)
}

/// `RUN-YYYYMMDDHHMM`
pub fn run_id(started_at: NaiveDateTime) -> String {
    format!("RUN-{}", started_at.format("%Y%m%d%H%M"))
}

/// Sequence number of a `PREFIX-...-NNNN` id, if its last segment is numeric
pub fn document_sequence(id: &str) -> Option<u32> {
    let id = id.trim();
    if !id.contains('-') {
        return None;
    }
    id.rsplit('-').next()?.parse().ok()
}

/// Sequence number of a `TXNNNNNNNNN` id
pub fn transaction_sequence(id: &str) -> Option<u32> {
    id.trim().strip_prefix(TRANSACTION_PREFIX)?.parse().ok()
}

/// `start + offset`, failing instead of wrapping past `u32::MAX`
pub fn sequence_after(start: u32, offset: usize) -> LedgerResult<u32> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| LedgerError::Validation(format!("Sequence exhausted after {}", start)))
}

/// Next document sequence after the last parseable id in a table.
///
/// Scans backwards so trailing blank or malformed rows do not reset
/// numbering. Returns 1 when nothing parses.
pub fn next_document_sequence<S: AsRef<str>>(ids: &[S]) -> LedgerResult<u32> {
    match ids.iter().rev().find_map(|id| document_sequence(id.as_ref())) {
        Some(last) => sequence_after(last, 1),
        None => Ok(1),
    }
}

/// Next transaction sequence after the highest parseable `TXN` id.
///
/// Rows whose other cells fail to parse still hold their id, so every
/// raw id counts.
pub fn next_transaction_sequence<S: AsRef<str>>(ids: &[S]) -> LedgerResult<u32> {
    match ids.iter().filter_map(|id| transaction_sequence(id.as_ref())).max() {
        Some(last) => sequence_after(last, 1),
        None => Ok(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_formats() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 6).unwrap();
        assert_eq!(invoice_id(date, 1), "INV-202601-0001");
        assert_eq!(bill_id(date, 42), "BILL-202601-0042");
        assert_eq!(transaction_id(7), "TXN00000007");
        let started = date.and_hms_opt(10, 5, 0).unwrap();
        assert_eq!(run_id(started), "RUN-202601061005");
    }

    #[test]
    fn test_sequence_parsing() {
        assert_eq!(document_sequence("INV-202601-0012"), Some(12));
        assert_eq!(document_sequence("INV-202601-"), None);
        assert_eq!(document_sequence("garbage"), None);
        assert_eq!(transaction_sequence("TXN00000123"), Some(123));
        assert_eq!(transaction_sequence("TX123"), None);
    }

    #[test]
    fn test_next_sequence_skips_malformed_tail() {
        let ids = vec!["INV-202512-0007", "INV-202601-0008", "", "n/a"];
        assert_eq!(next_document_sequence(&ids).unwrap(), 9);
        let empty: Vec<String> = Vec::new();
        assert_eq!(next_document_sequence(&empty).unwrap(), 1);
    }

    #[test]
    fn test_next_transaction_sequence_uses_highest_id() {
        let ids = vec!["TXN00000003", "TXN00000009", "", "TXN00000004"];
        assert_eq!(next_transaction_sequence(&ids).unwrap(), 10);
        let empty: Vec<&str> = Vec::new();
        assert_eq!(next_transaction_sequence(&empty).unwrap(), 1);
    }

    #[test]
    fn test_sequence_overflow_is_an_error() {
        let ids = vec![format!("INV-202601-{}", u32::MAX)];
        assert!(matches!(next_document_sequence(&ids), Err(LedgerError::Validation(_))));
        let ids = vec![format!("TXN{}", u32::MAX)];
        assert!(next_transaction_sequence(&ids).is_err());
        assert_eq!(sequence_after(7, 3).unwrap(), 10);
        assert!(sequence_after(u32::MAX - 1, 2).is_err());
    }
}
