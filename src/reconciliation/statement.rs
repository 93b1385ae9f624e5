//! Periodic bank account statements

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::BankTransaction;
use crate::utils::dates::format_indian_date;

/// Days covered by the biweekly statement
pub const STATEMENT_PERIOD_DAYS: i64 = 14;

/// Bank statement over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankStatement {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    /// Balance before the first transaction in the period
    pub opening_balance: BigDecimal,
    /// Balance after the last transaction in the period
    pub closing_balance: BigDecimal,
    pub total_credits: BigDecimal,
    pub total_debits: BigDecimal,
    pub transactions: Vec<BankTransaction>,
}

impl BankStatement {
    /// Statement for the transactions dated within `[start, end]`.
    ///
    /// Returns `None` when nothing falls in the period. `transactions`
    /// must already be in `(date, id)` order with running balances set.
    pub fn for_period(transactions: &[BankTransaction], start: NaiveDate, end: NaiveDate) -> Option<Self> {
        let in_period: Vec<BankTransaction> = transactions
            .iter()
            .filter(|txn| txn.date >= start && txn.date <= end)
            .cloned()
            .collect();

        let first = in_period.first()?;
        let last = in_period.last()?;
        let opening_balance = &first.running_balance - &first.credit + &first.debit;
        let closing_balance = last.running_balance.clone();

        Some(Self {
            period_start: start,
            period_end: end,
            total_credits: in_period.iter().map(|t| &t.credit).sum(),
            total_debits: in_period.iter().map(|t| &t.debit).sum(),
            opening_balance,
            closing_balance,
            transactions: in_period,
        })
    }

    /// Statement for the 14 days before `run_date`
    pub fn biweekly(transactions: &[BankTransaction], run_date: NaiveDate) -> Option<Self> {
        Self::for_period(
            transactions,
            run_date - Duration::days(STATEMENT_PERIOD_DAYS),
            run_date - Duration::days(1),
        )
    }

    /// `05 Jan 2026 to 18 Jan 2026`
    pub fn period_label(&self) -> String {
        format!(
            "{} to {}",
            format_indian_date(self.period_start),
            format_indian_date(self.period_end)
        )
    }
}
