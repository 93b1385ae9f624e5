//! Service periods embedded in line-item descriptions.
//!
//! Descriptions may carry a period as `Term: 01 Nov 2025 – 30 Nov 2025`
//! (bills) or `(Service Period: 01 Jan 2026 – 01 Apr 2026)` (invoices).
//! A period of three or more calendar months defers revenue; a period
//! starting after the document date marks a prepaid expense.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::types::{LineItem, RecognitionSchedule};
use crate::utils::dates::{format_service_period, months_spanned};
use crate::utils::money::round2;

const PERIOD_LABELS: [&str; 2] = ["Term:", "Service Period:"];
const DATE_FORMAT: &str = "%d %b %Y";

/// Minimum span in months that triggers revenue deferral
pub const DEFERRAL_MIN_MONTHS: u32 = 3;

/// An inclusive start/end date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ServicePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Extract the first labelled period from a description
    pub fn parse(description: &str) -> Option<Self> {
        PERIOD_LABELS.iter().find_map(|label| {
            let at = description.find(label)?;
            parse_range(&description[at + label.len()..])
        })
    }

    /// Calendar months touched by the period
    pub fn months(&self) -> u32 {
        months_spanned(self.start, self.end)
    }

    /// Whether revenue over this period should be deferred
    pub fn is_deferred(&self) -> bool {
        self.months() >= DEFERRAL_MIN_MONTHS
    }

    /// Whether the service starts after the document date
    pub fn is_prepaid(&self, document_date: NaiveDate) -> bool {
        self.start > document_date
    }

    /// `01 Jan 2026 – 01 Apr 2026`
    pub fn label(&self) -> String {
        format_service_period(self.start, self.end)
    }

    /// Fresh recognition schedule spreading `total` over the period
    pub fn schedule(&self, total: &BigDecimal) -> RecognitionSchedule {
        let months = self.months().max(1);
        RecognitionSchedule {
            start_date: self.start,
            end_date: self.end,
            period_months: months,
            monthly_amount: round2(&(total / BigDecimal::from(months))),
            recognized_to_date: BigDecimal::from(0),
            remaining_balance: total.clone(),
        }
    }
}

/// `DD Mon YYYY <dash> DD Mon YYYY`, tolerating trailing text
fn parse_range(text: &str) -> Option<ServicePeriod> {
    let normalized = text.replace('–', " - ");
    let tokens: Vec<&str> = normalized.split_whitespace().take(7).collect();
    if tokens.len() < 7 || tokens[3] != "-" {
        return None;
    }
    let start = parse_date(&tokens[0..3])?;
    let year: String = tokens[6].chars().take_while(|c| c.is_ascii_digit()).collect();
    let end = parse_date(&[tokens[4], tokens[5], year.as_str()])?;
    Some(ServicePeriod::new(start, end))
}

fn parse_date(parts: &[&str]) -> Option<NaiveDate> {
    if parts[0].len() != 2 || parts[2].len() != 4 {
        return None;
    }
    NaiveDate::parse_from_str(&parts.join(" "), DATE_FORMAT).ok()
}

/// Deferral schedule from the first line item whose period defers revenue
pub fn deferral_schedule(items: &[LineItem], total: &BigDecimal) -> Option<RecognitionSchedule> {
    items
        .iter()
        .filter_map(|item| ServicePeriod::parse(&item.description))
        .find(ServicePeriod::is_deferred)
        .map(|period| period.schedule(total))
}

/// Prepaid schedule from the first line item whose period starts after `bill_date`
pub fn prepaid_schedule(
    items: &[LineItem],
    bill_date: NaiveDate,
    total: &BigDecimal,
) -> Option<RecognitionSchedule> {
    items
        .iter()
        .filter_map(|item| ServicePeriod::parse(&item.description))
        .find(|period| period.is_prepaid(bill_date))
        .map(|period| period.schedule(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn item(description: &str) -> LineItem {
        LineItem {
            description: description.to_string(),
            quantity: 1,
            rate: BigDecimal::from(1000),
            amount: BigDecimal::from(1000),
            account: "Sales".to_string(),
        }
    }

    #[test]
    fn test_parse_term_label() {
        let period = ServicePeriod::parse("Software License (Term: 01 Feb 2026 – 31 Jan 2027)").unwrap();
        assert_eq!(period.start, d(2026, 2, 1));
        assert_eq!(period.end, d(2027, 1, 31));
        assert_eq!(period.months(), 12);
    }

    #[test]
    fn test_parse_service_period_label_with_ascii_dash() {
        let period =
            ServicePeriod::parse("SaaS Platform (Service Period: 05 Jan 2026 - 05 Apr 2026)").unwrap();
        assert_eq!(period, ServicePeriod::new(d(2026, 1, 5), d(2026, 4, 5)));
        assert!(period.is_deferred());
    }

    #[test]
    fn test_parse_rejects_missing_or_malformed() {
        assert!(ServicePeriod::parse("Rent Expense - February 2026").is_none());
        assert!(ServicePeriod::parse("Term: sometime soon").is_none());
        assert!(ServicePeriod::parse("Term: 1 Jan 2026 – 01 Feb 2026").is_none());
    }

    #[test]
    fn test_short_period_is_not_deferred() {
        let period = ServicePeriod::new(d(2026, 1, 10), d(2026, 2, 9));
        assert!(!period.is_deferred());
        assert!(period.is_prepaid(d(2026, 1, 9)));
        assert!(!period.is_prepaid(d(2026, 1, 10)));
    }

    #[test]
    fn test_schedule_amounts() {
        let total = BigDecimal::from_str("120000.00").unwrap();
        let schedule = ServicePeriod::new(d(2026, 1, 1), d(2026, 4, 1)).schedule(&total);
        assert_eq!(schedule.period_months, 4);
        assert_eq!(schedule.monthly_amount, BigDecimal::from(30000));
        assert_eq!(schedule.recognized_to_date, BigDecimal::from(0));
        assert_eq!(schedule.remaining_balance, total);
    }

    #[test]
    fn test_deferral_and_prepaid_detection() {
        let total = BigDecimal::from(1000);
        let items = vec![
            item("Implementation Support (Service Period: 01 Jan 2026 – 31 Jan 2026)"),
            item("Platform (Service Period: 01 Jan 2026 – 01 Jul 2026)"),
        ];
        let deferral = deferral_schedule(&items, &total).unwrap();
        assert_eq!(deferral.period_months, 7);

        let bill_items = vec![item("Software License (Term: 01 Feb 2026 – 31 Jan 2027)")];
        assert!(prepaid_schedule(&bill_items, d(2026, 1, 20), &total).is_some());
        assert!(prepaid_schedule(&bill_items, d(2026, 2, 2), &total).is_none());
    }
}
