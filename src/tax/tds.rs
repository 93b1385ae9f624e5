//! Tax deducted at source (TDS) on vendor payments.
//!
//! Withholding depends on the expense category of the bill and applies to
//! INR vendors only. Categories without a rule carry no TDS.

use bigdecimal::BigDecimal;

use crate::types::{Currency, TdsDeduction};
use crate::utils::money::round2;

/// Withholding rule for an expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdsRule {
    /// Income-tax act section
    pub section: &'static str,
    /// Rate in basis points
    rate_bp: i64,
}

impl TdsRule {
    const fn new(section: &'static str, rate_bp: i64) -> Self {
        Self { section, rate_bp }
    }

    /// Fractional rate, e.g. `0.10`
    pub fn rate(&self) -> BigDecimal {
        BigDecimal::new(self.rate_bp.into(), 4)
    }
}

/// Rent of land, buildings or equipment (10%)
const RENT: TdsRule = TdsRule::new("194I", 1_000);
/// Contract work (2%)
const CONTRACT: TdsRule = TdsRule::new("194C", 200);
/// Professional and technical fees (10%)
const PROFESSIONAL: TdsRule = TdsRule::new("194J", 1_000);

/// Withholding rule for an expense category, if any
pub fn tds_rule(category: &str) -> Option<TdsRule> {
    match category {
        "Rent Expense" | "Office Rent" | "Equipment Rent" => Some(RENT),
        "Repairs and Maintenance"
        | "Advertising And Marketing"
        | "Contractor Expense"
        | "Janitorial Expense" => Some(CONTRACT),
        "Consultant Expense"
        | "Professional Services"
        | "Technical Services"
        | "Accounting Services"
        | "Legal Services" => Some(PROFESSIONAL),
        _ => None,
    }
}

/// TDS on a subtotal at `rate`, rounded to two decimals
pub fn calculate_tds(subtotal: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    round2(&(subtotal * rate))
}

/// Deduction for a bill, or `None` for USD vendors and untaxed categories
pub fn tds_for_bill(
    category: &str,
    vendor_currency: Currency,
    subtotal: &BigDecimal,
) -> Option<TdsDeduction> {
    if vendor_currency != Currency::Inr {
        return None;
    }
    let rule = tds_rule(category)?;
    let rate = rule.rate();
    Some(TdsDeduction {
        section: rule.section.to_string(),
        amount: calculate_tds(subtotal, &rate),
        rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[test]
    fn test_calculate_tds() {
        let rate = BigDecimal::from_str("0.10").unwrap();
        assert_eq!(
            calculate_tds(&BigDecimal::from(100000), &rate),
            BigDecimal::from(10000)
        );
    }

    #[rstest]
    #[case("Rent Expense", Some(("194I", "0.10")))]
    #[case("Equipment Rent", Some(("194I", "0.10")))]
    #[case("Janitorial Expense", Some(("194C", "0.02")))]
    #[case("Repairs and Maintenance", Some(("194C", "0.02")))]
    #[case("Consultant Expense", Some(("194J", "0.10")))]
    #[case("Professional Services", Some(("194J", "0.10")))]
    #[case("Software Subscriptions", None)]
    #[case("Cloud Hosting", None)]
    #[case("Travel Expense", None)]
    #[case("Something Else", None)]
    fn test_tds_rules(#[case] category: &str, #[case] expected: Option<(&str, &str)>) {
        let rule = tds_rule(category);
        match expected {
            Some((section, rate)) => {
                let rule = rule.unwrap();
                assert_eq!(rule.section, section);
                assert_eq!(rule.rate(), BigDecimal::from_str(rate).unwrap());
            }
            None => assert!(rule.is_none()),
        }
    }

    #[test]
    fn test_tds_only_for_inr_vendors() {
        let subtotal = BigDecimal::from(75000);
        let deduction = tds_for_bill("Rent Expense", Currency::Inr, &subtotal).unwrap();
        assert_eq!(deduction.section, "194I");
        assert_eq!(deduction.amount, BigDecimal::from(7500));

        assert!(tds_for_bill("Rent Expense", Currency::Usd, &subtotal).is_none());
        assert!(tds_for_bill("Cloud Hosting", Currency::Inr, &subtotal).is_none());
    }
}
