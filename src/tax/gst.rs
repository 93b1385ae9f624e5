//! Indirect tax on invoices and bills.
//!
//! INR documents carry IGST at 18%; USD documents carry a US state sales
//! tax drawn from a small set of rates. Rates are fractions (`0.18`), and
//! every computed amount is rounded to two decimals.

use bigdecimal::BigDecimal;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Currency, TaxType};
use crate::utils::money::round2;

/// IGST rate applied to every INR document (18%)
pub fn igst_rate() -> BigDecimal {
    BigDecimal::new(18.into(), 2)
}

/// Sales tax rates a USD document may carry (4%, 6%, 8%)
pub fn sales_tax_rates() -> [BigDecimal; 3] {
    [
        BigDecimal::new(4.into(), 2),
        BigDecimal::new(6.into(), 2),
        BigDecimal::new(8.into(), 2),
    ]
}

/// IGST on a subtotal at the standard rate
pub fn calculate_igst(subtotal: &BigDecimal) -> BigDecimal {
    round2(&(subtotal * igst_rate()))
}

/// Sales tax on a subtotal at `rate`
pub fn calculate_sales_tax(subtotal: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    round2(&(subtotal * rate))
}

/// Tax regime and rate for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRate {
    pub tax_type: TaxType,
    /// Fractional rate, e.g. `0.18`
    pub rate: BigDecimal,
}

impl TaxRate {
    /// IGST at 18%
    pub fn igst() -> Self {
        Self {
            tax_type: TaxType::Igst,
            rate: igst_rate(),
        }
    }

    /// Sales tax at an explicit rate
    pub fn sales_tax(rate: BigDecimal) -> Self {
        Self {
            tax_type: TaxType::SalesTax,
            rate,
        }
    }

    /// Regime for a document currency.
    ///
    /// INR always maps to IGST. USD draws one sales tax rate, consuming a
    /// single value from `rng`.
    pub fn for_currency<R: Rng + ?Sized>(currency: Currency, rng: &mut R) -> Self {
        match currency {
            Currency::Inr => Self::igst(),
            Currency::Usd => {
                let rates = sales_tax_rates();
                let idx = rng.gen_range(0..rates.len());
                Self::sales_tax(rates[idx].clone())
            }
        }
    }
}

/// Tax and total for a subtotal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculation {
    /// Amount before tax
    pub subtotal: BigDecimal,
    /// Regime and rate used
    pub tax_rate: TaxRate,
    /// Rounded tax amount
    pub tax_amount: BigDecimal,
    /// Subtotal plus tax
    pub total_amount: BigDecimal,
}

impl TaxCalculation {
    /// Calculate the tax and total for a subtotal
    pub fn calculate(subtotal: BigDecimal, tax_rate: TaxRate) -> Self {
        let tax_amount = match tax_rate.tax_type {
            TaxType::Igst => calculate_igst(&subtotal),
            TaxType::SalesTax => calculate_sales_tax(&subtotal, &tax_rate.rate),
        };
        let total_amount = &subtotal + &tax_amount;

        Self {
            subtotal,
            tax_rate,
            tax_amount,
            total_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::str::FromStr;

    #[test]
    fn test_calculate_igst() {
        assert_eq!(calculate_igst(&BigDecimal::from(100000)), BigDecimal::from(18000));
        assert_eq!(
            calculate_igst(&BigDecimal::from_str("1234.56").unwrap()),
            BigDecimal::from_str("222.22").unwrap()
        );
    }

    #[test]
    fn test_calculate_sales_tax() {
        let rate = BigDecimal::from_str("0.06").unwrap();
        assert_eq!(
            calculate_sales_tax(&BigDecimal::from(2500), &rate),
            BigDecimal::from(150)
        );
    }

    #[test]
    fn test_tax_calculation_totals() {
        let calculation = TaxCalculation::calculate(BigDecimal::from(1000), TaxRate::igst());
        assert_eq!(calculation.tax_amount, BigDecimal::from(180));
        assert_eq!(calculation.total_amount, BigDecimal::from(1180));
        assert_eq!(calculation.tax_rate.tax_type, TaxType::Igst);
    }

    #[test]
    fn test_rate_for_currency() {
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(TaxRate::for_currency(Currency::Inr, &mut rng), TaxRate::igst());

        let allowed = sales_tax_rates();
        for _ in 0..20 {
            let rate = TaxRate::for_currency(Currency::Usd, &mut rng);
            assert_eq!(rate.tax_type, TaxType::SalesTax);
            assert!(allowed.contains(&rate.rate));
        }
    }
}
