//! Money helpers: rounding, conversion and display formatting

use bigdecimal::{BigDecimal, RoundingMode};

use crate::types::Currency;

/// Round to two decimal places, half away from zero
pub fn round2(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Amount from a whole number of cents (paise)
pub fn from_cents(cents: i64) -> BigDecimal {
    BigDecimal::new(cents.into(), 2)
}

/// Decimal from a configuration float, rounded to `scale` places
pub fn decimal_from_f64(value: f64, scale: i32) -> BigDecimal {
    let scaled = (value * 10f64.powi(scale)).round() as i64;
    BigDecimal::new(scaled.into(), scale as i64)
}

/// Convert USD to INR at `rate`, rounded to paise
pub fn usd_to_inr(amount: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    round2(&(amount * rate))
}

/// Convert INR to USD at `rate`, rounded to cents
pub fn inr_to_usd(amount: &BigDecimal, rate: &BigDecimal) -> BigDecimal {
    if *rate == BigDecimal::from(0) {
        return BigDecimal::from(0);
    }
    round2(&(amount / rate))
}

/// Amount with thousands separators and two decimals, e.g. `1,234.50`
pub fn format_amount(amount: &BigDecimal) -> String {
    let plain = round2(amount).to_string();
    let (sign, digits) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain.as_str()),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Symbol-prefixed amount, e.g. `₹1,234.50` or `$1,234.50`
pub fn format_money(amount: &BigDecimal, currency: Currency) -> String {
    let symbol = match currency {
        Currency::Inr => "₹",
        Currency::Usd => "$",
    };
    format!("{}{}", symbol, format_amount(amount))
}
