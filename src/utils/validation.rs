//! Validation utilities

use crate::types::*;
use bigdecimal::BigDecimal;

/// Compare two amounts with a relative tolerance.
///
/// `|a - b| <= rel_tol * max(|a|, |b|)`; two zeros are always close.
pub fn is_close(a: &BigDecimal, b: &BigDecimal, rel_tol: &BigDecimal) -> bool {
    let diff = (a - b).abs();
    let scale = std::cmp::max(a.abs(), b.abs());
    diff <= rel_tol * scale
}

/// Relative tolerance (1%) used for all amount comparisons
pub fn amount_tolerance() -> BigDecimal {
    BigDecimal::new(1.into(), 2)
}

/// Validate that an amount is positive
pub fn validate_amount_positive(amount: &BigDecimal, what: &str) -> LedgerResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(LedgerError::Validation(format!(
            "{} must be positive, got {}",
            what, amount
        )))
    } else {
        Ok(())
    }
}

/// Validate a currency code from the entity master
pub fn validate_currency(code: &str) -> LedgerResult<()> {
    match code.trim() {
        "USD" | "INR" => Ok(()),
        other => Err(LedgerError::Validation(format!(
            "Unsupported currency '{}', expected USD or INR",
            other
        ))),
    }
}

/// Validate that line-item amounts add up to the subtotal
pub fn validate_line_items_sum(items: &[LineItem], subtotal: &BigDecimal) -> LedgerResult<()> {
    let sum: BigDecimal = items.iter().map(|item| &item.amount).sum();
    if !is_close(&sum, subtotal, &amount_tolerance()) {
        return Err(LedgerError::Validation(format!(
            "Line items sum {} does not match subtotal {}",
            sum, subtotal
        )));
    }
    Ok(())
}

/// Validate that the tax amount equals subtotal times rate
pub fn validate_tax_calculation(
    subtotal: &BigDecimal,
    rate: &BigDecimal,
    tax_amount: &BigDecimal,
) -> LedgerResult<()> {
    let expected = subtotal * rate;
    if !is_close(&expected, tax_amount, &amount_tolerance()) {
        return Err(LedgerError::Validation(format!(
            "Tax amount {} does not match {} x {}",
            tax_amount, subtotal, rate
        )));
    }
    Ok(())
}

/// Validate that the TDS amount equals subtotal times the TDS rate
pub fn validate_tds_calculation(
    subtotal: &BigDecimal,
    tds_rate: &BigDecimal,
    tds_amount: &BigDecimal,
) -> LedgerResult<()> {
    let expected = subtotal * tds_rate;
    if !is_close(&expected, tds_amount, &amount_tolerance()) {
        return Err(LedgerError::Validation(format!(
            "TDS amount {} does not match {} x {}",
            tds_amount, subtotal, tds_rate
        )));
    }
    Ok(())
}

/// Validate `total = subtotal + tax - discount`
pub fn validate_total_amount(
    subtotal: &BigDecimal,
    tax_amount: &BigDecimal,
    discount: &BigDecimal,
    total: &BigDecimal,
) -> LedgerResult<()> {
    let expected = subtotal + tax_amount - discount;
    if !is_close(&expected, total, &amount_tolerance()) {
        return Err(LedgerError::Validation(format!(
            "Total {} does not match subtotal {} + tax {} - discount {}",
            total, subtotal, tax_amount, discount
        )));
    }
    Ok(())
}

/// Validate `net payable = total - tds`
pub fn validate_net_payable(
    total: &BigDecimal,
    tds_amount: &BigDecimal,
    net_payable: &BigDecimal,
) -> LedgerResult<()> {
    let expected = total - tds_amount;
    if !is_close(&expected, net_payable, &amount_tolerance()) {
        return Err(LedgerError::Validation(format!(
            "Net payable {} does not match total {} - TDS {}",
            net_payable, total, tds_amount
        )));
    }
    Ok(())
}

/// Validate the identifying fields of an entity master row
pub fn validate_entity(entity: &Entity) -> LedgerResult<()> {
    if entity.id.trim().is_empty() {
        return Err(LedgerError::Validation(
            "Entity ID cannot be empty".to_string(),
        ));
    }
    if entity.legal_name.trim().is_empty() {
        return Err(LedgerError::Validation(format!(
            "Entity {} has no legal name",
            entity.id
        )));
    }
    if let Some(value) = entity.average_transaction_value {
        if !value.is_finite() || value <= 0.0 {
            return Err(LedgerError::Validation(format!(
                "Entity {} has an invalid average transaction value {}",
                entity.id, value
            )));
        }
    }
    Ok(())
}
