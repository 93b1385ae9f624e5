//! Weekly customer invoice generation

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use tracing::{debug, warn};

use crate::tax::{TaxCalculation, TaxRate};
use crate::types::*;
use crate::utils::dates::format_service_period;
use crate::utils::ids::{invoice_id, next_document_sequence, sequence_after};
use crate::utils::money::{from_cents, round2};
use crate::utils::random::{
    apply_variance, seeded_rng, uniform_share, weighted_index, weighted_sample_without_replacement,
};
use crate::utils::service_period::deferral_schedule;

/// Selection weight for customers without an average transaction value
const DEFAULT_SELECTION_WEIGHT: f64 = 50_000.0;
/// Invoice base amount for customers without an average transaction value
const DEFAULT_BASE_AMOUNT: f64 = 100_000.0;
/// Revenue account every invoice line posts to
const REVENUE_ACCOUNT: &str = "Sales";
/// Bank details printed on every invoice
const PAYMENT_NOTE: &str =
    "Payment due as per terms. Bank details: HDFC Bank, A/c: 50200012345678, IFSC: HDFC0001234";
const DEFERRAL_NOTE: &str = ". Revenue to be recognized over service period per accrual schedule.";

/// Weights for 1, 2 and 3 line items
const LINE_COUNT_WEIGHTS: [f64; 3] = [0.6, 0.3, 0.1];
const SUBSCRIPTION_PLANS: [&str; 3] = ["Growth Plan", "Enterprise Plan", "Professional Plan"];

const TECHNOLOGY_SERVICES: &[&str] = &[
    "Software Development - Phase {phase}",
    "SaaS Platform Subscription - {plan}",
    "Business Intelligence Platform - Annual",
    "Data Analytics & BI - Phase {phase}",
    "Implementation Support (Hours)",
    "Technical Consulting Services",
];
const FINANCIAL_SERVICES: &[&str] = &[
    "Financial Advisory Services",
    "Risk Management Consulting",
    "Compliance Audit Services",
    "Portfolio Management - Annual",
];
const HEALTHCARE_SERVICES: &[&str] = &[
    "Healthcare IT Solutions",
    "Medical Records Management",
    "Telemedicine Platform Subscription",
];
const RETAIL_SERVICES: &[&str] = &[
    "E-commerce Platform Subscription",
    "Inventory Management System",
    "Point of Sale Software",
];

/// Service descriptions offered to a customer's industry
fn service_templates(industry: Option<&str>) -> &'static [&'static str] {
    match industry {
        Some("Financial Services") => FINANCIAL_SERVICES,
        Some("Healthcare") => HEALTHCARE_SERVICES,
        Some("Retail & E-commerce") => RETAIL_SERVICES,
        _ => TECHNOLOGY_SERVICES,
    }
}

/// Generates the week's customer invoices from the entity master
#[derive(Debug)]
pub struct InvoiceGenerator<'a> {
    customers: Vec<&'a Entity>,
    exchange_rate: BigDecimal,
}

impl<'a> InvoiceGenerator<'a> {
    /// Create a generator over the customers in `entities`
    pub fn new(entities: &'a [Entity], exchange_rate: BigDecimal) -> Self {
        let customers = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Customer)
            .collect();
        Self {
            customers,
            exchange_rate,
        }
    }

    /// Number of customers available for invoicing
    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Generate up to `count` invoices dated in the week before `run_date`.
    ///
    /// `prior_ids` is the `Invoice_ID` column of the existing table, in
    /// table order; numbering continues after its last parseable id. Each
    /// customer is invoiced at most once, so fewer than `count` invoices
    /// are returned when there are fewer customers.
    pub fn generate_weekly_invoices<S: AsRef<str>>(
        &self,
        run_date: NaiveDate,
        prior_ids: &[S],
        count: usize,
    ) -> LedgerResult<Vec<Invoice>> {
        if self.customers.is_empty() {
            return Err(LedgerError::NoCustomers);
        }
        if count > self.customers.len() {
            warn!(
                requested = count,
                customers = self.customers.len(),
                "Fewer customers than requested invoices"
            );
        }

        let mut rng = seeded_rng(run_date);
        let start_sequence = next_document_sequence(prior_ids)?;
        let selected = weighted_sample_without_replacement(&mut rng, &self.selection_weights(), count);

        let mut invoices = Vec::with_capacity(selected.len());
        for (offset, idx) in selected.into_iter().enumerate() {
            let customer = self.customers[idx];
            let days_back = rng.gen_range(1..=7);
            let invoice_date = run_date - Duration::days(days_back);
            let id = invoice_id(invoice_date, sequence_after(start_sequence, offset)?);

            let invoice = self.create_invoice(&mut rng, customer, id, invoice_date)?;
            debug!(
                invoice_id = %invoice.id,
                customer = %invoice.customer_name,
                total = %invoice.total_amount,
                deferred = invoice.is_deferred(),
                "Generated invoice"
            );
            invoices.push(invoice);
        }

        Ok(invoices)
    }

    /// Average transaction values, capped at three times the median
    fn selection_weights(&self) -> Vec<f64> {
        let raw: Vec<f64> = self
            .customers
            .iter()
            .map(|c| positive_average(c).unwrap_or(DEFAULT_SELECTION_WEIGHT))
            .collect();

        let mut sorted = raw.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let cap = sorted[sorted.len() / 2] * 3.0;

        raw.into_iter().map(|w| w.min(cap)).collect()
    }

    fn create_invoice(
        &self,
        rng: &mut StdRng,
        customer: &Entity,
        id: String,
        invoice_date: NaiveDate,
    ) -> LedgerResult<Invoice> {
        let line_count = weighted_index(rng, &LINE_COUNT_WEIGHTS) + 1;
        let line_items = generate_line_items(rng, customer, invoice_date, line_count)?;

        let subtotal: BigDecimal = line_items.iter().map(|item| &item.amount).sum();
        let tax = TaxCalculation::calculate(subtotal, TaxRate::for_currency(customer.currency, rng));
        let deferral = deferral_schedule(&line_items, &tax.total_amount);

        let mut notes = PAYMENT_NOTE.to_string();
        if deferral.is_some() {
            notes.push_str(DEFERRAL_NOTE);
        }

        let exchange_rate = match customer.currency {
            Currency::Usd => self.exchange_rate.clone(),
            Currency::Inr => BigDecimal::from(1),
        };

        let invoice = Invoice {
            id,
            date: invoice_date,
            customer_id: customer.id.clone(),
            customer_name: customer.legal_name.clone(),
            customer_address: customer.formatted_address(true),
            customer_tax_id: customer.tax_id.clone(),
            currency: customer.currency,
            exchange_rate,
            due_date: invoice_date + Duration::days(customer.due_days()),
            line_items,
            subtotal: tax.subtotal,
            tax_type: tax.tax_rate.tax_type,
            tax_rate: tax.tax_rate.rate,
            tax_amount: tax.tax_amount,
            total_amount: tax.total_amount,
            notes,
            deferral,
            status: "Sent".to_string(),
            pdf_generated: false,
            pdf_path: None,
            email_sent: false,
        };
        invoice.validate()?;
        Ok(invoice)
    }
}

/// Average transaction value, ignoring zero, negative and non-finite values
fn positive_average(customer: &Entity) -> Option<f64> {
    customer
        .average_transaction_value
        .filter(|value| value.is_finite() && *value > 0.0)
}

fn generate_line_items(
    rng: &mut StdRng,
    customer: &Entity,
    invoice_date: NaiveDate,
    count: usize,
) -> LedgerResult<Vec<LineItem>> {
    let templates = service_templates(customer.industry.as_deref());
    let base_cents =
        (positive_average(customer).unwrap_or(DEFAULT_BASE_AMOUNT) * 100.0).round() as i64;
    let multi_month_first_item = rng.gen_bool(0.7);

    (0..count)
        .map(|i| {
            let template = templates[rng.gen_range(0..templates.len())];
            let service = personalize(rng, template);

            let period_days = if i == 0 && multi_month_first_item {
                let months: i64 = [3, 6, 12][rng.gen_range(0..3)];
                Some(30 * months)
            } else if rng.gen_bool(0.3) {
                Some([15, 30][rng.gen_range(0..2)])
            } else {
                None
            };
            let description = match period_days {
                Some(days) => format!(
                    "{} (Service Period: {})",
                    service,
                    format_service_period(invoice_date, invoice_date + Duration::days(days))
                ),
                None => service,
            };

            let share_cents = match (count, i) {
                (1, _) => base_cents,
                (_, 0) => uniform_share(rng, base_cents, 6_000, 8_000)?,
                _ => uniform_share(rng, base_cents, 1_000, 3_000)?,
            };
            let amount = from_cents(apply_variance(rng, share_cents, 500)?);

            let (quantity, rate) = if template.contains("Hours") || template.contains("Support") {
                let quantity: u32 = rng.gen_range(5..=20);
                (quantity, round2(&(&amount / BigDecimal::from(quantity))))
            } else {
                (1, amount.clone())
            };

            Ok(LineItem {
                description,
                quantity,
                rate,
                amount,
                account: REVENUE_ACCOUNT.to_string(),
            })
        })
        .collect()
}

/// Fill `{phase}` and `{plan}` placeholders
fn personalize(rng: &mut StdRng, template: &str) -> String {
    if template.contains("{phase}") {
        template.replace("{phase}", &rng.gen_range(1..=3).to_string())
    } else if template.contains("{plan}") {
        template.replace("{plan}", SUBSCRIPTION_PLANS[rng.gen_range(0..SUBSCRIPTION_PLANS.len())])
    } else {
        template.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn customer(id: &str, currency: Currency, value: Option<f64>, terms: &str) -> Entity {
        Entity {
            id: id.to_string(),
            legal_name: format!("{} Pvt Ltd", id),
            entity_type: EntityType::Customer,
            industry: Some("Technology".to_string()),
            currency,
            tax_id: "29ABCDE1234F1Z5".to_string(),
            address_line1: Some("1 MG Road".to_string()),
            city: Some("Bangalore".to_string()),
            state: Some("KA".to_string()),
            zip: Some("560001".to_string()),
            average_transaction_value: value,
            payment_terms: Some(terms.to_string()),
            is_recurring: false,
        }
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn entities() -> Vec<Entity> {
        vec![
            customer("C001", Currency::Inr, Some(150_000.0), "Net 30"),
            customer("C002", Currency::Usd, Some(12_000.0), "Net 15"),
            customer("C003", Currency::Inr, None, "Net 30"),
        ]
    }

    #[test]
    fn test_no_customers_is_an_error() {
        let generator = InvoiceGenerator::new(&[], BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let result = generator.generate_weekly_invoices(run_date(), &empty, 2);
        assert!(matches!(result, Err(LedgerError::NoCustomers)));
    }

    #[test]
    fn test_invoices_are_consistent() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let invoices = generator.generate_weekly_invoices(run_date(), &empty, 3).unwrap();

        assert_eq!(invoices.len(), 3);
        for invoice in &invoices {
            assert!(invoice.validate().is_ok());
            assert!(invoice.date >= run_date() - Duration::days(7));
            assert!(invoice.date < run_date());
            assert_eq!(invoice.total_amount, &invoice.subtotal + &invoice.tax_amount);
            let expected_due = match invoice.customer_id.as_str() {
                "C002" => 15,
                _ => 30,
            };
            assert_eq!(invoice.due_date - invoice.date, Duration::days(expected_due));
            match invoice.currency {
                Currency::Usd => {
                    assert_eq!(invoice.tax_type, TaxType::SalesTax);
                    assert_eq!(invoice.exchange_rate, BigDecimal::from(85));
                }
                Currency::Inr => {
                    assert_eq!(invoice.tax_type, TaxType::Igst);
                    assert_eq!(invoice.exchange_rate, BigDecimal::from(1));
                }
            }
            assert!(invoice.line_items.iter().all(|i| i.account == "Sales"));
        }

        let mut customers: Vec<&str> = invoices.iter().map(|i| i.customer_id.as_str()).collect();
        customers.sort();
        customers.dedup();
        assert_eq!(customers.len(), 3);
    }

    #[test]
    fn test_count_capped_by_customer_count() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let invoices = generator.generate_weekly_invoices(run_date(), &empty, 10).unwrap();
        assert_eq!(invoices.len(), 3);
    }

    #[test]
    fn test_sequence_continues_from_prior_table() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let prior = vec!["INV-202512-0041", "INV-202512-0042", ""];
        let invoices = generator.generate_weekly_invoices(run_date(), &prior, 2).unwrap();
        assert_eq!(invoices[0].id, invoice_id(invoices[0].date, 43));
        assert_eq!(invoices[1].id, invoice_id(invoices[1].date, 44));
    }

    #[test]
    fn test_id_month_follows_invoice_date() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        // the week before 2026-02-01 lies entirely in January
        let run_date = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let invoices = generator.generate_weekly_invoices(run_date, &empty, 3).unwrap();
        for invoice in &invoices {
            assert_eq!(invoice.date.month(), 1);
            assert!(invoice.id.starts_with("INV-202601-"), "{}", invoice.id);
        }
    }

    #[test]
    fn test_zero_average_uses_default_amount() {
        let entities = vec![customer("C001", Currency::Inr, Some(0.0), "Net 30")];
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let invoices = generator.generate_weekly_invoices(run_date(), &empty, 1).unwrap();
        assert_eq!(invoices.len(), 1);
        assert!(invoices[0].subtotal > BigDecimal::from(0));
        assert!(invoices[0].validate().is_ok());
    }

    #[test]
    fn test_exhausted_sequence_is_an_error() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let prior = vec![format!("INV-202512-{}", u32::MAX - 1)];
        let result = generator.generate_weekly_invoices(run_date(), &prior, 2);
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_same_inputs_same_invoices() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let first = generator.generate_weekly_invoices(run_date(), &empty, 2).unwrap();
        let second = generator.generate_weekly_invoices(run_date(), &empty, 2).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_deferred_invoice_schedule() {
        let entities = entities();
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        let empty: [&str; 0] = [];
        let deferred: Vec<Invoice> = (0..8)
            .flat_map(|week| {
                let date = run_date() + Duration::weeks(week);
                generator.generate_weekly_invoices(date, &empty, 3).unwrap()
            })
            .filter(Invoice::is_deferred)
            .collect();

        assert!(!deferred.is_empty());
        for invoice in deferred {
            let schedule = invoice.deferral.as_ref().unwrap();
            assert!(schedule.period_months >= 3);
            assert_eq!(schedule.remaining_balance, invoice.total_amount);
            assert!(invoice.notes.ends_with("accrual schedule."));
        }
    }

    #[test]
    fn test_selection_weights_are_capped() {
        let entities = vec![
            customer("C001", Currency::Inr, Some(10_000.0), "Net 30"),
            customer("C002", Currency::Inr, Some(20_000.0), "Net 30"),
            customer("C003", Currency::Inr, Some(1_000_000.0), "Net 30"),
        ];
        let generator = InvoiceGenerator::new(&entities, BigDecimal::from(85));
        assert_eq!(generator.selection_weights(), vec![10_000.0, 20_000.0, 60_000.0]);
    }
}
