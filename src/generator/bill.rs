//! Weekly vendor bill generation.
//!
//! A week's bills mix up to two recurring charges, chosen by rotating
//! through the recurring schedule on the ISO week number, with one-time
//! expenses drawn from a frequency-weighted category table.

use bigdecimal::BigDecimal;
use chrono::{Datelike, Duration, NaiveDate};
use rand::prelude::*;
use tracing::{debug, warn};

use crate::tax::{tds_for_bill, TaxCalculation, TaxRate};
use crate::types::*;
use crate::utils::dates::{format_month_year, format_service_period, next_month_start};
use crate::utils::ids::{bill_id, next_document_sequence, sequence_after};
use crate::utils::money::from_cents;
use crate::utils::random::{seeded_rng, weighted_index};
use crate::utils::service_period::prepaid_schedule;

/// Recurring charges billed when no schedule is configured:
/// category, monthly amount in rupees and nominal day of month
const DEFAULT_RECURRING: [(&str, i64, u32); 10] = [
    ("Rent Expense", 75_000, 5),
    ("Telephone Expense", 5_000, 15),
    ("IT and Internet Expenses", 8_700, 10),
    ("Janitorial Expense", 6_000, 20),
    ("Software Subscriptions", 25_000, 1),
    ("Cloud Hosting", 50_000, 5),
    ("Insurance Expense", 15_000, 1),
    ("Professional Services", 30_000, 10),
    ("Security Services", 12_000, 15),
    ("Utilities", 10_000, 25),
];

/// One-time expense categories with frequency weight and amount range
const ONE_TIME_CATEGORIES: [(&str, f64, i64, i64); 7] = [
    ("Repairs and Maintenance", 7.0, 10_000, 50_000),
    ("Software Subscriptions", 6.0, 5_000, 30_000),
    ("Consultant Expense", 5.0, 30_000, 100_000),
    ("Travel Expense", 4.0, 5_000, 25_000),
    ("Cloud Hosting", 2.0, 10_000, 50_000),
    ("Advertising And Marketing", 3.0, 20_000, 100_000),
    ("Meals and Entertainment", 1.0, 2_000, 10_000),
];

/// Slots in the recurring rotation
const ROTATION_SIZE: u32 = 10;
const BILL_NOTES: &str = "Payment terms: Net 30";

/// The built-in recurring schedule
pub fn default_recurring_schedule() -> Vec<RecurringScheduleEntry> {
    DEFAULT_RECURRING
        .iter()
        .map(|&(category, amount, day_of_month)| RecurringScheduleEntry {
            category: category.to_string(),
            amount: BigDecimal::from(amount),
            day_of_month,
        })
        .collect()
}

/// A charge waiting to be turned into a bill
struct PlannedCharge {
    category: String,
    amount: BigDecimal,
    recurring: bool,
}

/// Generates the week's vendor bills
#[derive(Debug)]
pub struct BillGenerator<'a> {
    vendors: Vec<&'a Entity>,
    schedule: Vec<RecurringScheduleEntry>,
    exchange_rate: BigDecimal,
}

impl<'a> BillGenerator<'a> {
    /// Create a generator over the vendors in `entities`.
    ///
    /// An empty `schedule` falls back to [`default_recurring_schedule`].
    pub fn new(
        entities: &'a [Entity],
        schedule: Vec<RecurringScheduleEntry>,
        exchange_rate: BigDecimal,
    ) -> Self {
        let vendors = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Vendor)
            .collect();
        let schedule = if schedule.is_empty() {
            default_recurring_schedule()
        } else {
            schedule
        };
        Self {
            vendors,
            schedule,
            exchange_rate,
        }
    }

    /// Generate `count` bills dated in the week before `run_date`.
    ///
    /// `prior_ids` is the `Bill_ID` column of the existing table. When the
    /// rotation yields more recurring charges than `count`, all of them are
    /// still billed.
    pub fn generate_weekly_bills<S: AsRef<str>>(
        &self,
        run_date: NaiveDate,
        prior_ids: &[S],
        count: usize,
    ) -> LedgerResult<Vec<Bill>> {
        if self.vendors.is_empty() {
            return Err(LedgerError::NoVendors);
        }

        let mut rng = seeded_rng(run_date);
        let start_sequence = next_document_sequence(prior_ids)?;

        let mut charges = self.recurring_due(run_date);
        if charges.len() > count {
            warn!(
                recurring = charges.len(),
                requested = count,
                "Recurring charges exceed requested bill count"
            );
        }
        let one_time = count.saturating_sub(charges.len());
        charges.extend((0..one_time).map(|_| one_time_charge(&mut rng)));

        let mut bills = Vec::with_capacity(charges.len());
        for (offset, charge) in charges.into_iter().enumerate() {
            let vendor = self.vendors[rng.gen_range(0..self.vendors.len())];
            let bill_date = run_date - Duration::days(rng.gen_range(1..=7));
            let id = bill_id(bill_date, sequence_after(start_sequence, offset)?);

            let bill = self.create_bill(&mut rng, vendor, id, bill_date, charge)?;
            debug!(
                bill_id = %bill.id,
                vendor = %bill.vendor_name,
                category = bill.expense_account(),
                net_payable = %bill.net_payable,
                prepaid = bill.is_prepaid(),
                "Generated bill"
            );
            bills.push(bill);
        }

        Ok(bills)
    }

    /// Recurring charges for the ISO week of `run_date`
    fn recurring_due(&self, run_date: NaiveDate) -> Vec<PlannedCharge> {
        let week = run_date.iso_week().week();
        [(week * 2) % ROTATION_SIZE, (week * 2 + 1) % ROTATION_SIZE]
            .into_iter()
            .filter_map(|idx| self.schedule.get(idx as usize))
            .map(|entry| PlannedCharge {
                category: entry.category.clone(),
                amount: entry.amount.clone(),
                recurring: true,
            })
            .collect()
    }

    fn create_bill(
        &self,
        rng: &mut StdRng,
        vendor: &Entity,
        id: String,
        bill_date: NaiveDate,
        charge: PlannedCharge,
    ) -> LedgerResult<Bill> {
        let line_items = vec![LineItem {
            description: describe_charge(&charge, bill_date),
            quantity: 1,
            rate: charge.amount.clone(),
            amount: charge.amount.clone(),
            account: charge.category.clone(),
        }];

        let tax = TaxCalculation::calculate(charge.amount, TaxRate::for_currency(vendor.currency, rng));
        let tds = tds_for_bill(&charge.category, vendor.currency, &tax.subtotal);
        let net_payable = match &tds {
            Some(deduction) => &tax.total_amount - &deduction.amount,
            None => tax.total_amount.clone(),
        };
        let prepaid = prepaid_schedule(&line_items, bill_date, &tax.total_amount);

        let exchange_rate = match vendor.currency {
            Currency::Usd => self.exchange_rate.clone(),
            Currency::Inr => BigDecimal::from(1),
        };

        let bill = Bill {
            id,
            date: bill_date,
            vendor_id: vendor.id.clone(),
            vendor_name: vendor.legal_name.clone(),
            vendor_address: vendor.formatted_address(false),
            vendor_tax_id: vendor.tax_id.clone(),
            currency: vendor.currency,
            exchange_rate,
            due_date: bill_date + Duration::days(vendor.due_days()),
            line_items,
            subtotal: tax.subtotal,
            tax_type: tax.tax_rate.tax_type,
            tax_rate: tax.tax_rate.rate,
            tax_amount: tax.tax_amount,
            total_amount: tax.total_amount,
            tds,
            net_payable,
            notes: BILL_NOTES.to_string(),
            status: "Received".to_string(),
            prepaid,
            pdf_generated: false,
            pdf_path: None,
            email_sent: false,
        };
        bill.validate()?;
        Ok(bill)
    }
}

/// Category drawn by frequency weight, amount uniform in its range
fn one_time_charge(rng: &mut StdRng) -> PlannedCharge {
    let weights: Vec<f64> = ONE_TIME_CATEGORIES.iter().map(|c| c.1).collect();
    let (category, _, min, max) = ONE_TIME_CATEGORIES[weighted_index(rng, &weights)];
    let cents = rng.gen_range(min * 100..=max * 100);
    PlannedCharge {
        category: category.to_string(),
        amount: from_cents(cents),
        recurring: false,
    }
}

fn describe_charge(charge: &PlannedCharge, bill_date: NaiveDate) -> String {
    if charge.recurring {
        let service_month = bill_date + Duration::days(30);
        return format!("{} - {}", charge.category, format_month_year(service_month));
    }
    let month = format_month_year(bill_date);
    match charge.category.as_str() {
        "Repairs and Maintenance" => format!("Repair Services - {}", month),
        "Consultant Expense" => format!("Consulting Services - {}", month),
        "Travel Expense" => format!("Business Travel - {}", month),
        "Software Subscriptions" => {
            // Annual licence starting the month after the bill
            let start = next_month_start(bill_date).unwrap_or(bill_date);
            let end = start + Duration::days(365);
            format!("Software License (Term: {})", format_service_period(start, end))
        }
        other => format!("{} - {}", other, month),
    }
}
