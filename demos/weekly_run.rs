//! One weekly run against an in-memory store

use chrono::NaiveDate;
use demo_ledger::reconciliation::ReconciliationSummary;
use demo_ledger::sheets::load_records;
use demo_ledger::utils::money::format_money;
use demo_ledger::{
    AppConfig, BankTransaction, Bill, Currency, Entity, EntityType, Invoice, MemoryStore, Pipeline,
};
use std::sync::Arc;

fn entity(id: &str, name: &str, entity_type: EntityType, currency: Currency, industry: &str) -> Entity {
    Entity {
        id: id.to_string(),
        legal_name: name.to_string(),
        entity_type,
        industry: Some(industry.to_string()),
        currency,
        tax_id: format!("29ABCDE{}F1Z5", id),
        address_line1: Some("4th Floor, Prestige Tower".to_string()),
        city: Some("Bangalore".to_string()),
        state: Some("KA".to_string()),
        zip: Some("560001".to_string()),
        average_transaction_value: Some(200_000.0),
        payment_terms: Some("Net 30".to_string()),
        is_recurring: false,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("📒 Demo Ledger - Weekly Run\n");

    let store = MemoryStore::new();
    store
        .seed(&[
            entity("C001", "Bluefin Retail Pvt Ltd", EntityType::Customer, Currency::Inr, "Retail"),
            entity("C002", "Northwind Health Inc", EntityType::Customer, Currency::Usd, "Healthcare"),
            entity("C003", "Sahyadri Logistics Ltd", EntityType::Customer, Currency::Inr, "Logistics"),
            entity("V001", "Prestige Estates", EntityType::Vendor, Currency::Inr, "Real Estate"),
            entity("V002", "CloudStack LLC", EntityType::Vendor, Currency::Usd, "Software"),
        ])
        .await;

    let pipeline = Pipeline::new(Arc::new(store.clone()), AppConfig::default());
    let from = NaiveDate::from_ymd_opt(2026, 1, 5).ok_or("invalid date")?;
    let to = NaiveDate::from_ymd_opt(2026, 2, 2).ok_or("invalid date")?;
    for summary in pipeline.backfill(from, to).await {
        println!(
            "  {}: {} invoices, {} bills, {} bank rows",
            summary.run_date,
            summary.invoices_generated,
            summary.bills_generated,
            summary.transactions_generated
        );
    }
    println!();

    let invoices: Vec<Invoice> = load_records(&store).await?;
    println!("🧾 Invoices:");
    for invoice in &invoices {
        println!(
            "  {} {:<24} {}",
            invoice.id,
            invoice.customer_name,
            format_money(&invoice.total_amount, invoice.currency)
        );
    }

    let bills: Vec<Bill> = load_records(&store).await?;
    println!("\n📥 Bills:");
    for bill in &bills {
        let tds = bill
            .tds
            .as_ref()
            .map(|t| format!(" (TDS {} {})", t.section, format_money(&t.amount, Currency::Inr)))
            .unwrap_or_default();
        println!(
            "  {} {:<26} {}{}",
            bill.id,
            bill.expense_account(),
            format_money(&bill.net_payable, bill.currency),
            tds
        );
    }

    let transactions: Vec<BankTransaction> = load_records(&store).await?;
    let reconciliation = ReconciliationSummary::from_transactions(&transactions);
    println!("\n🏦 Bank: {} rows, {} matched, {} unmatched", transactions.len(), reconciliation.matched, reconciliation.unmatched);
    if let Some(last) = transactions.last() {
        println!("  Closing balance: {}", format_money(&last.running_balance, Currency::Inr));
    }

    Ok(())
}
