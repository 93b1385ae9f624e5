//! Tax rule examples: IGST, US sales tax and TDS withholding

use bigdecimal::BigDecimal;
use demo_ledger::utils::money::format_money;
use demo_ledger::{
    calculate_igst, calculate_sales_tax, sales_tax_rates, tds_for_bill, tds_rule, Currency,
    TaxCalculation, TaxRate,
};

fn main() {
    println!("🧾 Demo Ledger - Tax Rules\n");

    let subtotal = BigDecimal::from(100_000);

    println!("📊 Indirect tax on {}:", format_money(&subtotal, Currency::Inr));
    println!("  IGST @ 18%:      {}", format_money(&calculate_igst(&subtotal), Currency::Inr));
    for rate in sales_tax_rates() {
        println!(
            "  Sales tax @ {}: {}",
            rate,
            format_money(&calculate_sales_tax(&subtotal, &rate), Currency::Usd)
        );
    }
    println!();

    let calculation = TaxCalculation::calculate(subtotal.clone(), TaxRate::igst());
    println!("🏢 INR invoice:");
    println!("  Subtotal: {}", format_money(&calculation.subtotal, Currency::Inr));
    println!("  Tax:      {}", format_money(&calculation.tax_amount, Currency::Inr));
    println!("  Total:    {}", format_money(&calculation.total_amount, Currency::Inr));
    println!();

    println!("✂️  TDS by expense category (INR vendors):");
    let categories = [
        "Rent Expense",
        "Contractor Expense",
        "Consultant Expense",
        "Software Subscription",
    ];
    for category in categories {
        match tds_rule(category) {
            Some(rule) => {
                let tds = tds_for_bill(category, Currency::Inr, &subtotal);
                let amount = tds.map(|t| t.amount).unwrap_or_default();
                println!(
                    "  {:<22} section {} @ {} -> {}",
                    category,
                    rule.section,
                    rule.rate(),
                    format_money(&amount, Currency::Inr)
                );
            }
            None => println!("  {:<22} no withholding", category),
        }
    }

    let usd = tds_for_bill("Rent Expense", Currency::Usd, &subtotal);
    println!("\n  Rent Expense from a USD vendor withholds: {:?}", usd.map(|t| t.amount));
}
