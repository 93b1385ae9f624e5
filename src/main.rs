//! Demo ledger command line
//!
//! Runs the weekly generation once, backfills a range of Mondays, or
//! stays up as a scheduler firing every Monday at the configured time.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use demo_ledger::utils::dates::next_scheduled_run;
use demo_ledger::{AppConfig, Pipeline, RunSummary};

#[derive(Parser)]
#[command(name = "demo-ledger")]
#[command(about = "Weekly demo data for invoices, bills and bank transactions", long_about = None)]
struct Cli {
    /// Print run summaries as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one week of data
    Run {
        /// Run date (YYYY-MM-DD), normally a Monday; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Generate every Monday in a date range
    Backfill {
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    /// Run every Monday at the configured time
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "demo_ledger=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;
    let pipeline = Pipeline::from_config(config);

    match cli.command {
        Command::Run { date } => {
            let run_date = date.unwrap_or_else(|| Local::now().date_naive());
            let summary = pipeline.run(run_date).await;
            report(&[summary], cli.json)
        }
        Command::Backfill { from, to } => {
            if from > to {
                bail!("--from {} is after --to {}", from, to);
            }
            let summaries = pipeline.backfill(from, to).await;
            report(&summaries, cli.json)
        }
        Command::Schedule => schedule(&pipeline, cli.json).await,
    }
}

async fn schedule(pipeline: &Pipeline, json: bool) -> anyhow::Result<()> {
    let settings = &pipeline.config().schedule;
    let time = NaiveTime::from_hms_opt(settings.hour, settings.minute, 0)
        .context("Invalid schedule time")?;

    loop {
        let now = Local::now().naive_local();
        let next = next_scheduled_run(now, time);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_run = %next, wait_secs = wait.as_secs(), "Waiting for next scheduled run");
        tokio::time::sleep(wait).await;

        let summary = pipeline.run(next.date()).await;
        if let Err(err) = report(&[summary], json) {
            error!(error = %err, "Scheduled run finished with errors");
        }
    }
}

/// Print summaries; fails when any run recorded errors
fn report(summaries: &[RunSummary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
    } else {
        for summary in summaries {
            println!(
                "{} {}: {} invoices, {} bills, {} transactions, {} PDFs, {} emails",
                summary.run_id,
                summary.run_date,
                summary.invoices_generated,
                summary.bills_generated,
                summary.transactions_generated,
                summary.pdfs_generated,
                summary.emails_sent,
            );
            for err in &summary.errors {
                println!("  error: {}", err);
            }
        }
    }

    let failed = summaries.iter().filter(|s| !s.is_success()).count();
    if failed > 0 {
        bail!("{} of {} runs recorded errors", failed, summaries.len());
    }
    Ok(())
}
