//! `trade-inspect`: diagnose a trade document and show what would be handed to reporting.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use trade_extract::{
    config::{DerivationPolicy, ReportingSides},
    document::DocumentTree,
    service::{ExtractionService, resolve_sides},
    trade::CounterpartyRole,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "trade-inspect",
    about = "Classify, extract and diagnose a trade lifecycle document",
    version
)]
struct Cli {
    /// Path to the JSON document
    file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Date used when no event date can be found (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    processing_date: Option<NaiveDate>,

    /// Currency used when the payout carries none
    #[arg(long)]
    default_currency: Option<String>,

    /// Counterparty role acting as reporting party
    #[arg(long, value_enum, default_value = "party1")]
    reporting_party: Side,
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    Party1,
    Party2,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("✗ {err:#}");
            ExitCode::FAILURE
        }
    }
}

// Ok(false) when the document parsed but no trade could be extracted
fn run(cli: Cli) -> anyhow::Result<bool> {
    let doc = DocumentTree::from_path(&cli.file)
        .with_context(|| format!("Failed to load {}", cli.file.display()))?;

    let mut policy = DerivationPolicy::default();
    if let Some(date) = cli.processing_date {
        policy = policy.set_processing_date(date);
    }
    if let Some(currency) = cli.default_currency.as_deref() {
        policy = policy.set_default_currency(currency);
    }
    let sides = ReportingSides::reported_by(match cli.reporting_party {
        Side::Party1 => CounterpartyRole::Party1,
        Side::Party2 => CounterpartyRole::Party2,
    });

    let service = ExtractionService::new(policy);
    let report = service.diagnose(&doc);
    let prepared = service.prepare(&doc);

    if cli.json {
        let output = serde_json::json!({
            "report": report,
            "prepared": prepared.as_ref().ok(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(prepared.is_ok());
    }

    print!("{report}");
    let Ok(prepared) = prepared else {
        return Ok(false);
    };

    println!();
    println!("Strategy: {}", prepared.strategy);
    println!("Repair:   {:?}", prepared.repair);
    let derived = &prepared.derived;
    println!(
        "Currency: {} ({})",
        derived.currency.value, derived.currency.provenance
    );
    match derived.notional.value {
        Some(amount) => println!("Notional: {amount} ({})", derived.notional.provenance),
        None => println!("Notional: unknown ({})", derived.notional.provenance),
    }
    println!(
        "Event date: {} ({})",
        derived.event_date.value, derived.event_date.provenance
    );
    println!(
        "Reporting LEI: {} ({})",
        derived.reporting_lei.value, derived.reporting_lei.provenance
    );
    match resolve_sides(&prepared.record, sides) {
        Ok(resolved) => println!(
            "Reporting: {} -> {}",
            resolved.reporting_party.name_value().unwrap_or("<unnamed>"),
            resolved
                .reporting_counterparty
                .name_value()
                .unwrap_or("<unnamed>")
        ),
        Err(err) => println!("Reporting sides unresolved: {err}"),
    }

    Ok(true)
}
