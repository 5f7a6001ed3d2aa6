//! Investor Performance CLI
//!
//! Computes IRR and TWR for a single position's ledger

use anyhow::{Context, Result};
use clap::Parser;
use investor_performance::ledger::{load_transactions, parse_as_of_date};
use investor_performance::performance::{
    classify_cashflows, evaluate_time_weighted_return, solve_irr, IrrSolution,
    PerformanceOptions, TwrLedger,
};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "investor-performance",
    version,
    about = "IRR and time-weighted return for a position ledger"
)]
struct Cli {
    /// Ledger file (.csv or .json)
    ledger: PathBuf,

    /// Current value of the position
    #[arg(long)]
    ending_value: Option<f64>,

    /// Date of the ending value (defaults to now)
    #[arg(long)]
    as_of: Option<String>,

    /// Only use rows for this position id
    #[arg(long)]
    position: Option<String>,

    /// Print JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerformanceResponse {
    transaction_count: usize,
    cashflow_count: usize,
    irr_pct: Option<f64>,
    irr: Option<IrrSolution>,
    twr_pct: Option<f64>,
    twr: TwrLedger,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let as_of_date = cli
        .as_of
        .as_deref()
        .map(parse_as_of_date)
        .transpose()
        .context("Invalid --as-of")?;

    // One as-of instant for the IRR terminal cashflow, the TWR mark and the printout
    let options = PerformanceOptions {
        ending_value: cli.ending_value,
        as_of_date,
    }
    .pinned();

    let mut transactions = load_transactions(&cli.ledger)
        .with_context(|| format!("Failed to load ledger {}", cli.ledger.display()))?;

    if let Some(position) = &cli.position {
        transactions.retain(|tx| tx.position_id.as_deref() == Some(position.as_str()));
        log::info!("Filtered to {} transactions for position {}", transactions.len(), position);
    }

    let cashflows = classify_cashflows(&transactions, &options);
    let irr = solve_irr(&cashflows);
    let (twr, twr_pct) = evaluate_time_weighted_return(&transactions, &options);

    let response = PerformanceResponse {
        transaction_count: transactions.len(),
        cashflow_count: cashflows.len(),
        irr_pct: irr.map(|s| s.rate_pct),
        irr,
        twr_pct,
        twr,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Investor Performance v{}", env!("CARGO_PKG_VERSION"));
    println!("========================\n");

    println!("Ledger: {}", cli.ledger.display());
    println!("  Transactions: {}", response.transaction_count);
    println!("  Cashflows (IRR): {}", response.cashflow_count);
    if let Some(value) = options.ending_value {
        println!(
            "  Ending Value: {:.2} as of {}",
            value,
            options.resolved_as_of().format("%Y-%m-%d")
        );
    }
    println!();

    match response.irr {
        Some(solution) => {
            println!("  IRR: {:.4}%", solution.rate_pct);
            if !solution.converged() {
                println!(
                    "       (not converged: {:?} after {} iterations)",
                    solution.termination, solution.iterations
                );
            }
        }
        None => println!("  IRR: n/a"),
    }

    match response.twr_pct {
        Some(pct) => println!("  TWR: {:.4}%", pct),
        None => println!("  TWR: n/a"),
    }

    if !response.twr.periods.is_empty() {
        println!("\nPerformance periods:");
        println!(
            "{:>12} {:>10} {:>16} {:>14} {:>10}",
            "Date", "Kind", "CapitalAtRisk", "Amount", "Growth"
        );
        println!("{}", "-".repeat(66));
        for period in &response.twr.periods {
            let date = period
                .date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:>12} {:>10} {:>16.2} {:>14.2} {:>10.6}",
                date,
                format!("{:?}", period.kind),
                period.capital_at_risk,
                period.amount,
                period.growth,
            );
        }
    }

    Ok(())
}
