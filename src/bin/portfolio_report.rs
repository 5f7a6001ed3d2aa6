//! Compute performance for every position in a ledger
//!
//! Runs IRR and TWR for each (position, currency) group in parallel.
//! Supports JSON output for API integration via --json flag
//! Accepts config via environment variables:
//!   LEDGER_PATH   ledger file, .csv or .json (default: ledger.csv)
//!   MARKS_PATH    optional CSV of positionId,endingValue,asOfDate
//!   AS_OF_DATE    default as-of date for marks without one

use anyhow::{Context, Result};
use investor_performance::ledger::{load_marks, load_transactions, parse_as_of_date};
use investor_performance::performance::{build_position_reports, PositionReport};
use serde::Serialize;
use std::env;
use std::time::Instant;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PortfolioResponse {
    position_count: usize,
    transaction_count: usize,
    undefined_irr_count: usize,
    non_converged_irr_count: usize,
    undefined_twr_count: usize,
    positions: Vec<PositionReport>,
    execution_time_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let json_output = env::args().any(|arg| arg == "--json");
    let start = Instant::now();

    // Read config from environment or use defaults
    let ledger_path = env::var("LEDGER_PATH").unwrap_or_else(|_| "ledger.csv".to_string());
    let marks_path = env::var("MARKS_PATH").ok();
    let default_as_of = env::var("AS_OF_DATE")
        .ok()
        .map(|s| parse_as_of_date(&s))
        .transpose()
        .context("Invalid AS_OF_DATE")?;

    if !json_output {
        println!("Loading ledger from {}...", ledger_path);
    }
    let transactions = load_transactions(&ledger_path)
        .with_context(|| format!("Failed to load ledger {}", ledger_path))?;

    let marks = match &marks_path {
        Some(path) => {
            load_marks(path).with_context(|| format!("Failed to load marks {}", path))?
        }
        None => Vec::new(),
    };

    if !json_output {
        println!(
            "Loaded {} transactions, {} marks in {:?}",
            transactions.len(),
            marks.len(),
            start.elapsed()
        );
    }

    let reports = build_position_reports(&transactions, &marks, default_as_of);

    let undefined_irr_count = reports.iter().filter(|r| r.irr_pct.is_none()).count();
    let non_converged_irr_count = reports
        .iter()
        .filter(|r| r.irr_converged == Some(false))
        .count();
    let undefined_twr_count = reports.iter().filter(|r| r.twr_pct.is_none()).count();

    if non_converged_irr_count > 0 {
        log::warn!("{} positions returned a non-converged IRR estimate", non_converged_irr_count);
    }

    if json_output {
        let response = PortfolioResponse {
            position_count: reports.len(),
            transaction_count: transactions.len(),
            undefined_irr_count,
            non_converged_irr_count,
            undefined_twr_count,
            positions: reports,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    let fmt_pct = |v: Option<f64>| {
        v.map(|p| format!("{:.4}%", p))
            .unwrap_or_else(|| "n/a".to_string())
    };

    println!(
        "\n{:<20} {:>5} {:>6} {:>14} {:>12} {:>12}",
        "Position", "Ccy", "Txns", "EndingValue", "IRR", "TWR"
    );
    println!("{}", "-".repeat(74));
    for report in &reports {
        let ending = report
            .ending_value
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string());
        let irr = match (report.irr_pct, report.irr_converged) {
            (Some(p), Some(false)) => format!("{:.4}%*", p),
            (p, _) => fmt_pct(p),
        };
        println!(
            "{:<20} {:>5} {:>6} {:>14} {:>12} {:>12}",
            report.position_id,
            report.currency,
            report.transaction_count,
            ending,
            irr,
            fmt_pct(report.twr_pct),
        );
    }

    println!("\nPositions: {}", reports.len());
    println!("  IRR undefined:     {}", undefined_irr_count);
    println!("  IRR not converged: {} (marked *)", non_converged_irr_count);
    println!("  TWR undefined:     {}", undefined_twr_count);
    println!("\nTotal time: {:?}", start.elapsed());

    Ok(())
}
