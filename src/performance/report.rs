//! Per-position performance reports across a whole ledger
//!
//! Groups a mixed ledger by position and currency, then runs both solvers
//! for every group in parallel. Currencies are never netted together: a
//! position holding two currencies produces two reports.

use super::{calculate_time_weighted_return, solve_internal_rate_of_return, PerformanceOptions};
use crate::ledger::{Mark, Transaction};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Group key for rows that carry no position id
pub const UNASSIGNED_POSITION: &str = "unassigned";

/// Performance figures for one position in one currency
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReport {
    pub position_id: String,
    pub currency: String,
    pub transaction_count: usize,
    pub ending_value: Option<f64>,
    /// Annualized IRR percentage, None if undefined
    pub irr_pct: Option<f64>,
    /// Whether the IRR iteration met its tolerance; None when IRR is undefined
    pub irr_converged: Option<bool>,
    /// Time-weighted return percentage, None if undefined
    pub twr_pct: Option<f64>,
}

/// Build one report per (position, currency) group, sorted by position then currency.
///
/// A mark for a position applies to each of its currency groups. Marks
/// without an as-of date fall back to `default_as_of`, then to now.
pub fn build_position_reports(
    transactions: &[Transaction],
    marks: &[Mark],
    default_as_of: Option<DateTime<Utc>>,
) -> Vec<PositionReport> {
    let mut groups: BTreeMap<(String, String), Vec<Transaction>> = BTreeMap::new();
    for tx in transactions {
        let position_id = tx
            .position_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED_POSITION.to_string());
        groups
            .entry((position_id, tx.currency.clone()))
            .or_default()
            .push(tx.clone());
    }

    let marks_by_position: HashMap<&str, &Mark> =
        marks.iter().map(|m| (m.position_id.as_str(), m)).collect();

    log::info!(
        "Computing performance for {} position groups ({} marks)",
        groups.len(),
        marks_by_position.len()
    );

    let groups: Vec<_> = groups.into_iter().collect();

    // BTreeMap order is preserved by the indexed parallel collect
    groups
        .par_iter()
        .map(|((position_id, currency), txs)| {
            let options = match marks_by_position.get(position_id.as_str()) {
                Some(mark) => PerformanceOptions {
                    ending_value: Some(mark.ending_value),
                    as_of_date: mark.as_of_date.or(default_as_of),
                },
                None => PerformanceOptions::default(),
            };

            let irr = solve_internal_rate_of_return(txs, &options);
            let twr_pct = calculate_time_weighted_return(txs, &options);

            PositionReport {
                position_id: position_id.clone(),
                currency: currency.clone(),
                transaction_count: txs.len(),
                ending_value: options.ending_value,
                irr_pct: irr.map(|s| s.rate_pct),
                irr_converged: irr.map(|s| s.converged()),
                twr_pct,
            }
        })
        .collect()
}
