//! Cashflow classification for the IRR solver
//!
//! Converts ledger rows into signed, dated cashflows from the investor's
//! point of view: money leaving the investor is negative, money coming
//! back is positive.

use super::PerformanceOptions;
use crate::ledger::{Transaction, TransactionType};
use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A signed cashflow on a date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cashflow {
    pub amount: f64,
    pub date: DateTime<Utc>,
}

impl TransactionType {
    /// Sign applied to the stored magnitude, or None if the type is unclassifiable
    pub fn cashflow_sign(&self) -> Option<f64> {
        match self {
            TransactionType::Contribution | TransactionType::Fee => Some(-1.0),
            TransactionType::Distribution | TransactionType::Interest => Some(1.0),
            TransactionType::Unknown => None,
        }
    }
}

/// Elapsed years between two instants on an actual/365 basis.
///
/// No leap-year awareness; 366 calendar days is slightly more than one year.
pub fn years_between(base: DateTime<Utc>, date: DateTime<Utc>) -> f64 {
    let days = (date - base).num_milliseconds() as f64 / MILLIS_PER_DAY;
    days / super::DAYS_PER_YEAR
}

/// Build the sorted cashflow series for a position.
///
/// Rows are dropped, never rejected: unknown types, non-finite amounts,
/// amounts that are zero after signing, and unparseable dates. A finite
/// `ending_value` is appended as-is (positive by convention, not signed by
/// type) on the as-of date.
pub fn classify_cashflows(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> Vec<Cashflow> {
    let mut cashflows: Vec<Cashflow> = transactions
        .iter()
        .filter_map(|tx| {
            if !tx.amount.is_finite() {
                log::debug!(
                    "IRR: dropping {} on {:?}, non-finite amount",
                    tx.kind.as_str(),
                    tx.date
                );
                return None;
            }

            let Some(sign) = tx.kind.cashflow_sign() else {
                log::debug!("IRR: dropping unclassifiable transaction on {:?}", tx.date);
                return None;
            };

            // Negative stored amounts are taken as magnitudes here; the TWR solver skips them
            let amount = sign * tx.amount.abs();
            if amount == 0.0 {
                log::debug!("IRR: dropping zero-amount {} on {:?}", tx.kind.as_str(), tx.date);
                return None;
            }

            let Some(date) = tx.timestamp() else {
                log::debug!(
                    "IRR: dropping {} with unparseable date {:?}",
                    tx.kind.as_str(),
                    tx.date
                );
                return None;
            };

            Some(Cashflow { amount, date })
        })
        .collect();

    if let Some(ending_value) = options.ending_value.filter(|v| v.is_finite()) {
        cashflows.push(Cashflow {
            amount: ending_value,
            date: options.resolved_as_of(),
        });
    }

    cashflows.sort_by_key(|cf| cf.date);
    cashflows
}
