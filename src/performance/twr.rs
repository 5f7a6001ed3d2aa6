//! Time-Weighted Return (TWR) calculation
//!
//! Replays the ledger against a running net asset value. Capital movements
//! (contributions, distributions) change the NAV only; performance events
//! (interest, fees) also contribute a period growth factor scaled by the
//! capital at risk at that instant:
//!
//! ```text
//! interest: factor *= 1 + amount / nav
//! fee:      factor *= 1 - min(amount, nav) / nav
//! mark:     factor *= ending_value / nav
//!
//! TWR = (factor - 1) × 100
//! ```

use super::PerformanceOptions;
use crate::ledger::{Transaction, TransactionType};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Event that contributed a chain-link factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Interest,
    Fee,
    /// Final mark-to-market against the ending value
    Mark,
}

/// One chain-linked sub-period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodReturn {
    /// None when the ledger date was unparseable, or for a mark without an as-of date
    pub date: Option<DateTime<Utc>>,
    pub kind: PeriodKind,
    /// NAV immediately before the event
    pub capital_at_risk: f64,
    /// Amount applied to the NAV (the capped amount for fees)
    pub amount: f64,
    /// Growth factor for the period (1.10 = +10%)
    pub growth: f64,
}

/// Final state of the NAV simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwrLedger {
    /// Chain-linked growth multiplier
    pub factor: f64,
    pub net_asset_value: f64,
    pub periods: Vec<PeriodReturn>,
}

impl Default for TwrLedger {
    fn default() -> Self {
        Self {
            factor: 1.0,
            net_asset_value: 0.0,
            periods: Vec::new(),
        }
    }
}

impl TwrLedger {
    /// Return over the horizon as a percentage, or None for a non-positive factor
    pub fn return_pct(&self) -> Option<f64> {
        if self.factor <= 0.0 {
            return None;
        }
        Some((self.factor - 1.0) * 100.0)
    }

    fn link(&mut self, date: Option<DateTime<Utc>>, kind: PeriodKind, amount: f64, growth: f64) {
        self.factor *= growth;
        self.periods.push(PeriodReturn {
            date,
            kind,
            capital_at_risk: self.net_asset_value,
            amount,
            growth,
        });
    }

    fn apply(&mut self, tx: &Transaction, date: Option<DateTime<Utc>>) {
        let amount = tx.amount;

        match tx.kind {
            TransactionType::Contribution => {
                self.net_asset_value += amount;
            }
            TransactionType::Distribution => {
                self.net_asset_value = (self.net_asset_value - amount).max(0.0);
            }
            TransactionType::Interest => {
                if self.net_asset_value > 0.0 {
                    let growth = 1.0 + amount / self.net_asset_value;
                    self.link(date, PeriodKind::Interest, amount, growth);
                } else {
                    log::debug!("TWR: interest on {:?} with no capital at risk", tx.date);
                }
                // NAV keeps tracking income even when no return could be attributed
                self.net_asset_value += amount;
            }
            TransactionType::Fee => {
                if self.net_asset_value > 0.0 {
                    let effective = amount.min(self.net_asset_value);
                    let growth = 1.0 - effective / self.net_asset_value;
                    self.link(date, PeriodKind::Fee, effective, growth);
                    self.net_asset_value -= effective;
                } else {
                    log::debug!("TWR: fee on {:?} absorbed with no capital at risk", tx.date);
                }
            }
            TransactionType::Unknown => {}
        }
    }
}

/// Replay a position's ledger and return the full simulation state.
///
/// Unlike the IRR classifier, rows with unparseable dates are kept here and
/// ordered as if dated at the Unix epoch, which puts them ahead of every
/// real row. The two solvers intentionally disagree on this.
pub fn simulate_time_weighted_return(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> TwrLedger {
    let mut ordered: Vec<(i64, Option<DateTime<Utc>>, &Transaction)> = transactions
        .iter()
        .map(|tx| {
            let date = tx.timestamp();
            let key = date.map(|d| d.timestamp_millis()).unwrap_or(0);
            (key, date, tx)
        })
        .collect();
    // Stable: same-instant rows keep ledger order
    ordered.sort_by_key(|(key, _, _)| *key);

    let mut ledger = TwrLedger::default();

    for (_, date, tx) in ordered {
        if !tx.amount.is_finite() || tx.amount <= 0.0 {
            log::debug!(
                "TWR: skipping {} on {:?}, amount {}",
                tx.kind.as_str(),
                tx.date,
                tx.amount
            );
            continue;
        }
        ledger.apply(tx, date);
    }

    if let Some(ending_value) = options.ending_value.filter(|v| v.is_finite() && *v >= 0.0) {
        if ledger.net_asset_value > 0.0 {
            let ratio = ending_value / ledger.net_asset_value;
            if ratio > 0.0 {
                ledger.link(options.as_of_date, PeriodKind::Mark, ending_value, ratio);
            }
        }
        ledger.net_asset_value = ending_value;
    }

    ledger
}

/// Replay the ledger once and return both the simulation state and the
/// guarded percentage that [`calculate_time_weighted_return`] reports.
pub fn evaluate_time_weighted_return(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> (TwrLedger, Option<f64>) {
    let ledger = simulate_time_weighted_return(transactions, options);
    if transactions.is_empty() && options.ending_value.is_none() {
        return (ledger, None);
    }

    let pct = ledger.return_pct();
    (ledger, pct)
}

/// Time-weighted return over the ledger's horizon as a percentage.
///
/// # Returns
/// * `None` with no transactions and no ending value
/// * `None` when the chain-link factor ends non-positive (e.g. a fee took the whole NAV)
pub fn calculate_time_weighted_return(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> Option<f64> {
    evaluate_time_weighted_return(transactions, options).1
}
