//! Investor performance calculations over a single position's ledger
//!
//! Two independent, pure solvers:
//! - IRR: Newton-Raphson over dated cashflows, actual/365 day count
//! - TWR: running NAV simulation with chain-linked performance periods
//!
//! Neither solver fails. Degenerate input yields `None`, malformed rows
//! are dropped (IRR) or sorted to the front (TWR).

mod cashflows;
mod irr;
mod twr;
pub mod report;

pub use cashflows::{classify_cashflows, years_between, Cashflow};
pub use irr::{
    calculate_internal_rate_of_return, net_present_value, solve_internal_rate_of_return,
    solve_irr, IrrSolution, Termination, DAYS_PER_YEAR, DERIVATIVE_EPSILON, INITIAL_GUESS,
    MAX_ITERATIONS, RATE_FLOOR, TOLERANCE,
};
pub use report::{build_position_reports, PositionReport};
pub use twr::{
    calculate_time_weighted_return, evaluate_time_weighted_return, simulate_time_weighted_return,
    PeriodKind, PeriodReturn, TwrLedger,
};

use chrono::{DateTime, Utc};

/// Per-call options shared by both solvers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceOptions {
    /// Current value of the position, folded in as a terminal cashflow / final mark
    pub ending_value: Option<f64>,

    /// Date of `ending_value`; the current instant when absent
    pub as_of_date: Option<DateTime<Utc>>,
}

impl PerformanceOptions {
    pub fn with_ending_value(ending_value: f64) -> Self {
        Self {
            ending_value: Some(ending_value),
            as_of_date: None,
        }
    }

    pub fn as_of(mut self, as_of_date: DateTime<Utc>) -> Self {
        self.as_of_date = Some(as_of_date);
        self
    }

    /// The as-of date to stamp on the terminal cashflow
    pub fn resolved_as_of(&self) -> DateTime<Utc> {
        self.as_of_date.unwrap_or_else(Utc::now)
    }

    /// Fix a defaulted as-of date to the current instant, so repeated
    /// solver calls and any printout agree on the same date
    pub fn pinned(self) -> Self {
        match self.ending_value {
            Some(_) => Self {
                as_of_date: Some(self.resolved_as_of()),
                ..self
            },
            None => self,
        }
    }
}
