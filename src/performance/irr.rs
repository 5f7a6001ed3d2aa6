//! Internal Rate of Return (IRR) calculation
//!
//! Annualized money-weighted return of a position, found with Newton-Raphson
//! over an actual/365 NPV:
//!
//! ```text
//! f(r)  = Σ CF_i / (1 + r)^t_i
//! f'(r) = Σ -t_i × CF_i / (1 + r)^(t_i + 1)
//! r_new = r - f(r) / f'(r)
//! ```
//!
//! `t_i` is years from the earliest cashflow date.

use super::cashflows::{classify_cashflows, years_between, Cashflow};
use super::PerformanceOptions;
use crate::ledger::Transaction;
use serde::Serialize;

/// Starting rate for the iteration (10%)
pub const INITIAL_GUESS: f64 = 0.10;

/// Lowest rate evaluated; keeps `1 + r` strictly positive
pub const RATE_FLOOR: f64 = -0.9999999999;

pub const MAX_ITERATIONS: u32 = 100;

/// Step size at which the iteration counts as converged
pub const TOLERANCE: f64 = 1e-7;

/// Below this the Newton step is not taken
pub const DERIVATIVE_EPSILON: f64 = 1e-12;

pub const DAYS_PER_YEAR: f64 = 365.0;

/// How the Newton-Raphson loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Step size fell within tolerance
    Converged,
    /// Derivative too small to divide by; rate is the last estimate
    FlatDerivative,
    /// Iteration budget exhausted; rate is the last estimate
    IterationLimit,
}

/// IRR result with convergence diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IrrSolution {
    /// Annualized rate as a percentage (12.5 = 12.5%)
    pub rate_pct: f64,
    pub iterations: u32,
    pub termination: Termination,
}

impl IrrSolution {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Solve for the annualized IRR of a cashflow series.
///
/// # Returns
/// * `None` when the series is empty or has no sign change (IRR undefined)
/// * `Some(solution)` otherwise, including when the loop did not converge;
///   check `termination` to tell the cases apart
pub fn solve_irr(cashflows: &[Cashflow]) -> Option<IrrSolution> {
    let base = cashflows.iter().map(|cf| cf.date).min()?;

    let has_positive = cashflows.iter().any(|cf| cf.amount > 0.0);
    let has_negative = cashflows.iter().any(|cf| cf.amount < 0.0);
    if !has_positive || !has_negative {
        return None;
    }

    let points: Vec<(f64, f64)> = cashflows
        .iter()
        .map(|cf| (cf.amount, years_between(base, cf.date)))
        .collect();

    let solution = |rate: f64, iterations: u32, termination: Termination| IrrSolution {
        rate_pct: rate * 100.0,
        iterations,
        termination,
    };

    let mut rate = INITIAL_GUESS;

    for iteration in 1..=MAX_ITERATIONS {
        // f64::max returns the floor for a NaN rate, so a blown-up step restarts at the floor
        rate = rate.max(RATE_FLOOR);
        let (npv, dnpv) = npv_and_derivative(&points, rate);

        if dnpv.abs() < DERIVATIVE_EPSILON {
            log::debug!("IRR: derivative vanished at r={} after {} iterations", rate, iteration);
            return Some(solution(rate, iteration, Termination::FlatDerivative));
        }

        let new_rate = rate - npv / dnpv;

        if (new_rate - rate).abs() <= TOLERANCE {
            return Some(solution(new_rate, iteration, Termination::Converged));
        }

        rate = new_rate;
    }

    log::debug!("IRR: no convergence in {} iterations, last r={}", MAX_ITERATIONS, rate);
    if !rate.is_finite() {
        log::debug!("IRR: last estimate is non-finite; returned without a convergence signal");
    }
    Some(solution(rate, MAX_ITERATIONS, Termination::IterationLimit))
}

/// Calculate NPV and its derivative with respect to rate
fn npv_and_derivative(points: &[(f64, f64)], rate: f64) -> (f64, f64) {
    let mut npv = 0.0;
    let mut dnpv = 0.0;

    for &(cf, years) in points {
        npv += cf / (1.0 + rate).powf(years);
        // The base-date term has no rate sensitivity
        if years != 0.0 {
            dnpv -= years * cf / (1.0 + rate).powf(years + 1.0);
        }
    }

    (npv, dnpv)
}

/// NPV of a cashflow series at an annual rate (decimal), discounted to the earliest date
pub fn net_present_value(cashflows: &[Cashflow], rate: f64) -> f64 {
    let Some(base) = cashflows.iter().map(|cf| cf.date).min() else {
        return 0.0;
    };

    cashflows
        .iter()
        .map(|cf| cf.amount / (1.0 + rate).powf(years_between(base, cf.date)))
        .sum()
}

/// IRR of a position's ledger with convergence diagnostics
pub fn solve_internal_rate_of_return(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> Option<IrrSolution> {
    let cashflows = classify_cashflows(transactions, options);
    solve_irr(&cashflows)
}

/// Annualized IRR of a position's ledger as a percentage, or None if undefined.
///
/// A non-converged estimate is returned as a plain number; use
/// [`solve_internal_rate_of_return`] to see how the solver terminated.
pub fn calculate_internal_rate_of_return(
    transactions: &[Transaction],
    options: &PerformanceOptions,
) -> Option<f64> {
    solve_internal_rate_of_return(transactions, options).map(|s| s.rate_pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{parse_timestamp, TransactionType};
    use approx::assert_abs_diff_eq;

    fn tx(kind: TransactionType, amount: f64, date: &str) -> Transaction {
        Transaction::new(kind, amount, date)
    }

    fn no_options() -> PerformanceOptions {
        PerformanceOptions::default()
    }

    #[test]
    fn test_break_even() {
        // 2023 is not a leap year: exactly 365 days apart
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "2023-01-01"),
            tx(TransactionType::Distribution, 100.0, "2024-01-01"),
        ];
        let irr = calculate_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert_abs_diff_eq!(irr, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_simple_irr() {
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "2023-01-01"),
            tx(TransactionType::Distribution, 110.0, "2024-01-01"),
        ];
        let solution = solve_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert!(solution.converged());
        assert_abs_diff_eq!(solution.rate_pct, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_irr_from_below_guess() {
        // 100 -> 105 over one year converges from the 10% guess
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "2023-01-01"),
            tx(TransactionType::Distribution, 105.0, "2024-01-01"),
        ];
        let irr = calculate_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert_abs_diff_eq!(irr, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_two_year_compounding() {
        // 100 -> 121 over 730 days is 10% a year compounded
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "2021-01-01"),
            tx(TransactionType::Distribution, 121.0, "2023-01-01"),
        ];
        let irr = calculate_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert_abs_diff_eq!(irr, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_interest_and_fees_count() {
        // Interest in, fee out, principal back; the solution zeroes NPV
        let txs = vec![
            tx(TransactionType::Contribution, 1000.0, "2023-01-01"),
            tx(TransactionType::Interest, 30.0, "2023-07-01"),
            tx(TransactionType::Fee, 5.0, "2023-10-01"),
            tx(TransactionType::Interest, 30.0, "2024-01-01"),
            tx(TransactionType::Distribution, 1000.0, "2024-01-01"),
        ];
        let cashflows = classify_cashflows(&txs, &no_options());
        let solution = solve_irr(&cashflows).unwrap();
        assert!(solution.converged());
        assert!(solution.rate_pct > 5.0 && solution.rate_pct < 6.0);
        assert_abs_diff_eq!(
            net_present_value(&cashflows, solution.rate_pct / 100.0),
            0.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_no_sign_change_is_undefined() {
        let outflows = vec![
            tx(TransactionType::Contribution, 100.0, "2023-01-01"),
            tx(TransactionType::Fee, 5.0, "2023-06-01"),
        ];
        assert!(calculate_internal_rate_of_return(&outflows, &no_options()).is_none());

        let inflows = vec![
            tx(TransactionType::Distribution, 100.0, "2023-01-01"),
            tx(TransactionType::Interest, 5.0, "2023-06-01"),
        ];
        assert!(calculate_internal_rate_of_return(&inflows, &no_options()).is_none());
    }

    #[test]
    fn test_empty_is_undefined() {
        assert!(calculate_internal_rate_of_return(&[], &no_options()).is_none());
    }

    #[test]
    fn test_only_dropped_rows_is_undefined() {
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "bad-date"),
            tx(TransactionType::Distribution, f64::NAN, "2024-01-01"),
        ];
        assert!(calculate_internal_rate_of_return(&txs, &no_options()).is_none());
    }

    #[test]
    fn test_ending_value_supplies_sign_change() {
        let as_of = parse_timestamp("2024-01-01").unwrap();
        let txs = vec![tx(TransactionType::Contribution, 100.0, "2023-01-01")];
        let options = PerformanceOptions::with_ending_value(110.0).as_of(as_of);

        let irr = calculate_internal_rate_of_return(&txs, &options).unwrap();
        assert_abs_diff_eq!(irr, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn test_flat_derivative_bails_out_at_guess() {
        // Everything on the base date: f'(r) is identically zero
        let txs = vec![
            tx(TransactionType::Contribution, 100.0, "2023-01-01"),
            tx(TransactionType::Distribution, 50.0, "2023-01-01"),
        ];
        let solution = solve_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert_eq!(solution.termination, Termination::FlatDerivative);
        assert_eq!(solution.iterations, 1);
        assert!(!solution.converged());
        assert_abs_diff_eq!(solution.rate_pct, INITIAL_GUESS * 100.0, epsilon = 1e-12);

        // The plain API still reports a number
        assert!(calculate_internal_rate_of_return(&txs, &no_options()).is_some());
    }

    #[test]
    fn test_total_loss_hits_rate_floor() {
        // A tiny recovery after a full year drives r toward -100%
        let txs = vec![
            tx(TransactionType::Contribution, 1000.0, "2023-01-01"),
            tx(TransactionType::Distribution, 1e-9, "2024-01-01"),
        ];
        let solution = solve_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert!(solution.rate_pct.is_finite());
        assert!(solution.rate_pct > -100.001);
        assert!(solution.rate_pct < -99.0);
    }

    #[test]
    fn test_iteration_limit_returns_last_estimate() {
        // Over 40 years the discount factor underflows near the floor and every
        // step after the first overshoot is NaN, so the tolerance is never met
        let txs = vec![
            tx(TransactionType::Contribution, 1000.0, "2023-01-01"),
            tx(TransactionType::Distribution, 1e-9, "2063-01-01"),
        ];
        let solution = solve_internal_rate_of_return(&txs, &no_options()).unwrap();
        assert_eq!(solution.termination, Termination::IterationLimit);
        assert_eq!(solution.iterations, MAX_ITERATIONS);
        assert!(!solution.converged());
        assert!(solution.rate_pct.is_nan());

        // Non-convergence is not signalled through the plain API
        assert!(calculate_internal_rate_of_return(&txs, &no_options()).is_some());
    }

    #[test]
    fn test_input_order_irrelevant() {
        let forward = vec![
            tx(TransactionType::Contribution, 500.0, "2022-03-01"),
            tx(TransactionType::Interest, 12.0, "2022-09-01"),
            tx(TransactionType::Distribution, 530.0, "2023-03-01"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = calculate_internal_rate_of_return(&forward, &no_options());
        let b = calculate_internal_rate_of_return(&reversed, &no_options());
        assert_eq!(a, b);
        assert_eq!(a, calculate_internal_rate_of_return(&forward, &no_options()));
    }

    #[test]
    fn test_net_present_value() {
        let cfs = classify_cashflows(
            &[
                tx(TransactionType::Contribution, 100.0, "2023-01-01"),
                tx(TransactionType::Distribution, 110.0, "2024-01-01"),
            ],
            &no_options(),
        );
        assert_abs_diff_eq!(net_present_value(&cfs, 0.0), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(net_present_value(&cfs, 0.10), 0.0, epsilon = 1e-12);
        assert_eq!(net_present_value(&[], 0.10), 0.0);
    }
}
