//! Investor Performance - return metrics for investment positions
//!
//! This library provides:
//! - Position ledger loading (CSV / JSON) and ending-value marks
//! - Cashflow classification with investor-perspective signs
//! - Internal Rate of Return (Newton-Raphson, actual/365)
//! - Time-Weighted Return (NAV simulation, chain-linked periods)
//! - Per-position batch reports across a whole ledger

pub mod error;
pub mod ledger;
pub mod performance;

// Re-export commonly used types
pub use error::{Error, Result};
pub use ledger::{Mark, Transaction, TransactionType};
pub use performance::{
    calculate_internal_rate_of_return, calculate_time_weighted_return, PerformanceOptions,
    PositionReport,
};
