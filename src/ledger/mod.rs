//! Position ledger data structures and loading

mod data;
pub mod loader;

pub use data::{parse_as_of_date, parse_timestamp, Transaction, TransactionType};
pub use loader::{load_marks, load_marks_from_reader, load_transactions, Mark};
