//! Load position ledgers and ending-value marks from CSV or JSON
//!
//! Rows that cannot be decoded at all (missing `type` or `date` column,
//! wrong shape) are logged and skipped so one bad row does not sink the
//! whole ledger. Row-level value problems (bad amount, bad date) are left
//! for the solvers to handle with their own policies.

use super::{parse_as_of_date, Transaction};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Ending value for a position, used as the terminal cashflow / final mark
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub position_id: String,
    pub ending_value: f64,
    pub as_of_date: Option<DateTime<Utc>>,
}

/// Raw CSV row for a mark file: `positionId,endingValue,asOfDate`
#[derive(Debug, serde::Deserialize)]
struct MarkRow {
    #[serde(rename = "positionId", alias = "position_id")]
    position_id: String,
    #[serde(rename = "endingValue", alias = "ending_value")]
    ending_value: f64,
    #[serde(rename = "asOfDate", alias = "as_of_date", default)]
    as_of_date: Option<String>,
}

impl MarkRow {
    fn to_mark(self) -> Result<Mark> {
        let as_of_date = match self.as_of_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_as_of_date(raw)?),
        };

        Ok(Mark {
            position_id: self.position_id,
            ending_value: self.ending_value,
            as_of_date,
        })
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a ledger file, choosing the decoder from the file extension
pub fn load_transactions<P: AsRef<Path>>(path: P) -> Result<Vec<Transaction>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let transactions = match extension.as_deref() {
        Some("csv") => load_transactions_from_csv_reader(open(path)?)?,
        Some("json") => load_transactions_from_json_reader(open(path)?)?,
        _ => return Err(Error::UnsupportedFormat(path.to_path_buf())),
    };

    log::info!("Loaded {} transactions from {}", transactions.len(), path.display());
    Ok(transactions)
}

/// Load a CSV ledger from any reader (file, string buffer, network stream)
pub fn load_transactions_from_csv_reader<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut transactions = Vec::new();

    for (row, result) in csv_reader.deserialize::<Transaction>().enumerate() {
        match result {
            Ok(tx) => transactions.push(tx),
            Err(err) if is_row_error(&err) => {
                log::warn!("Skipping ledger row {}: {}", row + 1, err);
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok(transactions)
}

/// Decode failures confined to one record; I/O failures abort the load
fn is_row_error(err: &csv::Error) -> bool {
    matches!(
        err.kind(),
        csv::ErrorKind::Deserialize { .. } | csv::ErrorKind::UnequalLengths { .. }
    )
}

/// Load a JSON ledger: a top-level array of transaction records
pub fn load_transactions_from_json_reader<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let mut transactions = Vec::with_capacity(values.len());

    for (row, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<Transaction>(value) {
            Ok(tx) => transactions.push(tx),
            Err(err) => log::warn!("Skipping ledger record {}: {}", row, err),
        }
    }

    Ok(transactions)
}

/// Load ending-value marks from a CSV file
pub fn load_marks<P: AsRef<Path>>(path: P) -> Result<Vec<Mark>> {
    let path = path.as_ref();
    let marks = load_marks_from_reader(open(path)?)?;
    log::info!("Loaded {} marks from {}", marks.len(), path.display());
    Ok(marks)
}

/// Load ending-value marks from any reader
///
/// Unlike the ledger, a malformed mark is a configuration error and fails the
/// load. So does a second mark for the same position.
pub fn load_marks_from_reader<R: Read>(reader: R) -> Result<Vec<Mark>> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let mut marks = Vec::new();
    let mut seen = HashSet::new();

    for result in csv_reader.deserialize() {
        let row: MarkRow = result?;
        let mark = row.to_mark()?;
        if !seen.insert(mark.position_id.clone()) {
            return Err(Error::DuplicateMark(mark.position_id));
        }
        marks.push(mark);
    }

    Ok(marks)
}
