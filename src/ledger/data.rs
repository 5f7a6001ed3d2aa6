//! Ledger data structures matching the upstream transaction record shape

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Kind of ledger movement on a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum TransactionType {
    /// Capital invested by the investor
    Contribution,
    /// Capital returned to the investor
    Distribution,
    /// Income accrued to the investor
    Interest,
    /// Cost borne by the investor
    Fee,
    /// Anything else; ignored by both solvers
    Unknown,
}

impl TransactionType {
    /// Parse a ledger type label, case-insensitively
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "contribution" => TransactionType::Contribution,
            "distribution" => TransactionType::Distribution,
            "interest" => TransactionType::Interest,
            "fee" => TransactionType::Fee,
            _ => TransactionType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Contribution => "contribution",
            TransactionType::Distribution => "distribution",
            TransactionType::Interest => "interest",
            TransactionType::Fee => "fee",
            TransactionType::Unknown => "unknown",
        }
    }
}

impl From<String> for TransactionType {
    fn from(label: String) -> Self {
        TransactionType::parse(&label)
    }
}

/// Amount used when the field is absent or unparseable
fn missing_amount() -> f64 {
    f64::NAN
}

/// A single ledger row for one position, already scoped to one currency
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Magnitude in the position's reporting currency; sign comes from `kind`
    #[serde(default = "missing_amount", deserialize_with = "deserialize_amount")]
    pub amount: f64,

    #[serde(default)]
    pub currency: String,

    /// Raw timestamp; each solver applies its own parse policy
    pub date: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, alias = "position_id")]
    pub position_id: Option<String>,
}

impl Transaction {
    pub fn new(kind: TransactionType, amount: f64, date: impl Into<String>) -> Self {
        Self {
            kind,
            amount,
            currency: String::new(),
            date: date.into(),
            description: None,
            position_id: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_position(mut self, position_id: impl Into<String>) -> Self {
        self.position_id = Some(position_id.into());
        self
    }

    /// Parsed timestamp, or None if the raw date is unusable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.date)
    }
}

/// Parse a ledger timestamp.
///
/// Accepts RFC 3339 (with `Z` or an offset), naive `YYYY-MM-DDTHH:MM:SS`,
/// naive `YYYY-MM-DD HH:MM:SS` and plain `YYYY-MM-DD`. Naive values are
/// taken as UTC; a plain date is midnight UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|dt| dt.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

/// Parse a user-supplied as-of date, rejecting anything unusable
pub fn parse_as_of_date(raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).ok_or_else(|| Error::InvalidAsOfDate(raw.to_string()))
}

/// Accept a number or a numeric string; anything else becomes NaN
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or numeric string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<f64, E> {
            Ok(v.trim().parse::<f64>().unwrap_or(f64::NAN))
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> std::result::Result<f64, E> {
            match std::str::from_utf8(v) {
                Ok(s) => self.visit_str(s),
                Err(_) => Ok(f64::NAN),
            }
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<f64, E> {
            Ok(f64::NAN)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> std::result::Result<f64, D2::Error> {
            d.deserialize_any(AmountVisitor)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_transaction_type_parse() {
        assert_eq!(TransactionType::parse("contribution"), TransactionType::Contribution);
        assert_eq!(TransactionType::parse("Distribution"), TransactionType::Distribution);
        assert_eq!(TransactionType::parse(" INTEREST "), TransactionType::Interest);
        assert_eq!(TransactionType::parse("fee"), TransactionType::Fee);
        assert_eq!(TransactionType::parse("dividend"), TransactionType::Unknown);
        assert_eq!(TransactionType::parse(""), TransactionType::Unknown);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let d = parse_timestamp("2024-01-15").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2024, 1, 15, 0));

        let d = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(d.hour(), 10);

        // Offsets are normalised to UTC
        let d = parse_timestamp("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 8);

        let d = parse_timestamp("2024-01-15 23:59:59").unwrap();
        assert_eq!(d.minute(), 59);

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("2024-13-01").is_none());
    }

    #[test]
    fn test_parse_as_of_date_rejects_garbage() {
        assert!(parse_as_of_date("2024-06-30").is_ok());
        assert!(matches!(parse_as_of_date("yesterday"), Err(Error::InvalidAsOfDate(_))));
    }

    #[test]
    fn test_deserialize_json_record() {
        let json = r#"{
            "type": "Contribution",
            "amount": "1500.25",
            "currency": "EUR",
            "date": "2024-03-01",
            "positionId": "pos-7"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionType::Contribution);
        assert_eq!(tx.amount, 1500.25);
        assert_eq!(tx.currency, "EUR");
        assert_eq!(tx.position_id.as_deref(), Some("pos-7"));
        assert!(tx.description.is_none());
    }

    #[test]
    fn test_bad_amount_becomes_nan() {
        let tx: Transaction =
            serde_json::from_str(r#"{"type": "fee", "amount": "n/a", "date": "2024-03-01"}"#)
                .unwrap();
        assert!(tx.amount.is_nan());

        let tx: Transaction =
            serde_json::from_str(r#"{"type": "fee", "amount": null, "date": "2024-03-01"}"#)
                .unwrap();
        assert!(tx.amount.is_nan());

        let tx: Transaction =
            serde_json::from_str(r#"{"type": "fee", "date": "2024-03-01"}"#).unwrap();
        assert!(tx.amount.is_nan());
    }

    #[test]
    fn test_unknown_type_deserializes() {
        let tx: Transaction =
            serde_json::from_str(r#"{"type": "rebate", "amount": 10, "date": "2024-03-01"}"#)
                .unwrap();
        assert_eq!(tx.kind, TransactionType::Unknown);
        assert_eq!(tx.amount, 10.0);
    }
}
