//! Cleaning of raw price tables into typed columns.
//!
//! Close prices arrive as display strings (`"$1,234.56"`); timestamps as
//! ISO-8601 with or without a zone. Both are parsed per row and the first
//! failure aborts the table.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

use super::loader::{CsvLayout, RawTable};
use super::series::{AssetSeries, PricePoint};

/// A field that could not be parsed. `row` is 1-based over data rows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("{asset}: row {row}: unparseable timestamp {value:?}")]
    Timestamp {
        asset: String,
        row: usize,
        value: String,
    },

    #[error("{asset}: row {row}: unparseable close price {value:?}")]
    Price {
        asset: String,
        row: usize,
        value: String,
    },

    #[error("{asset}: column '{column}' missing from table")]
    MissingColumn { asset: String, column: String },
}

/// Characters removed from a price before numeric parsing.
const PRICE_NOISE: [char; 2] = ['$', ','];

/// Naive layouts tried after RFC 3339. Naive values are taken as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Strip currency symbol and thousands separators, then parse as `f64`.
///
/// Returns `None` for anything that is not a finite number afterwards.
/// Applying this to the `Display` output of a cleaned value returns the same
/// value.
pub fn clean_price(raw: &str) -> Option<f64> {
    let stripped: String = raw.chars().filter(|c| !PRICE_NOISE.contains(c)).collect();
    stripped
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a timestamp in any of the accepted forms, normalized to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// A raw table with typed timestamp and close columns.
///
/// Columns other than the two parsed ones are carried along untouched.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub label: String,
    pub source: PathBuf,
    pub timestamps: Vec<DateTime<Utc>>,
    pub closes: Vec<f64>,
    /// Names of the untouched columns, in file order.
    pub other_headers: Vec<String>,
    /// Untouched column values, one inner Vec per row.
    pub other_values: Vec<Vec<String>>,
}

impl CleanedTable {
    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    /// Value of an untouched column for a row.
    pub fn other(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.other_headers.iter().position(|h| h == column)?;
        self.other_values.get(row)?.get(idx).map(String::as_str)
    }

    /// Drop everything but (timestamp, close) and sort by time.
    pub fn into_series(self) -> AssetSeries {
        let points = self
            .timestamps
            .into_iter()
            .zip(self.closes)
            .map(|(timestamp, close)| PricePoint { timestamp, close })
            .collect();
        AssetSeries::new(self.label, points)
    }
}

/// Clean every row of `raw`, tagging the result with `label`.
pub fn clean_table(
    raw: &RawTable,
    label: &str,
    layout: &CsvLayout,
) -> Result<CleanedTable, FormatError> {
    let missing = |column: &str| FormatError::MissingColumn {
        asset: label.to_string(),
        column: column.to_string(),
    };
    let ts_idx = raw
        .column_index(&layout.timestamp_column)
        .ok_or_else(|| missing(&layout.timestamp_column))?;
    let px_idx = raw
        .column_index(&layout.price_column)
        .ok_or_else(|| missing(&layout.price_column))?;

    let other_idx: Vec<usize> = (0..raw.headers.len())
        .filter(|i| *i != ts_idx && *i != px_idx)
        .collect();

    let mut timestamps = Vec::with_capacity(raw.len());
    let mut closes = Vec::with_capacity(raw.len());
    let mut other_values = Vec::with_capacity(raw.len());

    for (i, row) in raw.rows.iter().enumerate() {
        let field = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");

        let ts_raw = field(ts_idx);
        let ts = parse_timestamp(ts_raw).ok_or_else(|| FormatError::Timestamp {
            asset: label.to_string(),
            row: i + 1,
            value: ts_raw.to_string(),
        })?;

        let px_raw = field(px_idx);
        let close = clean_price(px_raw).ok_or_else(|| FormatError::Price {
            asset: label.to_string(),
            row: i + 1,
            value: px_raw.to_string(),
        })?;

        timestamps.push(ts);
        closes.push(close);
        other_values.push(other_idx.iter().map(|&j| field(j).to_string()).collect());
    }

    Ok(CleanedTable {
        label: label.to_string(),
        source: raw.source.clone(),
        timestamps,
        closes,
        other_headers: other_idx.iter().map(|&j| raw.headers[j].clone()).collect(),
        other_values,
    })
}
