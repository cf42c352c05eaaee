//! Raw loading of delimited price-history exports.
//!
//! CoinMarketCap "historical data" downloads look like:
//!
//! ```text
//! timeOpen;timeClose;timeHigh;timeLow;name;open;high;low;close;volume;marketCap;timestamp
//! "2022-04-30T00:00:00.000Z";"2022-04-30T23:59:59.999Z";...;"$37,714.88";...
//! ```
//!
//! The loader only checks shape (header present, required columns present,
//! rows of equal width). Every field stays a string until cleaning.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from reading a price file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("price file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed price file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("price file {} has no '{column}' column (found: {found})", path.display())]
    MissingColumn {
        path: PathBuf,
        column: String,
        found: String,
    },

    #[error("price file {} contains no data rows", path.display())]
    Empty { path: PathBuf },

    #[error("delimiter {0:?} is not a single-byte ASCII character")]
    InvalidDelimiter(char),
}

/// Column layout of an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvLayout {
    pub delimiter: char,
    pub timestamp_column: String,
    pub price_column: String,
}

impl Default for CsvLayout {
    fn default() -> Self {
        Self {
            delimiter: ';',
            timestamp_column: "timeOpen".into(),
            price_column: "close".into(),
        }
    }
}

impl CsvLayout {
    /// The delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, LoadError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(LoadError::InvalidDelimiter(self.delimiter))
        }
    }
}

/// A price file as read from disk: header names plus string rows.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub source: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Position of a header, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a delimited file into a [`RawTable`].
///
/// Fails if the file is missing, cannot be parsed as delimited text, lacks
/// either of the layout's required columns, or has no data rows.
pub fn load_raw(path: &Path, layout: &CsvLayout) -> Result<RawTable, LoadError> {
    let delimiter = layout.delimiter_byte()?;
    let file = File::open(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let csv_err = |source: csv::Error| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    for required in [&layout.timestamp_column, &layout.price_column] {
        if !headers.iter().any(|h| h == required) {
            return Err(LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: required.clone(),
                found: headers.join(", "),
            });
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(String::from).collect());
    }

    if rows.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    debug!(
        path = %path.display(),
        columns = headers.len(),
        rows = rows.len(),
        "read price file"
    );
    Ok(RawTable {
        source: path.to_path_buf(),
        headers,
        rows,
    })
}
