//! Price data: raw loading, cleaning, and multi-asset alignment.

pub mod align;
pub mod clean;
pub mod loader;
pub mod series;

pub use align::{align_series, AlignError, AlignedTable};
pub use clean::{clean_price, clean_table, parse_timestamp, CleanedTable, FormatError};
pub use loader::{load_raw, CsvLayout, LoadError, RawTable};
pub use series::{AssetSeries, PricePoint};

use std::path::Path;
use thiserror::Error;

/// Either stage of reading one asset file can fail.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Load and clean one asset file into a time-sorted series.
pub fn load_asset(path: &Path, label: &str, layout: &CsvLayout) -> Result<AssetSeries, AssetError> {
    let raw = load_raw(path, layout)?;
    let cleaned = clean_table(&raw, label, layout)?;
    Ok(cleaned.into_series())
}
