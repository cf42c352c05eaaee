//! eventwin core: price files, cleaning, timestamp alignment, event windows.
//!
//! This crate holds everything up to (but not including) rendering:
//! - Loading semicolon-delimited price exports into raw string tables
//! - Cleaning close prices and timestamps into typed series
//! - Inner-joining several assets on timestamp
//! - Reference events and their ±N-day marker dates
//! - Study configuration (built-in presets and TOML files)

pub mod data;
pub mod events;
pub mod palette;
pub mod study;

pub use data::{
    align_series, clean_price, clean_table, load_asset, load_raw, parse_timestamp, AlignError,
    AlignedTable, AssetError, AssetSeries, CleanedTable, CsvLayout, FormatError, LoadError,
    PricePoint, RawTable,
};
pub use events::{event_markers, EventMarker, EventOffset, MarkerSide, ReferenceEvent};
pub use palette::Rgb;
pub use study::{
    AssetSpec, ChartSettings, NonPositivePolicy, OutputPaths, Study, StudyError, PRESET_NAMES,
};
