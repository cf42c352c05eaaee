//! eventwin runner: chart rendering and study orchestration.
//!
//! This crate builds on `eventwin-core` to provide:
//! - Log-scale time-series charts with dashed event-window markers
//! - Scatterplot matrices with histogram diagonals
//! - The end-to-end study runner and its JSON run manifest
//! - CSV export of the aligned table

pub mod export;
pub mod pipeline;
pub mod render;

pub use export::{export_aligned_csv, write_aligned_csv};
pub use pipeline::{
    dataset_hash, load_study_series, manifest_path, run_study, AssetSummary, PipelineError,
    RunOptions, RunReport,
};
pub use render::{
    format_price, histogram, prepare_log_series, render_pairplot, render_timeseries,
    sturges_bins, Bin, LogSeries, RenderError, TimeseriesOutcome,
};
