//! Study runner: wires loading, cleaning, alignment and rendering.
//!
//! Strictly sequential and all-or-nothing: the first error aborts the run.
//! Empty joins and log-scale violations are detected before any image is
//! written.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use eventwin_core::{
    align_series, clean_table, load_raw, AlignError, AlignedTable, AssetSeries, EventMarker,
    FormatError, LoadError, Study, StudyError,
};

use crate::export::write_aligned_csv;
use crate::render::{prepare_log_series, render_pairplot, render_timeseries, RenderError};

/// Errors from running a study.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid study: {0}")]
    Study(#[from] StudyError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Align(#[from] AlignError),
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize run manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error(transparent)]
    Export(#[from] anyhow::Error),
}

/// Where to read inputs and write outputs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Relative asset files resolve against this directory.
    pub data_dir: PathBuf,
    /// Relative chart paths and the manifest resolve against this directory.
    pub output_dir: PathBuf,
    /// Also write the aligned table as CSV.
    pub export_aligned: Option<PathBuf>,
    pub write_manifest: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            export_aligned: None,
            write_manifest: true,
        }
    }
}

/// Per-asset facts for the report.
#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub label: String,
    pub source: PathBuf,
    pub rows: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub min_close: Option<f64>,
    pub max_close: Option<f64>,
}

impl AssetSummary {
    pub fn from_series(series: &AssetSeries, source: &Path) -> Self {
        let range = series.close_range();
        Self {
            label: series.label.clone(),
            source: source.to_path_buf(),
            rows: series.len(),
            first: series.first_timestamp(),
            last: series.last_timestamp(),
            min_close: range.map(|r| r.0),
            max_close: range.map(|r| r.1),
        }
    }
}

/// Outcome of a successful run, also persisted as the run manifest.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub study: String,
    pub assets: Vec<AssetSummary>,
    pub aligned_rows: usize,
    pub markers: Vec<EventMarker>,
    pub skipped_points: usize,
    pub timeseries_chart: PathBuf,
    pub pairplot_chart: PathBuf,
    pub aligned_csv: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    /// BLAKE3 over labels, timestamps and closes of every cleaned series.
    pub dataset_hash: String,
}

/// Load and clean every asset of the study, in study order.
pub fn load_study_series(
    study: &Study,
    data_dir: &Path,
) -> Result<Vec<(AssetSeries, PathBuf)>, PipelineError> {
    let mut out = Vec::with_capacity(study.assets.len());
    for asset in &study.assets {
        let path = study.asset_path(asset, data_dir);
        debug!(asset = %asset.label, path = %path.display(), "loading");
        let raw = load_raw(&path, &study.input)?;
        let series = clean_table(&raw, &asset.label, &study.input)?.into_series();
        info!(
            asset = %asset.label,
            rows = series.len(),
            "loaded price history"
        );
        out.push((series, path));
    }
    Ok(out)
}

/// Deterministic hash over the cleaned data, in study order.
pub fn dataset_hash(series: &[AssetSeries]) -> String {
    let mut hasher = blake3::Hasher::new();
    for s in series {
        hasher.update(s.label.as_bytes());
        for p in &s.points {
            hasher.update(&p.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(&p.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Path of the manifest for a study under `output_dir`.
pub fn manifest_path(study: &Study, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}_manifest.json", study.name))
}

/// Run a study end to end: load → clean → align → render → manifest.
pub fn run_study(study: &Study, opts: &RunOptions) -> Result<RunReport, PipelineError> {
    study.validate()?;
    let span = tracing::info_span!("study", name = %study.name);
    let _guard = span.enter();

    let loaded = load_study_series(study, &opts.data_dir)?;
    let summaries: Vec<AssetSummary> = loaded
        .iter()
        .map(|(s, path)| AssetSummary::from_series(s, path))
        .collect();
    let series: Vec<AssetSeries> = loaded.into_iter().map(|(s, _)| s).collect();

    let table: AlignedTable = align_series(&series)?;
    info!(rows = table.row_count(), "aligned assets on timestamp");

    // Fail before writing anything.
    if table.is_empty() {
        return Err(RenderError::JoinEmpty.into());
    }
    prepare_log_series(&series, study.non_positive)?;

    // The manifest lands here even when the charts are written elsewhere.
    if opts.write_manifest {
        std::fs::create_dir_all(&opts.output_dir).map_err(|source| PipelineError::Io {
            path: opts.output_dir.clone(),
            source,
        })?;
    }

    let outputs = study.output_paths(&opts.output_dir);
    let ts = render_timeseries(study, &series, &outputs.timeseries)?;
    info!(path = %ts.path.display(), "wrote time-series chart");
    let pairplot = render_pairplot(study, &table, &outputs.pairplot)?;
    info!(path = %pairplot.display(), "wrote scatterplot matrix");

    let aligned_csv = match &opts.export_aligned {
        Some(path) => {
            write_aligned_csv(&table, path)?;
            info!(path = %path.display(), "exported aligned table");
            Some(path.clone())
        }
        None => None,
    };

    let mut report = RunReport {
        study: study.name.clone(),
        assets: summaries,
        aligned_rows: table.row_count(),
        markers: ts.markers,
        skipped_points: ts.skipped_points,
        timeseries_chart: ts.path,
        pairplot_chart: pairplot,
        aligned_csv,
        manifest: None,
        dataset_hash: dataset_hash(&series),
    };

    if opts.write_manifest {
        let path = manifest_path(study, &opts.output_dir);
        report.manifest = Some(path.clone());
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote run manifest");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use eventwin_core::PricePoint;

    fn series(label: &str, closes: &[f64]) -> AssetSeries {
        let start = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
        AssetSeries::new(
            label,
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    timestamp: start + Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn dataset_hash_is_deterministic_and_content_sensitive() {
        let a = vec![series("A", &[1.0, 2.0]), series("B", &[3.0])];
        let b = vec![series("A", &[1.0, 2.0]), series("B", &[3.0])];
        let c = vec![series("A", &[1.0, 2.5]), series("B", &[3.0])];

        assert_eq!(dataset_hash(&a), dataset_hash(&b));
        assert_ne!(dataset_hash(&a), dataset_hash(&c));
        assert_eq!(dataset_hash(&a).len(), 64);
    }

    #[test]
    fn summary_reports_range_and_dates() {
        let s = series("A", &[5.0, 1.0, 3.0]);
        let summary = AssetSummary::from_series(&s, Path::new("a.csv"));
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.min_close, Some(1.0));
        assert_eq!(summary.max_close, Some(5.0));
        assert_eq!(
            summary.last,
            Some(Utc.with_ymd_and_hms(2022, 3, 3, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_input_aborts_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            data_dir: dir.path().join("data"),
            output_dir: dir.path().join("out"),
            ..RunOptions::default()
        };

        let err = run_study(&Study::counterparty(), &opts).unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::FileNotFound { .. })));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn export_error_keeps_its_source() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let table = AlignedTable {
            labels: vec!["A".into()],
            timestamps: vec![Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap()],
            columns: vec![vec![1.0]],
        };
        let err: PipelineError = write_aligned_csv(&table, &blocker.join("aligned.csv"))
            .unwrap_err()
            .into();

        assert!(matches!(err, PipelineError::Export(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("blocker"));
    }

    #[test]
    fn manifest_path_uses_study_name() {
        assert_eq!(
            manifest_path(&Study::regulatory(), Path::new("out")),
            PathBuf::from("out/regulatory_manifest.json")
        );
    }
}
