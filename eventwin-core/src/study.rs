//! Study configuration: which assets to load, which events to mark, where
//! to write the charts.
//!
//! A study is either one of the built-in presets or a TOML file:
//!
//! ```toml
//! name = "regulatory"
//! reference_dates = ["2023-04-20", "2023-06-05", "2024-01-10"]
//!
//! [[assets]]
//! label = "Bitcoin"
//! file = "Bitcoin_2023_2_1-2024_1_31_historical_data_coinmarketcap.csv"
//! color = "orange"
//!
//! [[offsets]]
//! days = 7
//! color = "red"
//!
//! [output]
//! timeseries = "Crypto_Prices_Log_Scale_Combined.png"
//! pairplot = "Regu_Close_Pairplot.png"
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::CsvLayout;
use crate::events::{EventOffset, ReferenceEvent};
use crate::palette::Rgb;

/// Names accepted by [`Study::preset`].
pub const PRESET_NAMES: [&str; 3] = ["counterparty", "cybersecurity_operational", "regulatory"];

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("failed to read study file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse study TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown preset '{0}' (valid: counterparty, cybersecurity_operational, regulatory)")]
    UnknownPreset(String),

    #[error("study '{0}' has no assets")]
    NoAssets(String),

    #[error("study '{0}' has no reference dates")]
    NoReferenceDates(String),

    #[error("asset label '{0}' is used more than once")]
    DuplicateLabel(String),

    #[error("offset must be at least one day (got {0})")]
    InvalidOffset(u32),

    #[error("unrecognized color '{0}' (use a name like 'red' or '#rrggbb')")]
    InvalidColor(String),

    #[error("image size {0}x{1} is too small")]
    InvalidSize(u32, u32),
}

/// Action taken on zero or negative prices when drawing on a log axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonPositivePolicy {
    /// Fail the render.
    #[default]
    Reject,
    /// Drop the offending points and log a warning.
    Skip,
}

/// One asset: legend label, input file, optional line color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub label: String,
    pub file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl AssetSpec {
    pub fn new(label: &str, file: &str, color: Option<&str>) -> Self {
        Self {
            label: label.into(),
            file: file.into(),
            color: color.map(String::from),
        }
    }
}

/// Text and size of both charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub asset_legend_title: String,
    pub offset_legend_title: String,
    pub pairplot_title: String,
    pub width: u32,
    pub height: u32,
    /// Side length of one scatterplot-matrix cell, in pixels.
    pub pairplot_cell: u32,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            title: "Historical Close Prices (Log Scale)".into(),
            x_label: "Date".into(),
            y_label: "Close Price (USD, log scale)".into(),
            asset_legend_title: "Assets".into(),
            offset_legend_title: "Event Windows".into(),
            pairplot_title: "Pairwise Scatter & Marginal Histograms of Close Prices".into(),
            width: 1800,
            height: 900,
            pairplot_cell: 320,
        }
    }
}

/// Output image paths. Relative paths resolve against the output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub timeseries: PathBuf,
    pub pairplot: PathBuf,
}

/// A complete, runnable study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    pub name: String,
    pub reference_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub non_positive: NonPositivePolicy,
    pub assets: Vec<AssetSpec>,
    #[serde(default = "default_offsets")]
    pub offsets: Vec<EventOffset>,
    pub output: OutputPaths,
    #[serde(default)]
    pub chart: ChartSettings,
    #[serde(default)]
    pub input: CsvLayout,
}

fn default_offsets() -> Vec<EventOffset> {
    vec![EventOffset::new(7, "red"), EventOffset::new(14, "green")]
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("preset dates are valid")
}

impl Study {
    /// Load a study from a TOML file and validate it.
    pub fn from_file(path: &Path) -> Result<Self, StudyError> {
        let content = std::fs::read_to_string(path).map_err(|source| StudyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a study from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, StudyError> {
        let study: Study = toml::from_str(content)?;
        study.validate()?;
        Ok(study)
    }

    /// One of the built-in studies.
    pub fn preset(name: &str) -> Result<Self, StudyError> {
        match name {
            "counterparty" => Ok(Self::counterparty()),
            "cybersecurity_operational" => Ok(Self::cybersecurity_operational()),
            "regulatory" => Ok(Self::regulatory()),
            other => Err(StudyError::UnknownPreset(other.to_string())),
        }
    }

    /// Counterparty risk: BTC and ETH through 2025.
    pub fn counterparty() -> Self {
        let file = |asset: &str| {
            format!("{asset}_2025_1_1-2025_10_26_historical_data_coinmarketcap.csv")
        };
        Self {
            name: "counterparty".into(),
            reference_dates: vec![ymd(2025, 5, 31), ymd(2025, 10, 10)],
            non_positive: NonPositivePolicy::Reject,
            assets: vec![
                AssetSpec::new("Bitcoin", &file("Bitcoin"), Some("orange")),
                AssetSpec::new("Ethereum", &file("Ethereum"), Some("dodgerblue")),
            ],
            offsets: default_offsets(),
            output: OutputPaths {
                timeseries: "CounterpartyRisk_Close_Log.png".into(),
                pairplot: "CounterpartyRisk_Close_Pairplot.png".into(),
            },
            chart: ChartSettings {
                title: "Counterparty Risk: Historical Close Prices (Log Scale)".into(),
                ..ChartSettings::default()
            },
            input: CsvLayout::default(),
        }
    }

    /// Cybersecurity/operational risk: four majors, mid-2021 to spring 2022.
    pub fn cybersecurity_operational() -> Self {
        let file =
            |asset: &str| format!("{asset}_2021_7_1-2022_4_30_historical_data_coinmarketcap.csv");
        Self {
            name: "cybersecurity_operational".into(),
            reference_dates: vec![ymd(2022, 3, 23), ymd(2021, 8, 10)],
            non_positive: NonPositivePolicy::Reject,
            assets: ["Bitcoin", "Ethereum", "Solana", "Litecoin"]
                .iter()
                .map(|a| AssetSpec::new(a, &file(a), None))
                .collect(),
            offsets: default_offsets(),
            output: OutputPaths {
                timeseries: "historical_close_log.png".into(),
                pairplot: "crypto_close_prices_pairplot.png".into(),
            },
            chart: ChartSettings {
                title: "Historical Close Prices (log scale) & ±7/14-day Markers".into(),
                asset_legend_title: "Cryptocurrencies".into(),
                offset_legend_title: "Offsets".into(),
                ..ChartSettings::default()
            },
            input: CsvLayout::default(),
        }
    }

    /// Regulatory events: BTC, ETH and PAX Gold, Feb 2023 to Jan 2024.
    pub fn regulatory() -> Self {
        let file =
            |asset: &str| format!("{asset}_2023_2_1-2024_1_31_historical_data_coinmarketcap.csv");
        Self {
            name: "regulatory".into(),
            reference_dates: vec![ymd(2023, 4, 20), ymd(2023, 6, 5), ymd(2024, 1, 10)],
            non_positive: NonPositivePolicy::Reject,
            assets: vec![
                AssetSpec::new("Bitcoin", &file("Bitcoin"), Some("orange")),
                AssetSpec::new("Ethereum", &file("Ethereum"), Some("dodgerblue")),
                AssetSpec::new("PAXGold", &file("PAX Gold"), Some("seagreen")),
            ],
            offsets: default_offsets(),
            output: OutputPaths {
                timeseries: "Crypto_Prices_Log_Scale_Combined.png".into(),
                pairplot: "Regu_Close_Pairplot.png".into(),
            },
            chart: ChartSettings {
                title: "Historical Close Prices of Major Assets (Logarithmic Scale)".into(),
                y_label: "Price (USD) - Log Scale".into(),
                width: 2000,
                height: 1060,
                ..ChartSettings::default()
            },
            input: CsvLayout::default(),
        }
    }

    /// Check the study is runnable before any file is touched.
    pub fn validate(&self) -> Result<(), StudyError> {
        if self.assets.is_empty() {
            return Err(StudyError::NoAssets(self.name.clone()));
        }
        if self.reference_dates.is_empty() {
            return Err(StudyError::NoReferenceDates(self.name.clone()));
        }

        let mut labels = HashSet::new();
        for asset in &self.assets {
            if !labels.insert(asset.label.as_str()) {
                return Err(StudyError::DuplicateLabel(asset.label.clone()));
            }
            if let Some(color) = &asset.color {
                check_color(color)?;
            }
        }

        for offset in &self.offsets {
            if offset.days == 0 {
                return Err(StudyError::InvalidOffset(offset.days));
            }
            check_color(&offset.color)?;
        }

        if self.chart.width < 200 || self.chart.height < 150 {
            return Err(StudyError::InvalidSize(self.chart.width, self.chart.height));
        }
        if self.chart.pairplot_cell < 80 {
            return Err(StudyError::InvalidSize(
                self.chart.pairplot_cell,
                self.chart.pairplot_cell,
            ));
        }
        Ok(())
    }

    /// Reference events built from the study's dates and shared offsets.
    pub fn events(&self) -> Vec<ReferenceEvent> {
        self.reference_dates
            .iter()
            .map(|d| ReferenceEvent::new(*d, self.offsets.clone()))
            .collect()
    }

    /// Line color for the asset at `index`: explicit, else the default cycle.
    pub fn asset_color(&self, index: usize) -> Result<Rgb, StudyError> {
        match self.assets.get(index).and_then(|a| a.color.as_deref()) {
            Some(name) => check_color(name),
            None => Ok(Rgb::cycle(index)),
        }
    }

    /// Input path of an asset, resolved against `data_dir`.
    pub fn asset_path(&self, asset: &AssetSpec, data_dir: &Path) -> PathBuf {
        data_dir.join(&asset.file)
    }

    /// Both output paths, resolved against `output_dir`.
    pub fn output_paths(&self, output_dir: &Path) -> OutputPaths {
        OutputPaths {
            timeseries: output_dir.join(&self.output.timeseries),
            pairplot: output_dir.join(&self.output.pairplot),
        }
    }
}

fn check_color(name: &str) -> Result<Rgb, StudyError> {
    Rgb::parse(name).ok_or_else(|| StudyError::InvalidColor(name.to_string()))
}
