//! eventwin CLI: run event-window studies and inspect price files.
//!
//! Commands:
//! - `run`: load, align and chart a study from a preset or TOML file
//! - `presets`: list the built-in studies
//! - `inspect`: clean one price file and report its coverage

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use eventwin_core::{load_asset, CsvLayout, NonPositivePolicy, Study, PRESET_NAMES};
use eventwin_runner::{run_study, RunOptions, RunReport};

#[derive(Parser)]
#[command(
    name = "eventwin",
    about = "Event-window price charts for crypto and commodity exports"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a study and write its charts.
    Run {
        /// Built-in study name (see `eventwin presets`).
        #[arg(long)]
        preset: Option<String>,

        /// Path to a TOML study file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory holding the price exports.
        #[arg(long, default_value = ".")]
        data_dir: PathBuf,

        /// Directory for charts and the run manifest.
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Also write the aligned close table to this CSV file.
        #[arg(long)]
        export_aligned: Option<PathBuf>,

        /// Drop zero or negative closes from the log chart instead of failing.
        #[arg(long, default_value_t = false)]
        skip_non_positive: bool,

        /// Do not write the JSON run manifest.
        #[arg(long, default_value_t = false)]
        no_manifest: bool,
    },
    /// List the built-in studies.
    Presets,
    /// Load and clean a single price file, then summarize it.
    Inspect {
        /// Price export to read.
        file: PathBuf,

        /// Asset label. Defaults to the file stem.
        #[arg(long)]
        label: Option<String>,

        /// Field delimiter.
        #[arg(long, default_value_t = ';')]
        delimiter: char,

        /// Timestamp column name.
        #[arg(long, default_value = "timeOpen")]
        timestamp_column: String,

        /// Close price column name.
        #[arg(long, default_value = "close")]
        price_column: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            preset,
            config,
            data_dir,
            output_dir,
            export_aligned,
            skip_non_positive,
            no_manifest,
        } => run_cmd(
            preset,
            config,
            RunOptions {
                data_dir,
                output_dir,
                export_aligned,
                write_manifest: !no_manifest,
            },
            skip_non_positive,
        ),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
        Commands::Inspect {
            file,
            label,
            delimiter,
            timestamp_column,
            price_column,
        } => inspect_cmd(
            &file,
            label,
            CsvLayout {
                delimiter,
                timestamp_column,
                price_column,
            },
        ),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(
    preset: Option<String>,
    config: Option<PathBuf>,
    opts: RunOptions,
    skip_non_positive: bool,
) -> Result<()> {
    let mut study = match (preset, config) {
        (Some(_), Some(_)) => bail!("--preset and --config are mutually exclusive"),
        (None, None) => bail!("one of --preset or --config is required"),
        (Some(name), None) => Study::preset(&name)
            .with_context(|| format!("available presets: {}", PRESET_NAMES.join(", ")))?,
        (None, Some(path)) => Study::from_file(&path)
            .with_context(|| format!("failed to load study from {}", path.display()))?,
    };
    if skip_non_positive {
        study.non_positive = NonPositivePolicy::Skip;
    }
    debug!(study = %study.name, assets = study.assets.len(), "resolved study");

    let report = run_study(&study, &opts)
        .with_context(|| format!("study '{}' failed", study.name))?;
    print_summary(&report);
    Ok(())
}

fn list_presets() {
    for name in PRESET_NAMES {
        let Ok(study) = Study::preset(name) else {
            continue;
        };
        let dates: Vec<String> = study
            .reference_dates
            .iter()
            .map(|d| d.to_string())
            .collect();
        let assets: Vec<&str> = study.assets.iter().map(|a| a.label.as_str()).collect();
        println!("{name}");
        println!("  Assets:   {}", assets.join(", "));
        println!("  Events:   {}", dates.join(", "));
        println!(
            "  Charts:   {}, {}",
            study.output.timeseries.display(),
            study.output.pairplot.display()
        );
    }
}

fn inspect_cmd(file: &Path, label: Option<String>, layout: CsvLayout) -> Result<()> {
    let label = label.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "asset".to_string())
    });
    let series = load_asset(file, &label, &layout)
        .with_context(|| format!("failed to inspect {}", file.display()))?;

    println!();
    println!("=== {} ===", series.label);
    println!("File:           {}", file.display());
    println!("Rows:           {}", series.len());
    if let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) {
        println!(
            "Period:         {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        );
    }
    if let Some((lo, hi)) = series.close_range() {
        println!("Min Close:      {lo:.2}");
        println!("Max Close:      {hi:.2}");
    }
    let non_positive = series.points.iter().filter(|p| p.close <= 0.0).count();
    if non_positive > 0 {
        println!("WARNING: {non_positive} non-positive closes (not drawable on a log axis)");
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== Study: {} ===", report.study);
    for asset in &report.assets {
        let period = match (asset.first, asset.last) {
            (Some(first), Some(last)) => format!(
                "{} to {}",
                first.format("%Y-%m-%d"),
                last.format("%Y-%m-%d")
            ),
            _ => "-".to_string(),
        };
        println!("{:<16}{} rows, {}", asset.label, asset.rows, period);
    }
    println!("Aligned Rows:   {}", report.aligned_rows);
    println!("Markers:        {}", report.markers.len());
    if report.skipped_points > 0 {
        println!("Skipped Points: {}", report.skipped_points);
    }
    println!("Dataset Hash:   {}", &report.dataset_hash[..16]);
    println!();
    println!("--- Outputs ---");
    println!("Time Series:    {}", report.timeseries_chart.display());
    println!("Pair Plot:      {}", report.pairplot_chart.display());
    if let Some(path) = &report.aligned_csv {
        println!("Aligned CSV:    {}", path.display());
    }
    if let Some(path) = &report.manifest {
        println!("Manifest:       {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_preset() {
        let cli = Cli::try_parse_from([
            "eventwin",
            "run",
            "--preset",
            "regulatory",
            "--data-dir",
            "data",
            "--skip-non-positive",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                preset,
                data_dir,
                skip_non_positive,
                ..
            } => {
                assert_eq!(preset.as_deref(), Some("regulatory"));
                assert_eq!(data_dir, PathBuf::from("data"));
                assert!(skip_non_positive);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn run_requires_exactly_one_source() {
        let err = run_cmd(None, None, RunOptions::default(), false).unwrap_err();
        assert!(err.to_string().contains("required"));

        let err = run_cmd(
            Some("counterparty".into()),
            Some(PathBuf::from("study.toml")),
            RunOptions::default(),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn unknown_preset_is_reported() {
        let err = run_cmd(Some("nope".into()), None, RunOptions::default(), false).unwrap_err();
        assert!(format!("{err:#}").contains("counterparty"));
    }

    #[test]
    fn inspect_defaults_to_semicolon_layout() {
        let cli = Cli::try_parse_from(["eventwin", "inspect", "btc.csv"]).unwrap();
        match cli.command {
            Commands::Inspect {
                delimiter,
                timestamp_column,
                ..
            } => {
                assert_eq!(delimiter, ';');
                assert_eq!(timestamp_column, "timeOpen");
            }
            _ => panic!("expected inspect"),
        }
    }
}
