//! PNG rendering of the two study charts.
//!
//! - [`timeseries`]: log-scale close prices with dashed event-window markers
//! - [`pairplot`]: scatterplot matrix with histograms on the diagonal
//!
//! Both renderers validate their input before a file is created, so a
//! rejected render never leaves a blank image behind.

pub mod histogram;
pub mod pairplot;
pub mod timeseries;

pub use histogram::{histogram, sturges_bins, Bin};
pub use pairplot::render_pairplot;
pub use timeseries::{prepare_log_series, render_timeseries, LogSeries, TimeseriesOutcome};

use chrono::{DateTime, Utc};
use eventwin_core::{Rgb, StudyError};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("aligned table is empty: the assets share no timestamps")]
    JoinEmpty,

    #[error("{asset}: close {value} at {timestamp} cannot be drawn on a log scale")]
    NonPositivePrice {
        asset: String,
        timestamp: DateTime<Utc>,
        value: f64,
    },

    #[error("{asset}: no plottable prices")]
    EmptySeries { asset: String },

    #[error("no series to draw")]
    NoSeries,

    #[error(transparent)]
    Style(#[from] StudyError),

    #[error("drawing backend error: {0}")]
    Backend(String),

    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn backend_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Backend(e.to_string())
}

pub(crate) fn to_color(rgb: Rgb) -> RGBColor {
    RGBColor(rgb.0, rgb.1, rgb.2)
}

/// Create the parent directory of an output file if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), RenderError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            std::fs::create_dir_all(dir).map_err(|source| RenderError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Short axis label for a price.
pub fn format_price(v: f64) -> String {
    let a = v.abs();
    if a >= 1_000_000.0 {
        format!("{:.1}M", v / 1_000_000.0)
    } else if a >= 10_000.0 {
        format!("{:.0}k", v / 1_000.0)
    } else if a >= 100.0 {
        format!("{v:.0}")
    } else if a >= 1.0 {
        format!("{v:.2}")
    } else {
        format!("{v:.4}")
    }
}

/// Linear axis range with 5% padding; flat ranges are widened.
pub(crate) fn padded_range(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;
    if lo == hi {
        let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
        return Some((lo - pad, hi + pad));
    }
    let pad = (hi - lo) * 0.05;
    Some((lo - pad, hi + pad))
}

/// Corner of the plotting area a legend box is pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LegendCorner {
    UpperLeft,
    UpperRight,
}

pub(crate) struct LegendEntry {
    pub label: String,
    pub color: RGBColor,
    pub dashed: bool,
}

const LEGEND_SWATCH: i32 = 30;
const LEGEND_PAD: i32 = 10;
const LEGEND_ROW: i32 = 24;

/// Draw a titled legend box inside `plot` (pixel bounds of the plotting
/// area) on the root drawing area.
///
/// Each chart carries two of these, so series labels from plotters'
/// built-in legend are not used.
pub(crate) fn draw_legend<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: (std::ops::Range<i32>, std::ops::Range<i32>),
    corner: LegendCorner,
    title: &str,
    entries: &[LegendEntry],
) -> Result<(), RenderError> {
    let text_style: TextStyle = ("sans-serif", 18).into_font().into();
    let title_style: TextStyle = ("sans-serif", 18)
        .into_font()
        .style(FontStyle::Bold)
        .into();

    let mut text_w = root
        .estimate_text_size(title, &title_style)
        .map_err(backend_err)?
        .0 as i32;
    for entry in entries {
        let (w, _) = root
            .estimate_text_size(&entry.label, &text_style)
            .map_err(backend_err)?;
        text_w = text_w.max(w as i32 + LEGEND_SWATCH + LEGEND_PAD);
    }

    let width = text_w + 2 * LEGEND_PAD;
    let height = LEGEND_ROW * (entries.len() as i32 + 1) + LEGEND_PAD;
    let (xs, ys) = plot;
    let x0 = match corner {
        LegendCorner::UpperLeft => xs.start + LEGEND_PAD,
        LegendCorner::UpperRight => xs.end - LEGEND_PAD - width,
    };
    let y0 = ys.start + LEGEND_PAD;

    root.draw(&Rectangle::new(
        [(x0, y0), (x0 + width, y0 + height)],
        WHITE.mix(0.85).filled(),
    ))
    .map_err(backend_err)?;
    root.draw(&Rectangle::new(
        [(x0, y0), (x0 + width, y0 + height)],
        BLACK.mix(0.3).stroke_width(1),
    ))
    .map_err(backend_err)?;
    root.draw(&Text::new(
        title.to_string(),
        (x0 + LEGEND_PAD, y0 + 4),
        title_style.clone(),
    ))
    .map_err(backend_err)?;

    for (i, entry) in entries.iter().enumerate() {
        let row_top = y0 + LEGEND_ROW * (i as i32 + 1) + 4;
        let mid = row_top + LEGEND_ROW / 2 - 2;
        let sx = x0 + LEGEND_PAD;
        let style = entry.color.stroke_width(2);

        if entry.dashed {
            let mut x = sx;
            while x < sx + LEGEND_SWATCH {
                let end = (x + 6).min(sx + LEGEND_SWATCH);
                root.draw(&PathElement::new(vec![(x, mid), (end, mid)], style))
                    .map_err(backend_err)?;
                x += 10;
            }
        } else {
            root.draw(&PathElement::new(
                vec![(sx, mid), (sx + LEGEND_SWATCH, mid)],
                style,
            ))
            .map_err(backend_err)?;
        }

        root.draw(&Text::new(
            entry.label.clone(),
            (sx + LEGEND_SWATCH + LEGEND_PAD, row_top),
            text_style.clone(),
        ))
        .map_err(backend_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_labels() {
        assert_eq!(format_price(1_260_000.0), "1.3M");
        assert_eq!(format_price(42_892.96), "43k");
        assert_eq!(format_price(3_031.07), "3031");
        assert_eq!(format_price(12.5), "12.50");
        assert_eq!(format_price(0.99981), "0.9998");
    }

    #[test]
    fn padded_range_widens_flat_and_pads_spread() {
        assert_eq!(padded_range(&[5.0, 5.0]), Some((4.75, 5.25)));
        assert_eq!(padded_range(&[0.0]), Some((-1.0, 1.0)));
        assert_eq!(padded_range(&[0.0, 10.0]), Some((-0.5, 10.5)));
        assert_eq!(padded_range(&[]), None);
        assert_eq!(padded_range(&[f64::NAN]), None);
    }

    #[test]
    fn ensure_parent_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/chart.png");
        ensure_parent(&target).unwrap();
        assert!(dir.path().join("a/b").is_dir());
        ensure_parent(Path::new("chart.png")).unwrap();
    }
}
