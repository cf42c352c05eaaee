//! Log-scale close-price chart with event-window markers.

use chrono::{DateTime, Duration, Utc};
use eventwin_core::{event_markers, AssetSeries, EventMarker, NonPositivePolicy, Rgb, Study};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{
    backend_err, draw_legend, ensure_parent, format_price, to_color, LegendCorner, LegendEntry,
    RenderError,
};

/// A series filtered down to points a log axis can show.
#[derive(Debug, Clone)]
pub struct LogSeries {
    pub series: AssetSeries,
    /// Points dropped under [`NonPositivePolicy::Skip`].
    pub skipped: usize,
}

/// What was drawn.
#[derive(Debug, Clone)]
pub struct TimeseriesOutcome {
    pub path: PathBuf,
    pub markers: Vec<EventMarker>,
    pub skipped_points: usize,
}

/// Apply the non-positive policy to every series.
///
/// Zero, negative and non-finite closes fail under `Reject` and are dropped
/// with a warning under `Skip`. A series left with no points is an error
/// either way.
pub fn prepare_log_series(
    series: &[AssetSeries],
    policy: NonPositivePolicy,
) -> Result<Vec<LogSeries>, RenderError> {
    let mut out = Vec::with_capacity(series.len());
    for s in series {
        let mut kept = Vec::with_capacity(s.len());
        let mut skipped = 0;
        for p in &s.points {
            if p.close > 0.0 && p.close.is_finite() {
                kept.push(*p);
                continue;
            }
            match policy {
                NonPositivePolicy::Reject => {
                    return Err(RenderError::NonPositivePrice {
                        asset: s.label.clone(),
                        timestamp: p.timestamp,
                        value: p.close,
                    })
                }
                NonPositivePolicy::Skip => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                asset = %s.label,
                skipped,
                "dropped non-positive closes from log-scale chart"
            );
        }
        if kept.is_empty() {
            return Err(RenderError::EmptySeries {
                asset: s.label.clone(),
            });
        }
        out.push(LogSeries {
            series: AssetSeries {
                label: s.label.clone(),
                points: kept,
            },
            skipped,
        });
    }
    Ok(out)
}

fn time_extent(
    series: &[LogSeries],
    markers: &[EventMarker],
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let stamps = series
        .iter()
        .flat_map(|s| s.series.points.iter().map(|p| p.timestamp))
        .chain(markers.iter().map(EventMarker::timestamp));
    let (lo, hi) = stamps.fold(None, |acc, ts| match acc {
        None => Some((ts, ts)),
        Some((lo, hi)) => Some((ts.min(lo), ts.max(hi))),
    })?;
    if lo == hi {
        return Some((lo - Duration::days(1), hi + Duration::days(1)));
    }
    Some((lo, hi))
}

fn log_extent(series: &[LogSeries]) -> Option<(f64, f64)> {
    let (lo, hi) = series
        .iter()
        .filter_map(|s| s.series.close_range())
        .fold(None, |acc: Option<(f64, f64)>, (lo, hi)| match acc {
            None => Some((lo, hi)),
            Some((a, b)) => Some((a.min(lo), b.max(hi))),
        })?;
    let factor = if lo == hi { 1.5 } else { 1.15 };
    Some((lo / factor, hi * factor))
}

fn series_color(study: &Study, label: &str, index: usize) -> Result<RGBColor, RenderError> {
    let rgb = match study.assets.iter().position(|a| a.label == label) {
        Some(i) => study.asset_color(i)?,
        None => Rgb::cycle(index),
    };
    Ok(to_color(rgb))
}

fn marker_color(color: &str) -> Result<RGBColor, RenderError> {
    Rgb::parse(color)
        .map(to_color)
        .ok_or_else(|| eventwin_core::StudyError::InvalidColor(color.to_string()).into())
}

/// Draw `series` on a log price axis with the study's event markers and
/// write a PNG to `path`.
pub fn render_timeseries(
    study: &Study,
    series: &[AssetSeries],
    path: &Path,
) -> Result<TimeseriesOutcome, RenderError> {
    if series.is_empty() {
        return Err(RenderError::NoSeries);
    }
    let prepared = prepare_log_series(series, study.non_positive)?;
    let markers = event_markers(&study.events());

    let (x_min, x_max) = time_extent(&prepared, &markers).ok_or(RenderError::NoSeries)?;
    let (y_min, y_max) = log_extent(&prepared).ok_or(RenderError::NoSeries)?;

    let line_colors = prepared
        .iter()
        .enumerate()
        .map(|(i, s)| series_color(study, &s.series.label, i))
        .collect::<Result<Vec<_>, _>>()?;
    let marker_colors = markers
        .iter()
        .map(|m| marker_color(&m.color))
        .collect::<Result<Vec<_>, _>>()?;

    ensure_parent(path)?;
    let settings = &study.chart;
    let root = BitMapBackend::new(path, (settings.width, settings.height)).into_drawing_area();
    root.fill(&WHITE).map_err(backend_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&settings.title, ("sans-serif", 30).into_font())
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(x_min..x_max, (y_min..y_max).log_scale())
        .map_err(backend_err)?;

    chart
        .configure_mesh()
        .x_desc(settings.x_label.as_str())
        .y_desc(settings.y_label.as_str())
        .x_labels(12)
        .y_labels(10)
        .x_label_formatter(&|ts: &DateTime<Utc>| ts.format("%Y-%m-%d").to_string())
        .y_label_formatter(&|v: &f64| format_price(*v))
        .light_line_style(BLACK.mix(0.04).stroke_width(1))
        .bold_line_style(BLACK.mix(0.12).stroke_width(1))
        .label_style(("sans-serif", 16).into_font())
        .axis_desc_style(("sans-serif", 20).into_font())
        .draw()
        .map_err(backend_err)?;

    for (marker, color) in markers.iter().zip(&marker_colors) {
        let ts = marker.timestamp();
        chart
            .draw_series(DashedLineSeries::new(
                vec![(ts, y_min), (ts, y_max)],
                10u32,
                6u32,
                color.mix(0.7).stroke_width(2),
            ))
            .map_err(backend_err)?;
    }

    for (s, color) in prepared.iter().zip(&line_colors) {
        debug!(asset = %s.series.label, points = s.series.len(), "drawing series");
        chart
            .draw_series(LineSeries::new(
                s.series.points.iter().map(|p| (p.timestamp, p.close)),
                color.stroke_width(2),
            ))
            .map_err(backend_err)?;
    }

    let plot_area = chart.plotting_area().get_pixel_range();

    let asset_entries: Vec<LegendEntry> = prepared
        .iter()
        .zip(&line_colors)
        .map(|(s, color)| LegendEntry {
            label: s.series.label.clone(),
            color: *color,
            dashed: false,
        })
        .collect();
    draw_legend(
        &root,
        plot_area.clone(),
        LegendCorner::UpperLeft,
        &settings.asset_legend_title,
        &asset_entries,
    )?;

    let offset_entries = study
        .offsets
        .iter()
        .map(|o| {
            Ok(LegendEntry {
                label: o.legend_label(),
                color: marker_color(&o.color)?,
                dashed: true,
            })
        })
        .collect::<Result<Vec<_>, RenderError>>()?;
    draw_legend(
        &root,
        plot_area,
        LegendCorner::UpperRight,
        &settings.offset_legend_title,
        &offset_entries,
    )?;

    root.present().map_err(backend_err)?;

    Ok(TimeseriesOutcome {
        path: path.to_path_buf(),
        markers,
        skipped_points: prepared.iter().map(|s| s.skipped).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
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
    fn reject_policy_flags_zero_and_negative() {
        let err = prepare_log_series(
            &[series("A", &[1.0, 2.0]), series("B", &[3.0, 0.0, 4.0])],
            NonPositivePolicy::Reject,
        )
        .unwrap_err();

        match err {
            RenderError::NonPositivePrice { asset, value, .. } => {
                assert_eq!(asset, "B");
                assert_eq!(value, 0.0);
            }
            other => panic!("unexpected: {other}"),
        }

        let err = prepare_log_series(&[series("C", &[-1.0])], NonPositivePolicy::Reject);
        assert!(matches!(err, Err(RenderError::NonPositivePrice { .. })));
    }

    #[test]
    fn skip_policy_drops_and_counts() {
        let prepared = prepare_log_series(
            &[series("A", &[1.0, -2.0, 0.0, 5.0])],
            NonPositivePolicy::Skip,
        )
        .unwrap();

        assert_eq!(prepared[0].skipped, 2);
        let closes: Vec<f64> = prepared[0].series.points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 5.0]);
    }

    #[test]
    fn series_with_nothing_plottable_is_empty() {
        let err = prepare_log_series(&[series("A", &[0.0, -1.0])], NonPositivePolicy::Skip);
        assert!(matches!(err, Err(RenderError::EmptySeries { ref asset }) if asset == "A"));
    }

    #[test]
    fn extents_cover_markers_and_pad_prices() {
        let prepared =
            prepare_log_series(&[series("A", &[10.0, 20.0])], NonPositivePolicy::Reject).unwrap();
        let study = Study::cybersecurity_operational();
        let markers = event_markers(&study.events());

        let (lo, hi) = time_extent(&prepared, &markers).unwrap();
        assert_eq!(lo, Utc.with_ymd_and_hms(2021, 7, 27, 0, 0, 0).unwrap());
        assert_eq!(hi, Utc.with_ymd_and_hms(2022, 4, 6, 0, 0, 0).unwrap());

        let (ylo, yhi) = log_extent(&prepared).unwrap();
        assert!(ylo < 10.0 && ylo > 0.0);
        assert!(yhi > 20.0);
    }

    #[test]
    fn no_series_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.png");
        let err = render_timeseries(&Study::counterparty(), &[], &path).unwrap_err();
        assert!(matches!(err, RenderError::NoSeries));
        assert!(!path.exists());
    }
}
