//! Scatterplot matrix of aligned close prices.
//!
//! Cell (row, col) plots asset `col` on x against asset `row` on y; the
//! diagonal holds a histogram of the asset's own closes.

use eventwin_core::{AlignedTable, Study};
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::histogram::{histogram, sturges_bins};
use super::{backend_err, ensure_parent, format_price, padded_range, RenderError};

const TITLE_HEIGHT: u32 = 60;
const SCATTER_COLOR: RGBColor = RGBColor(0x1f, 0x77, 0xb4);
const HIST_COLOR: RGBColor = RGBColor(128, 128, 128);

/// Render the matrix for every column of `table` and write a PNG to `path`.
///
/// An empty table is an error; no file is created for it.
pub fn render_pairplot(
    study: &Study,
    table: &AlignedTable,
    path: &Path,
) -> Result<PathBuf, RenderError> {
    if table.is_empty() || table.labels.is_empty() {
        return Err(RenderError::JoinEmpty);
    }

    let n = table.labels.len();
    let ranges = table
        .columns
        .iter()
        .map(|c| padded_range(c).ok_or(RenderError::JoinEmpty))
        .collect::<Result<Vec<_>, _>>()?;

    let cell = study.chart.pairplot_cell;
    let side = cell * n as u32;

    ensure_parent(path)?;
    let root = BitMapBackend::new(path, (side, side + TITLE_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(backend_err)?;

    let (title_area, grid) = root.split_vertically(TITLE_HEIGHT);
    title_area
        .titled(&study.chart.pairplot_title, ("sans-serif", 26).into_font())
        .map_err(backend_err)?;

    let price_fmt = |v: &f64| format_price(*v);
    let cells = grid.split_evenly((n, n));
    for (idx, area) in cells.iter().enumerate() {
        let (row, col) = (idx / n, idx % n);
        let bottom = row + 1 == n;
        let left = col == 0;

        let bins = if row == col {
            histogram(&table.columns[row], sturges_bins(table.row_count()))
        } else {
            Vec::new()
        };
        let x_range = ranges[col];
        let y_range = if row == col {
            let top = bins.iter().map(|b| b.count).max().unwrap_or(1) as f64;
            (0.0, top * 1.1)
        } else {
            ranges[row]
        };

        let mut chart = ChartBuilder::on(area)
            .margin(8)
            .x_label_area_size(if bottom { 48 } else { 22 })
            .y_label_area_size(if left { 72 } else { 48 })
            .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)
            .map_err(backend_err)?;

        let mut mesh = chart.configure_mesh();
        mesh.x_labels(4)
            .y_labels(4)
            .x_label_formatter(&price_fmt)
            .y_label_formatter(&price_fmt)
            .light_line_style(BLACK.mix(0.04).stroke_width(1))
            .bold_line_style(BLACK.mix(0.1).stroke_width(1))
            .label_style(("sans-serif", 12).into_font())
            .axis_desc_style(("sans-serif", 16).into_font());
        if bottom {
            mesh.x_desc(table.labels[col].as_str());
        }
        if left {
            mesh.y_desc(table.labels[row].as_str());
        }
        mesh.draw().map_err(backend_err)?;

        if row == col {
            debug!(asset = %table.labels[row], bins = bins.len(), "drawing histogram");
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new([(b.lo, 0.0), (b.hi, b.count as f64)], HIST_COLOR.filled())
                }))
                .map_err(backend_err)?;
            chart
                .draw_series(bins.iter().map(|b| {
                    Rectangle::new(
                        [(b.lo, 0.0), (b.hi, b.count as f64)],
                        WHITE.stroke_width(1),
                    )
                }))
                .map_err(backend_err)?;
        } else {
            let xs = &table.columns[col];
            let ys = &table.columns[row];
            chart
                .draw_series(
                    xs.iter()
                        .zip(ys)
                        .map(|(x, y)| Circle::new((*x, *y), 3, SCATTER_COLOR.mix(0.6).filled())),
                )
                .map_err(backend_err)?;
        }
    }

    root.present().map_err(backend_err)?;
    Ok(path.to_path_buf())
}
