//! SVG plot rendering.
//!
//! All plots go straight to SVG files through Plotters' pure-Rust backend:
//! a step-outline histogram with per-bin error bars plus the fitted curve
//! for the 1D fits, and colored bin maps for the 2D diagnostics.

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::error::AppError;
use crate::hist::{Hist1D, Hist2D};

fn plot_err(e: impl std::fmt::Display) -> AppError {
    AppError::new(2, format!("Plot rendering failed: {e}"))
}

/// One histogram-plus-curve panel.
pub struct HistPanel<'a> {
    pub hist: &'a Hist1D,
    /// Fitted curve sampled on a fine grid, as `(x, y)` pairs.
    pub curve: Vec<(f64, f64)>,
    pub title: String,
}

/// Render a single histogram with its fitted curve.
pub fn save_hist_fit(path: &Path, panel: &HistPanel<'_>) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    draw_hist_panel(&root, panel)?;
    root.present().map_err(plot_err)
}

/// Render two histogram panels side by side (the simultaneous fit view).
pub fn save_two_panel(path: &Path, left: &HistPanel<'_>, right: &HistPanel<'_>) -> Result<(), AppError> {
    let root = SVGBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((1, 2));
    draw_hist_panel(&areas[0], left)?;
    draw_hist_panel(&areas[1], right)?;
    root.present().map_err(plot_err)
}

fn draw_hist_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &HistPanel<'_>,
) -> Result<(), AppError> {
    let h = panel.hist;

    // Vertical range covers data plus error bars and the curve, with a
    // little headroom; degenerate ranges are padded rather than rejected.
    let mut y_max = 0.0_f64;
    let mut y_min = 0.0_f64;
    for i in 0..h.n_bins {
        y_max = y_max.max(h.contents[i] + h.bin_error(i));
        y_min = y_min.min(h.contents[i] - h.bin_error(i));
    }
    for &(_, y) in &panel.curve {
        if y.is_finite() {
            y_max = y_max.max(y);
            y_min = y_min.min(y);
        }
    }
    if !(y_max > y_min) {
        y_max = y_min + 1.0;
    }
    let pad = 0.05 * (y_max - y_min);

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(h.x_min..h.x_max, (y_min - pad)..(y_max + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(8)
        .y_labels(6)
        .draw()
        .map_err(plot_err)?;

    // Histogram as a step outline.
    let w = h.bin_width();
    let mut steps = Vec::with_capacity(2 * h.n_bins);
    for i in 0..h.n_bins {
        let x0 = h.x_min + i as f64 * w;
        steps.push((x0, h.contents[i]));
        steps.push((x0 + w, h.contents[i]));
    }
    chart
        .draw_series(LineSeries::new(steps, &BLUE))
        .map_err(plot_err)?;

    // Per-bin error bars as short vertical paths.
    chart
        .draw_series((0..h.n_bins).map(|i| {
            let x = h.bin_center(i);
            let y = h.contents[i];
            let e = h.bin_error(i);
            PathElement::new(vec![(x, y - e), (x, y + e)], BLUE.stroke_width(1))
        }))
        .map_err(plot_err)?;

    // Fitted curve.
    chart
        .draw_series(LineSeries::new(
            panel.curve.iter().copied(),
            RED.stroke_width(2),
        ))
        .map_err(plot_err)?;

    Ok(())
}

/// One 2D map panel: a title and `nx * ny` values laid out like the
/// reference histogram's contents.
pub struct MapPanel {
    pub title: String,
    pub values: Vec<f64>,
}

/// Render a grid of 2D bin maps sharing the geometry of `shape`.
///
/// Panels are placed row-major into the smallest near-square grid.
pub fn save_heatmap_grid(path: &Path, shape: &Hist2D, panels: &[MapPanel]) -> Result<(), AppError> {
    if panels.is_empty() {
        return Err(AppError::new(2, "No panels to draw."));
    }
    for p in panels {
        if p.values.len() != shape.nx * shape.ny {
            return Err(AppError::new(
                2,
                format!("Panel '{}' does not match the histogram shape.", p.title),
            ));
        }
    }

    let cols = (panels.len() as f64).sqrt().ceil() as usize;
    let rows = panels.len().div_ceil(cols);

    let root = SVGBackend::new(path, (600 * cols as u32, 500 * rows as u32)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;
    let areas = root.split_evenly((rows, cols));

    for (panel, area) in panels.iter().zip(areas.iter()) {
        draw_map_panel(area, shape, panel)?;
    }

    root.present().map_err(plot_err)
}

fn draw_map_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    shape: &Hist2D,
    panel: &MapPanel,
) -> Result<(), AppError> {
    let lo = panel.values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = panel.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(shape.x_min..shape.x_max, shape.y_min..shape.y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(8)
        .y_labels(6)
        .draw()
        .map_err(plot_err)?;

    let wx = shape.x_width();
    let wy = shape.y_width();
    chart
        .draw_series((0..shape.nx).flat_map(|ix| {
            (0..shape.ny).map(move |iy| (ix, iy))
        }).map(|(ix, iy)| {
            let v = panel.values[ix * shape.ny + iy];
            let x0 = shape.x_min + ix as f64 * wx;
            let y0 = shape.y_min + iy as f64 * wy;
            Rectangle::new(
                [(x0, y0), (x0 + wx, y0 + wy)],
                heat_color(v, lo, hi).filled(),
            )
        }))
        .map_err(plot_err)?;

    Ok(())
}

/// White-to-dark-blue ramp over `[lo, hi]`.
fn heat_color(v: f64, lo: f64, hi: f64) -> RGBColor {
    let span = hi - lo;
    let u = if span > 0.0 && v.is_finite() {
        ((v - lo) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let lerp = |a: f64, b: f64| (a + u * (b - a)).round() as u8;
    RGBColor(lerp(255.0, 8.0), lerp(255.0, 48.0), lerp(255.0, 107.0))
}

/// Sample a model curve on a fine grid across a histogram's axis.
pub fn curve_over(h: &Hist1D, n: usize, f: impl Fn(f64) -> f64) -> Vec<(f64, f64)> {
    crate::math::linspace(h.x_min, h.x_max, n)
        .into_iter()
        .map(|x| (x, f(x)))
        .collect()
}
