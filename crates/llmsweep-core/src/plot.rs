//! SVG comparison charts: one two-panel chart per metric (linear and log
//! concurrency axes) and a stacked summary chart of the headline metrics.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use crate::error::{SweepError, SweepResult};

const ACTUAL_COLOR: RGBColor = RGBColor(0x2E, 0x86, 0xAB);
const CLAIMED_COLOR: RGBColor = RGBColor(0xA2, 0x3B, 0x72);
const FONT: &str = "sans-serif";

const METRIC_PLOT_SIZE: (u32, u32) = (1600, 700);
const SUMMARY_WIDTH: u32 = 1400;
const SUMMARY_PANEL_HEIGHT: u32 = 450;

/// One metric's data as it appears on a chart.
#[derive(Debug, Clone, Copy)]
pub struct MetricPlot<'a> {
    pub title: &'a str,
    pub unit: &'a str,
    pub actual: &'a [(f64, f64)],
    pub claims: &'a [(f64, f64)],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XScale {
    Linear,
    Log,
}

impl XScale {
    /// Map a concurrency value onto the drawn axis. Log axes drop `x <= 0`.
    pub fn project(self, x: f64) -> Option<f64> {
        match self {
            Self::Linear => Some(x),
            Self::Log => (x > 0.0).then(|| x.log10()),
        }
    }

    pub fn unproject(self, v: f64) -> f64 {
        match self {
            Self::Linear => v,
            Self::Log => 10f64.powf(v),
        }
    }

    fn caption(self) -> &'static str {
        match self {
            Self::Linear => "Linear Scale",
            Self::Log => "Log Scale",
        }
    }

    fn axis_label(self) -> &'static str {
        match self {
            Self::Linear => "Concurrency Level",
            Self::Log => "Concurrency Level (Log Scale)",
        }
    }
}

/// Write `<metric>_comparison.svg`: linear and log concurrency axes side by side.
pub fn render_metric_plot(path: &Path, plot: &MetricPlot<'_>) -> SweepResult<()> {
    let root = SVGBackend::new(path, METRIC_PLOT_SIZE).into_drawing_area();
    draw_metric(&root, plot).map_err(plot_error)
}

/// Write `summary_comparison.svg`: one linear panel per metric, stacked.
pub fn render_summary_plot(path: &Path, plots: &[MetricPlot<'_>]) -> SweepResult<()> {
    if plots.is_empty() {
        return Err(SweepError::invalid_input("summary plot needs at least one metric"));
    }
    let height = SUMMARY_PANEL_HEIGHT * plots.len() as u32 + 60;
    let root = SVGBackend::new(path, (SUMMARY_WIDTH, height)).into_drawing_area();
    draw_summary(&root, plots).map_err(plot_error)
}

fn plot_error(e: impl Display) -> SweepError {
    SweepError::Plot(e.to_string())
}

fn draw_metric<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plot: &MetricPlot<'_>,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let body = root.titled(
        &format!("{} - Performance Comparison", plot.title),
        (FONT, 26),
    )?;

    for (area, scale) in body
        .split_evenly((1, 2))
        .iter()
        .zip([XScale::Linear, XScale::Log])
    {
        draw_panel(area, scale.caption(), plot, scale)?;
    }

    root.present()
}

fn draw_summary<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    plots: &[MetricPlot<'_>],
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let body = root.titled("Performance Comparison Summary", (FONT, 28))?;

    for (area, plot) in body.split_evenly((plots.len(), 1)).iter().zip(plots) {
        draw_panel(area, plot.title, plot, XScale::Linear)?;
    }

    root.present()
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    caption: &str,
    plot: &MetricPlot<'_>,
    scale: XScale,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let actual = project(plot.actual, scale);
    let claims = project(plot.claims, scale);
    let x_range = padded_range(actual.iter().chain(&claims).map(|(x, _)| *x));
    let y_range = padded_range(actual.iter().chain(&claims).map(|(_, y)| *y));

    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, 20))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    let x_formatter = |v: &f64| format_tick(scale.unproject(*v));
    chart
        .configure_mesh()
        .x_desc(scale.axis_label())
        .y_desc(plot.unit)
        .x_label_formatter(&x_formatter)
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            actual.iter().copied(),
            ACTUAL_COLOR.stroke_width(3),
        ))?
        .label("Actual Performance")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACTUAL_COLOR.stroke_width(3)));

    // Label every second actual point; claims take the other half so the
    // two series' labels do not stack on shared concurrency levels.
    chart.draw_series(actual.iter().enumerate().map(|(i, &(x, y))| {
        let label = if i % 2 == 0 {
            coordinate_label(scale.unproject(x), y)
        } else {
            String::new()
        };
        EmptyElement::at((x, y))
            + Circle::new((0, 0), 6, ACTUAL_COLOR.filled())
            + Text::new(label, (8, -18), (FONT, 12).into_font().color(&ACTUAL_COLOR))
    }))?;

    if !claims.is_empty() {
        chart
            .draw_series(LineSeries::new(
                claims.iter().copied(),
                CLAIMED_COLOR.stroke_width(3),
            ))?
            .label("Claimed/Reference Performance")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], CLAIMED_COLOR.stroke_width(3))
            });

        chart.draw_series(claims.iter().enumerate().map(|(i, &(x, y))| {
            let label = if i % 2 == 1 {
                coordinate_label(scale.unproject(x), y)
            } else {
                String::new()
            };
            EmptyElement::at((x, y))
                + TriangleMarker::new((0, 0), 7, CLAIMED_COLOR.filled())
                + Text::new(label, (8, 6), (FONT, 12).into_font().color(&CLAIMED_COLOR))
        }))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.95))
        .border_style(BLACK)
        .draw()
}

fn project(points: &[(f64, f64)], scale: XScale) -> Vec<(f64, f64)> {
    points
        .iter()
        .filter_map(|&(x, y)| scale.project(x).map(|px| (px, y)))
        .collect()
}

/// Data extent with 10% headroom on each side; never empty.
pub fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if min > max {
        return 0.0..1.0;
    }

    let span = max - min;
    let pad = if span > 0.0 {
        span * 0.1
    } else {
        max.abs().max(1.0) * 0.1
    };
    (min - pad)..(max + pad)
}

fn format_tick(v: f64) -> String {
    if (v - v.round()).abs() < 1e-6 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

fn coordinate_label(x: f64, y: f64) -> String {
    format!("({}, {:.1})", format_tick(x), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_scale_drops_non_positive() {
        assert_eq!(XScale::Log.project(0.0), None);
        assert_eq!(XScale::Log.project(100.0), Some(2.0));
        assert!((XScale::Log.unproject(2.0) - 100.0).abs() < 1e-9);
        assert_eq!(XScale::Linear.project(0.0), Some(0.0));
    }

    #[test]
    fn test_padded_range() {
        assert_eq!(padded_range([10.0, 20.0].into_iter()), 9.0..21.0);
        assert_eq!(padded_range(std::iter::empty()), 0.0..1.0);

        let single = padded_range([50.0].into_iter());
        assert!(single.start < 50.0 && single.end > 50.0);
    }

    #[test]
    fn test_render_metric_plot_has_both_panels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mean_ttft_comparison.svg");
        let plot = MetricPlot {
            title: "Mean TTFT",
            unit: "ms",
            actual: &[(5.0, 120.0), (10.0, 150.0), (25.0, 210.0)],
            claims: &[(5.0, 100.0), (25.0, 200.0)],
        };

        render_metric_plot(&path, &plot).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Linear Scale"));
        assert!(svg.contains("Log Scale"));
        assert!(svg.contains("Claimed/Reference Performance"));
    }

    #[test]
    fn test_render_summary_plot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary_comparison.svg");
        let actual = [(5.0, 1.0), (10.0, 2.0)];
        let plots = [
            MetricPlot {
                title: "Mean TTFT",
                unit: "ms",
                actual: &actual,
                claims: &[],
            },
            MetricPlot {
                title: "Mean TPOT",
                unit: "ms",
                actual: &actual,
                claims: &[],
            },
        ];

        render_summary_plot(&path, &plots).unwrap();

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Performance Comparison Summary"));
        assert!(svg.contains("Mean TPOT"));
        assert!(render_summary_plot(&path, &[]).is_err());
    }
}
