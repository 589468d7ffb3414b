//! Comparison of a measured metrics series against claimed/reference figures:
//! a Markdown report plus SVG charts.

use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{SweepError, SweepResult};
use crate::plot::{self, MetricPlot};

pub const REPORT_FILE: &str = "comparison_report.md";

/// Per-metric charts are `<metric>_comparison.svg`.
pub const PLOT_SUFFIX: &str = "_comparison.svg";

pub const SUMMARY_PLOT_FILE: &str = "summary_comparison.svg";

/// Metrics stacked in the summary chart, when present.
pub const SUMMARY_METRICS: [&str; 4] = [
    "mean_ttft",
    "input_token_throughput",
    "output_token_throughput",
    "mean_tpot",
];

/// Default output directory name, created next to the metrics file.
pub const DEFAULT_OUTPUT_DIR: &str = "comparison";

/// `metric name → [[concurrency, value], ...]`
pub type SeriesMap = BTreeMap<String, Vec<(f64, f64)>>;

/// Loosely-typed view of a metrics document, tolerant of extra metrics.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeriesDocument {
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub metrics: SeriesMap,
}

/// Where reference figures come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsSource {
    None,
    File(PathBuf),
    Inline(String),
}

impl ClaimsSource {
    /// Build from CLI arguments; a file and inline JSON together are rejected.
    pub fn from_args(file: Option<PathBuf>, inline: Option<String>) -> SweepResult<Self> {
        match (file, inline) {
            (Some(_), Some(_)) => Err(SweepError::invalid_input(
                "provide either a claims file or inline claims, not both",
            )),
            (Some(path), None) => Ok(Self::File(path)),
            (None, Some(json)) => Ok(Self::Inline(json)),
            (None, None) => Ok(Self::None),
        }
    }

    pub fn load(&self) -> SweepResult<SeriesMap> {
        match self {
            Self::None => {
                warn!("⚠️  No claims data provided; generating actual-only report");
                Ok(SeriesMap::new())
            }
            Self::File(path) => {
                if !path.exists() {
                    return Err(SweepError::not_found("claims file", path));
                }
                Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
            }
            Self::Inline(json) => Ok(serde_json::from_str(json)?),
        }
    }
}

struct MetricInfo {
    title: &'static str,
    unit: &'static str,
    direction: &'static str,
}

fn metric_info(name: &str) -> Option<MetricInfo> {
    let (title, unit, direction) = match name {
        "mean_ttft" => ("Mean Time to First Token (TTFT)", "ms", "Lower is better"),
        "p99_ttft" => ("P99 Time to First Token (TTFT)", "ms", "Lower is better"),
        "throughput" => ("Request Throughput", "req/s", "Higher is better"),
        "input_token_throughput" => ("Input Token Throughput", "tok/s", "Higher is better"),
        "output_token_throughput" => ("Output Token Throughput", "tok/s", "Higher is better"),
        "output_tp" => ("Output Token Throughput (Claims)", "tok/s", "Higher is better"),
        "mean_tpot" => ("Mean Time per Output Token (TPOT)", "ms", "Lower is better"),
        "p99_tpot" => ("P99 Time per Output Token (TPOT)", "ms", "Lower is better"),
        "mean_itl" => ("Mean Inter-token Latency (ITL)", "ms", "Lower is better"),
        "p99_itl" => ("P99 Inter-token Latency (ITL)", "ms", "Lower is better"),
        "successful_requests" => ("Successful Requests", "requests", "Higher is better"),
        "duration" => ("Test Duration", "s", "Context dependent"),
        _ => return None,
    };
    Some(MetricInfo {
        title,
        unit,
        direction,
    })
}

/// Display title and unit, falling back to a title-cased name and "Value".
fn describe(name: &str) -> (String, &'static str) {
    match metric_info(name) {
        Some(info) => (info.title.to_string(), info.unit),
        None => (title_case(name), "Value"),
    }
}

fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One concurrency level present in both series.
#[derive(Debug, Clone, PartialEq)]
pub struct PointComparison {
    pub concurrency: f64,
    pub actual: f64,
    pub claimed: f64,
}

impl PointComparison {
    /// Relative difference of actual against claimed, in percent.
    pub fn delta_pct(&self) -> Option<f64> {
        (self.claimed != 0.0).then(|| (self.actual - self.claimed) / self.claimed * 100.0)
    }
}

/// Pair up points at equal concurrency levels, in actual-series order.
pub fn matching_points(actual: &[(f64, f64)], claims: &[(f64, f64)]) -> Vec<PointComparison> {
    actual
        .iter()
        .filter_map(|(c, a)| {
            claims
                .iter()
                .find(|(cc, _)| cc == c)
                .map(|(_, claimed)| PointComparison {
                    concurrency: *c,
                    actual: *a,
                    claimed: *claimed,
                })
        })
        .collect()
}

/// Metrics that get their own chart: those with at least one actual point.
pub fn plotted_metrics(document: &SeriesDocument) -> Vec<&str> {
    document
        .metrics
        .iter()
        .filter(|(_, actual)| !actual.is_empty())
        .map(|(name, _)| name.as_str())
        .collect()
}

/// [`SUMMARY_METRICS`] entries with actual data, in summary order.
pub fn summary_metrics(document: &SeriesDocument) -> Vec<&'static str> {
    SUMMARY_METRICS
        .into_iter()
        .filter(|name| document.metrics.get(*name).is_some_and(|a| !a.is_empty()))
        .collect()
}

fn plot_file(name: &str) -> String {
    format!("{name}{PLOT_SUFFIX}")
}

#[derive(Debug)]
pub struct ComparisonOutcome {
    pub output_dir: PathBuf,
    /// `None` when the metrics file held no metrics and nothing was written.
    pub report_path: Option<PathBuf>,
    pub metrics_compared: usize,
    /// Per-metric charts, in metric name order.
    pub plots: Vec<PathBuf>,
    pub summary_plot: Option<PathBuf>,
}

/// Compare `metrics_file` against `claims`; write the per-metric charts,
/// the summary chart and `comparison_report.md`.
///
/// `output_dir` defaults to `<metrics_dir>/comparison`.
pub fn compare(
    metrics_file: &Path,
    claims: &ClaimsSource,
    output_dir: Option<&Path>,
) -> SweepResult<ComparisonOutcome> {
    info!("📊 Metrics file: {}", metrics_file.display());
    if !metrics_file.exists() {
        return Err(SweepError::not_found("metrics file", metrics_file));
    }

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => metrics_file
            .parent()
            .map(|p| p.join(DEFAULT_OUTPUT_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    };

    let document: SeriesDocument = serde_json::from_str(&fs::read_to_string(metrics_file)?)?;
    let claims = claims.load()?;

    if document.metrics.is_empty() {
        error!("❌ No metrics found in {}", metrics_file.display());
        return Ok(ComparisonOutcome {
            output_dir,
            report_path: None,
            metrics_compared: 0,
            plots: Vec::new(),
            summary_plot: None,
        });
    }

    fs::create_dir_all(&output_dir)?;

    let mut plots = Vec::new();
    for name in plotted_metrics(&document) {
        let (title, unit) = describe(name);
        let path = output_dir.join(plot_file(name));
        plot::render_metric_plot(
            &path,
            &MetricPlot {
                title: &title,
                unit,
                actual: &document.metrics[name],
                claims: claims.get(name).map(Vec::as_slice).unwrap_or(&[]),
            },
        )?;
        info!("  📊 Generated: {}", path.display());
        plots.push(path);
    }

    let summary = summary_metrics(&document);
    let summary_plot = if summary.is_empty() {
        warn!("⚠️  No key metrics available for summary plot");
        None
    } else {
        let described: Vec<(String, &str)> = summary.iter().map(|name| describe(name)).collect();
        let panels: Vec<MetricPlot<'_>> = summary
            .iter()
            .zip(&described)
            .map(|(name, (title, unit))| MetricPlot {
                title,
                unit,
                actual: &document.metrics[*name],
                claims: claims.get(*name).map(Vec::as_slice).unwrap_or(&[]),
            })
            .collect();
        let path = output_dir.join(SUMMARY_PLOT_FILE);
        plot::render_summary_plot(&path, &panels)?;
        info!("  📊 Generated: {}", path.display());
        Some(path)
    };
    let report = render_comparison(metrics_file, &output_dir, &document, &claims);
    let report_path = output_dir.join(REPORT_FILE);
    fs::write(&report_path, report)?;

    info!("📄 Generated: {}", report_path.display());
    Ok(ComparisonOutcome {
        output_dir,
        report_path: Some(report_path),
        metrics_compared: document.metrics.len(),
        plots,
        summary_plot,
    })
}

/// Render the comparison report body.
pub fn render_comparison(
    metrics_file: &Path,
    output_dir: &Path,
    document: &SeriesDocument,
    claims: &SeriesMap,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Performance Comparison Report\n");
    let _ = writeln!(
        out,
        "Generated: {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "**Metrics Source**: {}", metrics_file.display());
    let _ = writeln!(out, "**Output Directory**: {}\n", output_dir.display());

    if !document.metadata.is_empty() {
        let _ = writeln!(out, "## Test Configuration\n");
        for (key, value) in &document.metadata {
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = writeln!(out, "- **{}**: {}", title_case(key), rendered);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "## Metrics Analysis\n");

    for (name, actual) in &document.metrics {
        let (title, unit) = describe(name);

        let _ = writeln!(out, "### {title}\n");
        if let Some(info) = metric_info(name) {
            let _ = writeln!(out, "_{}_\n", info.direction);
        }

        if let (Some(min), Some(max)) = (
            actual.iter().map(|(_, v)| *v).reduce(f64::min),
            actual.iter().map(|(_, v)| *v).reduce(f64::max),
        ) {
            let _ = writeln!(out, "- **Range**: {min:.2} - {max:.2} {unit}");
        }

        match claims.get(name).filter(|c| !c.is_empty()) {
            Some(claimed) => {
                let _ = writeln!(out, "- **Claims Data Points**: {}", claimed.len());
                let _ = writeln!(out, "- **Comparison**: Available\n");

                let points = matching_points(actual, claimed);
                if points.is_empty() {
                    let _ = writeln!(out, "No concurrency levels in common with the claims.\n");
                } else {
                    let _ = writeln!(out, "| Concurrency | Actual | Claimed | Difference |");
                    let _ = writeln!(out, "|-------------|--------|---------|------------|");
                    for p in points {
                        let delta = p
                            .delta_pct()
                            .map_or_else(|| "-".to_string(), |d| format!("{d:+.1}%"));
                        let _ = writeln!(
                            out,
                            "| {} | {:.2} | {:.2} | {} |",
                            p.concurrency, p.actual, p.claimed, delta
                        );
                    }
                    let _ = writeln!(out);
                }
            }
            None => {
                let _ = writeln!(out, "- **Comparison**: No claims data available\n");
            }
        }

        if !actual.is_empty() {
            let _ = writeln!(out, "- **Plot**: {}\n", plot_file(name));
        }
    }

    let _ = writeln!(out, "## Generated Files\n");
    let _ = writeln!(out, "### Individual Metric Plots");
    for name in plotted_metrics(document) {
        let _ = writeln!(out, "- `{}`", plot_file(name));
    }
    let _ = writeln!(out, "\n### Summary Files");
    if !summary_metrics(document).is_empty() {
        let _ = writeln!(out, "- `{SUMMARY_PLOT_FILE}` - Key metrics overview");
    }
    let _ = writeln!(out, "- `{REPORT_FILE}` - This report\n");

    let _ = writeln!(out, "## Usage Notes\n");
    let _ = writeln!(out, "- Blue labels show actual performance coordinates");
    let _ = writeln!(
        out,
        "- Purple labels show claimed/reference performance coordinates"
    );
    let _ = writeln!(out, "- Missing claims data results in actual-only plots");
    let _ = writeln!(out, "- Claims data is compared as-is without interpolation");
    let _ = writeln!(
        out,
        "- Only concurrency levels present in both series appear in the tables"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const METRICS: &str = r#"{
        "metadata": {"generated_at": "2026-01-01T00:00:00Z", "source_directory": "results", "sample_count": 2},
        "metrics": {
            "mean_ttft": [[1, 190.0], [2, 200.0]],
            "throughput": [[1, 5.0], [2, 9.5]]
        }
    }"#;

    #[test]
    fn test_claims_source_rejects_both() {
        let err = ClaimsSource::from_args(Some(PathBuf::from("c.json")), Some("{}".to_string()));
        assert!(matches!(err, Err(SweepError::InvalidInput(_))));
        assert_eq!(
            ClaimsSource::from_args(None, None).unwrap(),
            ClaimsSource::None
        );
    }

    #[test]
    fn test_matching_points_and_delta() {
        let actual = [(1.0, 190.0), (2.0, 200.0), (4.0, 260.0)];
        let claims = [(2.0, 183.0), (1.0, 195.0)];

        let points = matching_points(&actual, &claims);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].concurrency, 1.0);
        assert_eq!(points[0].claimed, 195.0);
        let delta = points[1].delta_pct().unwrap();
        assert!((delta - 9.289).abs() < 0.01);

        let zero = PointComparison {
            concurrency: 1.0,
            actual: 1.0,
            claimed: 0.0,
        };
        assert_eq!(zero.delta_pct(), None);
    }

    #[test]
    fn test_title_case_fallback() {
        assert_eq!(title_case("kv_cache_usage"), "Kv Cache Usage");
    }

    #[test]
    fn test_compare_with_inline_claims() {
        let dir = TempDir::new().unwrap();
        let metrics = dir.path().join("metrics-data.json");
        fs::write(&metrics, METRICS).unwrap();

        let claims = ClaimsSource::Inline(r#"{"mean_ttft": [[1, 195], [2, 183]]}"#.to_string());
        let outcome = compare(&metrics, &claims, None).unwrap();

        assert_eq!(outcome.output_dir, dir.path().join("comparison"));
        assert_eq!(outcome.metrics_compared, 2);
        let report = fs::read_to_string(outcome.report_path.unwrap()).unwrap();
        assert!(report.contains("## Test Configuration"));
        assert!(report.contains("- **Sample Count**: 2"));
        assert!(report.contains("### Mean Time to First Token (TTFT)"));
        assert!(report.contains("- **Range**: 190.00 - 200.00 ms"));
        assert!(report.contains("- **Claims Data Points**: 2"));
        assert!(report.contains("| 2 | 200.00 | 183.00 | +9.3% |"));
        assert!(report.contains("### Request Throughput"));
        assert!(report.contains("No claims data available"));
    }

    #[test]
    fn test_compare_writes_plots() {
        let dir = TempDir::new().unwrap();
        let metrics = dir.path().join("metrics-data.json");
        fs::write(&metrics, METRICS).unwrap();

        let claims = ClaimsSource::Inline(r#"{"mean_ttft": [[1, 195], [2, 183]]}"#.to_string());
        let outcome = compare(&metrics, &claims, None).unwrap();

        let out = dir.path().join("comparison");
        assert_eq!(
            outcome.plots,
            vec![
                out.join("mean_ttft_comparison.svg"),
                out.join("throughput_comparison.svg")
            ]
        );
        for plot in &outcome.plots {
            let svg = fs::read_to_string(plot).unwrap();
            assert!(svg.contains("Log Scale"), "{}", plot.display());
        }
        assert_eq!(outcome.summary_plot, Some(out.join("summary_comparison.svg")));
        assert!(out.join("summary_comparison.svg").exists());

        let report = fs::read_to_string(outcome.report_path.unwrap()).unwrap();
        assert!(report.contains("- **Plot**: mean_ttft_comparison.svg"));
        assert!(report.contains("## Generated Files"));
        assert!(report.contains("- `throughput_comparison.svg`"));
        assert!(report.contains("- `summary_comparison.svg` - Key metrics overview"));
    }

    #[test]
    fn test_summary_skipped_without_key_metrics() {
        let dir = TempDir::new().unwrap();
        let metrics = dir.path().join("metrics-data.json");
        fs::write(
            &metrics,
            r#"{"metadata": {}, "metrics": {"p99_itl": [[5, 30.0]], "duration": []}}"#,
        )
        .unwrap();

        let outcome = compare(&metrics, &ClaimsSource::None, None).unwrap();

        assert_eq!(outcome.plots.len(), 1);
        assert!(outcome.summary_plot.is_none());
        let report = fs::read_to_string(outcome.report_path.unwrap()).unwrap();
        assert!(!report.contains("summary_comparison.svg"));
        assert!(!report.contains("duration_comparison.svg"));
    }

    #[test]
    fn test_compare_empty_metrics_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let metrics = dir.path().join("metrics-data.json");
        fs::write(&metrics, r#"{"metadata": {}, "metrics": {}}"#).unwrap();

        let out_dir = dir.path().join("out");
        let outcome = compare(&metrics, &ClaimsSource::None, Some(&out_dir)).unwrap();
        assert!(outcome.report_path.is_none());
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_compare_missing_claims_file() {
        let dir = TempDir::new().unwrap();
        let metrics = dir.path().join("metrics-data.json");
        fs::write(&metrics, METRICS).unwrap();

        let claims = ClaimsSource::File(dir.path().join("claims.json"));
        assert!(matches!(
            compare(&metrics, &claims, None),
            Err(SweepError::NotFound { .. })
        ));
    }
}
