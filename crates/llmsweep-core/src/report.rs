//! Metrics JSON document and Markdown summary for an aggregation run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use crate::aggregate::{AnalysisStatus, FileAnalysis};
use crate::metrics::{Metric, MetricSample};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsMetadata {
    pub generated_at: String,
    pub source_directory: String,
    pub sample_count: usize,
}

/// Time series keyed by metric, each a list of `[concurrency, value]` pairs.
///
/// Every series has one entry per sample, in sample order, so index `i`
/// refers to the same result file across all metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDocument {
    pub metadata: MetricsMetadata,
    pub metrics: BTreeMap<Metric, Vec<(u32, f64)>>,
}

impl MetricsDocument {
    pub fn new(source_directory: &Path, samples: &[MetricSample]) -> Self {
        let metrics = Metric::ALL
            .into_iter()
            .map(|metric| {
                let series: Vec<(u32, f64)> = samples
                    .iter()
                    .map(|s| (s.concurrency_level, s.value(metric)))
                    .collect();
                (metric, series)
            })
            .collect();

        Self {
            metadata: MetricsMetadata {
                generated_at: Utc::now().to_rfc3339(),
                source_directory: source_directory.display().to_string(),
                sample_count: samples.len(),
            },
            metrics,
        }
    }
}

/// Render `analysis-summary.md`.
pub fn render_summary(directory: &Path, files: &[FileAnalysis], sample_count: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Benchmark Analysis Summary\n");
    let _ = writeln!(
        out,
        "**Generated**: {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out, "**Results Directory**: {}\n", directory.display());
    let _ = writeln!(out, "- **Files Analysed**: {}", files.len());
    let _ = writeln!(out, "- **Samples in Series**: {}\n", sample_count);
    let _ = writeln!(out, "---\n");

    for file in files {
        let _ = writeln!(out, "## {}\n", file.test_id);
        let _ = writeln!(out, "- **Result File**: `{}`", file.result_file.display());
        let _ = writeln!(out, "- **Analysis Output**: `{}`", file.artifact.display());
        if file.concurrency_level == 0 {
            let _ = writeln!(out, "- **Concurrency**: unresolved");
        } else {
            let _ = writeln!(out, "- **Concurrency**: {}", file.concurrency_level);
        }
        let _ = writeln!(
            out,
            "- **In Series**: {}",
            if file.included { "✅" } else { "❌" }
        );

        match (&file.status, &file.metrics) {
            (AnalysisStatus::Extracted, Some(metrics)) => {
                let _ = writeln!(out, "\n| Metric | Value |");
                let _ = writeln!(out, "|--------|-------|");
                for metric in Metric::ALL {
                    let _ = writeln!(out, "| {} | {} |", metric.title(), metrics.display(metric));
                }
            }
            (AnalysisStatus::ToolFailed { code }, _) => {
                let _ = writeln!(
                    out,
                    "\n❌ Analysis tool failed (exit code {})",
                    code.map_or_else(|| "none".to_string(), |c| c.to_string())
                );
            }
            (AnalysisStatus::SpawnFailed { message }, _) => {
                let _ = writeln!(out, "\n❌ Analysis tool could not start: {message}");
            }
            (AnalysisStatus::Extracted, None) => {}
        }
        let _ = writeln!(out);
    }

    out
}
