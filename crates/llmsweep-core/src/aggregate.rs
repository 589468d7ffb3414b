//! Result aggregation: analyse every result file in a directory and collect
//! a concurrency-ordered metrics series.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::error::{SweepError, SweepResult};
use crate::metrics::{sort_samples, ExtractedMetrics, Metric, MetricSample};
use crate::report::{self, MetricsDocument};
use crate::tool::BenchmarkTool;

/// Result files end with this suffix; the remainder is the test identifier.
pub const RESULT_SUFFIX: &str = "-results.json";

/// Per-file analysis artifacts end with this suffix.
pub const ANALYSIS_SUFFIX: &str = "_analysis.txt";

pub const METRICS_FILE: &str = "metrics-data.json";
pub const SUMMARY_FILE: &str = "analysis-summary.md";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    /// Analysis ran and its output was scraped.
    Extracted,
    /// Analysis tool exited non-zero; the artifact holds whatever it printed.
    ToolFailed { code: Option<i32> },
    /// Analysis tool could not be started.
    SpawnFailed { message: String },
}

/// Everything learned about one result file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub result_file: PathBuf,
    /// File name with [`RESULT_SUFFIX`] stripped, e.g. `concurrency-high`.
    pub test_id: String,
    pub artifact: PathBuf,
    pub status: AnalysisStatus,
    pub concurrency_level: u32,
    pub metrics: Option<ExtractedMetrics>,
    /// Whether the file contributed a sample to the series.
    pub included: bool,
}

/// Output of [`Aggregator::aggregate`].
#[derive(Debug)]
pub struct Aggregation {
    pub directory: PathBuf,
    pub files: Vec<FileAnalysis>,
    pub samples: Vec<MetricSample>,
    pub metrics_path: PathBuf,
    pub summary_path: PathBuf,
}

pub struct Aggregator {
    tool: Arc<dyn BenchmarkTool>,
}

impl Aggregator {
    pub fn new(tool: Arc<dyn BenchmarkTool>) -> Self {
        Self { tool }
    }

    /// Analyse every result file directly inside `directory`, then write
    /// `metrics-data.json` and `analysis-summary.md` next to them.
    pub async fn aggregate(&self, directory: &Path) -> SweepResult<Aggregation> {
        if !is_dir(directory).await {
            return Err(SweepError::not_found("results directory", directory));
        }

        let result_files = discover_result_files(directory).await?;
        info!(
            "📊 Analysing {} result files in {}",
            result_files.len(),
            directory.display()
        );

        let mut files = Vec::with_capacity(result_files.len());
        let mut samples = Vec::new();

        for result_file in result_files {
            let mut analysis = self.analyse_file(directory, &result_file).await?;

            if let Some(extracted) = &analysis.metrics {
                match MetricSample::from_extracted(analysis.concurrency_level, extracted) {
                    Some(sample) => {
                        samples.push(sample);
                        analysis.included = true;
                    }
                    None => debug!(
                        "Excluding {} from series (concurrency {}, mean TTFT {})",
                        analysis.test_id,
                        analysis.concurrency_level,
                        extracted.display(Metric::MeanTtft)
                    ),
                }
            }

            files.push(analysis);
        }

        sort_samples(&mut samples);

        let document = MetricsDocument::new(directory, &samples);
        let metrics_path = directory.join(METRICS_FILE);
        fs::write(&metrics_path, serde_json::to_string_pretty(&document)?).await?;

        let summary_path = directory.join(SUMMARY_FILE);
        fs::write(
            &summary_path,
            report::render_summary(directory, &files, samples.len()),
        )
        .await?;

        info!(
            "✅ {} files analysed, {} samples written to {}",
            files.len(),
            samples.len(),
            metrics_path.display()
        );

        Ok(Aggregation {
            directory: directory.to_path_buf(),
            files,
            samples,
            metrics_path,
            summary_path,
        })
    }

    async fn analyse_file(&self, directory: &Path, result_file: &Path) -> SweepResult<FileAnalysis> {
        let test_id = strip_result_suffix(result_file);
        let artifact = directory.join(format!("{test_id}{ANALYSIS_SUFFIX}"));
        let concurrency_level = catalog::lookup(&format!("{test_id}.json")).concurrency_limit;

        let (status, metrics) = match self.tool.analyse(result_file).await {
            Ok(out) => {
                fs::write(&artifact, &out.output).await?;
                if out.status.success() {
                    (
                        AnalysisStatus::Extracted,
                        Some(ExtractedMetrics::parse(&out.output)),
                    )
                } else {
                    warn!(
                        "Analysis of {} exited with {:?}; skipping extraction",
                        result_file.display(),
                        out.status.code
                    );
                    (
                        AnalysisStatus::ToolFailed {
                            code: out.status.code,
                        },
                        None,
                    )
                }
            }
            Err(e) => {
                warn!("Analysis of {} failed: {}", result_file.display(), e);
                fs::write(&artifact, format!("analysis failed: {e}\n")).await?;
                (
                    AnalysisStatus::SpawnFailed {
                        message: e.to_string(),
                    },
                    None,
                )
            }
        };

        Ok(FileAnalysis {
            result_file: result_file.to_path_buf(),
            test_id,
            artifact,
            status,
            concurrency_level,
            metrics,
            included: false,
        })
    }
}

/// Immediate children named `*-results.json`, sorted by file name.
pub async fn discover_result_files(directory: &Path) -> SweepResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(directory).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_result = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(RESULT_SUFFIX) && n.len() > RESULT_SUFFIX.len())
            .unwrap_or(false);
        if is_result && is_file(&path).await {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

fn strip_result_suffix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_suffix(RESULT_SUFFIX)
        .map(str::to_string)
        .unwrap_or(name)
}
