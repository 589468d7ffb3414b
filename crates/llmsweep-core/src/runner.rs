//! Single-test runner: benchmark, optional analysis, cooldown.

use chrono::Utc;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::baseline::{BaselineLogger, RunRecord};
use crate::catalog::{self, TestDefinition};
use crate::tool::BenchmarkTool;

/// Configuration field naming the file the benchmark writes its results to.
pub const OUTPUT_FILE_FIELD: &str = "output_file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// Benchmark exited with status 0.
    Succeeded,
    /// Benchmark exited non-zero or was killed by a signal.
    Failed { code: Option<i32> },
    /// Benchmark binary could not be started.
    SpawnFailed { message: String },
}

/// Result of running one configuration.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub config_path: PathBuf,
    pub definition: TestDefinition,
    pub status: RunStatus,
    /// Result file declared by the configuration, when it was found on disk.
    pub output_file: Option<PathBuf>,
    /// Analysis tool output for the result file.
    pub analysis: Option<String>,
    /// Timestamp bracket, when baseline logging is active.
    pub record: Option<RunRecord>,
}

impl RunOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

/// Runs one configuration at a time against the external tool.
pub struct TestRunner {
    tool: Arc<dyn BenchmarkTool>,
    cooldown: Duration,
    baseline: Option<BaselineLogger>,
}

impl TestRunner {
    pub fn new(tool: Arc<dyn BenchmarkTool>, cooldown: Duration) -> Self {
        Self {
            tool,
            cooldown,
            baseline: None,
        }
    }

    /// Record a [`RunRecord`] around every benchmark invocation.
    pub fn with_baseline(mut self, logger: BaselineLogger) -> Self {
        self.baseline = Some(logger);
        self
    }

    pub fn baseline(&self) -> Option<&BaselineLogger> {
        self.baseline.as_ref()
    }

    /// Run one configuration. Never fails: every problem is folded into the
    /// returned outcome so a sweep can move on to its next test.
    pub async fn run(&self, config_path: &Path) -> RunOutcome {
        let definition = catalog::lookup(&config_path.to_string_lossy());

        info!(
            "▶️  {} ({}): concurrency {}, target {} RPS",
            definition.display_name,
            config_path.display(),
            definition.concurrency_limit,
            definition.rps_target
        );

        if let Some(warning) = &definition.warning {
            warn!("⚠️  {warning}. Continuing automatically (unattended run).");
        }

        let started = Utc::now();
        let status = match self.tool.benchmark(config_path).await {
            Ok(exit) if exit.success() => RunStatus::Succeeded,
            Ok(exit) => RunStatus::Failed { code: exit.code },
            Err(e) => RunStatus::SpawnFailed {
                message: e.to_string(),
            },
        };
        let finished = Utc::now();

        let record = self.baseline.as_ref().map(|logger| {
            let record = RunRecord::new(definition.identifier.clone(), started, finished);
            if let Err(e) = logger.log(&record) {
                warn!(
                    "Failed to append to timestamp log {}: {}",
                    logger.log_file().display(),
                    e
                );
            }
            record
        });

        let mut outcome = RunOutcome {
            config_path: config_path.to_path_buf(),
            definition,
            status,
            output_file: None,
            analysis: None,
            record,
        };

        match &outcome.status {
            RunStatus::Succeeded => {
                info!("✅ {} completed", outcome.definition.display_name);
                self.analyse_output(&mut outcome).await;
            }
            RunStatus::Failed { code } => {
                error!(
                    "❌ {} failed (exit code {}); skipping analysis",
                    outcome.definition.display_name,
                    code.map_or_else(|| "none".to_string(), |c| c.to_string())
                );
            }
            RunStatus::SpawnFailed { message } => {
                error!(
                    "❌ {} could not start: {}; skipping analysis",
                    outcome.definition.display_name, message
                );
            }
        }

        if !self.cooldown.is_zero() {
            info!("😴 Cooling down for {}s", self.cooldown.as_secs());
            tokio::time::sleep(self.cooldown).await;
        }

        outcome
    }

    async fn analyse_output(&self, outcome: &mut RunOutcome) {
        let config_text = match tokio::fs::read_to_string(&outcome.config_path).await {
            Ok(text) => text,
            Err(e) => {
                debug!(
                    "Cannot read {} for {}: {}",
                    outcome.config_path.display(),
                    OUTPUT_FILE_FIELD,
                    e
                );
                return;
            }
        };

        let Some(output_file) = find_output_file(&config_text) else {
            debug!("{} declares no {}", outcome.config_path.display(), OUTPUT_FILE_FIELD);
            return;
        };

        if !tokio::fs::try_exists(&output_file).await.unwrap_or(false) {
            debug!("Result file {} not present", output_file.display());
            return;
        }

        match self.tool.analyse(&output_file).await {
            Ok(out) => {
                if !out.status.success() {
                    warn!(
                        "Analysis of {} exited with {:?}",
                        output_file.display(),
                        out.status.code
                    );
                }
                println!("{}", out.output);
                outcome.analysis = Some(out.output);
            }
            Err(e) => warn!("Analysis of {} failed: {}", output_file.display(), e),
        }
        outcome.output_file = Some(output_file);
    }
}

/// Locate the `output_file` value in a serialized configuration.
///
/// Parses JSON and searches depth-first; text that is not valid JSON falls
/// back to a `"output_file": "<path>"` pattern scan.
pub fn find_output_file(config_text: &str) -> Option<PathBuf> {
    match serde_json::from_str::<Value>(config_text) {
        Ok(value) => find_in_value(&value).map(PathBuf::from),
        Err(_) => scan_output_file(config_text).map(PathBuf::from),
    }
}

fn find_in_value(value: &Value) -> Option<&str> {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(path)) = map.get(OUTPUT_FILE_FIELD) {
                return Some(path.as_str());
            }
            map.values().find_map(find_in_value)
        }
        Value::Array(items) => items.iter().find_map(find_in_value),
        _ => None,
    }
}

fn scan_output_file(text: &str) -> Option<&str> {
    let key = format!("\"{OUTPUT_FILE_FIELD}\"");
    let rest = &text[text.find(&key)? + key.len()..];
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(&rest[..end]).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTool;
    use tempfile::TempDir;

    #[test]
    fn test_find_output_file_top_level() {
        let text = r#"{"model": "m", "output_file": "results/concurrency-low-results.json"}"#;
        assert_eq!(
            find_output_file(text),
            Some(PathBuf::from("results/concurrency-low-results.json"))
        );
    }

    #[test]
    fn test_find_output_file_nested() {
        let text = r#"{"load": {"concurrency": 5}, "report": {"output_file": "out.json"}}"#;
        assert_eq!(find_output_file(text), Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_find_output_file_pattern_fallback() {
        // Trailing comma makes this invalid JSON.
        let text = "{\n  \"output_file\" : \"results/x-results.json\",\n}";
        assert_eq!(
            find_output_file(text),
            Some(PathBuf::from("results/x-results.json"))
        );
        assert_eq!(find_output_file("{ \"rate\": 5, }"), None);
    }

    fn write_config(dir: &TempDir, name: &str, output: &Path) -> PathBuf {
        let path = dir.path().join(name);
        let body = serde_json::json!({ "output_file": output.to_string_lossy() });
        std::fs::write(&path, body.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_success_runs_analysis() {
        let dir = TempDir::new().unwrap();
        let result = dir.path().join("concurrency-low-results.json");
        std::fs::write(&result, "{}").unwrap();
        let config = write_config(&dir, "concurrency-low.json", &result);

        let tool = Arc::new(ScriptedTool::new().analysis_text("Mean TTFT (ms): 12.5"));
        let runner = TestRunner::new(tool.clone(), Duration::ZERO);
        let outcome = runner.run(&config).await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.definition.concurrency_limit, 5);
        assert_eq!(outcome.output_file, Some(result.clone()));
        assert_eq!(outcome.analysis.as_deref(), Some("Mean TTFT (ms): 12.5"));
        assert_eq!(tool.analysed(), vec![result]);
    }

    #[tokio::test]
    async fn test_failure_skips_analysis() {
        let dir = TempDir::new().unwrap();
        let result = dir.path().join("concurrency-high-results.json");
        std::fs::write(&result, "{}").unwrap();
        let config = write_config(&dir, "concurrency-high.json", &result);

        let tool = Arc::new(ScriptedTool::new().fail_benchmark("concurrency-high.json", 3));
        let runner = TestRunner::new(tool.clone(), Duration::ZERO);
        let outcome = runner.run(&config).await;

        assert_eq!(outcome.status, RunStatus::Failed { code: Some(3) });
        assert!(outcome.analysis.is_none());
        assert!(tool.analysed().is_empty());
    }

    #[tokio::test]
    async fn test_missing_result_file_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            "concurrency-medium.json",
            &dir.path().join("never-written-results.json"),
        );

        let tool = Arc::new(ScriptedTool::new());
        let outcome = TestRunner::new(tool.clone(), Duration::ZERO)
            .run(&config)
            .await;

        assert!(outcome.succeeded());
        assert!(outcome.output_file.is_none());
        assert!(tool.analysed().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_config_still_runs() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom-profile.json");
        std::fs::write(&config, "{}").unwrap();

        let tool = Arc::new(ScriptedTool::new());
        let outcome = TestRunner::new(tool.clone(), Duration::ZERO)
            .run(&config)
            .await;

        assert!(outcome.succeeded());
        assert!(!outcome.definition.is_resolved());
        assert_eq!(tool.benchmarked(), vec![config]);
    }

    #[tokio::test]
    async fn test_unknown_config_logged_by_file_name() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("custom-profile.json");
        std::fs::write(&config, "{}").unwrap();

        let logger = BaselineLogger::new(
            &crate::config::BaselineConfig {
                enabled: true,
                ..Default::default()
            },
            dir.path(),
        );
        let runner = TestRunner::new(Arc::new(ScriptedTool::new()), Duration::ZERO)
            .with_baseline(logger.clone());
        let outcome = runner.run(&config).await;

        assert_eq!(outcome.record.unwrap().test_name, "custom-profile.json");
        let log = std::fs::read_to_string(logger.log_file()).unwrap();
        assert!(log.lines().nth(1).unwrap().starts_with("custom-profile.json,"));
    }

    #[tokio::test]
    async fn test_record_excludes_analysis_time() {
        let dir = TempDir::new().unwrap();
        let result = dir.path().join("concurrency-medium-results.json");
        std::fs::write(&result, "{}").unwrap();
        let config = write_config(&dir, "concurrency-medium.json", &result);

        let logger = BaselineLogger::new(
            &crate::config::BaselineConfig {
                enabled: true,
                ..Default::default()
            },
            dir.path(),
        );
        let tool = Arc::new(
            ScriptedTool::new()
                .analysis_text("Mean TTFT (ms): 40.0")
                .analysis_delay(Duration::from_millis(1200)),
        );
        let runner = TestRunner::new(tool.clone(), Duration::ZERO).with_baseline(logger);
        let outcome = runner.run(&config).await;
        let finished = Utc::now();

        assert!(outcome.analysis.is_some());
        let record = outcome.record.expect("baseline record");
        assert_eq!(record.duration_seconds, 0);

        let end = chrono::DateTime::parse_from_rfc3339(&record.end_timestamp)
            .unwrap()
            .with_timezone(&Utc);
        assert!(finished - end >= chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_baseline_records_benchmark_window() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("concurrency-200.json");
        std::fs::write(&config, "{}").unwrap();

        let logger = BaselineLogger::new(
            &crate::config::BaselineConfig {
                enabled: true,
                log_file: Some(dir.path().join("timestamps.csv")),
                ..Default::default()
            },
            dir.path(),
        );
        let runner = TestRunner::new(Arc::new(ScriptedTool::new()), Duration::ZERO)
            .with_baseline(logger);
        let outcome = runner.run(&config).await;

        let record = outcome.record.expect("baseline record");
        assert_eq!(record.test_name, "concurrency-200.json");
        let log = std::fs::read_to_string(dir.path().join("timestamps.csv")).unwrap();
        assert_eq!(log.lines().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_applies_after_failure() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("concurrency-low.json");
        std::fs::write(&config, "{}").unwrap();

        let tool = Arc::new(ScriptedTool::new().fail_benchmark("concurrency-low.json", 1));
        let runner = TestRunner::new(tool, Duration::from_secs(30));

        let start = tokio::time::Instant::now();
        let outcome = runner.run(&config).await;
        assert!(!outcome.succeeded());
        assert!(start.elapsed() >= Duration::from_secs(30));
    }
}
