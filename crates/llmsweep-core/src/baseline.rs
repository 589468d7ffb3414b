//! Timestamp log and placeholder metric files for baseline comparisons.
//!
//! The log is an append-only CSV with one row per benchmark invocation. The
//! placeholder files are created once and later filled in by hand from the
//! serving platform's monitoring API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::BaselineConfig;
use crate::error::SweepResult;

/// Header row written once per log file.
pub const LOG_HEADER: [&str; 4] = [
    "test_name",
    "start_timestamp",
    "end_timestamp",
    "duration_seconds",
];

/// Placeholder metric files created under the placeholder directory.
pub const PLACEHOLDER_FILES: [&str; 4] = [
    "gpu_utilization.json",
    "gpu_memory.json",
    "kv_cache_usage.json",
    "request_queue.json",
];

/// Wall-clock bracket around one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub test_name: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub duration_seconds: i64,
}

impl RunRecord {
    pub fn new(test_name: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            test_name: test_name.into(),
            start_timestamp: start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end_timestamp: end.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_seconds: (end - start).num_seconds(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Placeholder<'a> {
    metric: &'a str,
    status: &'a str,
    values: Vec<serde_json::Value>,
    collection: &'a str,
    token_env_var: &'a str,
}

/// Single-writer appender for [`RunRecord`]s.
#[derive(Debug, Clone)]
pub struct BaselineLogger {
    log_file: PathBuf,
    placeholder_dir: PathBuf,
    token_env_var: String,
}

impl BaselineLogger {
    /// Unset paths in `config` resolve under `results_dir`.
    pub fn new(config: &BaselineConfig, results_dir: &Path) -> Self {
        Self {
            log_file: config.log_file_in(results_dir),
            placeholder_dir: config.placeholder_dir_in(results_dir),
            token_env_var: config.token_env_var.clone(),
        }
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn placeholder_dir(&self) -> &Path {
        &self.placeholder_dir
    }

    /// Append one record, writing the header first if the log is new or empty.
    pub fn log(&self, record: &RunRecord) -> SweepResult<()> {
        if let Some(parent) = self.log_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let needs_header = fs::metadata(&self.log_file)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(LOG_HEADER)?;
        }
        writer.serialize(record)?;
        writer.flush()?;

        debug!(
            "Logged {} ({}s) to {}",
            record.test_name,
            record.duration_seconds,
            self.log_file.display()
        );
        Ok(())
    }

    /// Create any missing placeholder files; existing ones are left untouched.
    ///
    /// Returns the paths that were created by this call.
    pub fn ensure_placeholders(&self) -> SweepResult<Vec<PathBuf>> {
        fs::create_dir_all(&self.placeholder_dir)?;

        let mut created = Vec::new();
        for name in PLACEHOLDER_FILES {
            let path = self.placeholder_dir.join(name);
            if path.exists() {
                continue;
            }

            let metric = name.trim_end_matches(".json");
            let placeholder = Placeholder {
                metric,
                status: "pending",
                values: Vec::new(),
                collection: "manual: export from the serving platform's monitoring API \
                             for each window in the timestamp log",
                token_env_var: &self.token_env_var,
            };
            fs::write(&path, serde_json::to_string_pretty(&placeholder)?)?;
            created.push(path);
        }

        if !created.is_empty() {
            info!(
                "Created {} placeholder metric files in {}",
                created.len(),
                self.placeholder_dir.display()
            );
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn logger(dir: &TempDir) -> BaselineLogger {
        let config = BaselineConfig {
            enabled: true,
            ..BaselineConfig::default()
        };
        BaselineLogger::new(&config, dir.path())
    }

    fn record(name: &str) -> RunRecord {
        let start = Utc::now();
        RunRecord::new(name, start, start + Duration::seconds(42))
    }

    #[test]
    fn test_run_record_duration() {
        let r = record("concurrency-low.json");
        assert_eq!(r.duration_seconds, 42);
        assert!(r.start_timestamp.ends_with('Z'));
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);

        logger.log(&record("concurrency-low.json")).unwrap();
        logger.log(&record("concurrency-medium.json")).unwrap();

        let contents = fs::read_to_string(logger.log_file()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_HEADER.join(","));
        assert!(lines[1].starts_with("concurrency-low.json,"));
        assert!(lines[2].starts_with("concurrency-medium.json,"));
        assert!(lines[2].ends_with(",42"));
    }

    #[test]
    fn test_header_added_to_empty_existing_log() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        fs::create_dir_all(logger.log_file().parent().unwrap()).unwrap();
        fs::write(logger.log_file(), "").unwrap();

        logger.log(&record("concurrency-high.json")).unwrap();

        let contents = fs::read_to_string(logger.log_file()).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.starts_with("test_name,"));
    }

    #[test]
    fn test_placeholders_never_overwritten() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);

        let created = logger.ensure_placeholders().unwrap();
        assert_eq!(created.len(), PLACEHOLDER_FILES.len());

        let gpu = dir.path().join("baseline").join("gpu_utilization.json");
        fs::write(&gpu, r#"{"metric":"gpu_utilization","values":[81.5]}"#).unwrap();

        let created_again = logger.ensure_placeholders().unwrap();
        assert!(created_again.is_empty());
        assert!(fs::read_to_string(&gpu).unwrap().contains("81.5"));
    }

    #[test]
    fn test_paths_follow_results_dir() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        assert_eq!(
            logger.log_file(),
            dir.path().join("baseline").join("timestamps.csv")
        );
        assert_eq!(logger.placeholder_dir(), dir.path().join("baseline"));

        let explicit = BaselineConfig {
            log_file: Some(PathBuf::from("/var/log/sweep.csv")),
            ..BaselineConfig::default()
        };
        let logger = BaselineLogger::new(&explicit, dir.path());
        assert_eq!(logger.log_file(), Path::new("/var/log/sweep.csv"));
        assert_eq!(logger.placeholder_dir(), dir.path().join("baseline"));
    }

    #[test]
    fn test_placeholder_names_token_variable() {
        let dir = TempDir::new().unwrap();
        let logger = logger(&dir);
        logger.ensure_placeholders().unwrap();

        let raw = fs::read_to_string(dir.path().join("baseline").join("request_queue.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["metric"], "request_queue");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["token_env_var"], "METRICS_API_TOKEN");
    }
}
