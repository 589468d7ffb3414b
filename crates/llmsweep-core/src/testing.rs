//! In-process [`BenchmarkTool`] for tests and dry runs.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SweepResult;
use crate::runner::find_output_file;
use crate::tool::{BenchmarkTool, ExitStatus, ToolOutput};

/// Scripted tool that records every invocation.
///
/// Exit codes and analysis text are keyed by file name. Unscripted
/// benchmarks succeed; unscripted analyses return the default text.
#[derive(Debug, Default)]
pub struct ScriptedTool {
    benchmark_failures: HashMap<String, i32>,
    analysis_failures: HashMap<String, i32>,
    analysis_texts: HashMap<String, String>,
    default_analysis: String,
    analysis_delay: Duration,
    write_results: bool,
    benchmarked: Mutex<Vec<PathBuf>>,
    analysed: Mutex<Vec<PathBuf>>,
}

impl ScriptedTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the benchmark for `file_name` exit with `code`.
    pub fn fail_benchmark(mut self, file_name: &str, code: i32) -> Self {
        self.benchmark_failures.insert(file_name.to_string(), code);
        self
    }

    /// Make the analysis of `file_name` exit with `code`.
    pub fn fail_analysis(mut self, file_name: &str, code: i32) -> Self {
        self.analysis_failures.insert(file_name.to_string(), code);
        self
    }

    /// Text returned when analysing any file without a specific script.
    pub fn analysis_text(mut self, text: impl Into<String>) -> Self {
        self.default_analysis = text.into();
        self
    }

    /// Text returned when analysing `file_name`.
    pub fn analysis_for(mut self, file_name: &str, text: impl Into<String>) -> Self {
        self.analysis_texts.insert(file_name.to_string(), text.into());
        self
    }

    /// Make every analysis take `delay` of real time before returning.
    pub fn analysis_delay(mut self, delay: Duration) -> Self {
        self.analysis_delay = delay;
        self
    }

    /// On successful benchmarks, create the config's declared result file.
    pub fn write_results(mut self) -> Self {
        self.write_results = true;
        self
    }

    pub fn benchmarked(&self) -> Vec<PathBuf> {
        self.benchmarked.lock().clone()
    }

    pub fn analysed(&self) -> Vec<PathBuf> {
        self.analysed.lock().clone()
    }

    /// File names of benchmarked configs, in invocation order.
    pub fn benchmarked_names(&self) -> Vec<String> {
        self.benchmarked().iter().map(|p| file_name(p)).collect()
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl BenchmarkTool for ScriptedTool {
    async fn benchmark(&self, config_path: &Path) -> SweepResult<ExitStatus> {
        self.benchmarked.lock().push(config_path.to_path_buf());

        if let Some(code) = self.benchmark_failures.get(&file_name(config_path)) {
            return Ok(ExitStatus::failure(*code));
        }

        if self.write_results {
            let text = std::fs::read_to_string(config_path)?;
            if let Some(output) = find_output_file(&text) {
                std::fs::write(output, "{}")?;
            }
        }

        Ok(ExitStatus::SUCCESS)
    }

    async fn analyse(&self, result_path: &Path) -> SweepResult<ToolOutput> {
        self.analysed.lock().push(result_path.to_path_buf());

        if !self.analysis_delay.is_zero() {
            tokio::time::sleep(self.analysis_delay).await;
        }

        let name = file_name(result_path);
        let output = self
            .analysis_texts
            .get(&name)
            .cloned()
            .unwrap_or_else(|| self.default_analysis.clone());
        let status = self
            .analysis_failures
            .get(&name)
            .map_or(ExitStatus::SUCCESS, |code| ExitStatus::failure(*code));

        Ok(ToolOutput { status, output })
    }
}
