//! Seam between the sweep and the external load-testing binary.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{SweepError, SweepResult};

/// Exit status of one external invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    /// Process exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl ExitStatus {
    pub const SUCCESS: ExitStatus = ExitStatus { code: Some(0) };

    pub fn failure(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Captured analysis run: exit status plus stdout and stderr interleaved in
/// write order, as a shell `2>&1` would capture them.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub output: String,
}

/// Interface to the external benchmark/analysis tool.
#[async_trait]
pub trait BenchmarkTool: Send + Sync {
    /// Runs one load profile. Output goes straight to the terminal.
    async fn benchmark(&self, config_path: &Path) -> SweepResult<ExitStatus>;

    /// Summarises one result file, capturing stdout and stderr as one stream.
    async fn analyse(&self, result_path: &Path) -> SweepResult<ToolOutput>;
}

/// [`BenchmarkTool`] backed by a real subprocess.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    binary: String,
    benchmark_subcommand: String,
    analyse_subcommand: String,
}

impl ExternalTool {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            benchmark_subcommand: config.benchmark_subcommand.clone(),
            analyse_subcommand: config.analyse_subcommand.clone(),
        }
    }

    fn command(&self, subcommand: &str, path: &Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(subcommand).arg(path).stdin(Stdio::null());
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> SweepError {
        SweepError::Spawn {
            binary: self.binary.clone(),
            source,
        }
    }
}

#[async_trait]
impl BenchmarkTool for ExternalTool {
    async fn benchmark(&self, config_path: &Path) -> SweepResult<ExitStatus> {
        debug!(
            "{} {} {}",
            self.binary,
            self.benchmark_subcommand,
            config_path.display()
        );

        let status = self
            .command(&self.benchmark_subcommand, config_path)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        Ok(status.into())
    }

    async fn analyse(&self, result_path: &Path) -> SweepResult<ToolOutput> {
        debug!(
            "{} {} {}",
            self.binary,
            self.analyse_subcommand,
            result_path.display()
        );

        // Both streams share one file description, so writes land in order.
        let capture = tempfile::tempfile()?;
        let stdout = capture.try_clone()?;
        let stderr = capture.try_clone()?;

        let status = self
            .command(&self.analyse_subcommand, result_path)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let mut capture = tokio::fs::File::from_std(capture);
        capture.seek(SeekFrom::Start(0)).await?;
        let mut bytes = Vec::new();
        capture.read_to_end(&mut bytes).await?;

        Ok(ToolOutput {
            status: status.into(),
            output: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
