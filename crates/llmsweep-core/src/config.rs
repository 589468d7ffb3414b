//! Configuration management for llmsweep.
//!
//! Supports multiple configuration sources with precedence:
//! 1. Environment variables (highest priority)
//! 2. TOML configuration file
//! 3. Default values (lowest priority)
//!
//! CLI flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "llmsweep.toml";

/// Baseline files default to this subdirectory of the results directory.
pub const BASELINE_DIR: &str = "baseline";

pub const TIMESTAMP_LOG_FILE: &str = "timestamps.csv";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config file {path}: {source}")]
    TomlError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

/// Main configuration structure for a sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    /// External benchmark tool invocation
    #[serde(default)]
    pub tool: ToolConfig,

    /// Input and output locations
    #[serde(default)]
    pub paths: PathsConfig,

    /// Timestamp log and placeholder metric files
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Per-test execution policy
    #[serde(default)]
    pub run: RunConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How the external tool is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Binary name or path (default: "llm-bench")
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Subcommand that runs a load profile (default: "benchmark")
    #[serde(default = "default_benchmark_subcommand")]
    pub benchmark_subcommand: String,

    /// Subcommand that summarises a result file (default: "analyse")
    #[serde(default = "default_analyse_subcommand")]
    pub analyse_subcommand: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding `concurrency-*.json` configs (default: "configs")
    #[serde(default = "default_configs_dir")]
    pub configs_dir: PathBuf,

    /// Directory result files and reports land in (default: "results")
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Record run timestamps and create placeholder files (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// CSV timestamp log (default: "<results_dir>/baseline/timestamps.csv")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Directory for placeholder metric files (default: "<results_dir>/baseline")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder_dir: Option<PathBuf>,

    /// Bearer-token variable used by the manual collection workflow.
    /// Only the name is recorded; the value is never read.
    #[serde(default = "default_token_env_var")]
    pub token_env_var: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Pause after every test so the backend can recover (default: 30)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty (default: "pretty")
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_binary() -> String {
    "llm-bench".to_string()
}

fn default_benchmark_subcommand() -> String {
    "benchmark".to_string()
}

fn default_analyse_subcommand() -> String {
    "analyse".to_string()
}

fn default_configs_dir() -> PathBuf {
    PathBuf::from("configs")
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_token_env_var() -> String {
    "METRICS_API_TOKEN".to_string()
}

fn default_cooldown_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            benchmark_subcommand: default_benchmark_subcommand(),
            analyse_subcommand: default_analyse_subcommand(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            configs_dir: default_configs_dir(),
            results_dir: default_results_dir(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_file: None,
            placeholder_dir: None,
            token_env_var: default_token_env_var(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BaselineConfig {
    /// Configured log file, or `<results_dir>/baseline/timestamps.csv`.
    pub fn log_file_in(&self, results_dir: &Path) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.placeholder_dir_in(results_dir).join(TIMESTAMP_LOG_FILE))
    }

    /// Configured placeholder directory, or `<results_dir>/baseline`.
    pub fn placeholder_dir_in(&self, results_dir: &Path) -> PathBuf {
        self.placeholder_dir
            .clone()
            .unwrap_or_else(|| results_dir.join(BASELINE_DIR))
    }
}

impl RunConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl SweepConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file doesn't exist or has invalid TOML syntax.
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::TomlError { path, source: e })
    }

    /// Load configuration with environment variable overrides.
    ///
    /// An explicit `path` must exist. Without one, `llmsweep.toml` is used if
    /// present, otherwise defaults.
    ///
    /// Supported environment variables:
    /// - `LLMSWEEP_BINARY` - External tool binary
    /// - `LLMSWEEP_CONFIGS_DIR` - Directory of test configurations
    /// - `LLMSWEEP_RESULTS_DIR` - Results directory
    /// - `LLMSWEEP_COOLDOWN_SECS` - Post-test cooldown
    /// - `LLMSWEEP_BASELINE` - Enable the timestamp/baseline logger
    /// - `LLMSWEEP_LOG_LEVEL` / `LLMSWEEP_LOG_FORMAT` - Logging
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(binary) = std::env::var("LLMSWEEP_BINARY") {
            self.tool.binary = binary;
        }

        if let Ok(dir) = std::env::var("LLMSWEEP_CONFIGS_DIR") {
            self.paths.configs_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = std::env::var("LLMSWEEP_RESULTS_DIR") {
            self.paths.results_dir = PathBuf::from(dir);
        }

        if let Ok(secs) = std::env::var("LLMSWEEP_COOLDOWN_SECS") {
            if let Ok(secs) = secs.parse() {
                self.run.cooldown_secs = secs;
            }
        }

        if let Ok(enabled) = std::env::var("LLMSWEEP_BASELINE") {
            if let Ok(enabled) = enabled.parse() {
                self.baseline.enabled = enabled;
            }
        }

        if let Ok(level) = std::env::var("LLMSWEEP_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("LLMSWEEP_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tool.binary.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "tool.binary cannot be empty".to_string(),
            ));
        }

        if self.tool.benchmark_subcommand.trim().is_empty()
            || self.tool.analyse_subcommand.trim().is_empty()
        {
            return Err(ConfigError::ValidationError(
                "tool subcommands cannot be empty".to_string(),
            ));
        }

        if self.paths.results_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "paths.results_dir cannot be empty".to_string(),
            ));
        }

        if self.baseline.enabled
            && matches!(&self.baseline.log_file, Some(path) if path.as_os_str().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "baseline.log_file cannot be empty when baseline logging is enabled".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log format: {}. Must be one of: {}",
                self.logging.format,
                valid_formats.join(", ")
            )));
        }

        Ok(())
    }
}
