//! Concurrency sweep driver and metrics aggregation for an external LLM
//! load-testing tool.

pub mod aggregate;
pub mod baseline;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod error;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod runner;
pub mod suite;
pub mod testing;
pub mod tool;

pub use aggregate::{Aggregation, AnalysisStatus, Aggregator, FileAnalysis};
pub use baseline::{BaselineLogger, RunRecord};
pub use catalog::{lookup, TestDefinition, TestId};
pub use compare::{compare, ClaimsSource, ComparisonOutcome};
pub use config::{ConfigError, SweepConfig};
pub use error::{SweepError, SweepResult};
pub use metrics::{ExtractedMetrics, Metric, MetricSample};
pub use report::MetricsDocument;
pub use runner::{RunOutcome, RunStatus, TestRunner};
pub use suite::{Suite, SuiteReport, SuiteRunner, Target};
pub use tool::{BenchmarkTool, ExitStatus, ExternalTool, ToolOutput};
