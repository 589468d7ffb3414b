//! Scalar metrics scraped from the analysis tool's text output.
//!
//! The tool prints one `label: value` line per metric. Label spelling and the
//! whitespace field holding the value are fixed by the tool's output format.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Series names written to the metrics JSON, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    MeanTtft,
    P99Ttft,
    Throughput,
    OutputTokenThroughput,
    MeanTpot,
    P99Tpot,
    MeanItl,
    P99Itl,
    SuccessfulRequests,
    Duration,
}

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::MeanTtft,
        Metric::P99Ttft,
        Metric::Throughput,
        Metric::OutputTokenThroughput,
        Metric::MeanTpot,
        Metric::P99Tpot,
        Metric::MeanItl,
        Metric::P99Itl,
        Metric::SuccessfulRequests,
        Metric::Duration,
    ];

    /// Line prefix the analysis tool prints for this metric.
    pub fn label(self) -> &'static str {
        match self {
            Self::MeanTtft => "Mean TTFT",
            Self::P99Ttft => "P99 TTFT",
            Self::Throughput => "Request throughput",
            Self::OutputTokenThroughput => "Output token throughput",
            Self::MeanTpot => "Mean TPOT",
            Self::P99Tpot => "P99 TPOT",
            Self::MeanItl => "Mean ITL",
            Self::P99Itl => "P99 ITL",
            Self::SuccessfulRequests => "Successful requests:",
            Self::Duration => "Benchmark duration",
        }
    }

    /// Human-readable name for reports: the label without its trailing colon.
    pub fn title(self) -> &'static str {
        self.label().trim_end_matches(':')
    }

    /// Zero-based whitespace field holding the value on the labelled line.
    ///
    /// `Mean TTFT (ms): 123.4` → field 3, `Successful requests: 100` → field 2.
    pub fn field_index(self) -> usize {
        match self {
            Self::SuccessfulRequests => 2,
            Self::OutputTokenThroughput => 4,
            _ => 3,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::MeanTtft => "mean_ttft",
            Self::P99Ttft => "p99_ttft",
            Self::Throughput => "throughput",
            Self::OutputTokenThroughput => "output_token_throughput",
            Self::MeanTpot => "mean_tpot",
            Self::P99Tpot => "p99_tpot",
            Self::MeanItl => "mean_itl",
            Self::P99Itl => "p99_itl",
            Self::SuccessfulRequests => "successful_requests",
            Self::Duration => "duration",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw per-file extraction. `None` means the label was absent or unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedMetrics {
    values: [Option<f64>; Metric::ALL.len()],
}

impl ExtractedMetrics {
    /// Scrape every known label from `text`. Missing labels stay `None`.
    pub fn parse(text: &str) -> Self {
        let mut extracted = Self::default();
        for (slot, metric) in extracted.values.iter_mut().zip(Metric::ALL) {
            *slot = extract_field(text, metric.label(), metric.field_index());
        }
        extracted
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values[metric as usize]
    }

    /// Value formatted the way the summary reports it: "N/A" for a missing
    /// mean TTFT, "0" for any other missing metric.
    pub fn display(&self, metric: Metric) -> String {
        match (self.get(metric), metric) {
            (Some(v), Metric::SuccessfulRequests) => format!("{}", v as u64),
            (Some(v), _) => format!("{v}"),
            (None, Metric::MeanTtft) => "N/A".to_string(),
            (None, _) => "0".to_string(),
        }
    }
}

/// First line containing `label`, split on whitespace, field `index`.
fn extract_field(text: &str, label: &str, index: usize) -> Option<f64> {
    let line = text.lines().find(|line| line.contains(label))?;
    line.split_whitespace().nth(index)?.parse().ok()
}

/// One analysed result file, resolved to its concurrency level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub concurrency_level: u32,
    pub mean_ttft: f64,
    pub p99_ttft: f64,
    pub throughput: f64,
    pub output_token_throughput: f64,
    pub mean_tpot: f64,
    pub p99_tpot: f64,
    pub mean_itl: f64,
    pub p99_itl: f64,
    pub successful_requests: u64,
    pub duration: f64,
}

impl MetricSample {
    /// Build a sample; `None` when the concurrency level is unresolved (`0`)
    /// or mean TTFT is missing. Other missing metrics degrade to `0`.
    pub fn from_extracted(concurrency_level: u32, extracted: &ExtractedMetrics) -> Option<Self> {
        if concurrency_level == 0 {
            return None;
        }
        let mean_ttft = extracted.get(Metric::MeanTtft)?;
        let or_zero = |metric| extracted.get(metric).unwrap_or(0.0);

        Some(Self {
            concurrency_level,
            mean_ttft,
            p99_ttft: or_zero(Metric::P99Ttft),
            throughput: or_zero(Metric::Throughput),
            output_token_throughput: or_zero(Metric::OutputTokenThroughput),
            mean_tpot: or_zero(Metric::MeanTpot),
            p99_tpot: or_zero(Metric::P99Tpot),
            mean_itl: or_zero(Metric::MeanItl),
            p99_itl: or_zero(Metric::P99Itl),
            successful_requests: or_zero(Metric::SuccessfulRequests) as u64,
            duration: or_zero(Metric::Duration),
        })
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::MeanTtft => self.mean_ttft,
            Metric::P99Ttft => self.p99_ttft,
            Metric::Throughput => self.throughput,
            Metric::OutputTokenThroughput => self.output_token_throughput,
            Metric::MeanTpot => self.mean_tpot,
            Metric::P99Tpot => self.p99_tpot,
            Metric::MeanItl => self.mean_itl,
            Metric::P99Itl => self.p99_itl,
            Metric::SuccessfulRequests => self.successful_requests as f64,
            Metric::Duration => self.duration,
        }
    }
}

/// Stable sort by concurrency ascending; ties keep discovery order.
pub fn sort_samples(samples: &mut [MetricSample]) {
    samples.sort_by_key(|s| s.concurrency_level);
}
