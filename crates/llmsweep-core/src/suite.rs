//! Named suites over the test catalog and the sequential suite runner.

use indicatif::ProgressBar;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use crate::catalog::TestId;
use crate::error::SweepError;
use crate::runner::{RunOutcome, TestRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suite {
    Basic,
    Standard,
    Extended,
    Full,
    HighLoad,
}

impl Suite {
    pub const ALL: [Suite; 5] = [
        Suite::Basic,
        Suite::Standard,
        Suite::Extended,
        Suite::Full,
        Suite::HighLoad,
    ];

    /// Suite run when no target is given.
    pub const DEFAULT: Suite = Suite::Full;

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Extended => "extended",
            Self::Full => "full",
            Self::HighLoad => "high-load",
        }
    }

    pub fn alias(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Standard => 2,
            Self::Extended => 3,
            Self::Full => 4,
            Self::HighLoad => 5,
        }
    }

    /// Member tests in execution order. Concurrency never decreases.
    pub fn members(self) -> &'static [TestId] {
        use TestId::*;
        match self {
            Self::Basic => &[Low, Medium, High],
            Self::Standard => &[Low, Medium, High, Users50, Users100],
            Self::Extended => &[Low, Medium, High, Users50, Users100, Users200],
            Self::Full => &[
                Low, Medium, High, Users50, Users100, Users200, Users500, Users1000,
            ],
            Self::HighLoad => &[Users200, Users500, Users1000],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Basic => "low, medium and high concurrency",
            Self::Standard => "basic plus 50 and 100 concurrent users",
            Self::Extended => "standard plus 200 concurrent users",
            Self::Full => "every profile up to 1000 concurrent users",
            Self::HighLoad => "200, 500 and 1000 concurrent users only",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Suite {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Suite::ALL
            .into_iter()
            .find(|suite| suite.name() == s || suite.alias().to_string() == s)
            .ok_or_else(|| SweepError::UnknownTarget(s.to_string()))
    }
}

/// What a CLI invocation asks to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Suite(Suite),
    /// A literal configuration file name or path.
    Config(PathBuf),
}

impl Target {
    /// Config files share the result-file extension.
    pub const CONFIG_EXTENSION: &'static str = ".json";

    /// Parse an optional positional argument. `None` selects [`Suite::DEFAULT`].
    pub fn parse(arg: Option<&str>) -> Result<Self, SweepError> {
        match arg {
            None => Ok(Self::Suite(Suite::DEFAULT)),
            Some(arg) if arg.ends_with(Self::CONFIG_EXTENSION) => {
                Ok(Self::Config(PathBuf::from(arg)))
            }
            Some(arg) => arg.parse().map(Self::Suite),
        }
    }
}

/// Aggregate result of a suite run.
#[derive(Debug)]
pub struct SuiteReport {
    pub suite: Suite,
    pub outcomes: Vec<RunOutcome>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }
}

/// Runs suite members one after another through a [`TestRunner`].
pub struct SuiteRunner<'a> {
    runner: &'a TestRunner,
    configs_dir: PathBuf,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(runner: &'a TestRunner, configs_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            configs_dir: configs_dir.into(),
        }
    }

    pub fn config_path(&self, id: TestId) -> PathBuf {
        self.configs_dir.join(id.file_name())
    }

    /// Resolve a literal config target: bare names live in the configs directory.
    pub fn resolve_config(&self, config: &Path) -> PathBuf {
        if config.components().count() == 1 && !config.exists() {
            self.configs_dir.join(config)
        } else {
            config.to_path_buf()
        }
    }

    pub async fn run_suite(&self, suite: Suite, pb: &ProgressBar) -> SuiteReport {
        let members = suite.members();

        info!(
            "🚀 Running {} suite: {} ({} tests)",
            suite,
            suite.description(),
            members.len()
        );

        if suite == Suite::Full {
            warn!(
                "⚠️  The full suite escalates to 1000 concurrent users. High-load \
                 profiles may time out requests or destabilise the backend. \
                 Continuing automatically."
            );
        }

        pb.set_length(members.len() as u64);
        pb.set_position(0);

        let mut outcomes = Vec::with_capacity(members.len());
        for (idx, id) in members.iter().enumerate() {
            pb.set_message(format!(
                "[{}/{}] {}",
                idx + 1,
                members.len(),
                id.definition().display_name
            ));

            let outcome = self.runner.run(&self.config_path(*id)).await;
            outcomes.push(outcome);
            pb.inc(1);
        }

        let report = SuiteReport { suite, outcomes };
        pb.finish_with_message(format!(
            "{} suite: {} passed, {} failed",
            suite,
            report.passed(),
            report.failed()
        ));
        report
    }
}
