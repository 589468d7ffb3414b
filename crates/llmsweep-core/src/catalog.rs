//! Static catalog of concurrency test profiles.

use std::fmt;
use std::path::Path;

/// Display name of the sentinel returned for unknown identifiers.
pub const UNKNOWN_TEST_NAME: &str = "Unknown Test";

/// One catalog entry per configuration file shipped with the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestId {
    Low,
    Medium,
    High,
    Users50,
    Users100,
    Users200,
    Users500,
    Users1000,
}

/// Declared targets for one load profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    /// Configuration file name, e.g. `concurrency-high.json`.
    pub identifier: String,
    pub display_name: String,
    /// Simultaneous in-flight requests. `0` marks an unresolved definition.
    pub concurrency_limit: u32,
    pub rps_target: u32,
    /// Risk annotation printed before the test runs.
    pub warning: Option<String>,
}

impl TestId {
    /// Every entry, in ladder order.
    pub const ALL: [TestId; 8] = [
        TestId::Low,
        TestId::Medium,
        TestId::High,
        TestId::Users50,
        TestId::Users100,
        TestId::Users200,
        TestId::Users500,
        TestId::Users1000,
    ];

    /// Configuration file name for this entry.
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Low => "concurrency-low.json",
            Self::Medium => "concurrency-medium.json",
            Self::High => "concurrency-high.json",
            Self::Users50 => "concurrency-50.json",
            Self::Users100 => "concurrency-100.json",
            Self::Users200 => "concurrency-200.json",
            Self::Users500 => "concurrency-500.json",
            Self::Users1000 => "concurrency-1000.json",
        }
    }

    /// Resolve from a file name or a path whose file name is a catalog entry.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let name = file_name_of(identifier);
        Self::ALL.into_iter().find(|id| id.file_name() == name)
    }

    pub fn definition(self) -> TestDefinition {
        let (display_name, concurrency_limit, rps_target, warning) = match self {
            Self::Low => ("Low Concurrency", 5, 10, None),
            Self::Medium => ("Medium Concurrency", 10, 20, None),
            Self::High => ("High Concurrency", 25, 50, None),
            Self::Users50 => ("50 Concurrent Users", 50, 100, None),
            Self::Users100 => ("100 Concurrent Users", 100, 200, None),
            Self::Users200 => (
                "200 Concurrent Users",
                200,
                400,
                Some("High load test: backend latency may degrade sharply"),
            ),
            Self::Users500 => (
                "500 Concurrent Users",
                500,
                1000,
                Some("Very high load test: expect request timeouts and queueing"),
            ),
            Self::Users1000 => (
                "1000 Concurrent Users",
                1000,
                2000,
                Some("Extreme load test: may overwhelm or crash the serving backend"),
            ),
        };

        TestDefinition {
            identifier: self.file_name().to_string(),
            display_name: display_name.to_string(),
            concurrency_limit,
            rps_target,
            warning: warning.map(str::to_string),
        }
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

impl TestDefinition {
    /// Sentinel for identifiers the catalog does not know.
    pub fn unknown(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name: UNKNOWN_TEST_NAME.to_string(),
            concurrency_limit: 0,
            rps_target: 0,
            warning: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.concurrency_limit != 0
    }
}

/// Final path component of `identifier`, or the whole string if it has none.
fn file_name_of(identifier: &str) -> &str {
    Path::new(identifier)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(identifier)
}

/// Look up a test definition by configuration identifier.
///
/// Never fails: unknown identifiers yield [`TestDefinition::unknown`], keyed
/// by file name like every catalog entry.
pub fn lookup(identifier: &str) -> TestDefinition {
    match TestId::from_identifier(identifier) {
        Some(id) => id.definition(),
        None => TestDefinition::unknown(file_name_of(identifier)),
    }
}
