//! Test result data structures

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;

/// Outcome of a single test execution, as recorded in TRX documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum TestOutcome {
    /// Test ran and passed.
    Passed,
    /// Test ran and failed.
    Failed,
    /// Test was not executed (skipped, filtered out, or never run).
    #[default]
    NotExecuted,
    /// Test ran but the framework could not decide pass/fail.
    Inconclusive,
    /// Test was aborted after exceeding its time limit.
    Timeout,
    /// Test is awaiting execution.
    Pending,
}

impl TestOutcome {
    /// All outcomes, in display order: Failed and Passed first, then the
    /// outcomes without a dedicated partition.
    pub const DISPLAY_ORDER: [TestOutcome; 6] = [
        TestOutcome::Failed,
        TestOutcome::Passed,
        TestOutcome::NotExecuted,
        TestOutcome::Inconclusive,
        TestOutcome::Timeout,
        TestOutcome::Pending,
    ];

    /// Position of this outcome in [`Self::DISPLAY_ORDER`].
    pub fn display_rank(&self) -> usize {
        Self::DISPLAY_ORDER
            .iter()
            .position(|o| o == self)
            .unwrap_or(Self::DISPLAY_ORDER.len())
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestOutcome::Passed => "Passed",
            TestOutcome::Failed => "Failed",
            TestOutcome::NotExecuted => "NotExecuted",
            TestOutcome::Inconclusive => "Inconclusive",
            TestOutcome::Timeout => "Timeout",
            TestOutcome::Pending => "Pending",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for TestOutcome {
    type Err = Error;

    /// Parses the TRX spelling of an outcome. An unknown spelling is an
    /// error: an absent attribute defaults to `NotExecuted`, but a present
    /// value that is not in the dialect means the file does not conform.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Passed" => Ok(TestOutcome::Passed),
            "Failed" => Ok(TestOutcome::Failed),
            "NotExecuted" => Ok(TestOutcome::NotExecuted),
            "Inconclusive" => Ok(TestOutcome::Inconclusive),
            "Timeout" => Ok(TestOutcome::Timeout),
            "Pending" => Ok(TestOutcome::Pending),
            other => Err(Error::InvalidOutcome(other.to_string())),
        }
    }
}

fn serialize_opt_duration<S>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match d {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}

/// Result of a single test execution.
///
/// The unit of record produced by the TRX parser. `test_name`,
/// `class_name` and `namespace_name` are derived once at construction from
/// `fully_qualified_test_name`; the inference is pure, depends only on the
/// name, and degrades gracefully for names that are not conventional
/// dotted identifiers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// The canonical key: the dotted identifier naming the test.
    pub fully_qualified_test_name: String,
    /// Execution outcome; `NotExecuted` when the source had none.
    pub outcome: TestOutcome,
    /// Wall-clock time the test took, if recorded.
    #[serde(serialize_with = "serialize_opt_duration")]
    pub duration: Option<Duration>,
    /// When the test started, if recorded.
    pub start_time: Option<DateTime<FixedOffset>>,
    /// When the test finished, if recorded.
    pub end_time: Option<DateTime<FixedOffset>>,
    /// Root directory of the test project, derived from `codebase`.
    pub test_project_directory: Option<PathBuf>,
    /// The .trx file this result came from; unset for in-memory results.
    pub test_output_file: Option<PathBuf>,
    /// Path of the compiled test binary, from the test definition record.
    pub codebase: Option<PathBuf>,
    /// Captured stdout, normally present only for failed tests.
    pub std_out: Option<String>,
    /// Failure message, normally present only for failed tests.
    pub error_message: Option<String>,
    /// Stack trace, normally present only for failed tests.
    pub stack_trace: Option<String>,
    /// Last segment of the qualified name, or the whole name when the
    /// name could not be split.
    pub test_name: String,
    /// Second-to-last segment of the qualified name.
    pub class_name: Option<String>,
    /// Dot-join of every segment before the class name.
    pub namespace_name: Option<String>,
}

impl TestResult {
    /// Create a test result, deriving the name parts.
    pub fn new(fully_qualified_test_name: impl Into<String>, outcome: TestOutcome) -> Self {
        let fully_qualified_test_name = fully_qualified_test_name.into();
        let (test_name, class_name, namespace_name) =
            derive_name_parts(&fully_qualified_test_name);

        TestResult {
            fully_qualified_test_name,
            outcome,
            duration: None,
            start_time: None,
            end_time: None,
            test_project_directory: None,
            test_output_file: None,
            codebase: None,
            std_out: None,
            error_message: None,
            stack_trace: None,
            test_name,
            class_name,
            namespace_name,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Set the start time
    pub fn with_start_time(mut self, start_time: DateTime<FixedOffset>) -> Self {
        self.start_time = Some(start_time);
        self
    }

    /// Set the end time
    pub fn with_end_time(mut self, end_time: DateTime<FixedOffset>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Set the codebase path
    pub fn with_codebase(mut self, codebase: impl Into<PathBuf>) -> Self {
        self.codebase = Some(codebase.into());
        self
    }

    /// Set the captured stdout
    pub fn with_std_out(mut self, std_out: impl Into<String>) -> Self {
        self.std_out = Some(std_out.into());
        self
    }

    /// Set the failure message
    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    /// Set the stack trace
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }
}

/// Split a fully qualified test name into (test, class, namespace) parts.
///
/// Names with fewer than two dot-segments, and names whose class-qualified
/// prefix contains a space (a notebook cell label like
/// `"Cell 1: Console.Write(...)"` rather than a dotted identifier), are
/// left unsplit: the whole input becomes the test name.
fn derive_name_parts(name: &str) -> (String, Option<String>, Option<String>) {
    let parts: Vec<&str> = name.split('.').collect();

    if parts.len() < 2 {
        return (name.to_string(), None, None);
    }

    let prefix_len = name.len() - parts[parts.len() - 1].len() - 1;
    if name[..prefix_len].contains(' ') {
        return (name.to_string(), None, None);
    }

    let test_name = parts[parts.len() - 1].to_string();
    let class_name = parts[parts.len() - 2].to_string();
    let namespace_name = parts[..parts.len() - 2].join(".");

    (test_name, Some(class_name), Some(namespace_name))
}
