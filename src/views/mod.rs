//! Rendering test result sets for terminal and machine consumption
//!
//! Each view renders a [`TestResultSet`] to a `String`; nothing here
//! writes to stdout directly, so views compose and test without capturing
//! process output.

pub mod execution_order;
pub mod hierarchical;
pub mod json;

use console::Style;
use std::time::Duration;

use crate::result_set::TestResultSet;
use crate::test_result::{TestOutcome, TestResult};

/// Styles used by the terminal views.
///
/// `auto` follows the terminal's color support, `plain` never emits escape
/// codes and `ansi` always does (for output that is piped into a pager or
/// a CI log that understands color).
#[derive(Debug, Clone)]
pub struct Theme {
    passed: Style,
    failed: Style,
    attention: Style,
    timeout: Style,
    dim: Style,
}

impl Theme {
    /// No styling at all.
    pub fn plain() -> Theme {
        Theme {
            passed: Style::new(),
            failed: Style::new(),
            attention: Style::new(),
            timeout: Style::new(),
            dim: Style::new(),
        }
    }

    /// Styled when the terminal supports it.
    pub fn auto() -> Theme {
        Theme::colored(false)
    }

    /// Always styled, regardless of terminal detection.
    pub fn ansi() -> Theme {
        Theme::colored(true)
    }

    fn colored(force: bool) -> Theme {
        let style = |style: Style| {
            if force {
                style.force_styling(true)
            } else {
                style
            }
        };
        Theme {
            passed: style(Style::new().green()),
            failed: style(Style::new().red()),
            attention: style(Style::new().yellow()),
            timeout: style(Style::new().magenta()),
            dim: style(Style::new().dim()),
        }
    }

    pub fn for_outcome(&self, outcome: TestOutcome) -> &Style {
        match outcome {
            TestOutcome::Passed => &self.passed,
            TestOutcome::Failed => &self.failed,
            TestOutcome::Timeout => &self.timeout,
            TestOutcome::NotExecuted | TestOutcome::Inconclusive | TestOutcome::Pending => {
                &self.attention
            }
        }
    }

    pub fn dim(&self) -> &Style {
        &self.dim
    }
}

impl Default for Theme {
    fn default() -> Theme {
        Theme::auto()
    }
}

pub(crate) struct ClassGroup<'a> {
    pub name: String,
    pub duration: Duration,
    pub tests: Vec<&'a TestResult>,
}

pub(crate) struct NamespaceGroup<'a> {
    pub name: String,
    pub duration: Duration,
    pub classes: Vec<ClassGroup<'a>>,
}

pub(crate) struct OutcomeGroup<'a> {
    pub outcome: TestOutcome,
    pub duration: Duration,
    pub namespaces: Vec<NamespaceGroup<'a>>,
}

/// Group results into the outcome / namespace / class hierarchy.
///
/// Namespaces and classes keep first-seen order within their parent;
/// outcome groups are ordered Failed first, Passed second, then the rest.
/// Durations are sums over the group's tests, with absent durations
/// counting as zero. Results without an inferred namespace or class fall
/// into a group named by the empty string.
pub(crate) fn group_by_outcome(results: &TestResultSet) -> Vec<OutcomeGroup<'_>> {
    let mut groups: Vec<OutcomeGroup> = Vec::new();

    for result in results.iter() {
        let duration = result.duration.unwrap_or(Duration::ZERO);

        let outcome_index = match groups.iter().position(|g| g.outcome == result.outcome) {
            Some(index) => index,
            None => {
                groups.push(OutcomeGroup {
                    outcome: result.outcome,
                    duration: Duration::ZERO,
                    namespaces: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let outcome_group = &mut groups[outcome_index];
        outcome_group.duration += duration;

        let namespace = result.namespace_name.clone().unwrap_or_default();
        let namespace_index = match outcome_group
            .namespaces
            .iter()
            .position(|n| n.name == namespace)
        {
            Some(index) => index,
            None => {
                outcome_group.namespaces.push(NamespaceGroup {
                    name: namespace,
                    duration: Duration::ZERO,
                    classes: Vec::new(),
                });
                outcome_group.namespaces.len() - 1
            }
        };
        let namespace_group = &mut outcome_group.namespaces[namespace_index];
        namespace_group.duration += duration;

        let class = result.class_name.clone().unwrap_or_default();
        let class_index = match namespace_group.classes.iter().position(|c| c.name == class) {
            Some(index) => index,
            None => {
                namespace_group.classes.push(ClassGroup {
                    name: class,
                    duration: Duration::ZERO,
                    tests: Vec::new(),
                });
                namespace_group.classes.len() - 1
            }
        };
        let class_group = &mut namespace_group.classes[class_index];
        class_group.duration += duration;
        class_group.tests.push(result);
    }

    groups.sort_by_key(|g| g.outcome.display_rank());
    groups
}

pub(crate) fn format_duration(duration: Duration) -> String {
    format!("({:.3}s)", duration.as_secs_f64())
}

pub(crate) fn format_optional_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(duration) => format_duration(duration),
        None => "(no duration)".to_string(),
    }
}

/// Append the per-outcome summary trailer every terminal view ends with.
pub(crate) fn write_summary(out: &mut String, results: &TestResultSet, theme: &Theme) {
    out.push_str("SUMMARY:\n");
    out.push_str(&format!(
        "{}{}{}\n",
        theme
            .for_outcome(TestOutcome::Passed)
            .apply_to(format!("Passed: {}, ", results.passed_count())),
        theme
            .for_outcome(TestOutcome::Failed)
            .apply_to(format!("Failed: {}, ", results.failed_count())),
        theme
            .for_outcome(TestOutcome::NotExecuted)
            .apply_to(format!("Not run: {}", results.not_executed_count())),
    ));
}
