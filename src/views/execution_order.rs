//! Flat chronological view: one line per test in execution order.

use crate::result_set::TestResultSet;
use crate::test_result::TestResult;
use crate::views::{format_optional_duration, write_summary, Theme};

/// Key to order the flat view by. Results missing the key sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    StartTime,
    EndTime,
    Duration,
}

#[derive(Debug, Clone)]
pub struct ExecutionOrderOptions {
    pub sort: SortOrder,
    pub theme: Theme,
}

impl Default for ExecutionOrderOptions {
    fn default() -> Self {
        ExecutionOrderOptions {
            sort: SortOrder::StartTime,
            theme: Theme::default(),
        }
    }
}

/// Render one line per result, sorted by the chosen key: start timestamp
/// (or `-` when absent), the fully qualified name, the outcome and the
/// duration.
pub fn render(results: &TestResultSet, options: &ExecutionOrderOptions) -> String {
    let mut sorted: Vec<&TestResult> = results.iter().collect();
    match options.sort {
        SortOrder::StartTime => sorted.sort_by_key(|r| r.start_time),
        SortOrder::EndTime => sorted.sort_by_key(|r| r.end_time),
        SortOrder::Duration => sorted.sort_by_key(|r| r.duration),
    }

    let theme = &options.theme;
    let mut out = String::new();
    for result in sorted {
        let timestamp = result
            .start_time
            .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let style = theme.for_outcome(result.outcome);
        out.push_str(&format!(
            "{} {} [{}] {}\n",
            timestamp,
            style.apply_to(&result.fully_qualified_test_name),
            style.apply_to(result.outcome),
            theme.dim().apply_to(format_optional_duration(result.duration)),
        ));
    }
    out.push('\n');
    write_summary(&mut out, results, theme);
    out
}
