//! The default hierarchical view: outcome, namespace, class, test.

use crate::result_set::TestResultSet;
use crate::test_result::{TestOutcome, TestResult};
use crate::views::{format_duration, format_optional_duration, group_by_outcome, write_summary, Theme};

#[derive(Debug, Clone, Default)]
pub struct HierarchicalOptions {
    /// Suppress captured stdout, failure messages and stack traces under
    /// failed tests.
    pub hide_test_output: bool,
    pub theme: Theme,
}

/// Render the set as an indented tree grouped by outcome, namespace and
/// class, each node labeled with its summed duration. Failed tests carry
/// their captured output unless `hide_test_output` is set.
pub fn render(results: &TestResultSet, options: &HierarchicalOptions) -> String {
    let theme = &options.theme;
    let mut out = String::new();

    for group in group_by_outcome(results) {
        let style = theme.for_outcome(group.outcome);
        out.push_str(&format!(
            "{}     {}\n",
            style.apply_to(group.outcome.to_string().to_uppercase()),
            theme.dim().apply_to(format_duration(group.duration)),
        ));

        for namespace in &group.namespaces {
            out.push_str(&format!(
                "  {}     {}\n",
                style.apply_to(&namespace.name),
                theme.dim().apply_to(format_duration(namespace.duration)),
            ));

            for class in &namespace.classes {
                out.push_str(&format!(
                    "    {}     {}\n",
                    style.apply_to(&class.name),
                    theme.dim().apply_to(format_duration(class.duration)),
                ));

                for test in &class.tests {
                    out.push_str(&format!(
                        "      {}     {}\n",
                        style.apply_to(&test.test_name),
                        theme.dim().apply_to(format_optional_duration(test.duration)),
                    ));
                    if group.outcome == TestOutcome::Failed && !options.hide_test_output {
                        write_failure_output(&mut out, test, theme);
                    }
                }
            }
        }
        out.push('\n');
    }

    write_summary(&mut out, results, theme);
    out
}

fn write_failure_output(out: &mut String, test: &TestResult, theme: &Theme) {
    if let Some(std_out) = &test.std_out {
        push_indented(out, std_out, theme);
    }
    if let Some(message) = &test.error_message {
        push_indented(out, message, theme);
    }
    if let Some(stack_trace) = &test.stack_trace {
        out.push_str(&format!("        {}\n", theme.dim().apply_to("Stack trace:")));
        push_indented(out, stack_trace, theme);
    }
}

fn push_indented(out: &mut String, text: &str, theme: &Theme) {
    for line in text.replace("\r\n", "\n").lines() {
        out.push_str(&format!("        {}\n", theme.dim().apply_to(line)));
    }
}
