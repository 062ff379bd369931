//! Wildcard filtering of test results
//!
//! Filters select results whose fully qualified test name matches a
//! pattern. Patterns use `*` as the only wildcard and match
//! case-insensitively anywhere in the name: `math` matches every test
//! whose name contains "math", `*.MathTests.*divide*` narrows by class
//! and method.

use regex::{Regex, RegexBuilder};

use crate::error::Result;
use crate::result_set::TestResultSet;
use crate::test_result::TestResult;

/// A compiled test-name filter.
#[derive(Debug, Clone)]
pub struct Filter {
    regex: Regex,
}

impl Filter {
    /// Compile a wildcard pattern.
    ///
    /// The pattern is implicitly anchored as `*pattern*`; `*` matches any
    /// run of characters (including none) and every other character
    /// matches itself literally. Matching is case-insensitive.
    pub fn compile(pattern: &str) -> Result<Filter> {
        let wrapped = format!("*{}*", pattern);
        let expression = wrapped
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = RegexBuilder::new(&format!("^{}$", expression))
            .case_insensitive(true)
            .build()?;
        Ok(Filter { regex })
    }

    /// Whether a result's fully qualified name matches.
    pub fn is_match(&self, result: &TestResult) -> bool {
        self.regex.is_match(&result.fully_qualified_test_name)
    }

    /// A new set holding only the matching results, preserving order and
    /// the run-level metadata of the input.
    pub fn apply(&self, results: &TestResultSet) -> TestResultSet {
        let mut filtered = TestResultSet::new();
        filtered.test_run_name = results.test_run_name.clone();
        filtered.test_file_path = results.test_file_path.clone();
        for result in results.iter() {
            if self.is_match(result) {
                filtered.add(result.clone());
            }
        }
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_result::TestOutcome;

    fn named(name: &str) -> TestResult {
        TestResult::new(name, TestOutcome::Passed)
    }

    fn sample() -> TestResultSet {
        TestResultSet::from_results(vec![
            named("Contoso.Tests.MathTests.adds_numbers"),
            named("Contoso.Tests.MathTests.divides_by_zero"),
            named("Contoso.Tests.StringTests.concatenates"),
            named("Other.Suite.Checks.runs"),
        ])
    }

    #[test]
    fn test_substring_match() {
        let filter = Filter::compile("math").unwrap();
        let filtered = filter.apply(&sample());
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_case_insensitive() {
        let filter = Filter::compile("MATHTESTS").unwrap();
        assert_eq!(filter.apply(&sample()).len(), 2);
    }

    #[test]
    fn test_wildcard_between_literals() {
        let filter = Filter::compile("Contoso*divides*zero").unwrap();
        let filtered = filter.apply(&sample());
        assert_eq!(filtered.len(), 1);
        assert_eq!(
            filtered.all()[0].fully_qualified_test_name,
            "Contoso.Tests.MathTests.divides_by_zero"
        );
    }

    #[test]
    fn test_literal_characters_are_not_regex() {
        // Dots and parens in the pattern match themselves only.
        let filter = Filter::compile("Suite.Checks").unwrap();
        assert_eq!(filter.apply(&sample()).len(), 1);

        let filter = Filter::compile("S___e.Checks").unwrap();
        assert_eq!(filter.apply(&sample()).len(), 0);
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let filter = Filter::compile("").unwrap();
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_no_matches_yields_empty_set() {
        let filter = Filter::compile("nonexistent").unwrap();
        let filtered = filter.apply(&sample());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_apply_preserves_run_metadata() {
        let mut set = sample();
        set.test_run_name = Some("run".to_string());
        let filtered = Filter::compile("math").unwrap().apply(&set);
        assert_eq!(filtered.test_run_name.as_deref(), Some("run"));
    }
}
