//! Ordered, outcome-partitioned collections of test results

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::test_result::{TestOutcome, TestResult};
use crate::trx;

/// An ordered collection of test results with materialized partitions for
/// the Passed, Failed and NotExecuted outcomes.
///
/// Bulk construction sorts results ascending by fully qualified test name;
/// the partitions are maintained eagerly as results are added. Outcomes
/// outside the three named kinds (Timeout, Inconclusive, Pending) are
/// counted in the full sequence but have no dedicated partition, so
/// `passed + failed + not_executed <= len` always holds.
#[derive(Debug, Clone, Default)]
pub struct TestResultSet {
    all: Vec<TestResult>,
    passed: Vec<usize>,
    failed: Vec<usize>,
    not_executed: Vec<usize>,
    /// Name recorded on the `TestRun` element; kept for round-trip
    /// fidelity with the writer.
    pub test_run_name: Option<String>,
    /// Path written as test `storage` by the writer.
    pub test_file_path: Option<PathBuf>,
}

impl TestResultSet {
    /// Creates an empty result set.
    pub fn new() -> Self {
        TestResultSet::default()
    }

    /// Builds a result set from results, sorted by fully qualified name.
    pub fn from_results(results: impl IntoIterator<Item = TestResult>) -> Self {
        let mut sorted: Vec<TestResult> = results.into_iter().collect();
        sorted.sort_by(|a, b| a.fully_qualified_test_name.cmp(&b.fully_qualified_test_name));

        let mut set = TestResultSet::new();
        for result in sorted {
            set.add(result);
        }
        set
    }

    /// Parses every file and merges the results into one sorted set.
    ///
    /// The merge is all-or-nothing: a parse failure on any file aborts the
    /// whole aggregation and no partial set is returned.
    pub fn from_files(files: &[PathBuf]) -> Result<Self> {
        let mut results = Vec::new();
        for file in files {
            let set = trx::parse_file(file)?;
            results.extend(set.into_results());
        }
        Ok(TestResultSet::from_results(results))
    }

    /// Discovers .trx files under `path` and parses them into one set.
    pub fn from_directory(path: &Path, latest_only: bool) -> Result<Self> {
        let files = find_trx_files(path, latest_only)?;
        TestResultSet::from_files(&files)
    }

    /// Appends a result, maintaining the outcome partitions.
    pub fn add(&mut self, result: TestResult) {
        let index = self.all.len();
        match result.outcome {
            TestOutcome::Passed => self.passed.push(index),
            TestOutcome::Failed => self.failed.push(index),
            TestOutcome::NotExecuted => self.not_executed.push(index),
            _ => {}
        }
        self.all.push(result);
    }

    /// All results, in order.
    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.all.iter()
    }

    /// All results as a slice.
    pub fn all(&self) -> &[TestResult] {
        &self.all
    }

    /// Consumes the set, returning the ordered results.
    pub fn into_results(self) -> Vec<TestResult> {
        self.all
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Results with outcome `Passed`.
    pub fn passed(&self) -> impl Iterator<Item = &TestResult> {
        self.passed.iter().map(|&i| &self.all[i])
    }

    /// Results with outcome `Failed`.
    pub fn failed(&self) -> impl Iterator<Item = &TestResult> {
        self.failed.iter().map(|&i| &self.all[i])
    }

    /// Results with outcome `NotExecuted`.
    pub fn not_executed(&self) -> impl Iterator<Item = &TestResult> {
        self.not_executed.iter().map(|&i| &self.all[i])
    }

    pub fn passed_count(&self) -> usize {
        self.passed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn not_executed_count(&self) -> usize {
        self.not_executed.len()
    }

    /// Sum of all recorded durations; absent durations count as zero.
    pub fn total_duration(&self) -> Duration {
        self.all.iter().filter_map(|r| r.duration).sum()
    }

    /// Process exit code for this set: 1 when any test failed, -1 when the
    /// set is empty ("no results", distinct from failure), 0 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.failed_count() > 0 {
            1
        } else if self.is_empty() {
            -1
        } else {
            0
        }
    }
}

/// Recursively finds `.trx` files under `path`.
///
/// Files are grouped by their containing directory; with `latest_only`
/// each directory contributes only its most recently modified file,
/// otherwise every file is returned. The result is ordered by directory
/// and file name for deterministic output.
pub fn find_trx_files(path: &Path, latest_only: bool) -> Result<Vec<PathBuf>> {
    let mut by_directory: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    collect_trx_files(path, &mut by_directory)?;

    let mut found = Vec::new();
    for (_, mut files) in by_directory {
        files.sort();
        if latest_only {
            if let Some(latest) = files
                .iter()
                .max_by_key(|f| fs::metadata(f).and_then(|m| m.modified()).ok())
            {
                found.push(latest.clone());
            }
        } else {
            found.extend(files);
        }
    }
    Ok(found)
}

fn collect_trx_files(path: &Path, by_directory: &mut BTreeMap<PathBuf, Vec<PathBuf>>) -> Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_trx_files(&entry_path, by_directory)?;
        } else if entry_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("trx"))
        {
            by_directory
                .entry(path.to_path_buf())
                .or_default()
                .push(entry_path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn result(name: &str, outcome: TestOutcome) -> TestResult {
        TestResult::new(name, outcome)
    }

    #[test]
    fn test_partition_counts() {
        let set = TestResultSet::from_results(vec![
            result("a.b.passes", TestOutcome::Passed),
            result("a.b.fails", TestOutcome::Failed),
            result("a.b.skipped", TestOutcome::NotExecuted),
            result("a.b.timed_out", TestOutcome::Timeout),
            result("a.b.undecided", TestOutcome::Inconclusive),
        ]);

        assert_eq!(set.len(), 5);
        assert_eq!(set.passed_count(), 1);
        assert_eq!(set.failed_count(), 1);
        assert_eq!(set.not_executed_count(), 1);
        // Timeout and Inconclusive are counted in the whole but have no
        // dedicated partition.
        assert!(set.passed_count() + set.failed_count() + set.not_executed_count() < set.len());
    }

    #[test]
    fn test_partition_totality_with_named_outcomes_only() {
        let set = TestResultSet::from_results(vec![
            result("a.b.one", TestOutcome::Passed),
            result("a.b.two", TestOutcome::Failed),
            result("a.b.three", TestOutcome::NotExecuted),
        ]);
        assert_eq!(
            set.passed_count() + set.failed_count() + set.not_executed_count(),
            set.len()
        );
    }

    #[test]
    fn test_construction_sorts_by_qualified_name() {
        let set = TestResultSet::from_results(vec![
            result("z.z.last", TestOutcome::Passed),
            result("a.a.first", TestOutcome::Passed),
            result("m.m.middle", TestOutcome::Passed),
        ]);

        let names: Vec<&str> = set
            .iter()
            .map(|r| r.fully_qualified_test_name.as_str())
            .collect();
        assert_eq!(names, vec!["a.a.first", "m.m.middle", "z.z.last"]);
    }

    #[test]
    fn test_exit_code_success() {
        let set = TestResultSet::from_results(vec![result("a.b.ok", TestOutcome::Passed)]);
        assert_eq!(set.exit_code(), 0);
    }

    #[test]
    fn test_exit_code_failure() {
        let set = TestResultSet::from_results(vec![
            result("a.b.ok", TestOutcome::Passed),
            result("a.b.bad", TestOutcome::Failed),
        ]);
        assert_eq!(set.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_no_results() {
        let set = TestResultSet::new();
        assert_eq!(set.exit_code(), -1);
    }

    #[test]
    fn test_total_duration_treats_absent_as_zero() {
        let set = TestResultSet::from_results(vec![
            result("a.b.timed", TestOutcome::Passed).with_duration(Duration::from_millis(300)),
            result("a.b.untimed", TestOutcome::Passed),
        ]);
        assert_eq!(set.total_duration(), Duration::from_millis(300));
    }

    fn touch(path: &Path, modified: SystemTime) {
        let file = File::create(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_find_trx_files_latest_per_directory() {
        let temp = TempDir::new().unwrap();
        let sub = temp.path().join("results");
        fs::create_dir(&sub).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        touch(&sub.join("older.trx"), base);
        touch(&sub.join("newer.trx"), base + Duration::from_secs(3600));
        touch(&sub.join("notes.txt"), base + Duration::from_secs(7200));

        let latest = find_trx_files(temp.path(), true).unwrap();
        assert_eq!(latest, vec![sub.join("newer.trx")]);

        let all = find_trx_files(temp.path(), false).unwrap();
        assert_eq!(all, vec![sub.join("newer.trx"), sub.join("older.trx")]);
    }

    #[test]
    fn test_find_trx_files_groups_by_directory() {
        let temp = TempDir::new().unwrap();
        let dir_a = temp.path().join("a");
        let dir_b = temp.path().join("b");
        fs::create_dir(&dir_a).unwrap();
        fs::create_dir(&dir_b).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        touch(&dir_a.join("old.trx"), base);
        touch(&dir_a.join("new.trx"), base + Duration::from_secs(60));
        touch(&dir_b.join("only.trx"), base);

        let latest = find_trx_files(temp.path(), true).unwrap();
        assert_eq!(latest, vec![dir_a.join("new.trx"), dir_b.join("only.trx")]);
    }

    #[test]
    fn test_find_trx_files_extension_case_insensitive() {
        let temp = TempDir::new().unwrap();
        let mut file = File::create(temp.path().join("RESULTS.TRX")).unwrap();
        file.write_all(b"").unwrap();

        let found = find_trx_files(temp.path(), true).unwrap();
        assert_eq!(found.len(), 1);
    }
}
