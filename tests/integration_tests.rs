//! Integration tests for full workflows
//!
//! These tests exercise complete pipelines: .trx files on disk through
//! discovery, parsing, merging, filtering and rendering.

use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use trex::filter::Filter;
use trex::result_set::{find_trx_files, TestResultSet};
use trex::test_result::{TestOutcome, TestResult};
use trex::views::hierarchical::{self, HierarchicalOptions};
use trex::views::{json, Theme};
use trex::{trx, Error};

fn trx_document(run_name: &str, results: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<TestRun id="c07d89c0-a57a-49cd-9b13-b6d859ec3f4e" name="{run_name}" xmlns="http://microsoft.com/schemas/VisualStudio/TeamTest/2010">
  <Results>
{results}
  </Results>
</TestRun>"#
    )
}

fn passing_result(name: &str) -> String {
    format!(
        r#"    <UnitTestResult testName="{name}" outcome="Passed" duration="00:00:01.0000000" startTime="2023-05-04T10:00:01.0000000-08:00" endTime="2023-05-04T10:00:02.0000000-08:00" />"#
    )
}

fn failing_result(name: &str, message: &str) -> String {
    format!(
        r#"    <UnitTestResult testName="{name}" outcome="Failed" duration="00:00:00.5000000">
      <Output>
        <ErrorInfo>
          <Message>{message}</Message>
          <StackTrace>at {name}()</StackTrace>
        </ErrorInfo>
      </Output>
    </UnitTestResult>"#
    )
}

fn write_trx(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

fn plain_options() -> HierarchicalOptions {
    HierarchicalOptions {
        hide_test_output: false,
        theme: Theme::plain(),
    }
}

#[test]
fn test_parse_file_records_provenance() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("run.trx");
    write_trx(
        &path,
        &trx_document("provenance run", &passing_result("Suite.Class.test_one")),
    );

    let set = trx::parse_file(&path).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.test_run_name.as_deref(), Some("provenance run"));
    assert_eq!(set.all()[0].test_output_file.as_deref(), Some(path.as_path()));
}

#[test]
fn test_discovery_merge_filter_render() {
    let temp = TempDir::new().unwrap();
    let dir_a = temp.path().join("unit");
    let dir_b = temp.path().join("acceptance");
    fs::create_dir(&dir_a).unwrap();
    fs::create_dir(&dir_b).unwrap();

    write_trx(
        &dir_a.join("unit.trx"),
        &trx_document(
            "unit",
            &[
                passing_result("Contoso.MathTests.adds"),
                failing_result("Contoso.MathTests.divides", "kaboom"),
            ]
            .join("\n"),
        ),
    );
    write_trx(
        &dir_b.join("acceptance.trx"),
        &trx_document("acceptance", &passing_result("Contoso.WebTests.loads_page")),
    );

    let merged = TestResultSet::from_directory(temp.path(), true).unwrap();
    assert_eq!(merged.len(), 3);
    assert_eq!(merged.failed_count(), 1);
    assert_eq!(merged.exit_code(), 1);

    // Merged sets are ordered by qualified name across files.
    let names: Vec<&str> = merged
        .iter()
        .map(|r| r.fully_qualified_test_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Contoso.MathTests.adds",
            "Contoso.MathTests.divides",
            "Contoso.WebTests.loads_page"
        ]
    );

    let filtered = Filter::compile("math").unwrap().apply(&merged);
    assert_eq!(filtered.len(), 2);
    assert_eq!(filtered.exit_code(), 1);

    let rendered = hierarchical::render(&filtered, &plain_options());
    assert!(rendered.contains("FAILED"));
    assert!(rendered.contains("kaboom"));
    assert!(!rendered.contains("loads_page"));
    assert!(rendered.ends_with("SUMMARY:\nPassed: 1, Failed: 1, Not run: 0\n"));
}

#[test]
fn test_discovery_latest_only_per_directory() {
    let temp = TempDir::new().unwrap();
    let older = temp.path().join("older.trx");
    let newer = temp.path().join("newer.trx");
    write_trx(&older, &trx_document("old", &passing_result("a.b.stale")));
    write_trx(&newer, &trx_document("new", &passing_result("a.b.fresh")));

    let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
    let set_mtime = |path: &Path, mtime: SystemTime| {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    };
    set_mtime(&older, base);
    set_mtime(&newer, base + Duration::from_secs(3600));

    let latest = TestResultSet::from_directory(temp.path(), true).unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest.all()[0].fully_qualified_test_name, "a.b.fresh");

    let everything = TestResultSet::from_directory(temp.path(), false).unwrap();
    assert_eq!(everything.len(), 2);
}

#[test]
fn test_merge_is_all_or_nothing() {
    let temp = TempDir::new().unwrap();
    let good = temp.path().join("good.trx");
    let bad = temp.path().join("bad.trx");
    write_trx(&good, &trx_document("good", &passing_result("a.b.fine")));
    write_trx(&bad, "<TestRun><Results>");

    let err = TestResultSet::from_files(&[good, bad.clone()]).unwrap_err();
    match err {
        Error::ParseFile { path, .. } => assert_eq!(path, bad),
        other => panic!("expected ParseFile, got {:?}", other),
    }
}

#[test]
fn test_empty_directory_is_no_results_not_failure() {
    let temp = TempDir::new().unwrap();
    let set = TestResultSet::from_directory(temp.path(), true).unwrap();
    assert!(set.is_empty());
    assert_eq!(set.exit_code(), -1);
}

#[test]
fn test_round_trip_preserves_counts_and_diagnostics() {
    let temp = TempDir::new().unwrap();
    let original_path = temp.path().join("original.trx");
    write_trx(
        &original_path,
        &trx_document(
            "round trip",
            &[
                passing_result("Contoso.MathTests.adds"),
                failing_result("Contoso.MathTests.divides", "expected &lt;1&gt; got &lt;2&gt;"),
            ]
            .join("\n"),
        ),
    );

    let original = trx::parse_file(&original_path).unwrap();
    let rewritten_path = temp.path().join("rewritten.trx");
    fs::write(&rewritten_path, trx::write(&original).unwrap()).unwrap();
    let rewritten = trx::parse_file(&rewritten_path).unwrap();

    assert_eq!(rewritten.len(), original.len());
    assert_eq!(rewritten.passed_count(), original.passed_count());
    assert_eq!(rewritten.failed_count(), original.failed_count());
    assert_eq!(rewritten.test_run_name.as_deref(), Some("round trip"));

    let failure: Vec<&TestResult> = rewritten.failed().collect();
    assert_eq!(failure[0].error_message.as_deref(), Some("expected <1> got <2>"));
    assert_eq!(
        failure[0].stack_trace.as_deref(),
        Some("at Contoso.MathTests.divides()")
    );
}

#[test]
fn test_json_view_of_parsed_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("run.trx");
    write_trx(
        &path,
        &trx_document("json run", &passing_result("Suite.Class.test_one")),
    );

    let set = trx::parse_file(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json::render(&set).unwrap()).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 1);
    assert_eq!(array[0]["fullyQualifiedTestName"], "Suite.Class.test_one");
    assert_eq!(array[0]["testName"], "test_one");
    assert_eq!(array[0]["className"], "Class");
    assert_eq!(array[0]["duration"], serde_json::json!(1.0));
}

#[test]
fn test_ansi_and_plain_views_agree_on_content() {
    let set = TestResultSet::from_results(vec![
        TestResult::new("a.b.passes", TestOutcome::Passed),
        TestResult::new("a.b.fails", TestOutcome::Failed).with_error_message("boom"),
    ]);

    let plain = hierarchical::render(&set, &plain_options());
    let ansi = hierarchical::render(
        &set,
        &HierarchicalOptions {
            hide_test_output: false,
            theme: Theme::ansi(),
        },
    );
    assert_ne!(plain, ansi);
    assert_eq!(console::strip_ansi_codes(&ansi), plain);
}

#[test]
fn test_find_trx_files_recurses_nested_directories() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a").join("b").join("c");
    fs::create_dir_all(&nested).unwrap();
    write_trx(
        &nested.join("deep.trx"),
        &trx_document("deep", &passing_result("x.y.z")),
    );

    let found: Vec<PathBuf> = find_trx_files(temp.path(), true).unwrap();
    assert_eq!(found, vec![nested.join("deep.trx")]);
}

#[test]
fn test_missing_file_error_names_the_file() {
    let err = trx::parse_file(Path::new("/nonexistent/run.trx")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/run.trx"));
}
