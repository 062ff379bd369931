//! TRX document codec
//!
//! This module reads and writes the TRX XML dialect emitted by .NET test
//! runners, converting between documents and our [`TestResultSet`]
//! representation.
//!
//! The parser is namespace-agnostic: elements and attributes are matched by
//! local name only, because the dialect's namespace URI carries no
//! information this tool needs. Events from quick-xml are folded into a
//! small element tree first, which keeps the traversal close to the shape
//! of the documents themselves.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::result_set::TestResultSet;
use crate::test_id::stable_test_id;
use crate::test_result::{TestOutcome, TestResult};

/// The fixed "Results Not in a List" test list id used by TRX writers.
const TEST_LIST_ID: &str = "8c84fa94-04c1-424b-9868-57a2d4851a1d";
/// The test type GUID for unit tests.
const UNIT_TEST_TYPE_ID: &str = "13cdc9d9-ddb5-4fa4-a97d-d965ccfc6d4b";
const TRX_XMLNS: &str = "http://microsoft.com/schemas/VisualStudio/TeamTest/2010";

/// One element of the parsed document: local name, attributes (local names
/// as well), direct text content and child elements.
#[derive(Debug, Clone, Default)]
struct XmlNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
    text: String,
}

impl XmlNode {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All elements below this one, in document order (excluding self).
    fn descendants(&self) -> Vec<&XmlNode> {
        let mut nodes = Vec::new();
        for child in &self.children {
            child.collect_into(&mut nodes);
        }
        nodes
    }

    fn collect_into<'a>(&'a self, nodes: &mut Vec<&'a XmlNode>) {
        nodes.push(self);
        for child in &self.children {
            child.collect_into(nodes);
        }
    }
}

/// Parse a .trx file into a result set.
pub fn parse_file(path: &Path) -> Result<TestResultSet> {
    let xml = fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
    parse(&xml, Some(path))
}

/// Parse TRX XML text into a result set.
///
/// `test_output_file` is the provenance path recorded on every result and
/// named in diagnostics; pass `None` when parsing an in-memory string.
/// Malformed XML and present-but-unparseable attribute values are fatal;
/// the provenance path and whatever partial document was read are dumped
/// to stderr before the error propagates.
pub fn parse(xml: &str, test_output_file: Option<&Path>) -> Result<TestResultSet> {
    let document = match build_document(xml) {
        Ok(document) => document,
        Err((error, partial)) => {
            return Err(report_parse_failure(error, &partial, test_output_file));
        }
    };

    match extract_results(&document, test_output_file) {
        Ok(set) => Ok(set),
        Err(error) => Err(report_parse_failure(error, &document, test_output_file)),
    }
}

fn report_parse_failure(error: Error, partial: &XmlNode, path: Option<&Path>) -> Error {
    let name = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<string>".to_string());
    eprintln!("An error occurred while parsing {}\n\n{}\n\n{:#?}", name, error, partial);
    match path {
        Some(path) => error.in_file(path),
        None => error,
    }
}

/// Fold the XML event stream into an element tree. On failure the partial
/// tree read so far is returned alongside the error, for diagnostics.
fn build_document(xml: &str) -> std::result::Result<XmlNode, (Error, XmlNode)> {
    let mut reader = Reader::from_str(xml);
    // Stack of open elements; index 0 is a synthetic document root.
    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => match node_from_start(&start) {
                Ok(node) => stack.push(node),
                Err(error) => return Err((error, collapse(stack))),
            },
            Ok(Event::Empty(start)) => match node_from_start(&start) {
                Ok(node) => push_child(&mut stack, node),
                Err(error) => return Err((error, collapse(stack))),
            },
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    let error = Error::MalformedDocument("unexpected closing tag".to_string());
                    return Err((error, collapse(stack)));
                }
                let node = stack.pop().unwrap_or_default();
                push_child(&mut stack, node);
            }
            Ok(Event::Text(text)) => match text.unescape() {
                Ok(text) => append_text(&mut stack, &text),
                Err(error) => return Err((error.into(), collapse(stack))),
            },
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append_text(&mut stack, &text);
            }
            Ok(Event::Eof) => {
                if stack.len() > 1 {
                    let error =
                        Error::MalformedDocument("unexpected end of document".to_string());
                    return Err((error, collapse(stack)));
                }
                return Ok(stack.pop().unwrap_or_default());
            }
            // Declarations, comments, processing instructions and doctypes
            // carry nothing the TRX dialect needs.
            Ok(_) => {}
            Err(error) => return Err((error.into(), collapse(stack))),
        }
    }
}

fn node_from_start(start: &BytesStart<'_>) -> Result<XmlNode> {
    let name = String::from_utf8_lossy(start.name().local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::InvalidAttr)?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(XmlNode {
        name,
        attributes,
        ..XmlNode::default()
    })
}

fn push_child(stack: &mut [XmlNode], node: XmlNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn append_text(stack: &mut [XmlNode], text: &str) {
    if let Some(parent) = stack.last_mut() {
        parent.text.push_str(text);
    }
}

fn collapse(mut stack: Vec<XmlNode>) -> XmlNode {
    while stack.len() > 1 {
        let node = stack.pop().unwrap_or_default();
        push_child(&mut stack, node);
    }
    stack.pop().unwrap_or_default()
}

fn extract_results(document: &XmlNode, test_output_file: Option<&Path>) -> Result<TestResultSet> {
    let elements = document.descendants();

    let test_run_name = elements
        .iter()
        .find(|element| element.name == "TestRun")
        .and_then(|element| element.attr("name"))
        .map(String::from);

    // Cross-reference table: execution id -> (codeBase, className) from the
    // test definitions. Missing ids or attributes are tolerated.
    let mut definitions: HashMap<&str, (Option<&str>, Option<&str>)> = HashMap::new();
    for section in elements.iter().filter(|e| e.name == "TestDefinitions") {
        for unit_test in section
            .descendants()
            .into_iter()
            .filter(|e| e.name == "UnitTest")
        {
            let Some(execution_id) = unit_test.child("Execution").and_then(|e| e.attr("id"))
            else {
                continue;
            };
            let method = unit_test.child("TestMethod");
            definitions.insert(
                execution_id,
                (
                    method.and_then(|m| m.attr("codeBase")),
                    method.and_then(|m| m.attr("className")),
                ),
            );
        }
    }

    let mut results = Vec::new();
    for element in elements.iter().filter(|e| e.name == "UnitTestResult") {
        let name = element.attr("testName").ok_or_else(|| {
            Error::MalformedDocument(
                "UnitTestResult element is missing its testName attribute".to_string(),
            )
        })?;

        let outcome = match element.attr("outcome") {
            Some(value) => value.parse::<TestOutcome>()?,
            None => TestOutcome::NotExecuted,
        };

        let codebase = element
            .attr("executionId")
            .and_then(|id| definitions.get(id))
            .and_then(|(code_base, _)| *code_base)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let mut result = TestResult::new(name, outcome);
        result.start_time = parse_optional_timestamp(element.attr("startTime"))?;
        result.end_time = parse_optional_timestamp(element.attr("endTime"))?;
        result.duration = parse_optional_duration(element.attr("duration"))?;
        result.std_out = join_descendant_text(element, "StdOut");
        result.error_message = join_descendant_text(element, "Message");
        result.stack_trace = join_descendant_text(element, "StackTrace");
        result.test_project_directory = codebase.as_deref().and_then(project_directory_for);
        result.codebase = codebase;
        result.test_output_file = test_output_file.map(Path::to_path_buf);
        results.push(result);
    }

    let mut set = TestResultSet::from_results(results);
    set.test_run_name = test_run_name;
    Ok(set)
}

/// Join the text of every descendant element with the given local name,
/// one per line. No matching descendants means the field is absent.
fn join_descendant_text(element: &XmlNode, name: &str) -> Option<String> {
    let texts: Vec<&str> = element
        .descendants()
        .into_iter()
        .filter(|e| e.name == name)
        .map(|e| e.text.as_str())
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.join("\n"))
    }
}

fn parse_optional_timestamp(value: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    match value {
        Some(value) if !value.trim().is_empty() => parse_trx_timestamp(value).map(Some),
        _ => Ok(None),
    }
}

fn parse_optional_duration(value: Option<&str>) -> Result<Option<Duration>> {
    match value {
        Some(value) if !value.trim().is_empty() => parse_trx_duration(value).map(Some),
        _ => Ok(None),
    }
}

fn parse_trx_timestamp(value: &str) -> Result<DateTime<FixedOffset>> {
    // TRX start/end times are RFC 3339 with an offset; some writers omit
    // the offset, in which case the time is read as UTC.
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
        })
        .map_err(|_| Error::InvalidTimestamp(value.to_string()))
}

/// Parse the TRX `hh:mm:ss[.fffffff]` duration syntax.
fn parse_trx_duration(value: &str) -> Result<Duration> {
    let invalid = || Error::InvalidDuration(value.to_string());

    let mut parts = value.split(':');
    let (hours, minutes, seconds) = match (parts.next(), parts.next(), parts.next(), parts.next())
    {
        (Some(h), Some(m), Some(s), None) => (h, m, s),
        _ => return Err(invalid()),
    };

    let hours: u64 = hours.parse().map_err(|_| invalid())?;
    let minutes: u64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    if !(0.0..60.0).contains(&seconds) || minutes >= 60 {
        return Err(invalid());
    }

    // An hours field large enough to overflow is unparseable, not a panic.
    let whole_seconds = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60))
        .ok_or_else(invalid)?;
    Duration::from_secs(whole_seconds)
        .checked_add(Duration::from_secs_f64(seconds))
        .ok_or_else(invalid)
}

fn format_trx_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let ticks = duration.subsec_nanos() / 100;
    format!(
        "{:02}:{:02}:{:02}.{:07}",
        total / 3600,
        (total % 3600) / 60,
        total % 60,
        ticks
    )
}

/// Derive the test project directory from a codebase path: generated test
/// binaries live three levels below the project root
/// (`bin/<configuration>/<tfm>/`). The result carries a trailing path
/// separator. Paths too shallow for the ascent yield `None`.
fn project_directory_for(codebase: &Path) -> Option<PathBuf> {
    let directory = codebase.parent()?;
    let project = directory.parent()?.parent()?.parent()?;
    if project.as_os_str().is_empty() {
        return None;
    }
    let display = project.to_string_lossy();
    if display.ends_with(std::path::MAIN_SEPARATOR) {
        Some(project.to_path_buf())
    } else {
        Some(PathBuf::from(format!(
            "{}{}",
            display,
            std::path::MAIN_SEPARATOR
        )))
    }
}

/// Serialize a result set as TRX XML text.
pub fn write(results: &TestResultSet) -> Result<String> {
    let mut buffer = Vec::new();
    write_to(results, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| Error::Other(e.to_string()))
}

/// Serialize a result set as a TRX document to a writer.
///
/// Parsing the output reproduces the set's total and per-outcome counts
/// and preserves stdout, error message and stack trace text exactly.
pub fn write_to(results: &TestResultSet, out: impl io::Write) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut test_run = BytesStart::new("TestRun");
    test_run.push_attribute(("id", Uuid::new_v4().to_string().as_str()));
    if let Some(name) = &results.test_run_name {
        test_run.push_attribute(("name", name.as_str()));
    }
    test_run.push_attribute(("xmlns", TRX_XMLNS));
    writer.write_event(Event::Start(test_run))?;

    write_times(&mut writer, results)?;

    let mut settings = BytesStart::new("TestSettings");
    settings.push_attribute(("name", "default"));
    settings.push_attribute(("id", Uuid::new_v4().to_string().as_str()));
    writer.write_event(Event::Empty(settings))?;

    write_results(&mut writer, results)?;
    write_definitions(&mut writer, results)?;
    write_entries(&mut writer, results)?;
    write_lists(&mut writer)?;
    write_summary(&mut writer, results)?;

    writer.write_event(Event::End(BytesEnd::new("TestRun")))?;
    Ok(())
}

fn write_times<W: io::Write>(writer: &mut Writer<W>, results: &TestResultSet) -> Result<()> {
    let start = results
        .iter()
        .filter_map(|r| r.start_time)
        .min()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    let finish = results
        .iter()
        .filter_map(|r| r.end_time)
        .max()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    let mut times = BytesStart::new("Times");
    times.push_attribute(("creation", start.as_str()));
    times.push_attribute(("queuing", start.as_str()));
    times.push_attribute(("start", start.as_str()));
    times.push_attribute(("finish", finish.as_str()));
    writer.write_event(Event::Empty(times))?;
    Ok(())
}

fn write_results<W: io::Write>(writer: &mut Writer<W>, results: &TestResultSet) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("Results")))?;

    let computer_name = std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_default();

    for result in results.iter() {
        let id = stable_test_id(&result.fully_qualified_test_name).to_string();
        let duration = result.duration.map(format_trx_duration).unwrap_or_default();
        let start_time = result.start_time.map(|t| t.to_rfc3339()).unwrap_or_default();
        let end_time = result.end_time.map(|t| t.to_rfc3339()).unwrap_or_default();
        let outcome = result.outcome.to_string();

        let mut element = BytesStart::new("UnitTestResult");
        element.push_attribute(("executionId", id.as_str()));
        element.push_attribute(("testId", id.as_str()));
        element.push_attribute(("testName", result.fully_qualified_test_name.as_str()));
        element.push_attribute(("computerName", computer_name.as_str()));
        element.push_attribute(("duration", duration.as_str()));
        element.push_attribute(("startTime", start_time.as_str()));
        element.push_attribute(("endTime", end_time.as_str()));
        element.push_attribute(("outcome", outcome.as_str()));
        element.push_attribute(("testType", UNIT_TEST_TYPE_ID));
        element.push_attribute(("testListId", TEST_LIST_ID));

        let has_output = result.std_out.is_some()
            || result.error_message.is_some()
            || result.stack_trace.is_some();
        if !has_output {
            writer.write_event(Event::Empty(element))?;
            continue;
        }

        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Start(BytesStart::new("Output")))?;

        if result.error_message.is_some() || result.stack_trace.is_some() {
            writer.write_event(Event::Start(BytesStart::new("ErrorInfo")))?;
            if let Some(message) = &result.error_message {
                write_text_element(writer, "Message", message)?;
            }
            if let Some(stack_trace) = &result.stack_trace {
                write_text_element(writer, "StackTrace", stack_trace)?;
            }
            writer.write_event(Event::End(BytesEnd::new("ErrorInfo")))?;
        }
        if let Some(std_out) = &result.std_out {
            write_text_element(writer, "StdOut", std_out)?;
        }

        writer.write_event(Event::End(BytesEnd::new("Output")))?;
        writer.write_event(Event::End(BytesEnd::new("UnitTestResult")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Results")))?;
    Ok(())
}

fn write_definitions<W: io::Write>(writer: &mut Writer<W>, results: &TestResultSet) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("TestDefinitions")))?;

    let storage = results
        .test_file_path
        .as_deref()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut seen = HashSet::new();
    for result in results.iter() {
        if !seen.insert(result.fully_qualified_test_name.as_str()) {
            continue;
        }

        let id = stable_test_id(&result.fully_qualified_test_name).to_string();
        let codebase = result
            .codebase
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let class_name = fully_qualified_class_name(result);

        let mut unit_test = BytesStart::new("UnitTest");
        unit_test.push_attribute(("name", result.fully_qualified_test_name.as_str()));
        unit_test.push_attribute(("storage", storage.as_str()));
        unit_test.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Start(unit_test))?;

        let mut execution = BytesStart::new("Execution");
        execution.push_attribute(("id", id.as_str()));
        writer.write_event(Event::Empty(execution))?;

        let mut method = BytesStart::new("TestMethod");
        method.push_attribute(("codeBase", codebase.as_str()));
        method.push_attribute(("className", class_name.as_str()));
        method.push_attribute(("name", result.test_name.as_str()));
        writer.write_event(Event::Empty(method))?;

        writer.write_event(Event::End(BytesEnd::new("UnitTest")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("TestDefinitions")))?;
    Ok(())
}

fn fully_qualified_class_name(result: &TestResult) -> String {
    match (&result.namespace_name, &result.class_name) {
        (Some(namespace), Some(class)) if !namespace.is_empty() => {
            format!("{}.{}", namespace, class)
        }
        (_, Some(class)) => class.clone(),
        _ => String::new(),
    }
}

fn write_entries<W: io::Write>(writer: &mut Writer<W>, results: &TestResultSet) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("TestEntries")))?;
    for result in results.iter() {
        let id = stable_test_id(&result.fully_qualified_test_name).to_string();
        let mut entry = BytesStart::new("TestEntry");
        entry.push_attribute(("testId", id.as_str()));
        entry.push_attribute(("executionId", id.as_str()));
        entry.push_attribute(("testListId", TEST_LIST_ID));
        writer.write_event(Event::Empty(entry))?;
    }
    writer.write_event(Event::End(BytesEnd::new("TestEntries")))?;
    Ok(())
}

fn write_lists<W: io::Write>(writer: &mut Writer<W>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("TestLists")))?;
    let mut list = BytesStart::new("TestList");
    list.push_attribute(("name", "Results Not in a List"));
    list.push_attribute(("id", TEST_LIST_ID));
    writer.write_event(Event::Empty(list))?;
    writer.write_event(Event::End(BytesEnd::new("TestLists")))?;
    Ok(())
}

fn write_summary<W: io::Write>(writer: &mut Writer<W>, results: &TestResultSet) -> Result<()> {
    let count_of = |outcome: TestOutcome| results.iter().filter(|r| r.outcome == outcome).count();
    let executed = results
        .iter()
        .filter(|r| r.outcome != TestOutcome::NotExecuted)
        .count();
    let completed = results
        .iter()
        .filter(|r| matches!(r.outcome, TestOutcome::Passed | TestOutcome::Failed))
        .count();

    writer.write_event(Event::Start(BytesStart::new("ResultSummary")))?;
    let mut counters = BytesStart::new("Counters");
    counters.push_attribute(("total", results.len().to_string().as_str()));
    counters.push_attribute(("executed", executed.to_string().as_str()));
    counters.push_attribute(("passed", results.passed_count().to_string().as_str()));
    counters.push_attribute(("failed", results.failed_count().to_string().as_str()));
    counters.push_attribute(("timeout", count_of(TestOutcome::Timeout).to_string().as_str()));
    counters.push_attribute((
        "inconclusive",
        count_of(TestOutcome::Inconclusive).to_string().as_str(),
    ));
    counters.push_attribute((
        "notExecuted",
        results.not_executed_count().to_string().as_str(),
    ));
    counters.push_attribute(("completed", completed.to_string().as_str()));
    counters.push_attribute(("pending", count_of(TestOutcome::Pending).to_string().as_str()));
    writer.write_event(Event::Empty(counters))?;
    writer.write_event(Event::End(BytesEnd::new("ResultSummary")))?;
    Ok(())
}

fn write_text_element<W: io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
