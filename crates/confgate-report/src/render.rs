//! # Renderers
//!
//! Every format renders the same [`Report`]; none of them drop findings.
//! Output is deterministic for a given report.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use confgate_core::{Finding, Severity};
use serde::{Deserialize, Serialize};

use crate::model::{Report, ReportEntry};
use crate::options::ParseOptionError;

/// Report output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON of the report model.
    #[default]
    Json,
    /// One line per finding plus a summary line.
    Stdout,
    /// Aligned text table.
    Table,
    /// Test Anything Protocol.
    Tap,
    /// JUnit XML.
    Junit,
}

impl OutputFormat {
    /// Every format, in display order.
    pub const ALL: [OutputFormat; 5] = [
        Self::Json,
        Self::Stdout,
        Self::Table,
        Self::Tap,
        Self::Junit,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Stdout => "stdout",
            Self::Table => "table",
            Self::Tap => "tap",
            Self::Junit => "junit",
        }
    }

    /// HTTP content type of the rendered output.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Junit => "application/xml",
            Self::Stdout | Self::Table | Self::Tap => "text/plain; charset=utf-8",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| ParseOptionError {
                kind: "output format",
                value: s.to_string(),
                expected: "json, stdout, table, tap, junit",
            })
    }
}

/// Render `report` in `format`.
pub fn render(report: &Report, format: OutputFormat) -> Result<String, serde_json::Error> {
    Ok(match format {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(report)?;
            out.push('\n');
            out
        }
        OutputFormat::Stdout => render_stdout(report),
        OutputFormat::Table => render_table(report),
        OutputFormat::Tap => render_tap(report),
        OutputFormat::Junit => render_junit(report),
    })
}

// ---------------------------------------------------------------------------
// Text renderers
// ---------------------------------------------------------------------------

/// `FAIL` for findings that fail their entry, otherwise the severity's own
/// label.
fn label(report: &Report, finding: &Finding) -> &'static str {
    if report.is_failing(finding) {
        return "FAIL";
    }
    match finding.severity {
        Severity::Failure => "FAIL",
        Severity::Warning => "WARN",
        Severity::Exception => "ERROR",
    }
}

/// `file - namespace - message`, omitting the namespace when absent.
fn describe(entry: &ReportEntry, finding: &Finding) -> String {
    match &finding.namespace {
        Some(ns) => format!("{} - {} - {}", entry.id(), ns, finding.message),
        None => format!("{} - {}", entry.id(), finding.message),
    }
}

/// Closing `PASS` / `FAIL` line shared by the text formats.
fn verdict_line(report: &Report) -> String {
    format!(
        "{} - {}/{} documents failed",
        if report.failed { "FAIL" } else { "PASS" },
        report.failed_entries(),
        report.summary.documents
    )
}

fn render_stdout(report: &Report) -> String {
    let mut out = String::new();
    for (entry, finding) in report.findings() {
        let _ = writeln!(out, "{} - {}", label(report, finding), describe(entry, finding));
    }
    if !out.is_empty() {
        out.push('\n');
    }
    let s = &report.summary;
    let _ = writeln!(
        out,
        "{} tests, {} passed, {} warnings, {} failures, {} exceptions",
        s.tests, s.passed, s.warnings, s.failures, s.exceptions
    );
    let _ = writeln!(out, "{}", verdict_line(report));
    out
}

fn render_table(report: &Report) -> String {
    const HEADER: [&str; 4] = ["RESULT", "FILE", "NAMESPACE", "MESSAGE"];

    let mut rows: Vec<[String; 4]> = Vec::new();
    for entry in &report.results {
        for finding in &entry.findings {
            let result = if report.is_failing(finding) {
                format!("{} (fail)", finding.severity)
            } else {
                finding.severity.to_string()
            };
            rows.push([
                result,
                entry.id().to_string(),
                finding.namespace.clone().unwrap_or_default(),
                finding.message.clone(),
            ]);
        }
        if entry.successes > 0 {
            rows.push([
                "success".to_string(),
                entry.id().to_string(),
                String::new(),
                format!("{} passed", entry.successes),
            ]);
        }
    }

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut line = |cells: [&str; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect();
        let _ = writeln!(out, "| {} |", padded.join(" | "));
    };
    line(HEADER);
    let rule = widths.map(|w| "-".repeat(w));
    line([&rule[0], &rule[1], &rule[2], &rule[3]]);
    for row in &rows {
        line([&row[0], &row[1], &row[2], &row[3]]);
    }
    out.push('\n');
    let _ = writeln!(out, "{}", verdict_line(report));
    out
}

fn render_tap(report: &Report) -> String {
    let mut lines: Vec<(&str, String)> = Vec::new();
    for entry in &report.results {
        for finding in &entry.findings {
            let status = if report.is_failing(finding) { "not ok" } else { "ok" };
            let text = match finding.severity {
                Severity::Failure => describe(entry, finding),
                Severity::Warning => format!("{} # warning", describe(entry, finding)),
                Severity::Exception => format!("{} # exception", describe(entry, finding)),
            };
            lines.push((status, text));
        }
        if entry.successes > 0 {
            lines.push(("ok", format!("{} - {} passed", entry.id(), entry.successes)));
        }
    }

    let mut out = format!("1..{}\n", lines.len());
    for (i, (status, text)) in lines.iter().enumerate() {
        let _ = writeln!(out, "{status} {} - {text}", i + 1);
    }
    out
}

// ---------------------------------------------------------------------------
// JUnit
// ---------------------------------------------------------------------------

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// How a finding appears inside its `<testcase>`.
enum JunitCase {
    Failure,
    Error,
    Output,
}

fn junit_case(report: &Report, finding: &Finding) -> JunitCase {
    match (report.is_failing(finding), finding.severity) {
        (true, Severity::Exception) => JunitCase::Error,
        (true, _) => JunitCase::Failure,
        (false, _) => JunitCase::Output,
    }
}

/// `(failures, errors)` rendered for `entry`.
fn junit_counts(report: &Report, entry: &ReportEntry) -> (usize, usize) {
    entry
        .findings
        .iter()
        .fold((0, 0), |(failures, errors), f| match junit_case(report, f) {
            JunitCase::Failure => (failures + 1, errors),
            JunitCase::Error => (failures, errors + 1),
            JunitCase::Output => (failures, errors),
        })
}

fn render_junit(report: &Report) -> String {
    let (failures, errors) = report
        .results
        .iter()
        .map(|entry| junit_counts(report, entry))
        .fold((0, 0), |(f, e), (ef, ee)| (f + ef, e + ee));
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        out,
        "<testsuites name=\"confgate\" tests=\"{}\" failures=\"{failures}\" errors=\"{errors}\">",
        report.summary.tests
    );
    for entry in &report.results {
        let file = xml_escape(&entry.id().to_string());
        let (failures, errors) = junit_counts(report, entry);
        let cases = entry.findings.len() + usize::from(entry.successes > 0);
        let _ = writeln!(
            out,
            "  <testsuite name=\"{file}\" tests=\"{cases}\" failures=\"{failures}\" errors=\"{errors}\">"
        );
        for finding in &entry.findings {
            let name = xml_escape(&match &finding.namespace {
                Some(ns) => format!("{ns} - {}", finding.message),
                None => finding.message.clone(),
            });
            let message = xml_escape(&finding.message);
            let severity = finding.severity;
            let _ = write!(out, "    <testcase classname=\"{file}\" name=\"{name}\">");
            match junit_case(report, finding) {
                JunitCase::Failure => {
                    let _ = write!(out, "<failure message=\"{message}\" type=\"{severity}\"/>");
                }
                JunitCase::Error => {
                    let _ = write!(out, "<error message=\"{message}\" type=\"{severity}\"/>");
                }
                JunitCase::Output => {
                    let _ = write!(out, "<system-out>{severity}: {message}</system-out>");
                }
            }
            out.push_str("</testcase>\n");
        }
        if entry.successes > 0 {
            let _ = writeln!(
                out,
                "    <testcase classname=\"{file}\" name=\"{} passed\"/>",
                entry.successes
            );
        }
        out.push_str("  </testsuite>\n");
    }
    out.push_str("</testsuites>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::ReportCollector;
    use crate::options::{FailurePolicy, ReportOptions};
    use confgate_core::{DocumentId, Verdict};

    fn sample() -> Report {
        let collector = ReportCollector::new();
        let mut bad = Verdict::new(DocumentId::new("deploy.yaml", 1));
        for _ in 0..3 {
            bad.record_query();
        }
        bad.push(Finding::failure("runs as <root>").with_rule("main", "deny_root"));
        bad.push(Finding::warning("no health checks").with_rule("main", "warn_health_checks"));
        collector.put(bad);

        let mut broken = Verdict::new(DocumentId::new("broken.json", 0));
        broken.push(Finding::exception("broken.json: expected value"));
        collector.put(broken);
        collector.flush(&ReportOptions::default())
    }

    #[test]
    fn parses_every_format_name() {
        for format in OutputFormat::ALL {
            assert_eq!(format.as_str().parse::<OutputFormat>().unwrap(), format);
        }
        assert_eq!("JUnit".parse::<OutputFormat>().unwrap(), OutputFormat::Junit);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn json_round_trips_the_model() {
        let report = sample();
        let text = render(&report, OutputFormat::Json).unwrap();
        let back: Report = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["failed"], true);
        assert_eq!(raw["results"][0]["filename"], "deploy.yaml");
        assert_eq!(raw["results"][0]["index"], 1);
        assert_eq!(raw["results"][0]["findings"][0]["namespace"], "main");
    }

    #[test]
    fn stdout_lists_findings_and_summary() {
        let out = render(&sample(), OutputFormat::Stdout).unwrap();
        assert_eq!(
            out,
            "FAIL - deploy.yaml#1 - main - runs as <root>\n\
             WARN - deploy.yaml#1 - main - no health checks\n\
             ERROR - broken.json - broken.json: expected value\n\
             \n\
             3 tests, 1 passed, 1 warnings, 1 failures, 1 exceptions\n\
             FAIL - 1/2 documents failed\n"
        );
    }

    #[test]
    fn table_is_aligned() {
        let out = render(&sample(), OutputFormat::Table).unwrap();
        let lines: Vec<&str> = out.lines().filter(|l| l.starts_with('|')).collect();
        assert!(lines[0].starts_with("| RESULT "));
        assert!(lines[1].starts_with("| ------"));
        let width = lines[0].chars().count();
        assert!(lines.iter().all(|l| l.chars().count() == width));
        assert!(out.contains("success"));
        assert!(out.contains("1 passed"));
        assert!(out.contains("| failure (fail) "));
        assert_eq!(out.lines().last(), Some("FAIL - 1/2 documents failed"));
    }

    #[test]
    fn tap_numbers_every_line() {
        let out = render(&sample(), OutputFormat::Tap).unwrap();
        assert_eq!(
            out,
            "1..4\n\
             not ok 1 - deploy.yaml#1 - main - runs as <root>\n\
             ok 2 - deploy.yaml#1 - main - no health checks # warning\n\
             ok 3 - deploy.yaml#1 - 1 passed\n\
             ok 4 - broken.json - broken.json: expected value # exception\n"
        );
    }

    #[test]
    fn junit_escapes_and_counts() {
        let out = render(&sample(), OutputFormat::Junit).unwrap();
        assert!(out.starts_with("<?xml"));
        assert!(out.contains("tests=\"3\" failures=\"1\" errors=\"0\""));
        assert!(out.contains("<failure message=\"runs as &lt;root&gt;\" type=\"failure\"/>"));
        assert!(out.contains("<system-out>exception: broken.json: expected value</system-out>"));
        assert!(out.contains("<system-out>warning: no health checks</system-out>"));
        assert!(out.trim_end().ends_with("</testsuites>"));
    }

    fn single_finding(finding: Finding, policy: FailurePolicy) -> Report {
        let collector = ReportCollector::new();
        let mut verdict = Verdict::new(DocumentId::new("a.yaml", 0));
        verdict.record_query();
        verdict.push(finding);
        collector.put(verdict);
        collector.flush(&ReportOptions {
            failure_policy: policy,
            ..ReportOptions::default()
        })
    }

    #[test]
    fn fail_on_warn_marks_warnings_as_failing_everywhere() {
        let report = single_finding(
            Finding::warning("replicas low").with_rule("main", "warn_replicas"),
            FailurePolicy {
                fail_on_warn: true,
                ..FailurePolicy::default()
            },
        );
        assert!(report.failed);

        let stdout = render(&report, OutputFormat::Stdout).unwrap();
        assert!(stdout.starts_with("FAIL - a.yaml - main - replicas low\n"));
        assert!(stdout.ends_with("FAIL - 1/1 documents failed\n"));

        let tap = render(&report, OutputFormat::Tap).unwrap();
        assert_eq!(tap, "1..1\nnot ok 1 - a.yaml - main - replicas low # warning\n");

        let junit = render(&report, OutputFormat::Junit).unwrap();
        assert!(junit.contains("<testsuites name=\"confgate\" tests=\"1\" failures=\"1\" errors=\"0\">"));
        assert!(junit.contains("<failure message=\"replicas low\" type=\"warning\"/>"));

        let table = render(&report, OutputFormat::Table).unwrap();
        assert!(table.contains("| warning (fail) "));
        assert!(table.ends_with("FAIL - 1/1 documents failed\n"));
    }

    #[test]
    fn fail_on_exception_renders_errors() {
        let exception = || Finding::exception("a.yaml: bad indentation");
        let report = single_finding(
            exception(),
            FailurePolicy {
                fail_on_exception: true,
                ..FailurePolicy::default()
            },
        );
        let tap = render(&report, OutputFormat::Tap).unwrap();
        assert_eq!(tap, "1..1\nnot ok 1 - a.yaml - a.yaml: bad indentation # exception\n");
        let junit = render(&report, OutputFormat::Junit).unwrap();
        assert!(junit.contains("failures=\"0\" errors=\"1\""));
        assert!(junit.contains("<error message=\"a.yaml: bad indentation\" type=\"exception\"/>"));

        let lenient = single_finding(exception(), FailurePolicy::default());
        let stdout = render(&lenient, OutputFormat::Stdout).unwrap();
        assert!(stdout.starts_with("ERROR - a.yaml - a.yaml: bad indentation\n"));
        assert!(stdout.ends_with("PASS - 0/1 documents failed\n"));
    }
}
