//! Aggregation properties and the end-to-end report shape.

use confgate_core::{DocumentId, Finding, Severity, Verdict};
use confgate_report::{render, Granularity, OutputFormat, ReportCollector, ReportOptions};
use proptest::prelude::*;

fn verdict(file: &str, index: usize, severities: &[Severity]) -> Verdict {
    let mut v = Verdict::new(DocumentId::new(file, index));
    for (i, severity) in severities.iter().enumerate() {
        v.record_query();
        v.push(Finding::new(*severity, format!("finding {i}")).with_rule("main", &format!("rule_{i}")));
    }
    v.record_query();
    v
}

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Failure),
        Just(Severity::Warning),
        Just(Severity::Exception),
    ]
}

#[test]
fn severity_high_document_fails_the_report() {
    let collector = ReportCollector::new();
    collector.put(verdict("input.json", 0, &[Severity::Failure]));
    let report = collector.flush(&ReportOptions::default());

    assert!(report.failed);
    let entry = &report.results[0];
    assert_eq!(entry.findings.len(), 1);
    assert_eq!(entry.findings[0].severity, Severity::Failure);
    assert_eq!(entry.findings[0].namespace.as_deref(), Some("main"));

    let json: serde_json::Value =
        serde_json::from_str(&render(&report, OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(
        json["results"][0]["findings"][0],
        serde_json::json!({
            "message": "finding 0",
            "severity": "failure",
            "rule": "rule_0",
            "namespace": "main",
            "query": "data.main.rule_0"
        })
    );
}

#[test]
fn every_format_renders_an_empty_report() {
    let report = ReportCollector::new().flush(&ReportOptions::default());
    for format in OutputFormat::ALL {
        let out = render(&report, format).unwrap();
        assert!(!out.is_empty(), "{format} rendered nothing");
    }
}

proptest! {
    /// Permuting put order never changes the overall status or totals.
    #[test]
    fn overall_status_is_order_independent(
        docs in prop::collection::vec(prop::collection::vec(severity(), 0..4), 0..8),
        seed in any::<u64>(),
        fail_on_warn in any::<bool>(),
        fail_on_exception in any::<bool>(),
        per_file in any::<bool>(),
    ) {
        let options = ReportOptions {
            granularity: if per_file { Granularity::File } else { Granularity::Document },
            failure_policy: confgate_report::FailurePolicy { fail_on_warn, fail_on_exception },
        };
        let verdicts: Vec<Verdict> = docs
            .iter()
            .enumerate()
            .map(|(i, sev)| verdict(&format!("f{}.yaml", i % 3), i, sev))
            .collect();

        let forward = ReportCollector::new();
        for v in &verdicts {
            forward.put(v.clone());
        }
        let mut shuffled = verdicts.clone();
        let len = shuffled.len().max(1);
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();
        let permuted = ReportCollector::new();
        for v in shuffled {
            permuted.put(v);
        }

        let a = forward.flush(&options);
        let b = permuted.flush(&options);
        prop_assert_eq!(a.failed, b.failed);
        prop_assert_eq!(a.summary, b.summary);

        let expected = verdicts
            .iter()
            .flat_map(|v| v.findings.iter())
            .any(|f| options.failure_policy.fails(f.severity));
        prop_assert_eq!(a.failed, expected);
    }

    /// Text, TAP and JUnit output agree with the report's failed flag.
    #[test]
    fn rendered_status_matches_failed_flag(
        docs in prop::collection::vec(prop::collection::vec(severity(), 0..4), 1..6),
        fail_on_warn in any::<bool>(),
        fail_on_exception in any::<bool>(),
    ) {
        let options = ReportOptions {
            failure_policy: confgate_report::FailurePolicy { fail_on_warn, fail_on_exception },
            ..ReportOptions::default()
        };
        let collector = ReportCollector::new();
        for (i, sev) in docs.iter().enumerate() {
            collector.put(verdict(&format!("f{i}.yaml"), 0, sev));
        }
        let report = collector.flush(&options);

        let stdout = render(&report, OutputFormat::Stdout).unwrap();
        let last = stdout.lines().last().unwrap_or_default();
        prop_assert_eq!(last.starts_with("FAIL"), report.failed);

        let tap = render(&report, OutputFormat::Tap).unwrap();
        prop_assert_eq!(tap.contains("\nnot ok "), report.failed);

        let junit = render(&report, OutputFormat::Junit).unwrap();
        let clean = junit.contains("failures=\"0\" errors=\"0\">\n");
        prop_assert_eq!(!junit.contains("<failure") && !junit.contains("<error"), !report.failed);
        prop_assert!(report.failed || clean);
    }
}
