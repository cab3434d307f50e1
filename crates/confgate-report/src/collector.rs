//! # Report Collector
//!
//! `Empty -> Accumulating -> Flushed`. [`ReportCollector::put`] takes
//! `&self` and serializes concurrent callers internally;
//! [`ReportCollector::flush`] takes `self`, so no verdict can be added to a
//! finalized report.

use std::collections::HashMap;

use confgate_core::{Severity, Verdict};
use parking_lot::Mutex;

use crate::model::{Report, ReportEntry, Summary};
use crate::options::{Granularity, ReportOptions};

/// Accumulates verdicts for one invocation.
#[derive(Debug, Default)]
pub struct ReportCollector {
    verdicts: Mutex<Vec<Verdict>>,
}

impl ReportCollector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a verdict. Duplicate document identities are kept as
    /// distinct entries.
    pub fn put(&self, verdict: Verdict) {
        tracing::trace!(document = %verdict.document, findings = verdict.findings.len(), "put verdict");
        self.verdicts.lock().push(verdict);
    }

    /// Number of verdicts collected so far.
    pub fn len(&self) -> usize {
        self.verdicts.lock().len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.verdicts.lock().is_empty()
    }

    /// Finalize the report.
    ///
    /// Entries keep put order. With [`Granularity::File`], verdicts sharing
    /// a filename merge into the entry of the first one seen.
    pub fn flush(self, options: &ReportOptions) -> Report {
        let verdicts = self.verdicts.into_inner();

        let mut summary = Summary::default();
        for verdict in &verdicts {
            summary.tests += verdict.rule_count;
            summary.passed += verdict.successes();
            summary.failures += verdict.count(Severity::Failure);
            summary.warnings += verdict.count(Severity::Warning);
            summary.exceptions += verdict.count(Severity::Exception);
        }

        let mut results: Vec<ReportEntry> = match options.granularity {
            Granularity::Document => verdicts.iter().map(ReportEntry::from_verdict).collect(),
            Granularity::File => merge_by_file(&verdicts),
        };
        for entry in &mut results {
            entry.apply_policy(&options.failure_policy);
        }
        summary.documents = results.len();
        let failed = results.iter().any(|entry| !entry.passed);

        tracing::info!(
            documents = summary.documents,
            tests = summary.tests,
            failures = summary.failures,
            warnings = summary.warnings,
            exceptions = summary.exceptions,
            failed,
            "report finalized"
        );
        Report {
            failed,
            summary,
            results,
            policy: options.failure_policy,
        }
    }
}

fn merge_by_file(verdicts: &[Verdict]) -> Vec<ReportEntry> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut entries: Vec<ReportEntry> = Vec::new();
    for verdict in verdicts {
        let filename = verdict.document.filename.as_str();
        match positions.get(filename) {
            Some(&pos) => entries[pos].absorb(verdict),
            None => {
                positions.insert(filename, entries.len());
                let mut entry = ReportEntry::from_verdict(verdict);
                entry.index = 0;
                entries.push(entry);
            }
        }
    }
    entries
}
