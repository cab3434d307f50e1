//! # Report Model
//!
//! The serialized shape shared by every renderer and by the HTTP API:
//!
//! ```json
//! {
//!   "failed": true,
//!   "summary": { "documents": 2, "tests": 4, "passed": 3, ... },
//!   "results": [
//!     { "filename": "deploy.yaml", "index": 0, "passed": false,
//!       "successes": 1, "findings": [ ... ] }
//!   ],
//!   "policy": { "fail_on_warn": false, "fail_on_exception": false }
//! }
//! ```

use confgate_core::{DocumentId, Finding, Severity, Verdict};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::options::FailurePolicy;

/// The outcome for one document (or one file, when merged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportEntry {
    /// Source name of the document.
    pub filename: String,
    /// Sub-document ordinal; always 0 for file-granularity entries.
    pub index: usize,
    /// Whether no finding failed the entry under the report's policy.
    pub passed: bool,
    /// Rules that ran without firing.
    pub successes: usize,
    /// Findings in evaluation order.
    pub findings: Vec<Finding>,
}

impl ReportEntry {
    pub(crate) fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            filename: verdict.document.filename.clone(),
            index: verdict.document.index,
            passed: true,
            successes: verdict.successes(),
            findings: verdict.findings.clone(),
        }
    }

    pub(crate) fn absorb(&mut self, verdict: &Verdict) {
        self.successes += verdict.successes();
        self.findings.extend(verdict.findings.iter().cloned());
    }

    pub(crate) fn apply_policy(&mut self, policy: &FailurePolicy) {
        self.passed = !self.findings.iter().any(|f| policy.fails(f.severity));
    }

    /// Identity of the entry.
    pub fn id(&self) -> DocumentId {
        DocumentId::new(self.filename.as_str(), self.index)
    }

    /// Findings with the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }
}

/// Totals across the whole report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Summary {
    /// Number of report entries.
    pub documents: usize,
    /// Rule queries executed.
    pub tests: usize,
    /// Rule queries that did not fire.
    pub passed: usize,
    /// Failure-severity findings.
    pub failures: usize,
    /// Warning-severity findings.
    pub warnings: usize,
    /// Exception-severity findings.
    pub exceptions: usize,
}

/// A finalized report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Report {
    /// Whether any entry failed.
    pub failed: bool,
    /// Totals.
    pub summary: Summary,
    /// One entry per document (or file), in the order verdicts were put.
    pub results: Vec<ReportEntry>,
    /// Policy the entries were judged under.
    #[serde(default)]
    pub policy: FailurePolicy,
}

impl Report {
    /// Whether every entry passed.
    pub fn passed(&self) -> bool {
        !self.failed
    }

    /// Whether `finding` fails its entry under the report's policy.
    pub fn is_failing(&self, finding: &Finding) -> bool {
        self.policy.fails(finding.severity)
    }

    /// Number of entries that did not pass.
    pub fn failed_entries(&self) -> usize {
        self.results.iter().filter(|entry| !entry.passed).count()
    }

    /// Every finding across entries, paired with its entry.
    pub fn findings(&self) -> impl Iterator<Item = (&ReportEntry, &Finding)> {
        self.results
            .iter()
            .flat_map(|entry| entry.findings.iter().map(move |f| (entry, f)))
    }
}
