//! # Verdicts
//!
//! A [`Verdict`] collects every finding produced for one document in one
//! evaluation run.

use serde::{Deserialize, Serialize};

use crate::document::DocumentId;
use crate::finding::{Finding, Severity};

/// The complete evaluation outcome for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// The document this verdict was computed for.
    pub document: DocumentId,
    /// Findings in evaluation order.
    pub findings: Vec<Finding>,
    /// Whether at least one rule query was executed. Distinguishes "no rules
    /// applied" from "rules applied and passed".
    pub queries_evaluated: bool,
    /// Number of rule queries executed against the document.
    pub rule_count: usize,
}

impl Verdict {
    /// An empty verdict for `document`: no findings, no queries.
    pub fn new(document: DocumentId) -> Self {
        Self {
            document,
            findings: Vec::new(),
            queries_evaluated: false,
            rule_count: 0,
        }
    }

    /// Record that one more rule query ran.
    pub fn record_query(&mut self) {
        self.queries_evaluated = true;
        self.rule_count += 1;
    }

    /// Append a finding.
    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Findings with the given severity.
    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Number of findings with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    /// Whether any failure-severity finding is present.
    pub fn has_failures(&self) -> bool {
        self.count(Severity::Failure) > 0
    }

    /// Number of rule queries that ran without producing a rule finding.
    ///
    /// A rule that fires several times (one message per binding) still
    /// counts as one query, so this saturates at zero.
    pub fn successes(&self) -> usize {
        let fired: std::collections::BTreeSet<&str> = self
            .findings
            .iter()
            .filter_map(|f| f.query.as_deref())
            .collect();
        self.rule_count.saturating_sub(fired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> DocumentId {
        DocumentId::new("deploy.yaml", 0)
    }

    #[test]
    fn new_verdict_is_empty_and_unevaluated() {
        let verdict = Verdict::new(id());
        assert!(verdict.findings.is_empty());
        assert!(!verdict.queries_evaluated);
        assert_eq!(verdict.successes(), 0);
    }

    #[test]
    fn counts_by_severity() {
        let mut verdict = Verdict::new(id());
        verdict.push(Finding::failure("a"));
        verdict.push(Finding::warning("b"));
        verdict.push(Finding::failure("c"));
        assert_eq!(verdict.count(Severity::Failure), 2);
        assert_eq!(verdict.count(Severity::Warning), 1);
        assert_eq!(verdict.count(Severity::Exception), 0);
        assert!(verdict.has_failures());
    }

    #[test]
    fn successes_count_rules_that_did_not_fire() {
        let mut verdict = Verdict::new(id());
        for _ in 0..3 {
            verdict.record_query();
        }
        verdict.push(Finding::failure("first").with_rule("main", "deny_x"));
        verdict.push(Finding::failure("second").with_rule("main", "deny_x"));
        assert!(verdict.queries_evaluated);
        assert_eq!(verdict.rule_count, 3);
        assert_eq!(verdict.successes(), 2);
    }
}
