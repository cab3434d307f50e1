//! # Findings
//!
//! A [`Finding`] is the atomic outcome of one rule firing against one
//! document, or of a captured evaluation/input problem on that document.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Severity classification of a finding.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A `deny` or `violation` rule fired.
    Failure,
    /// A `warn` rule fired.
    Warning,
    /// Rule execution or document decoding raised an internal error.
    Exception,
}

impl Severity {
    /// Lowercase label used by the text renderers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Failure => "failure",
            Self::Warning => "warning",
            Self::Exception => "exception",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule outcome: message, severity, and optional provenance.
///
/// Provenance is absent for findings that did not come from a rule, such as
/// a document that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Finding {
    /// Human-readable message produced by the rule.
    pub message: String,
    /// Severity classification.
    pub severity: Severity,
    /// Name of the rule that produced the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Namespace (package) the rule belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Fully qualified query path, e.g. `data.main.deny_root`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Finding {
    /// Create a finding with no provenance.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            rule: None,
            namespace: None,
            query: None,
        }
    }

    /// Failure-severity finding.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(Severity::Failure, message)
    }

    /// Warning-severity finding.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Exception-severity finding.
    pub fn exception(message: impl Into<String>) -> Self {
        Self::new(Severity::Exception, message)
    }

    /// Tag the finding with the rule and namespace that produced it.
    ///
    /// The query path is derived as `data.<namespace>.<rule>`.
    pub fn with_rule(mut self, namespace: &str, rule: &str) -> Self {
        self.query = Some(format!("data.{namespace}.{rule}"));
        self.rule = Some(rule.to_string());
        self.namespace = Some(namespace.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Severity::Failure).unwrap(), "\"failure\"");
        assert_eq!(serde_json::to_string(&Severity::Exception).unwrap(), "\"exception\"");
    }

    #[test]
    fn with_rule_sets_provenance() {
        let finding = Finding::failure("severity is high").with_rule("main", "deny_high");
        assert_eq!(finding.rule.as_deref(), Some("deny_high"));
        assert_eq!(finding.namespace.as_deref(), Some("main"));
        assert_eq!(finding.query.as_deref(), Some("data.main.deny_high"));
    }

    #[test]
    fn provenance_is_omitted_when_absent() {
        let json = serde_json::to_string(&Finding::exception("decode failed")).unwrap();
        assert_eq!(json, r#"{"message":"decode failed","severity":"exception"}"#);
    }
}
