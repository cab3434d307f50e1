//! Aggregation options: entry granularity and failure policy.

use std::fmt;
use std::str::FromStr;

use confgate_core::Severity;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// An option value that does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} {value:?} (expected one of: {expected})")]
pub struct ParseOptionError {
    /// What was being parsed, e.g. `output format`.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
    /// Accepted values, comma-separated.
    pub expected: &'static str,
}

/// How sub-documents map to report entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One entry per `(filename, index)`.
    #[default]
    Document,
    /// One entry per filename; sub-documents are merged.
    File,
}

impl Granularity {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::File => "file",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "file" => Ok(Self::File),
            _ => Err(ParseOptionError {
                kind: "granularity",
                value: s.to_string(),
                expected: "document, file",
            }),
        }
    }
}

/// Which severities make a document fail.
///
/// Failures always do. Warnings and exceptions are informational unless
/// enabled here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FailurePolicy {
    /// Warnings fail the document.
    #[serde(default)]
    pub fail_on_warn: bool,
    /// Exceptions fail the document.
    #[serde(default)]
    pub fail_on_exception: bool,
}

impl FailurePolicy {
    /// Whether a finding of `severity` fails its document.
    pub fn fails(&self, severity: Severity) -> bool {
        match severity {
            Severity::Failure => true,
            Severity::Warning => self.fail_on_warn,
            Severity::Exception => self.fail_on_exception,
        }
    }
}

/// Options applied when a collector is flushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Entry granularity.
    pub granularity: Granularity,
    /// Failure policy.
    pub failure_policy: FailurePolicy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_only_fails_on_failures() {
        let policy = FailurePolicy::default();
        assert!(policy.fails(Severity::Failure));
        assert!(!policy.fails(Severity::Warning));
        assert!(!policy.fails(Severity::Exception));
    }

    #[test]
    fn opt_in_policies() {
        let policy = FailurePolicy {
            fail_on_warn: true,
            fail_on_exception: true,
        };
        assert!(policy.fails(Severity::Warning));
        assert!(policy.fails(Severity::Exception));
    }

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("File".parse::<Granularity>().unwrap(), Granularity::File);
        assert_eq!(" document ".parse::<Granularity>().unwrap(), Granularity::Document);
        let err = "line".parse::<Granularity>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown granularity \"line\" (expected one of: document, file)"
        );
    }

    #[test]
    fn granularity_serde_is_lowercase() {
        assert_eq!(serde_json::to_string(&Granularity::File).unwrap(), "\"file\"");
    }
}
