//! # Pipeline Configuration
//!
//! Loaded from YAML; every field is optional:
//!
//! ```yaml
//! policy: [policy, shared/policy]
//! data: [data]
//! namespaces: [main]
//! combine: false
//! input_errors: finding   # or abort
//! granularity: document   # or file
//! fail_on_warn: false
//! fail_on_exception: false
//! ```

use std::path::{Path, PathBuf};

use confgate_policy::NamespaceSelection;
use confgate_report::{FailurePolicy, Granularity, ReportOptions};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Policy location used when none is configured.
pub const DEFAULT_POLICY_DIR: &str = "policy";

/// A configuration file could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[error("invalid config {path}: {source}")]
    Parse {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}

/// What happens when an input document cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputErrorMode {
    /// Record an exception finding for the source and keep going.
    #[default]
    Finding,
    /// Abort the invocation with the input error.
    Abort,
}

/// Everything one invocation needs besides its input documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Rule source files and directories.
    pub policy: Vec<PathBuf>,
    /// Auxiliary data files and directories.
    pub data: Vec<PathBuf>,
    /// Namespaces to evaluate; empty means all.
    pub namespaces: Vec<String>,
    /// Evaluate all documents as one combined input.
    pub combine: bool,
    /// Handling of undecodable inputs.
    pub input_errors: InputErrorMode,
    /// Report entry granularity.
    pub granularity: Granularity,
    /// Warnings fail the report.
    pub fail_on_warn: bool,
    /// Exceptions fail the report.
    pub fail_on_exception: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            policy: vec![PathBuf::from(DEFAULT_POLICY_DIR)],
            data: Vec::new(),
            namespaces: Vec::new(),
            combine: false,
            input_errors: InputErrorMode::default(),
            granularity: Granularity::default(),
            fail_on_warn: false,
            fail_on_exception: false,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document. `source` names it in errors.
    pub fn from_yaml_str(source: &Path, text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse {
            path: source.to_path_buf(),
            source: e,
        })
    }

    /// Load a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_yaml_str(path, &text)?;
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// The namespace restriction this config requests.
    pub fn namespace_selection(&self) -> NamespaceSelection {
        NamespaceSelection::from_list(self.namespaces.iter().cloned())
    }

    /// Options for flushing the report.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            granularity: self.granularity,
            failure_policy: FailurePolicy {
                fail_on_warn: self.fail_on_warn,
                fail_on_exception: self.fail_on_exception,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.policy, vec![PathBuf::from("policy")]);
        assert_eq!(config.namespace_selection(), NamespaceSelection::All);
        assert_eq!(config.report_options(), ReportOptions::default());
        assert_eq!(config.input_errors, InputErrorMode::Finding);
    }

    #[test]
    fn empty_yaml_is_default() {
        let config = PipelineConfig::from_yaml_str(Path::new("c.yaml"), "\n").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn parses_every_field() {
        let yaml = "policy: [rules]\n\
                    data: [ref, more.json]\n\
                    namespaces: [main]\n\
                    combine: true\n\
                    input_errors: abort\n\
                    granularity: file\n\
                    fail_on_warn: true\n\
                    fail_on_exception: true\n";
        let config = PipelineConfig::from_yaml_str(Path::new("c.yaml"), yaml).unwrap();
        assert_eq!(config.policy, vec![PathBuf::from("rules")]);
        assert_eq!(config.data.len(), 2);
        assert!(config.combine);
        assert_eq!(config.input_errors, InputErrorMode::Abort);
        assert_eq!(
            config.namespace_selection(),
            NamespaceSelection::Only(vec!["main".to_string()])
        );
        let options = config.report_options();
        assert_eq!(options.granularity, Granularity::File);
        assert!(options.failure_policy.fail_on_warn);
        assert!(options.failure_policy.fail_on_exception);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let config =
            PipelineConfig::from_yaml_str(Path::new("c.yaml"), "fail_on_warn: true\n").unwrap();
        assert!(config.fail_on_warn);
        assert_eq!(config.policy, vec![PathBuf::from("policy")]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = PipelineConfig::from_yaml_str(Path::new("c.yaml"), "polcy: [x]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid config c.yaml:"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_yaml_file(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
