//! # Error Taxonomy
//!
//! Structured error types for the whole pipeline, built with `thiserror`.
//!
//! - [`InputError`]: a single input document could not be read or decoded.
//!   Recoverable. The pipeline turns it into an exception finding on that
//!   document's verdict unless the caller asked to abort.
//! - [`CompileError`]: a rule source is malformed. Invocation-fatal.
//! - [`PipelineError`]: anything that stops an invocation before a report
//!   is produced.

use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentFormat;

/// A per-document input problem.
#[derive(Error, Debug)]
pub enum InputError {
    /// No decoder is registered for the resolved format, or the format could
    /// not be resolved from the source name.
    #[error("unsupported format for {name}: {format}")]
    UnsupportedFormat {
        /// Source name of the input.
        name: String,
        /// The resolved format name, or the unrecognized suffix.
        format: String,
    },

    /// The bytes are not valid for the declared format.
    #[error("failed to decode {name} as {format}: {reason}")]
    Decode {
        /// Source name of the input.
        name: String,
        /// The format the decoder attempted.
        format: DocumentFormat,
        /// Decoder diagnostic.
        reason: String,
    },

    /// The input could not be read from disk or standard input.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

impl InputError {
    /// The source name the error refers to.
    pub fn source_name(&self) -> String {
        match self {
            Self::UnsupportedFormat { name, .. } | Self::Decode { name, .. } => name.clone(),
            Self::Read { path, .. } => path.display().to_string(),
        }
    }
}

/// A syntax or reference error in one rule source.
///
/// Lines and columns are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_name}:{line}:{column}: {message}")]
pub struct CompileError {
    /// Name of the offending rule source.
    pub source_name: String,
    /// Line of the offending token.
    pub line: usize,
    /// Column of the offending token.
    pub column: usize,
    /// Diagnostic message.
    pub message: String,
}

/// Errors that abort an invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A rule source failed to compile; no bundle was produced.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// A requested namespace is not declared by any rule source.
    #[error("unknown namespace {namespace:?} (available: {available})")]
    UnknownNamespace {
        /// The requested namespace.
        namespace: String,
        /// Comma-separated list of namespaces the bundle declares.
        available: String,
    },

    /// Two auxiliary data sources map to the same key path.
    #[error("data conflict at data.{key}: {first} collides with {second}")]
    DataConflict {
        /// Dotted key path under `data`.
        key: String,
        /// Source that claimed the key first.
        first: String,
        /// Source that collided with it.
        second: String,
    },

    /// An auxiliary data source could not be read or decoded.
    #[error("invalid data source {path}: {source}")]
    DataSource {
        /// Path of the data source.
        path: PathBuf,
        /// Underlying input error.
        source: InputError,
    },

    /// A policy source could not be read.
    #[error("failed to read policy source {path}: {source}")]
    PolicyRead {
        /// Path of the policy source.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configured policy locations contain no rule sources.
    #[error("no policies found in {paths}")]
    NoPolicies {
        /// Comma-separated list of searched locations.
        paths: String,
    },

    /// An input document was rejected and the caller asked to abort on
    /// input errors.
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The caller cancelled the invocation; no report was finalized.
    #[error("evaluation cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether the error was caused by the caller's request rather than by
    /// server-side configuration.
    ///
    /// Drivers use this to choose between client-error and server-error
    /// responses.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Compile(_) | Self::UnknownNamespace { .. } | Self::Input(_)
        )
    }
}
