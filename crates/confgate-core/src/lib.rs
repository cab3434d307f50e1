#![deny(missing_docs)]

//! # confgate-core: Foundational Types for confgate
//!
//! Every other crate in the workspace depends on this one. It has no internal
//! crate dependencies: only `serde`, `serde_json`, `thiserror`, and `utoipa`
//! from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **One document representation.** JSON, YAML, TOML and JSON-lines inputs
//!    all normalize into the [`Value`] tagged union. Rule evaluation never sees
//!    a format-specific type.
//!
//! 2. **Identity is `(filename, index)`.** A single file may carry several
//!    sub-documents; [`DocumentId`] keeps them distinct all the way into the
//!    report.
//!
//! 3. **Severity is closed.** [`Severity`] has exactly three variants. Whether
//!    a warning or an exception fails a report is decided by the report
//!    options, never by the finding itself.
//!
//! 4. **Structured errors.** The taxonomy in [`error`] separates per-document
//!    input problems from invocation-fatal compilation and configuration
//!    problems, so drivers can map them without string matching.

pub mod document;
pub mod error;
pub mod finding;
pub mod value;
pub mod verdict;

// Re-export primary types at crate root for ergonomic imports.
pub use document::{DocumentFormat, DocumentId, ParseFormatError, StructuredDocument};
pub use error::{CompileError, InputError, PipelineError};
pub use finding::{Finding, Severity};
pub use value::Value;
pub use verdict::Verdict;
