//! # confgate-report: Result Aggregation
//!
//! Collects per-document [`Verdict`](confgate_core::Verdict)s into a
//! [`Report`] and renders it.
//!
//! ## Lifecycle
//!
//! A [`ReportCollector`] accepts verdicts through [`ReportCollector::put`]
//! from any number of threads. [`ReportCollector::flush`] consumes the
//! collector and derives the overall status, so a flushed report can never
//! be appended to.
//!
//! ## Failure Policy
//!
//! A document fails when it has a failure-severity finding. Warnings and
//! exceptions are reported but only fail the document when the
//! [`FailurePolicy`] opts in.

pub mod collector;
pub mod model;
pub mod options;
pub mod render;

pub use collector::ReportCollector;
pub use model::{Report, ReportEntry, Summary};
pub use options::{FailurePolicy, Granularity, ParseOptionError, ReportOptions};
pub use render::{render, OutputFormat};
