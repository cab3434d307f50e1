//! # confgate-pipeline: Invocation Entry Point
//!
//! One invocation (a CLI run or one HTTP request) is:
//!
//! ```text
//! PipelineConfig ─┬─> PolicyBundle ──> namespaces ─┐
//!                 └─> DataStore ───────────────────┤
//! InputSource[] ──> DocumentLoader ──> documents ──┴─> TestRun ──> ReportCollector ──> Report
//! ```
//!
//! Configuration is an explicit [`PipelineConfig`] value, never ambient
//! state, and every [`Pipeline::run`] builds its own bundle, data store and
//! collector. Concurrent invocations share nothing mutable.
//!
//! ## Error Discipline
//!
//! Compile errors, unknown namespaces and data conflicts abort before any
//! document is evaluated. Input errors either become exception findings on
//! the affected document or abort, per [`InputErrorMode`]. Cancellation
//! returns [`PipelineError::Cancelled`](confgate_core::PipelineError) and no
//! report.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, InputErrorMode, PipelineConfig, DEFAULT_POLICY_DIR};
pub use pipeline::Pipeline;
