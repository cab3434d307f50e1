//! # Middleware
//!
//! - [`metrics`]: request and error counters.
//!
//! Request tracing uses `tower_http::trace::TraceLayer` directly.

pub mod metrics;
