//! # API Route Modules
//!
//! - `validate`: multipart upload validation (`/v1/validate`, legacy
//!   `/validate`) and the root banner.
//! - `metrics`: Prometheus request and validation metrics.

pub mod metrics;
pub mod validate;
