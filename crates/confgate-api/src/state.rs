//! # Application State
//!
//! Shared, immutable server configuration plus request metrics. Nothing
//! evaluation-related lives here: each request builds its own pipeline,
//! bundle, data store and report from [`AppConfig::pipeline`].

use std::sync::Arc;

use confgate_pipeline::{InputErrorMode, PipelineConfig};

use crate::middleware::metrics::ApiMetrics;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum accepted upload size (32 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 32 << 20;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Maximum request body size for uploads, in bytes.
    pub body_limit: usize,
    /// Template for every request's pipeline.
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            body_limit: DEFAULT_BODY_LIMIT,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Immutable server configuration.
    pub config: Arc<AppConfig>,
    /// Prometheus request and validation metrics.
    pub metrics: ApiMetrics,
}

impl AppState {
    /// State with the default configuration.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_config(AppConfig::default())
    }

    /// State with an explicit configuration and a fresh metrics registry.
    pub fn with_config(config: AppConfig) -> Result<Self, prometheus::Error> {
        Ok(Self {
            config: Arc::new(config),
            metrics: ApiMetrics::new()?,
        })
    }

    /// The pipeline configuration for one request.
    ///
    /// Uploads that fail to decode are answered with 400, so input errors
    /// always abort.
    pub fn request_pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            input_errors: InputErrorMode::Abort,
            ..self.config.pipeline.clone()
        }
    }
}
