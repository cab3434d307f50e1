//! # confgate-api: Binary Entry Point
//!
//! Environment:
//!
//! - `PORT`: listen port (default 8080).
//! - `CONFGATE_CONFIG`: pipeline config file (YAML).
//! - `RUST_LOG`: log filter (default `info`).
//! - `LOG_FORMAT=json`: emit JSON log lines.

use std::path::PathBuf;

use confgate_api::state::{AppConfig, AppState, DEFAULT_PORT};
use confgate_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let pipeline = match std::env::var_os("CONFGATE_CONFIG") {
        Some(path) => PipelineConfig::from_yaml_file(&PathBuf::from(path)).map_err(|e| {
            tracing::error!("Config load failed: {e}");
            e
        })?,
        None => PipelineConfig::default(),
    };

    let config = AppConfig {
        port,
        pipeline,
        ..AppConfig::default()
    };
    confgate_api::serve(AppState::with_config(config)?).await?;

    Ok(())
}
