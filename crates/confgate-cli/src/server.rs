//! # HTTP Server Subcommand

use anyhow::{Context, Result};
use clap::Args;

use confgate_api::state::{AppConfig, AppState, DEFAULT_PORT};
use confgate_pipeline::PipelineConfig;

/// Arguments for the `confgate http-server` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Port to listen on.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ServerArgs {
    /// Server configuration for the given pipeline settings.
    pub fn app_config(&self, pipeline: PipelineConfig) -> AppConfig {
        AppConfig {
            port: self.port,
            pipeline,
            ..AppConfig::default()
        }
    }
}

/// Execute the http-server subcommand. Runs until the process is stopped.
pub fn run_server(args: &ServerArgs, config: PipelineConfig) -> Result<u8> {
    let state = AppState::with_config(args.app_config(config))
        .context("failed to register metrics")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime
        .block_on(confgate_api::serve(state))
        .with_context(|| format!("HTTP server on port {} failed", args.port))?;
    Ok(crate::EXIT_PASS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_and_pipeline_flow_into_app_config() {
        let pipeline = PipelineConfig {
            combine: true,
            ..Default::default()
        };
        let config = ServerArgs { port: 9090 }.app_config(pipeline);
        assert_eq!(config.port, 9090);
        assert!(config.pipeline.combine);
        assert_eq!(config.body_limit, AppConfig::default().body_limit);
    }
}
