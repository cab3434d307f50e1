//! # confgate-cli: Command-Line Driver
//!
//! ## Subcommands
//!
//! - `confgate test`: evaluate documents against policies and print a report.
//! - `confgate parse`: print documents as the rules see them.
//! - `confgate http-server`: serve the validation API.
//!
//! ```bash
//! confgate test deploy.yaml -p policy -o table
//! confgate test - --parser json < input.json
//! confgate parse config.toml
//! ```
//!
//! ## Exit Codes
//!
//! `0` when every document passed, `1` when the report failed, `2` when the
//! invocation could not run (bad config, policy errors, unreadable inputs).

pub mod parse;
pub mod server;

use std::path::Path;

use anyhow::{Context, Result};
use confgate_pipeline::PipelineConfig;

/// Exit code for a passing report.
pub const EXIT_PASS: u8 = 0;
/// Exit code for a failing report.
pub const EXIT_FAIL: u8 = 1;
/// Exit code for an invocation that could not complete.
pub const EXIT_ERROR: u8 = 2;

/// Load the pipeline configuration, or the defaults without a file.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_config_file_means_defaults() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }

    #[test]
    fn config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confgate.yaml");
        std::fs::write(&path, "combine: true\n").unwrap();
        assert!(load_config(Some(&path)).unwrap().combine);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("absent.yaml"));
    }
}
