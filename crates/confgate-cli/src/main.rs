//! # confgate CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use confgate_cli::parse::{run_parse, ParseArgs};
use confgate_cli::server::{run_server, ServerArgs};
use confgate_cli::test::{run_test, TestArgs};
use confgate_cli::{load_config, EXIT_ERROR};

/// Validate structured configuration documents against declarative policy rules.
#[derive(Parser, Debug)]
#[command(name = "confgate", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML pipeline configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Test documents against policies.
    Test(TestArgs),

    /// Print documents in the normalized form rules see.
    Parse(ParseArgs),

    /// Serve the validation API over HTTP.
    #[command(name = "http-server")]
    HttpServer(ServerArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = load_config(cli.config.as_deref()).and_then(|config| match &cli.command {
        Commands::Test(args) => run_test(args, config),
        Commands::Parse(args) => run_parse(args, config),
        Commands::HttpServer(args) => run_server(args, config),
    });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}
