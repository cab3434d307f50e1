//! # Parse Subcommand
//!
//! Prints every input document in the normalized form rules evaluate,
//! as pretty-printed JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use confgate_core::{DocumentFormat, Value};
use confgate_loader::{collect_paths, DocumentLoader, InputSource};
use confgate_pipeline::{Pipeline, PipelineConfig};

/// Arguments for the `confgate parse` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ParseArgs {
    /// Files or directories to parse; `-` reads standard input.
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Decode every input with this format instead of its suffix.
    #[arg(long, value_name = "FORMAT")]
    pub parser: Option<DocumentFormat>,
}

#[derive(Debug, Serialize)]
struct ParsedDocument {
    document: String,
    format: DocumentFormat,
    contents: Value,
}

/// Decode every input and render the documents as a JSON array.
pub fn parse_documents(args: &ParseArgs, loader: &DocumentLoader) -> Result<String> {
    let mut parsed = Vec::new();
    for path in collect_paths(&args.paths, loader) {
        let source = InputSource::read(&path, args.parser)?;
        let documents = loader
            .load_source(&source)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        for doc in documents {
            tracing::debug!(document = %doc.id(), "parsed");
            parsed.push(ParsedDocument {
                document: doc.id().to_string(),
                format: doc.format(),
                contents: doc.into_content(),
            });
        }
    }
    let mut out = serde_json::to_string_pretty(&parsed)?;
    out.push('\n');
    Ok(out)
}

/// Execute the parse subcommand with the loader `test` would use.
pub fn run_parse(args: &ParseArgs, config: PipelineConfig) -> Result<u8> {
    let pipeline = Pipeline::new(config);
    print!("{}", parse_documents(args, pipeline.loader())?);
    Ok(crate::EXIT_PASS)
}
