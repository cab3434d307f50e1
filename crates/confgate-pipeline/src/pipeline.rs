//! # Pipeline
//!
//! [`Pipeline::run`] executes one invocation end to end and is the only
//! evaluation entry point the drivers call.

use std::path::PathBuf;

use confgate_core::{
    DocumentFormat, DocumentId, Finding, InputError, PipelineError, StructuredDocument, Verdict,
};
use confgate_loader::{collect_paths, DocumentLoader, InputSource};
use confgate_policy::{CancelFlag, DataStore, PolicyBundle, TestRun};
use confgate_report::{Report, ReportCollector};

use crate::config::{InputErrorMode, PipelineConfig};

/// An evaluation pipeline for one configuration.
///
/// Holds no per-invocation state; each [`run`](Self::run) compiles its own
/// bundle and data store.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: DocumentLoader,
}

/// One decoded input slot, kept in input order.
enum Loaded {
    Document(StructuredDocument),
    Rejected(Verdict),
}

impl Pipeline {
    /// A pipeline using the default decoders.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            loader: DocumentLoader::default(),
        }
    }

    /// Replace the document loader.
    pub fn with_loader(mut self, loader: DocumentLoader) -> Self {
        self.loader = loader;
        self
    }

    /// The pipeline's configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The pipeline's document loader.
    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    /// Compile the configured policy sources.
    ///
    /// An empty policy list yields an empty bundle.
    pub fn compile_bundle(&self) -> Result<PolicyBundle, PipelineError> {
        if self.config.policy.is_empty() {
            return Ok(PolicyBundle::default());
        }
        PolicyBundle::from_paths(&self.config.policy)
    }

    /// Evaluate in-memory sources and finalize the report.
    pub fn run(&self, inputs: Vec<InputSource>, cancel: &CancelFlag) -> Result<Report, PipelineError> {
        self.run_inputs(inputs.into_iter().map(Ok), cancel)
    }

    /// Evaluate files and directories (`-` for standard input).
    ///
    /// Directories are expanded with [`collect_paths`]. Files are read
    /// lazily after the bundle compiled; a read failure is handled like a
    /// decode failure, per the configured [`InputErrorMode`].
    pub fn run_paths(
        &self,
        paths: &[PathBuf],
        format: Option<DocumentFormat>,
        cancel: &CancelFlag,
    ) -> Result<Report, PipelineError> {
        let files = collect_paths(paths, &self.loader);
        self.run_inputs(
            files.into_iter().map(|path| InputSource::read(&path, format)),
            cancel,
        )
    }

    /// Evaluate sources that may already have failed to read.
    ///
    /// Stages run in order: compile, load data, resolve namespaces, decode,
    /// evaluate, flush. Everything up to namespace resolution fails the
    /// invocation before any input is consumed.
    pub fn run_inputs<I>(&self, inputs: I, cancel: &CancelFlag) -> Result<Report, PipelineError>
    where
        I: IntoIterator<Item = Result<InputSource, InputError>>,
    {
        tracing::info!(combine = self.config.combine, "starting evaluation");

        let bundle = self.compile_bundle()?;
        let data = DataStore::build(&self.loader, &self.config.data)?;
        let namespaces = bundle.select(&self.config.namespace_selection())?;
        tracing::debug!(namespaces = ?namespaces, "resolved namespaces");

        let loaded = self.decode(inputs)?;
        let run = TestRun::new(&bundle, &data).with_cancel(cancel.clone());
        let collector = ReportCollector::new();

        if self.config.combine {
            let mut documents = Vec::new();
            for slot in loaded {
                match slot {
                    Loaded::Document(doc) => documents.push(doc),
                    Loaded::Rejected(verdict) => collector.put(verdict),
                }
            }
            collector.put(run.evaluate_combined(&namespaces, &documents)?);
        } else {
            for slot in loaded {
                match slot {
                    Loaded::Document(doc) => collector.put(run.evaluate(&namespaces, &doc)?),
                    Loaded::Rejected(verdict) => {
                        cancel.check()?;
                        collector.put(verdict);
                    }
                }
            }
        }

        Ok(collector.flush(&self.config.report_options()))
    }

    fn decode<I>(&self, inputs: I) -> Result<Vec<Loaded>, PipelineError>
    where
        I: IntoIterator<Item = Result<InputSource, InputError>>,
    {
        let mut loaded = Vec::new();
        let mut sources = 0usize;
        for input in inputs {
            sources += 1;
            match input.and_then(|source| self.loader.load_source(&source)) {
                Ok(documents) => loaded.extend(documents.into_iter().map(Loaded::Document)),
                Err(e) => match self.config.input_errors {
                    InputErrorMode::Abort => return Err(PipelineError::Input(e)),
                    InputErrorMode::Finding => {
                        tracing::warn!(source = %e.source_name(), error = %e, "input rejected");
                        loaded.push(Loaded::Rejected(rejected(&e)));
                    }
                },
            }
        }
        tracing::debug!(sources, slots = loaded.len(), "decoded inputs");
        Ok(loaded)
    }
}

/// A verdict standing in for a source that could not be decoded.
fn rejected(error: &InputError) -> Verdict {
    let mut verdict = Verdict::new(DocumentId::new(error.source_name(), 0));
    verdict.push(Finding::exception(error.to_string()));
    verdict
}
