//! # Policy Bundles
//!
//! Reads rule sources from the filesystem and compiles them into an
//! immutable [`PolicyBundle`]. Compilation is all-or-nothing: one bad source
//! and no bundle exists.
//!
//! Namespaces are the `package` names declared by the sources. A
//! [`NamespaceSelection`] is resolved against the bundle before any document
//! is evaluated, so an unknown namespace fails the invocation up front.

use std::path::{Path, PathBuf};

use confgate_core::{CompileError, PipelineError};
use confgate_rules::{compile, CompiledRule, RuleSet, RuleSource};
use walkdir::WalkDir;

/// File extension of rule sources found by directory walks.
pub const RULES_EXTENSION: &str = "rules";

// ---------------------------------------------------------------------------
// Namespace selection
// ---------------------------------------------------------------------------

/// Which namespaces a test run evaluates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NamespaceSelection {
    /// Every namespace the bundle declares.
    #[default]
    All,
    /// Only the listed namespaces. Each must exist in the bundle.
    Only(Vec<String>),
}

impl NamespaceSelection {
    /// Build a selection from a possibly empty list; empty means all.
    pub fn from_list<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|n| !n.trim().is_empty())
            .collect();
        if names.is_empty() {
            Self::All
        } else {
            Self::Only(names)
        }
    }
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A compiled, immutable set of rule sources grouped by namespace.
#[derive(Debug, Clone, Default)]
pub struct PolicyBundle {
    rules: RuleSet,
    sources: Vec<String>,
}

impl PolicyBundle {
    /// Compile in-memory rule sources.
    ///
    /// An empty slice yields an empty bundle with no namespaces.
    pub fn compile(sources: &[RuleSource]) -> Result<Self, CompileError> {
        let rules = compile(sources)?;
        let mut names: Vec<String> = sources.iter().map(|s| s.name.clone()).collect();
        names.sort();
        tracing::info!(
            sources = names.len(),
            namespaces = rules.namespaces().count(),
            rules = rules.rule_count(),
            "compiled policy bundle"
        );
        Ok(Self {
            rules,
            sources: names,
        })
    }

    /// Read every rule source under `paths` and compile them.
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self, PipelineError> {
        let sources = read_rule_sources(paths)?;
        Ok(Self::compile(&sources)?)
    }

    /// Declared namespaces in lexicographic order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.namespaces()
    }

    /// Names of the compiled sources, sorted.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Rules in `namespace`, in evaluation order. Unknown namespaces have
    /// no rules.
    pub fn rules(&self, namespace: &str) -> &[CompiledRule] {
        self.rules.rules(namespace)
    }

    /// Total number of rules across all namespaces.
    pub fn rule_count(&self) -> usize {
        self.rules.rule_count()
    }

    /// Whether the bundle declares no namespaces.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve `selection` to a sorted, deduplicated namespace list.
    ///
    /// Fails with [`PipelineError::UnknownNamespace`] on the first requested
    /// namespace the bundle does not declare.
    pub fn select(&self, selection: &NamespaceSelection) -> Result<Vec<String>, PipelineError> {
        match selection {
            NamespaceSelection::All => Ok(self.namespaces().map(str::to_string).collect()),
            NamespaceSelection::Only(requested) => {
                let mut selected: Vec<String> = Vec::with_capacity(requested.len());
                for name in requested {
                    if !self.rules.contains_namespace(name) {
                        return Err(PipelineError::UnknownNamespace {
                            namespace: name.clone(),
                            available: self.namespaces().collect::<Vec<_>>().join(", "),
                        });
                    }
                    selected.push(name.clone());
                }
                selected.sort();
                selected.dedup();
                Ok(selected)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Source discovery
// ---------------------------------------------------------------------------

/// Read rule sources from files and directories.
///
/// Directories are walked recursively for `*.rules` files; explicit file
/// arguments are read whatever their extension. Sources are named by path
/// and returned sorted by name.
///
/// Fails with [`PipelineError::PolicyRead`] when a path cannot be read and
/// with [`PipelineError::NoPolicies`] when nothing was found.
pub fn read_rule_sources(paths: &[PathBuf]) -> Result<Vec<RuleSource>, PipelineError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            find_rule_files(path, &mut found)?;
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(PipelineError::NoPolicies {
            paths: paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    files
        .into_iter()
        .map(|file| {
            let text = std::fs::read_to_string(&file).map_err(|source| {
                PipelineError::PolicyRead {
                    path: file.clone(),
                    source,
                }
            })?;
            tracing::debug!(path = %file.display(), "read rule source");
            Ok(RuleSource::new(file.display().to_string(), text))
        })
        .collect()
}

fn find_rule_files(dir: &Path, acc: &mut Vec<PathBuf>) -> Result<(), PipelineError> {
    // Symlinked directories are not descended into.
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|err| PipelineError::PolicyRead {
            path: err.path().unwrap_or(dir).to_path_buf(),
            source: std::io::Error::from(err),
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RULES_EXTENSION) {
            acc.push(path.to_path_buf());
        }
    }
    Ok(())
}
