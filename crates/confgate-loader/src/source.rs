//! # Input Sources
//!
//! An [`InputSource`] is a named byte stream with an optional format
//! override. Sources come from files, standard input (`-`), or, in the HTTP
//! driver, multipart uploads.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use confgate_core::{DocumentFormat, InputError};
use walkdir::WalkDir;

use crate::loader::DocumentLoader;

/// Path argument that stands for standard input.
pub const STDIN_NAME: &str = "-";

/// A named byte stream awaiting decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    /// Source name: the file path as given, an upload's filename, or `-`.
    pub name: String,
    /// Explicit format override. `None` resolves from the name's suffix.
    pub format: Option<DocumentFormat>,
    /// Raw contents.
    pub bytes: Vec<u8>,
}

impl InputSource {
    /// Wrap in-memory bytes.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            format: None,
            bytes: bytes.into(),
        }
    }

    /// Set the explicit format override.
    pub fn with_format(mut self, format: Option<DocumentFormat>) -> Self {
        self.format = format;
        self
    }

    /// Read a file, or standard input when `path` is `-`.
    ///
    /// Standard input has no suffix, so it requires an explicit format.
    pub fn read(path: &Path, format: Option<DocumentFormat>) -> Result<Self, InputError> {
        if path == Path::new(STDIN_NAME) {
            return Self::from_stdin(format);
        }
        let bytes = std::fs::read(path).map_err(|source| InputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.display().to_string(), bytes).with_format(format))
    }

    /// Read all of standard input.
    pub fn from_stdin(format: Option<DocumentFormat>) -> Result<Self, InputError> {
        let Some(format) = format else {
            return Err(InputError::UnsupportedFormat {
                name: STDIN_NAME.to_string(),
                format: "unspecified (standard input needs an explicit format)".to_string(),
            });
        };
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .map_err(|source| InputError::Read {
                path: PathBuf::from(STDIN_NAME),
                source,
            })?;
        Ok(Self::new(STDIN_NAME, bytes).with_format(Some(format)))
    }
}

/// Expand path arguments into the list of files to load.
///
/// Directories are walked recursively and contribute only files whose
/// suffix resolves to a format `loader` supports, in sorted order. File
/// arguments and `-` are kept as given, so unreadable or unsupported files
/// surface as input errors later. Duplicates keep their first position.
pub fn collect_paths(paths: &[PathBuf], loader: &DocumentLoader) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = Vec::new();
            walk_dir(path, loader, &mut found);
            found.sort();
            for file in found {
                if seen.insert(file.clone()) {
                    out.push(file);
                }
            }
        } else if seen.insert(path.clone()) {
            out.push(path.clone());
        }
    }
    out
}

fn walk_dir(dir: &Path, loader: &DocumentLoader, acc: &mut Vec<PathBuf>) {
    // Symlinked directories are not descended into; symlinked files are kept.
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %e,
                    "failed to read directory entry during file walk"
                );
                continue;
            }
        };
        let path = entry.path();
        if path.is_file() && loader.recognizes(&path.to_string_lossy()) {
            acc.push(path.to_path_buf());
        }
    }
}
