//! # Documents and Document Identity
//!
//! A [`StructuredDocument`] is the decoded, immutable form of one input
//! document. Identity is the pair `(filename, index)` captured by
//! [`DocumentId`]: a multi-document YAML file yields several documents that
//! share a filename and differ by index.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

/// Declared document format.
///
/// Resolved from an explicit override or from the source name's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// A single JSON value.
    Json,
    /// One or more YAML documents separated by `---`.
    #[serde(alias = "yml")]
    Yaml,
    /// A TOML table.
    Toml,
    /// Newline-delimited JSON, one document per line.
    #[serde(alias = "ndjson")]
    Jsonl,
}

impl DocumentFormat {
    /// Every supported format, in display order.
    pub const ALL: [DocumentFormat; 4] = [Self::Json, Self::Yaml, Self::Toml, Self::Jsonl];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Jsonl => "jsonl",
        }
    }

    /// File extensions (without the dot) that resolve to this format.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Json => &["json"],
            Self::Yaml => &["yaml", "yml"],
            Self::Toml => &["toml"],
            Self::Jsonl => &["jsonl", "ndjson"],
        }
    }

    /// Resolve a format from a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extensions().contains(&ext.as_str()))
    }

    /// Resolve a format from the suffix of a source name or path.
    pub fn from_name(name: &str) -> Option<Self> {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A format name that does not correspond to any [`DocumentFormat`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown document format {0:?} (expected one of: json, yaml, toml, jsonl)")]
pub struct ParseFormatError(pub String);

impl FromStr for DocumentFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s.trim()).ok_or_else(|| ParseFormatError(s.to_string()))
    }
}

/// Identity of one decoded document: source name plus sub-document ordinal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId {
    /// Source filename or identifier the document was decoded from.
    pub filename: String,
    /// Zero-based position of the document within its source.
    pub index: usize,
}

impl DocumentId {
    /// Create a document identity.
    pub fn new(filename: impl Into<String>, index: usize) -> Self {
        Self {
            filename: filename.into(),
            index,
        }
    }
}

/// `file.yaml` for the first document, `file.yaml#2` for later ones.
impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            f.write_str(&self.filename)
        } else {
            write!(f, "{}#{}", self.filename, self.index)
        }
    }
}

/// An immutable decoded document.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredDocument {
    id: DocumentId,
    format: DocumentFormat,
    content: Value,
}

impl StructuredDocument {
    /// Wrap decoded content with its identity and declared format.
    pub fn new(id: DocumentId, format: DocumentFormat, content: Value) -> Self {
        Self {
            id,
            format,
            content,
        }
    }

    /// Document identity.
    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Declared format the document was decoded from.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    /// Decoded content.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Consume the document, returning its content.
    pub fn into_content(self) -> Value {
        self.content
    }
}
