//! # Document Loader Registry
//!
//! `load(name, declared, bytes)` resolves the format, dispatches to the
//! registered [`Decoder`], and assigns each decoded document its identity
//! `(name, index)`.

use std::collections::BTreeMap;
use std::sync::Arc;

use confgate_core::{DocumentFormat, DocumentId, InputError, StructuredDocument, Value};

use crate::decoder::{Decoder, JsonDecoder, JsonlDecoder, TomlDecoder, YamlDecoder};
use crate::source::InputSource;

/// Registry of decoders keyed by format.
///
/// Cheap to clone; decoders are shared behind `Arc`.
#[derive(Clone)]
pub struct DocumentLoader {
    decoders: BTreeMap<DocumentFormat, Arc<dyn Decoder>>,
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader")
            .field("formats", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::with_default_decoders()
    }
}

impl DocumentLoader {
    /// A loader with no decoders registered. Every load fails with
    /// [`InputError::UnsupportedFormat`] until decoders are added.
    pub fn empty() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// A loader with the JSON, YAML, TOML and JSON-lines decoders.
    pub fn with_default_decoders() -> Self {
        let mut loader = Self::empty();
        loader.register(DocumentFormat::Json, JsonDecoder);
        loader.register(DocumentFormat::Yaml, YamlDecoder);
        loader.register(DocumentFormat::Toml, TomlDecoder);
        loader.register(DocumentFormat::Jsonl, JsonlDecoder);
        loader
    }

    /// Register (or replace) the decoder for `format`.
    pub fn register(&mut self, format: DocumentFormat, decoder: impl Decoder + 'static) {
        self.decoders.insert(format, Arc::new(decoder));
    }

    /// Whether a decoder is registered for `format`.
    pub fn supports(&self, format: DocumentFormat) -> bool {
        self.decoders.contains_key(&format)
    }

    /// Whether `name`'s suffix resolves to a registered format.
    pub fn recognizes(&self, name: &str) -> bool {
        DocumentFormat::from_name(name).is_some_and(|f| self.supports(f))
    }

    /// Resolve the format of a source: the explicit override wins, otherwise
    /// the name's suffix is used.
    pub fn resolve_format(
        &self,
        name: &str,
        declared: Option<DocumentFormat>,
    ) -> Result<DocumentFormat, InputError> {
        let format = match declared.or_else(|| DocumentFormat::from_name(name)) {
            Some(format) => format,
            None => {
                let suffix = std::path::Path::new(name)
                    .extension()
                    .map(|ext| ext.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "unspecified".to_string());
                return Err(InputError::UnsupportedFormat {
                    name: name.to_string(),
                    format: suffix,
                });
            }
        };
        if !self.supports(format) {
            return Err(InputError::UnsupportedFormat {
                name: name.to_string(),
                format: format.to_string(),
            });
        }
        Ok(format)
    }

    /// Decode `bytes` into raw values without assigning identity.
    ///
    /// Whitespace-only input decodes to zero values for every format.
    pub fn decode_values(
        &self,
        name: &str,
        declared: Option<DocumentFormat>,
        bytes: &[u8],
    ) -> Result<(DocumentFormat, Vec<Value>), InputError> {
        let (format, values) = self.decode_indexed(name, declared, bytes)?;
        Ok((format, values.into_iter().map(|(_, value)| value).collect()))
    }

    fn decode_indexed(
        &self,
        name: &str,
        declared: Option<DocumentFormat>,
        bytes: &[u8],
    ) -> Result<(DocumentFormat, Vec<(usize, Value)>), InputError> {
        let format = self.resolve_format(name, declared)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok((format, Vec::new()));
        }
        let decoder = self
            .decoders
            .get(&format)
            .ok_or_else(|| InputError::UnsupportedFormat {
                name: name.to_string(),
                format: format.to_string(),
            })?;
        let values = decoder
            .decode_indexed(bytes)
            .map_err(|reason| InputError::Decode {
                name: name.to_string(),
                format,
                reason,
            })?;
        Ok((format, values))
    }

    /// Decode one named byte stream into structured documents.
    ///
    /// Each document is identified by its ordinal in the stream. An empty
    /// result is not an error: the source simply contributes no documents.
    pub fn load(
        &self,
        name: &str,
        declared: Option<DocumentFormat>,
        bytes: &[u8],
    ) -> Result<Vec<StructuredDocument>, InputError> {
        let (format, values) = self.decode_indexed(name, declared, bytes)?;
        tracing::debug!(source = name, %format, documents = values.len(), "decoded input");
        Ok(values
            .into_iter()
            .map(|(index, content)| {
                StructuredDocument::new(DocumentId::new(name, index), format, content)
            })
            .collect())
    }

    /// Decode an [`InputSource`].
    pub fn load_source(&self, source: &InputSource) -> Result<Vec<StructuredDocument>, InputError> {
        self.load(&source.name, source.format, &source.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_assigns_identity_per_sub_document() {
        let loader = DocumentLoader::default();
        let docs = loader
            .load("manifests.yaml", None, b"a: 1\n---\nb: 2\n")
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id(), &DocumentId::new("manifests.yaml", 0));
        assert_eq!(docs[1].id(), &DocumentId::new("manifests.yaml", 1));
        assert_eq!(docs[1].format(), DocumentFormat::Yaml);
    }

    #[test]
    fn skipped_null_documents_keep_later_ordinals() {
        let loader = DocumentLoader::default();
        let docs = loader.load("m.yaml", None, b"a: 1\n---\n~\n---\nb: 2\n").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id(), &DocumentId::new("m.yaml", 0));
        assert_eq!(docs[1].id(), &DocumentId::new("m.yaml", 2));
        assert_eq!(docs[1].id().to_string(), "m.yaml#2");
        assert_eq!(docs[1].content().get("b").and_then(Value::as_f64), Some(2.0));
    }

    #[test]
    fn explicit_format_overrides_suffix() {
        let loader = DocumentLoader::default();
        let docs = loader
            .load("config.txt", Some(DocumentFormat::Json), br#"{"x": true}"#)
            .unwrap();
        assert_eq!(docs[0].format(), DocumentFormat::Json);

        let err = loader
            .load("config.json", Some(DocumentFormat::Toml), br#"{"x": true}"#)
            .unwrap_err();
        assert!(matches!(err, InputError::Decode { format: DocumentFormat::Toml, .. }));
    }

    #[test]
    fn unknown_suffix_is_unsupported() {
        let loader = DocumentLoader::default();
        let err = loader.load("notes.txt", None, b"hello").unwrap_err();
        match err {
            InputError::UnsupportedFormat { name, format } => {
                assert_eq!(name, "notes.txt");
                assert_eq!(format, "txt");
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
        let err = loader.load("Dockerfile", None, b"FROM x").unwrap_err();
        assert!(err.to_string().contains("unspecified"));
    }

    #[test]
    fn unregistered_format_is_unsupported() {
        let loader = DocumentLoader::empty();
        let err = loader.load("a.json", None, b"{}").unwrap_err();
        assert!(matches!(err, InputError::UnsupportedFormat { ref format, .. } if format == "json"));
    }

    #[test]
    fn whitespace_only_input_yields_no_documents() {
        let loader = DocumentLoader::default();
        for name in ["a.json", "a.yaml", "a.toml", "a.jsonl"] {
            let docs = loader.load(name, None, b"  \n\t\n").unwrap();
            assert!(docs.is_empty(), "{name} produced documents");
        }
    }

    #[test]
    fn decode_errors_carry_source_name() {
        let loader = DocumentLoader::default();
        let err = loader.load("broken.json", None, b"{").unwrap_err();
        assert_eq!(err.source_name(), "broken.json");
    }

    #[test]
    fn decoding_is_idempotent() {
        let loader = DocumentLoader::default();
        let bytes = b"kind: Pod\nspec:\n  containers:\n    - image: nginx:latest\n";
        let first = loader.load("pod.yaml", None, bytes).unwrap();
        let second = loader.load("pod.yaml", None, bytes).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_decoders_can_be_registered() {
        struct Lines;
        impl Decoder for Lines {
            fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
                Ok(String::from_utf8_lossy(bytes)
                    .lines()
                    .map(Value::from)
                    .collect())
            }
        }
        let mut loader = DocumentLoader::default();
        loader.register(DocumentFormat::Jsonl, Lines);
        let docs = loader.load("x.jsonl", None, b"not\njson").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content(), &Value::from("not"));
    }
}
