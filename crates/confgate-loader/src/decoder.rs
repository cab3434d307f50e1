//! # Format Decoders
//!
//! Every decoder normalizes its format's value model into [`Value`]:
//!
//! - YAML tags are stripped, merge keys (`<<`) are applied, and non-string
//!   mapping keys are rendered as strings.
//! - TOML datetimes become RFC 3339 strings.
//! - JSON numbers become `f64`.
//!
//! A decoder never retains the input buffer; it returns owned values.

use serde::Deserialize;

use confgate_core::Value;

/// Decode capability for one document format.
///
/// Returns every document contained in `bytes`, in stream order. The error
/// is a human-readable diagnostic; the loader attaches the source name and
/// format.
pub trait Decoder: Send + Sync {
    /// Decode `bytes` into zero or more documents.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String>;

    /// Decode `bytes`, pairing each document with its ordinal in the stream.
    ///
    /// Decoders that skip entries report the original ordinal of the
    /// documents they keep, so identities stay stable.
    fn decode_indexed(&self, bytes: &[u8]) -> Result<Vec<(usize, Value)>, String> {
        Ok(self.decode(bytes)?.into_iter().enumerate().collect())
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {e}"))
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// A single JSON value per stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
        let json: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Ok(vec![Value::from(json)])
    }
}

/// Newline-delimited JSON: one document per non-blank line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlDecoder;

impl Decoder for JsonlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
        let text = utf8(bytes)?;
        let mut docs = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let json: serde_json::Value =
                serde_json::from_str(line).map_err(|e| format!("line {}: {e}", idx + 1))?;
            docs.push(Value::from(json));
        }
        Ok(docs)
    }
}

// ---------------------------------------------------------------------------
// YAML
// ---------------------------------------------------------------------------

/// One or more YAML documents separated by `---`.
///
/// Null documents (an empty section between separators, or a stream of only
/// comments) are skipped. The documents after them keep their position in
/// the stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDecoder;

impl Decoder for YamlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
        Ok(self
            .decode_indexed(bytes)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    fn decode_indexed(&self, bytes: &[u8]) -> Result<Vec<(usize, Value)>, String> {
        let mut docs = Vec::new();
        for (idx, de) in serde_yaml::Deserializer::from_slice(bytes).enumerate() {
            let mut yaml = serde_yaml::Value::deserialize(de)
                .map_err(|e| format!("document {idx}: {e}"))?;
            yaml.apply_merge()
                .map_err(|e| format!("document {idx}: {e}"))?;
            if yaml.is_null() {
                continue;
            }
            docs.push((idx, yaml_to_value(yaml)));
        }
        Ok(docs)
    }
}

/// Convert a `serde_yaml::Value` into a [`Value`].
///
/// Tagged values are unwrapped. Mapping keys that are not strings are
/// rendered: scalars by their literal text, collections as compact JSON.
pub fn yaml_to_value(yaml: serde_yaml::Value) -> Value {
    match yaml {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i as f64)
            } else if let Some(u) = n.as_u64() {
                Value::Number(u as f64)
            } else {
                Value::Number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Sequence(seq.into_iter().map(yaml_to_value).collect())
        }
        serde_yaml::Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_value(v)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => yaml_to_value(other).to_string(),
    }
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

/// A single TOML table per stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlDecoder;

impl Decoder for TomlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Value>, String> {
        let table: toml::Table = toml::from_str(utf8(bytes)?).map_err(|e| e.to_string())?;
        Ok(vec![toml_to_value(toml::Value::Table(table))])
    }
}

/// Convert a `toml::Value` into a [`Value`]. Datetimes become strings.
pub fn toml_to_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i as f64),
        toml::Value::Float(f) => Value::Number(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Sequence(items.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => Value::Mapping(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_value(v)))
                .collect(),
        ),
    }
}
