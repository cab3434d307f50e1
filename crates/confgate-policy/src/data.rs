//! # Auxiliary Data Store
//!
//! Static reference data exposed to rules as `data`. Each source is decoded
//! with the [`DocumentLoader`] and mounted under a key path derived from its
//! location:
//!
//! - a file argument mounts at its file stem (`registries.yaml` becomes
//!   `data.registries`);
//! - a directory argument is walked and every decodable file mounts at its
//!   relative path without extension (`k8s/limits.yaml` becomes
//!   `data.k8s.limits`).
//!
//! Dots inside a stem or directory name separate key segments too, so
//! `registries.prod.yaml` mounts at `data.registries.prod`.
//!
//! A multi-document source mounts as a sequence and an empty one as `null`.
//! Two sources claiming the same key, or a leaf where a nested mapping is
//! needed, fail with [`PipelineError::DataConflict`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use confgate_core::{InputError, PipelineError, Value};
use confgate_loader::{collect_paths, DocumentLoader, InputSource};

/// Read-only auxiliary data for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DataStore {
    root: Value,
}

impl Default for DataStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl DataStore {
    /// A store with no data: `data` is an empty mapping.
    pub fn empty() -> Self {
        Self {
            root: Value::Mapping(BTreeMap::new()),
        }
    }

    /// Wrap an existing value as the data root.
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Load and merge every source under `paths`.
    pub fn build(loader: &DocumentLoader, paths: &[PathBuf]) -> Result<Self, PipelineError> {
        let mut tree = Tree::default();
        for path in paths {
            if path.is_dir() {
                for file in collect_paths(std::slice::from_ref(path), loader) {
                    let relative = file.strip_prefix(path).unwrap_or(&file);
                    let key = key_segments(relative);
                    let value = decode(loader, &file)?;
                    tree.insert(&key, value, &file)?;
                }
            } else {
                let key = key_segments(Path::new(path.file_name().unwrap_or(path.as_os_str())));
                let value = decode(loader, path)?;
                tree.insert(&key, value, path)?;
            }
        }
        tracing::info!(sources = tree.sources, "built auxiliary data store");
        Ok(Self {
            root: Value::Mapping(tree.entries),
        })
    }

    /// The data root, always a mapping when built from sources.
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted key path, e.g. `k8s.limits`.
    pub fn get(&self, dotted: &str) -> Option<&Value> {
        dotted
            .split('.')
            .try_fold(&self.root, |node, segment| node.get(segment))
    }
}

fn decode(loader: &DocumentLoader, path: &Path) -> Result<Value, PipelineError> {
    let wrap = |source: InputError| PipelineError::DataSource {
        path: path.to_path_buf(),
        source,
    };
    let input = InputSource::read(path, None).map_err(wrap)?;
    let (_, mut values) = loader
        .decode_values(&input.name, None, &input.bytes)
        .map_err(wrap)?;
    Ok(match values.len() {
        0 => Value::Null,
        1 => values.remove(0),
        _ => Value::Sequence(values),
    })
}

fn key_segments(relative: &Path) -> Vec<String> {
    relative
        .with_extension("")
        .components()
        .flat_map(|c| {
            c.as_os_str()
                .to_string_lossy()
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

#[derive(Default)]
struct Tree {
    entries: BTreeMap<String, Value>,
    /// Dotted key of every node, with the source that created it.
    origins: BTreeMap<String, String>,
    /// Keys of mappings created to hold nested sources.
    containers: BTreeSet<String>,
    sources: usize,
}

impl Tree {
    fn insert(&mut self, segments: &[String], value: Value, source: &Path) -> Result<(), PipelineError> {
        let source = source.display().to_string();
        let Some((leaf, parents)) = segments.split_last() else {
            return Ok(());
        };

        let mut map = &mut self.entries;
        let mut key = String::new();
        for segment in parents {
            push_segment(&mut key, segment);
            if !map.contains_key(segment) {
                map.insert(segment.clone(), Value::Mapping(BTreeMap::new()));
                self.containers.insert(key.clone());
                self.origins.insert(key.clone(), source.clone());
            }
            map = match map.get_mut(segment) {
                Some(Value::Mapping(next)) if self.containers.contains(&key) => next,
                _ => return Err(conflict(&self.origins, key, source)),
            };
        }

        push_segment(&mut key, leaf);
        if map.contains_key(leaf) {
            return Err(conflict(&self.origins, key, source));
        }
        map.insert(leaf.clone(), value);
        self.origins.insert(key, source);
        self.sources += 1;
        Ok(())
    }
}

fn push_segment(key: &mut String, segment: &str) {
    if !key.is_empty() {
        key.push('.');
    }
    key.push_str(segment);
}

fn conflict(origins: &BTreeMap<String, String>, key: String, second: String) -> PipelineError {
    let first = origins.get(&key).cloned().unwrap_or_default();
    PipelineError::DataConflict { key, first, second }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn file_mounts_at_its_stem() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "registries.yaml", "allowed: ghcr.io/\n");
        let store = DataStore::build(&DocumentLoader::default(), &[file]).unwrap();
        assert_eq!(store.get("registries.allowed"), Some(&Value::from("ghcr.io/")));
    }

    #[test]
    fn dotted_stem_mounts_as_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(dir.path(), "registries.prod.yaml", "allowed: ghcr.io/\n");
        let store = DataStore::build(&DocumentLoader::default(), &[file]).unwrap();
        assert_eq!(store.get("registries.prod.allowed"), Some(&Value::from("ghcr.io/")));
        assert!(store.value().get("registries.prod").is_none());
    }

    #[test]
    fn dotted_stem_conflicts_with_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        let dotted = write(dir.path(), "a/registries.prod.yaml", "x: 1\n");
        let tree = dir.path().join("b");
        let nested = write(&tree, "registries/prod.yaml", "x: 2\n");
        let err = DataStore::build(&DocumentLoader::default(), &[dotted.clone(), tree]).unwrap_err();
        match err {
            PipelineError::DataConflict { key, first, second } => {
                assert_eq!(key, "registries.prod");
                assert_eq!(first, dotted.display().to_string());
                assert_eq!(second, nested.display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn directory_mounts_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "k8s/limits.yaml", "cpu: 2\n");
        write(dir.path(), "k8s/names.json", r#"["a","b"]"#);
        write(dir.path(), "top.toml", "enabled = true\n");
        write(dir.path(), "notes.txt", "ignored");

        let store =
            DataStore::build(&DocumentLoader::default(), &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(store.get("k8s.limits.cpu"), Some(&Value::from(2.0)));
        assert_eq!(store.get("k8s.names").and_then(Value::as_sequence).map(<[Value]>::len), Some(2));
        assert_eq!(store.get("top.enabled"), Some(&Value::Bool(true)));
        assert_eq!(store.get("notes"), None);
    }

    #[test]
    fn multi_document_and_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let multi = write(dir.path(), "multi.yaml", "a: 1\n---\na: 2\n");
        let empty = write(dir.path(), "empty.json", "  \n");
        let store = DataStore::build(&DocumentLoader::default(), &[multi, empty]).unwrap();
        assert_eq!(store.get("multi").and_then(Value::as_sequence).map(<[Value]>::len), Some(2));
        assert_eq!(store.get("empty"), Some(&Value::Null));
    }

    #[test]
    fn same_key_twice_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "one/settings.yaml", "x: 1\n");
        let b = write(dir.path(), "two/settings.json", "{}");
        let err = DataStore::build(&DocumentLoader::default(), &[a.clone(), b.clone()]).unwrap_err();
        match err {
            PipelineError::DataConflict { key, first, second } => {
                assert_eq!(key, "settings");
                assert_eq!(first, a.display().to_string());
                assert_eq!(second, b.display().to_string());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn leaf_where_mapping_needed_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let leaf = write(dir.path(), "a/k8s.yaml", "limits: {}\n");
        let tree = dir.path().join("b");
        write(&tree, "k8s/limits.yaml", "cpu: 1\n");
        let err = DataStore::build(&DocumentLoader::default(), &[leaf, tree]).unwrap_err();
        assert!(matches!(err, PipelineError::DataConflict { ref key, .. } if key == "k8s"));
    }

    #[test]
    fn decode_failure_names_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.json", "{oops");
        let err = DataStore::build(&DocumentLoader::default(), &[bad.clone()]).unwrap_err();
        match err {
            PipelineError::DataSource { path, .. } => assert_eq!(path, bad),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_store_is_an_empty_mapping() {
        let store = DataStore::build(&DocumentLoader::default(), &[]).unwrap();
        assert_eq!(store, DataStore::empty());
        assert_eq!(store.value().as_mapping().map(BTreeMap::len), Some(0));
    }
}
