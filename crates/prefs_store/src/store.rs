use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::PrefsStoreError;
use crate::paths::temp_path_for;

/// Key-value preferences persisted as one JSON object on disk.
///
/// Writes are buffered in memory until [`PrefsStore::flush`], which replaces
/// the file atomically through a sibling temp file.
#[derive(Debug)]
pub struct PrefsStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
    dirty: bool,
}

impl PrefsStore {
    /// Opens the store at `path`. A missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self, PrefsStoreError> {
        let path = path.to_path_buf();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) if source.kind() == ErrorKind::NotFound => {
                return Ok(Self {
                    path,
                    values: BTreeMap::new(),
                    dirty: false,
                });
            }
            Err(source) => {
                return Err(PrefsStoreError::io("reading preferences file", &path, source));
            }
        };

        let values = if text.trim().is_empty() {
            BTreeMap::new()
        } else {
            let parsed: Value =
                serde_json::from_str(&text).map_err(|source| PrefsStoreError::JsonParse {
                    path: path.clone(),
                    source,
                })?;
            match parsed {
                Value::Object(map) => map.into_iter().collect(),
                _ => return Err(PrefsStoreError::InvalidRoot { path }),
            }
        };

        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Decodes the value stored under `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PrefsStoreError> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };

        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|source| PrefsStoreError::ValueDecode {
                key: key.to_string(),
                source,
            })
    }

    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), PrefsStoreError> {
        let value = serde_json::to_value(value).map_err(|source| PrefsStoreError::ValueEncode {
            key: key.to_string(),
            source,
        })?;

        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
        Ok(())
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        self.dirty |= removed;
        removed
    }

    /// Writes pending changes to disk. A clean store is a no-op.
    pub fn flush(&mut self) -> Result<(), PrefsStoreError> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| {
                PrefsStoreError::io("creating preferences directory", parent, source)
            })?;
        }

        let body = serde_json::to_string_pretty(&self.values).map_err(|source| {
            PrefsStoreError::ValueEncode {
                key: "<root>".to_string(),
                source,
            }
        })?;

        let temp_path = temp_path_for(&self.path);
        fs::write(&temp_path, body).map_err(|source| {
            PrefsStoreError::io("writing preferences temp file", &temp_path, source)
        })?;
        fs::rename(&temp_path, &self.path).map_err(|source| {
            PrefsStoreError::io("replacing preferences file", &self.path, source)
        })?;

        self.dirty = false;
        Ok(())
    }
}
