// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent key/value backends for identity.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use crate::error::StorageError;

/// Durable string storage scoped to one origin.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` if the key has never been written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-lifetime store. Used when no durable storage is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file store: one flat string map per origin.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by a specific file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store for `origin` inside `dir`, one file per origin.
    pub fn for_origin(dir: &Path, origin: &str) -> Self {
        Self::at(dir.join(format!("{}.json", sanitize_origin(origin))))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Like `read_all`, but an unparseable file reads as empty so the next
    /// write replaces it.
    fn read_or_reset(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match self.read_all() {
            Err(StorageError::Corrupted(reason)) => {
                warn!(path = %self.path.display(), %reason, "Discarding corrupted store");
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_or_reset()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_or_reset()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }
}

/// Map an origin such as `https://example.com:8080` to a safe file stem.
fn sanitize_origin(origin: &str) -> String {
    let stem: String = origin
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "default".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::for_origin(temp.path(), "https://example.com");
        store.set("error_tracker_user_id", "user_1_abc").unwrap();

        let reopened = FileStore::for_origin(temp.path(), "https://example.com");
        assert_eq!(
            reopened.get("error_tracker_user_id").unwrap(),
            Some("user_1_abc".to_string())
        );
    }

    #[test]
    fn test_file_store_scoped_by_origin() {
        let temp = TempDir::new().unwrap();
        FileStore::for_origin(temp.path(), "https://a.example.com")
            .set("k", "a")
            .unwrap();

        let other = FileStore::for_origin(temp.path(), "https://b.example.com");
        assert_eq!(other.get("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::at(temp.path().join("nested/dir/store.json"));
        store.set("k", "v").unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_file_store_corrupted_reads_empty_and_is_replaced() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("store.json");
        std::fs::write(&path, r#"{"error_tracker_user_id": "user_1_abc"#).unwrap();

        let store = FileStore::at(&path);
        assert!(matches!(store.read_all(), Err(StorageError::Corrupted(_))));
        assert_eq!(store.get("error_tracker_user_id").unwrap(), None);

        store.set("error_tracker_user_id", "user_2_def").unwrap();
        let reopened = FileStore::at(&path);
        assert_eq!(
            reopened.get("error_tracker_user_id").unwrap(),
            Some("user_2_def".to_string())
        );
    }

    #[test]
    fn test_file_store_leaves_no_temp_file() {
        let temp = TempDir::new().unwrap();
        let store = FileStore::for_origin(temp.path(), "https://example.com");
        store.set("k", "v").unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["https___example.com.json".to_string()]);
    }

    #[test]
    fn test_sanitize_origin() {
        assert_eq!(sanitize_origin("https://example.com:8080"), "https___example.com_8080");
        assert_eq!(sanitize_origin("///"), "default");
        assert_eq!(sanitize_origin("default"), "default");
    }
}
