//! File-backed string key-value store, the CLI's stand-in for browser local storage.
//!
//! The whole map is loaded at open and rewritten on every mutation.

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CART_KEY: &str = "purat_cart";
pub const THEME_KEY: &str = "purat_theme";

#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let text = fs::read_to_string(&path)
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)
                    .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?
            }
        } else {
            BTreeMap::new()
        };

        tracing::debug!("Opened local store {} with {} keys", path.display(), entries.len());
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<()> {
        self.entries.insert(key.to_string(), value.into());
        self.flush()
    }

    pub fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    /// Decode a JSON-encoded value. Unparseable entries are logged and treated as absent.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {} entry: {}", key, e);
                None
            }
        }
    }

    pub fn set_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw)
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, text)
            .map_err(|e| anyhow!("Failed to write {}: {}", self.path.display(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(THEME_KEY, "dark").unwrap();
        store.set_json(CART_KEY, &vec![1, 2, 3]).unwrap();

        let store = LocalStore::open(&path).unwrap();
        assert_eq!(store.get(THEME_KEY), Some("dark"));
        assert_eq!(store.get_json::<Vec<i32>>(CART_KEY), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set(CART_KEY, "[]").unwrap();
        store.remove(CART_KEY).unwrap();
        store.remove("missing").unwrap();

        assert!(LocalStore::open(&path).unwrap().get(CART_KEY).is_none());
    }

    #[test]
    fn test_malformed_json_entry_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::open(dir.path().join("store.json")).unwrap();
        store.set(CART_KEY, "not json").unwrap();
        assert_eq!(store.get_json::<Vec<i32>>(CART_KEY), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{").unwrap();
        assert!(LocalStore::open(&path).is_err());
    }
}
