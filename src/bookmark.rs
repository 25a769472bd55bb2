//! Resume point persistence.
//!
//! State lives in a small key-value store. The file-backed store keeps every
//! key in one JSON object on disk, written whole on each change.

use crate::error::{ReaderError, Result};
use crate::playback::Settings;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

pub const BOOKMARK_KEY: &str = "readaloud.bookmark";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: String) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Shared handle, so a host (or a test) can inspect what the engine wrote.
impl<T: KeyValueStore> KeyValueStore for Rc<RefCell<T>> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.borrow().get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.borrow_mut().set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.borrow_mut().remove(key)
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(err) => return Err(storage_error(&self.path, err)),
        };
        if data.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&data).map_err(|err| storage_error(&self.path, err))
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| storage_error(parent, err))?;
            }
        }
        let contents =
            serde_json::to_string_pretty(entries).map_err(|err| storage_error(&self.path, err))?;
        fs::write(&self.path, contents).map_err(|err| storage_error(&self.path, err))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

fn storage_error(path: &Path, err: impl std::fmt::Display) -> ReaderError {
    ReaderError::Storage(format!("{}: {err}", path.display()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub file_id: String,
    pub file_name: String,
    pub chunk_index: usize,
    pub is_sequential: bool,
    pub settings: Settings,
}

pub struct BookmarkStore {
    store: Box<dyn KeyValueStore>,
}

impl BookmarkStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn save(&mut self, bookmark: &Bookmark) -> Result<()> {
        let json = serde_json::to_string(bookmark)
            .map_err(|err| ReaderError::Storage(err.to_string()))?;
        self.store.set(BOOKMARK_KEY, json)?;
        debug!(
            file = %bookmark.file_name,
            chunk = bookmark.chunk_index,
            "Saved bookmark"
        );
        Ok(())
    }

    /// A malformed entry is logged and treated as absent.
    pub fn load(&self) -> Option<Bookmark> {
        let raw = match self.store.get(BOOKMARK_KEY) {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("Failed to read bookmark: {err}");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(bookmark) => Some(bookmark),
            Err(err) => {
                warn!("Ignoring malformed bookmark: {err}");
                None
            }
        }
    }

    pub fn clear(&mut self) -> Result<()> {
        self.store.remove(BOOKMARK_KEY)
    }
}
