//! Content-addressed cache of raw search pages.
//!
//! Entries are keyed by a SHA-256 of `(query, page)` and are write-once:
//! a second `put` for the same key is a no-op, and nothing ever expires.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::RegistryError;

/// Cache key for one page of one search query.
pub fn page_key(query: &str, page: usize) -> String {
    format!("{:x}", Sha256::digest(format!("{query}-{page}").as_bytes()))
}

/// Key-value store for raw registry responses.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, RegistryError>;

    /// Store `raw` under `key` unless an entry already exists.
    async fn put(&self, key: &str, raw: &str) -> Result<(), RegistryError>;
}

/// One `<key>.json` file per entry under a directory.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open a cache rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl PageCache for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        match tokio::fs::read_to_string(self.entry_path(key)).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, raw: &str) -> Result<(), RegistryError> {
        let dir = self.dir.clone();
        let path = self.entry_path(key);
        let raw = raw.to_owned();
        tokio::task::spawn_blocking(move || write_once(&dir, &path, &raw))
            .await
            .map_err(std::io::Error::other)??;
        Ok(())
    }
}

/// Write through a sibling temp file and rename without clobbering, so a
/// concurrent writer for the same key never observes a partial file.
fn write_once(dir: &Path, path: &Path, raw: &str) -> Result<(), RegistryError> {
    if path.exists() {
        return Ok(());
    }
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(raw.as_bytes())?;
    tmp.flush()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => {
            debug!(path = %path.display(), "cached search page");
            Ok(())
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.error.into()),
    }
}

/// Process-local cache, mainly for tests and short-lived runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PageCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, RegistryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, raw: &str) -> Result<(), RegistryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| std::io::Error::other("memory cache lock poisoned"))?;
        entries
            .entry(key.to_owned())
            .or_insert_with(|| raw.to_owned());
        Ok(())
    }
}
