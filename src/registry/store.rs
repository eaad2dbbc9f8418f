//! Thread-safe storage of tracked file entries.
//!
//! All reads and writes go through a single mutex. The lock is held only for
//! the map operation itself (one insert, one snapshot copy, one lookup), never
//! across file I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use super::entry::FileEntry;

#[derive(Debug, Default)]
struct Inner {
    /// Absolute path -> entry.
    entries: HashMap<PathBuf, FileEntry>,
    /// URL -> absolute path, kept in step with `entries`.
    by_url: HashMap<String, PathBuf>,
}

impl Inner {
    fn remove_key(&mut self, path: &Path) -> Option<FileEntry> {
        let entry = self.entries.remove(path)?;
        if self.by_url.get(&entry.url).is_some_and(|p| p == path) {
            self.by_url.remove(&entry.url);
        }
        Some(entry)
    }
}

/// In-memory registry of tracked files keyed by absolute path.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the entry for `path`.
    ///
    /// If another path currently owns the same URL, that entry is evicted so
    /// URLs stay unique.
    pub fn insert(&self, path: PathBuf, entry: FileEntry) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(previous) = inner.entries.get(&path) {
            if previous.url != entry.url {
                inner.by_url.remove(&previous.url);
            }
        }

        if let Some(owner) = inner.by_url.get(&entry.url).cloned() {
            if owner != path {
                inner.entries.remove(&owner);
                crate::debug_event!("registry", "evicted", "{} (url reused)", owner.display());
            }
        }

        inner.by_url.insert(entry.url.clone(), path.clone());
        inner.entries.insert(path, entry);
    }

    /// Copy of every entry, in no particular order.
    pub fn snapshot(&self) -> Vec<FileEntry> {
        let inner = self.inner.lock();
        inner.entries.values().cloned().collect()
    }

    /// Entry whose `url` equals `url` exactly.
    pub fn find_by_url(&self, url: &str) -> Option<FileEntry> {
        let inner = self.inner.lock();
        inner
            .by_url
            .get(url)
            .and_then(|path| inner.entries.get(path))
            .cloned()
    }

    pub fn get(&self, path: &Path) -> Option<FileEntry> {
        self.inner.lock().entries.get(path).cloned()
    }

    /// Remove the entry keyed by `path`.
    pub fn remove(&self, path: &Path) -> Option<FileEntry> {
        self.inner.lock().remove_key(path)
    }

    /// Remove `dir` itself and every entry located beneath it.
    ///
    /// Returns the number of entries removed.
    pub fn remove_under(&self, dir: &Path) -> usize {
        let mut inner = self.inner.lock();
        let doomed: Vec<PathBuf> = inner
            .entries
            .keys()
            .filter(|key| key.starts_with(dir))
            .cloned()
            .collect();

        for key in &doomed {
            inner.remove_key(key);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}
