//! Persistent extraction cache.
//!
//! Maps each [`DocumentId`] to the fingerprint it had when last extracted and
//! the fragments extracted from it. The whole map lives in memory during a
//! scan and is written back as a single JSON file.
//!
//! The store has no internal locking: workers never touch it. The controller
//! mutates it on the control path after collecting worker results, and
//! [`CacheStore::save`] writes to a uniquely named temporary file and renames
//! it into place, so neither a crash mid-write nor an overlapping run ever
//! exposes a truncated cache.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::CacheError;
use crate::models::{CacheEntry, DocumentId, Fingerprint, Fragments};

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = ".i18n-cache";
/// File name of the cache inside the cache directory.
pub const CACHE_FILE: &str = "extraction_cache.json";

const CACHE_VERSION: u32 = 1;

#[derive(Deserialize)]
struct CacheFile {
    version: u32,
    entries: BTreeMap<DocumentId, CacheEntry>,
}

#[derive(Serialize)]
struct CacheFileRef<'a> {
    version: u32,
    entries: &'a BTreeMap<DocumentId, CacheEntry>,
}

pub struct CacheStore {
    path: PathBuf,
    entries: BTreeMap<DocumentId, CacheEntry>,
    dirty: bool,
}

impl CacheStore {
    /// An empty store that will persist into `dir`.
    pub fn empty(dir: &Path) -> Self {
        Self {
            path: dir.join(CACHE_FILE),
            entries: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Loads the cache from `dir`. A missing file yields an empty store; a
    /// file that cannot be parsed is [`CacheError::Corrupt`].
    pub fn load(dir: &Path) -> Result<Self, CacheError> {
        let mut store = Self::empty(dir);
        let raw = match fs::read(&store.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(source) => {
                return Err(CacheError::Io {
                    path: store.path,
                    source,
                })
            }
        };

        let file: CacheFile = serde_json::from_slice(&raw).map_err(|e| CacheError::Corrupt {
            path: store.path.clone(),
            reason: e.to_string(),
        })?;
        if file.version != CACHE_VERSION {
            return Err(CacheError::Corrupt {
                path: store.path,
                reason: format!(
                    "unsupported cache version {} (expected {})",
                    file.version, CACHE_VERSION
                ),
            });
        }

        store.entries = file.entries;
        debug!(path = %store.path.display(), entries = store.entries.len(), "loaded cache");
        Ok(store)
    }

    /// Loads the cache, falling back to an empty store (and therefore a full
    /// rescan) when the persisted file is unreadable or corrupt.
    pub fn open(dir: &Path) -> Self {
        match Self::load(dir) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, "ignoring unusable cache, forcing full rescan");
                Self::empty(dir)
            }
        }
    }

    pub fn lookup(&self, id: &DocumentId) -> Option<&CacheEntry> {
        self.entries.get(id)
    }

    /// Replaces any prior entry for `id`.
    pub fn upsert(&mut self, id: DocumentId, fingerprint: Fingerprint, results: Fragments) {
        self.entries.insert(
            id,
            CacheEntry {
                fingerprint,
                computed_at: Utc::now(),
                results,
            },
        );
        self.dirty = true;
    }

    /// Persists the full map atomically: serialize, write a uniquely named
    /// temp file in the cache directory, sync, rename over the cache file.
    /// Concurrent saves never share a temp file; the last rename wins.
    pub fn save(&mut self) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let body = serde_json::to_vec_pretty(&CacheFileRef {
            version: CACHE_VERSION,
            entries: &self.entries,
        })?;

        let io_err = |source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io {
            path: self.path.clone(),
            source: e.error,
        })?;

        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "saved cache");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when entries changed since the last load or save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Entries in identity order.
    pub fn entries(&self) -> impl Iterator<Item = (&DocumentId, &CacheEntry)> {
        self.entries.iter()
    }
}
