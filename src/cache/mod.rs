//! On-disk result cache
//!
//! One JSON document per fingerprint, stored under the cache directory:
//!
//! ```text
//! <cache dir>/<file name>-<digest>.json
//!   { "version": 1, "key": "...", "stored_at": "...", "result": { ... } }
//! ```
//!
//! Entries are written to a uniquely named temp file in the same directory
//! and renamed into place, so a concurrent reader sees either the old entry,
//! the new one, or nothing. An entry that fails to parse, carries another
//! version or belongs to another fingerprint is deleted and reported as a
//! miss. A process-local `DashMap` sits in front of the disk so repeated
//! lookups in one run do not re-read JSON.

mod key;
pub mod paths;
pub mod traits;

pub use key::CacheKey;
pub use paths::get_cache_dir;
pub use traits::ResultStore;

use crate::models::AnalysisResult;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Cache format version - bump when the result schema changes
pub const CACHE_VERSION: u32 = 1;

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to parse cache entry: {0}")]
    Deserialize(#[source] serde_json::Error),
    #[error("cache entry version {found} does not match {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("cache entry belongs to a different file state")]
    KeyMismatch,
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialized form of one cache entry
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    version: u32,
    key: String,
    stored_at: DateTime<Utc>,
    result: AnalysisResult,
}

/// What a prune pass removed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub removed: usize,
    pub kept: usize,
}

/// Persistent, self-healing store of analysis results
pub struct ResultCache {
    dir: PathBuf,
    memo: DashMap<CacheKey, Arc<AnalysisResult>>,
}

impl ResultCache {
    /// Cache rooted at `dir`. The directory is created lazily on first store.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            memo: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.entry_file_name())
    }

    /// Cached result for `key`. Any unreadable entry is removed and treated
    /// as a miss.
    pub fn lookup(&self, key: &CacheKey) -> Option<AnalysisResult> {
        if let Some(hit) = self.memo.get(key) {
            return Some(AnalysisResult::clone(&hit));
        }

        let path = self.entry_path(key);
        match read_entry(&path, key) {
            Ok(Some(result)) => {
                self.memo.insert(key.clone(), Arc::new(result.clone()));
                Some(result)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Discarding cache entry {}: {}", path.display(), e);
                if let Err(e) = fs::remove_file(&path) {
                    debug!("Could not remove {}: {}", path.display(), e);
                }
                None
            }
        }
    }

    /// Persist `result` under `key`. Failures are logged and swallowed.
    pub fn store(&self, key: &CacheKey, result: &AnalysisResult) {
        match self.try_store(key, result) {
            Ok(()) => {
                self.memo.insert(key.clone(), Arc::new(result.clone()));
            }
            Err(e) => warn!("Failed to cache result for {}: {}", key.name(), e),
        }
    }

    /// Fallible store used by [`ResultCache::store`]
    pub fn try_store(&self, key: &CacheKey, result: &AnalysisResult) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|e| CacheError::io(&self.dir, e))?;

        let entry = CacheEntry {
            version: CACHE_VERSION,
            key: key.to_string(),
            stored_at: Utc::now(),
            result: result.clone(),
        };
        let json = serde_json::to_vec(&entry).map_err(CacheError::Serialize)?;

        let final_path = self.entry_path(key);
        let tmp_path = self.dir.join(format!(
            ".{:016x}.{}.{}",
            key.digest(),
            uuid::Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ));

        // Write to temp file first, then rename (atomic on POSIX)
        if let Err(e) = fs::write(&tmp_path, &json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::io(&tmp_path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &final_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(CacheError::io(&final_path, e));
        }

        debug!("Cached result for {} at {}", key.name(), final_path.display());
        Ok(())
    }

    /// Remove entries older than `max_age`, plus stale temp files left by
    /// interrupted writers.
    ///
    /// Entries are written once, so a file modified within `max_age` is kept
    /// without being read. Only older files are parsed for their stored
    /// timestamp; those that fail to parse are removed.
    pub fn prune(&self, max_age: Duration) -> Result<PruneStats, CacheError> {
        let mut stats = PruneStats::default();
        let cutoff = chrono::Duration::from_std(max_age)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age));

        for path in self.entry_files()? {
            let is_temp = path.extension().and_then(|e| e.to_str()) == Some(TEMP_EXTENSION);
            let old_file = file_age(&path).is_none_or(|age| age >= max_age);
            let expired = if is_temp || !old_file {
                old_file
            } else {
                match read_stored_at(&path) {
                    Ok(stored_at) => cutoff.is_some_and(|cutoff| stored_at < cutoff),
                    Err(e) => {
                        debug!("Pruning unreadable entry {}: {}", path.display(), e);
                        true
                    }
                }
            };

            if expired {
                match fs::remove_file(&path) {
                    Ok(()) => stats.removed += 1,
                    Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
                }
            } else if !is_temp {
                stats.kept += 1;
            }
        }

        self.memo.clear();
        debug!(
            "Pruned cache {}: {} removed, {} kept",
            self.dir.display(),
            stats.removed,
            stats.kept
        );
        Ok(stats)
    }

    /// Delete every entry. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs::remove_file(&path).map_err(|e| CacheError::io(&path, e))?;
            removed += 1;
        }
        self.memo.clear();
        Ok(removed)
    }

    /// Number of committed entries on disk
    pub fn entry_count(&self) -> usize {
        self.entry_files()
            .map(|files| {
                files
                    .iter()
                    .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Entry and temp files in the cache directory
    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.dir, e)),
        };

        let mut files = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CacheError::io(&self.dir, e))?;
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if path.is_file() && matches!(ext, Some(ENTRY_EXTENSION) | Some(TEMP_EXTENSION)) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl ResultStore for ResultCache {
    fn name(&self) -> &str {
        "disk"
    }

    fn lookup(&self, key: &CacheKey) -> Option<AnalysisResult> {
        ResultCache::lookup(self, key)
    }

    fn store(&self, key: &CacheKey, result: &AnalysisResult) {
        ResultCache::store(self, key, result)
    }
}

/// Read and validate one entry. `Ok(None)` means no entry exists.
fn read_entry(path: &Path, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };
    let entry: CacheEntry = serde_json::from_slice(&bytes).map_err(CacheError::Deserialize)?;
    if entry.version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            found: entry.version,
            expected: CACHE_VERSION,
        });
    }
    if entry.key != key.to_string() {
        return Err(CacheError::KeyMismatch);
    }
    Ok(Some(entry.result))
}

fn read_stored_at(path: &Path) -> Result<DateTime<Utc>, CacheError> {
    #[derive(Deserialize)]
    struct Stamp {
        version: u32,
        stored_at: DateTime<Utc>,
    }

    let bytes = fs::read(path).map_err(|e| CacheError::io(path, e))?;
    let stamp: Stamp = serde_json::from_slice(&bytes).map_err(CacheError::Deserialize)?;
    if stamp.version != CACHE_VERSION {
        return Err(CacheError::VersionMismatch {
            found: stamp.version,
            expected: CACHE_VERSION,
        });
    }
    Ok(stamp.stored_at)
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    modified.elapsed().ok()
}
