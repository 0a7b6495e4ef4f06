//! File fingerprints used as cache keys
//!
//! A fingerprint is the file's identity (its path), its last-modification
//! time in nanosecond ticks and its byte length. This is a cheap check, not a
//! content hash: two edits that keep the size and land on the same timestamp
//! are indistinguishable. Setting `cache.verify_content` folds an xxh3 hash
//! of the content into the key to close that gap.

use super::paths::sanitize;
use std::fs;
use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;
use xxhash_rust::xxh3::{xxh3_64, Xxh3};

/// Deterministic identity of one file state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    mtime_ticks: u128,
    len: u64,
    content_hash: Option<u64>,
}

impl CacheKey {
    /// Build a key from its parts
    pub fn from_parts(name: impl Into<String>, mtime_ticks: u128, len: u64) -> Self {
        Self {
            name: name.into(),
            mtime_ticks,
            len,
            content_hash: None,
        }
    }

    /// Fingerprint a file on disk. Fails if the file cannot be stat'ed (or,
    /// with `verify_content`, read).
    pub fn for_path(path: &Path, verify_content: bool) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime_ticks = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let name = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string();

        let key = Self::from_parts(name, mtime_ticks, meta.len());
        if verify_content {
            return Ok(key.with_content_hash(xxh3_64(&fs::read(path)?)));
        }
        Ok(key)
    }

    /// Fold a content hash into the key
    pub fn with_content_hash(mut self, hash: u64) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mtime_ticks(&self) -> u128 {
        self.mtime_ticks
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stable 64-bit digest over every field
    pub fn digest(&self) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(self.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(&self.mtime_ticks.to_le_bytes());
        hasher.update(&self.len.to_le_bytes());
        if let Some(hash) = self.content_hash {
            hasher.update(&hash.to_le_bytes());
        }
        hasher.digest()
    }

    /// File name of the cache entry: readable prefix plus digest
    pub fn entry_file_name(&self) -> String {
        let base = Path::new(&self.name)
            .file_name()
            .and_then(|n| n.to_str())
            .map(sanitize)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "file".to_string());
        format!("{}-{:016x}.json", base, self.digest())
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.mtime_ticks, self.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_deterministic() {
        let a = CacheKey::from_parts("/repo/a.css", 1_000, 42);
        let b = CacheKey::from_parts("/repo/a.css", 1_000, 42);
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.entry_file_name(), b.entry_file_name());
    }

    #[test]
    fn test_every_field_changes_digest() {
        let base = CacheKey::from_parts("/repo/a.css", 1_000, 42);
        assert_ne!(base.digest(), CacheKey::from_parts("/repo/b.css", 1_000, 42).digest());
        assert_ne!(base.digest(), CacheKey::from_parts("/repo/a.css", 1_001, 42).digest());
        assert_ne!(base.digest(), CacheKey::from_parts("/repo/a.css", 1_000, 43).digest());
        assert_ne!(base.digest(), base.clone().with_content_hash(7).digest());
    }

    #[test]
    fn test_entry_file_name() {
        let key = CacheKey::from_parts("/repo/src/app.js", 5, 10);
        let name = key.entry_file_name();
        assert!(name.starts_with("app.js-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_for_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.css");
        fs::write(&path, ".a { color: red; }").unwrap();

        let key = CacheKey::for_path(&path, false).unwrap();
        assert_eq!(key.len(), 18);
        assert!(key.name().ends_with("site.css"));
        assert_eq!(key, CacheKey::for_path(&path, false).unwrap());

        let verified = CacheKey::for_path(&path, true).unwrap();
        assert_ne!(key.digest(), verified.digest());
    }

    #[test]
    fn test_for_missing_path_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheKey::for_path(&tmp.path().join("gone.js"), false).is_err());
    }
}
