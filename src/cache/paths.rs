//! Cache path utilities - uses ~/.cache/commitgate/<repo-hash>/ instead of a directory inside the repo

use std::path::{Path, PathBuf};
use xxhash_rust::xxh3::xxh3_64;

/// Get the cache directory for a repository.
/// Uses ~/.cache/commitgate/<repo-hash>/ on Unix, %LOCALAPPDATA%/commitgate/<repo-hash>/ on Windows.
pub fn get_cache_dir(repo_path: &Path) -> PathBuf {
    let repo_hash = hash_path(repo_path);

    let base = if cfg!(windows) {
        std::env::var("LOCALAPPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".")))
    } else {
        dirs::cache_dir().unwrap_or_else(|| {
            // Fallback to ~/.cache
            dirs::home_dir()
                .map(|h| h.join(".cache"))
                .unwrap_or_else(|| PathBuf::from("."))
        })
    };

    base.join("commitgate").join(&repo_hash)
}

/// Hash a path to create a unique but deterministic directory name.
/// Uses the canonical path to ensure consistency.
fn hash_path(path: &Path) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let hash = xxh3_64(canonical.to_string_lossy().as_bytes());

    // Use canonical path's file_name for consistent naming (important when path is ".")
    let repo_name = sanitize(
        canonical
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("repo"),
    );

    format!("{}-{:012x}", repo_name, hash & 0xffff_ffff_ffff)
}

/// Keep a short, filesystem-safe prefix of a name
pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .take(20)
        .collect()
}
