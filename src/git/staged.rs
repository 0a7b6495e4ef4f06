//! Staged file discovery (index vs HEAD)

use crate::models::FileCategory;
use anyhow::{Context, Result};
use git2::{Delta, DiffOptions, Repository};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Check if a path is inside a git repository.
pub fn is_git_repo(path: &Path) -> bool {
    Repository::discover(path).is_ok()
}

/// Absolute paths of files added, modified, renamed or copied in the index
/// relative to `HEAD`, restricted to supported categories.
///
/// An unborn `HEAD` (no commits yet) compares against the empty tree, so
/// every staged file counts as added. Deleted files are never returned.
pub fn staged_files(path: &Path) -> Result<Vec<PathBuf>> {
    let repo = Repository::discover(path)
        .with_context(|| format!("Failed to open git repository at {:?}", path))?;
    let workdir = repo
        .workdir()
        .context("Cannot list staged files in a bare repository")?
        .to_path_buf();

    let head_tree = match repo.head() {
        Ok(head) => Some(head.peel_to_tree().context("HEAD does not point to a tree")?),
        Err(e) => {
            debug!("No HEAD commit ({}); diffing against the empty tree", e);
            None
        }
    };
    let index = repo.index().context("Failed to read the git index")?;

    let mut opts = DiffOptions::new();
    opts.include_typechange(true);
    let diff = repo
        .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))
        .context("Failed to diff index against HEAD")?;

    let mut files: Vec<PathBuf> = diff
        .deltas()
        .filter(|delta| {
            matches!(
                delta.status(),
                Delta::Added | Delta::Modified | Delta::Renamed | Delta::Copied | Delta::Typechange
            )
        })
        .filter_map(|delta| delta.new_file().path().map(|p| workdir.join(p)))
        .filter(|p| FileCategory::from_path(p).is_supported())
        .collect();
    files.sort();
    files.dedup();

    debug!("Found {} staged file(s) in {:?}", files.len(), workdir);
    Ok(files)
}
