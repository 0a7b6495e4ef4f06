//! Cache command - prune or clear stored results

use crate::cache::ResultCache;
use crate::config::load_config;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TTL_DAYS: u64 = 30;

fn open(path: &Path) -> Result<ResultCache> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    let config = load_config(&repo_path);
    Ok(ResultCache::open(config.cache_dir(&repo_path)))
}

pub fn prune(path: &Path, days: Option<u64>) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;
    let days = days
        .or(load_config(&repo_path).cache.ttl_days)
        .unwrap_or(DEFAULT_TTL_DAYS);

    let cache = open(&repo_path)?;
    let stats = cache
        .prune(Duration::from_secs(days.saturating_mul(24 * 60 * 60)))
        .with_context(|| format!("Failed to prune {}", cache.dir().display()))?;

    println!(
        "{} Pruned {} entr{} older than {} day(s), {} kept ({})",
        style("✓").green(),
        style(stats.removed).cyan(),
        if stats.removed == 1 { "y" } else { "ies" },
        days,
        stats.kept,
        style(cache.dir().display()).dim()
    );
    Ok(())
}

pub fn clear(path: &Path) -> Result<()> {
    let cache = open(path)?;
    let removed = cache
        .clear()
        .with_context(|| format!("Failed to clear {}", cache.dir().display()))?;

    println!(
        "{} Removed {} cache entr{} from {}",
        style("✓").green(),
        style(removed).cyan(),
        if removed == 1 { "y" } else { "ies" },
        style(cache.dir().display()).dim()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheKey;
    use crate::config::CONFIG_FILE_NAME;
    use crate::models::AnalysisResult;
    use tempfile::TempDir;

    fn repo_with_local_cache() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[cache]\ndirectory = \".cache\"\n",
        )
        .unwrap();
        tmp
    }

    #[test]
    fn test_clear_removes_entries() {
        let tmp = repo_with_local_cache();
        let cache = open(tmp.path()).unwrap();
        let key = CacheKey::from_parts("/repo/a.css", 1, 2);
        cache.store(&key, &AnalysisResult::skipped(Path::new("/repo/a.css")));
        assert_eq!(cache.entry_count(), 1);

        clear(tmp.path()).unwrap();
        assert_eq!(open(tmp.path()).unwrap().entry_count(), 0);
    }

    #[test]
    fn test_prune_keeps_fresh_entries() {
        let tmp = repo_with_local_cache();
        let cache = open(tmp.path()).unwrap();
        let key = CacheKey::from_parts("/repo/a.css", 1, 2);
        cache.store(&key, &AnalysisResult::skipped(Path::new("/repo/a.css")));

        prune(tmp.path(), Some(1)).unwrap();
        assert_eq!(open(tmp.path()).unwrap().entry_count(), 1);
    }
}
