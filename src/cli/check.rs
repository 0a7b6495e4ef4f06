//! Check command - analyze files and gate on high-severity issues

use crate::cache::{ResultCache, ResultStore};
use crate::config::{load_config, Config};
use crate::git;
use crate::models::FileCategory;
use crate::pipeline::Orchestrator;
use crate::reporters::{report_with_format, BatchReport, OutputFormat};
use crate::summary::summarize;

use anyhow::{Context, Result};
use console::style;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Default)]
pub(super) struct CheckOptions {
    pub paths: Vec<PathBuf>,
    pub staged: bool,
    pub format: OutputFormat,
    pub no_cache: bool,
    pub workers: Option<usize>,
    pub timeout: Option<u64>,
}

/// Run the check command and return the process exit code
pub(super) fn run(repo: &Path, options: CheckOptions) -> Result<i32> {
    let repo_path = repo
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", repo.display()))?;

    let config = effective_config(&repo_path, &options);
    let files = collect_targets(&repo_path, &options)?;
    debug!("Checking {} file(s) in {}", files.len(), repo_path.display());

    let cache = if config.cache.enabled {
        Some(Arc::new(ResultCache::open(config.cache_dir(&repo_path))))
    } else {
        None
    };

    let mut orchestrator = Orchestrator::new(config.clone());
    if let Some(cache) = &cache {
        orchestrator = orchestrator.with_store(Arc::clone(cache) as Arc<dyn ResultStore>);
    }

    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );
    let on_progress = |done: usize, total: usize| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
    };
    let outcome = orchestrator.run(&files, Some(&on_progress));
    bar.finish_and_clear();

    if let (Some(cache), Some(days)) = (&cache, config.cache.ttl_days) {
        if let Err(e) = cache.prune(Duration::from_secs(days.saturating_mul(SECS_PER_DAY))) {
            warn!("Cache prune failed: {}", e);
        }
    }

    if options.format == OutputFormat::Text && outcome.cache_hits > 0 {
        eprintln!(
            "{}{} of {} file(s) served from cache",
            style("✓ ").green(),
            style(outcome.cache_hits).cyan(),
            style(outcome.results.len()).dim()
        );
    }

    let summary = summarize(&outcome.results, &config);
    let exit_code = summary.exit_code();
    let report = BatchReport::new(summary, outcome.results, outcome.timed_out);
    println!("{}", report_with_format(&report, options.format)?);

    Ok(exit_code)
}

/// Project config with command-line overrides applied
fn effective_config(repo_path: &Path, options: &CheckOptions) -> Config {
    let mut config = load_config(repo_path);
    if let Some(workers) = options.workers {
        config = config.with_parallelism(workers);
    }
    if let Some(secs) = options.timeout {
        config = config.with_timeout_secs(secs);
    }
    if options.no_cache {
        config = config.with_cache_enabled(false);
    }
    config
}

/// Files to check: the staged set, the given paths, or the whole repository
fn collect_targets(repo_path: &Path, options: &CheckOptions) -> Result<Vec<PathBuf>> {
    if options.staged {
        if !git::is_git_repo(repo_path) {
            anyhow::bail!(
                "--staged needs a git repository, but {} is not inside one",
                repo_path.display()
            );
        }
        return git::staged_files(repo_path);
    }
    if options.paths.is_empty() {
        return collect_source_files(repo_path);
    }

    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let mut files = Vec::new();
    for path in &options.paths {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            cwd.join(path)
        };
        if path.is_dir() {
            files.extend(collect_source_files(&path)?);
        } else {
            // Missing files are kept so they surface as read errors
            files.push(path);
        }
    }
    Ok(files)
}

/// Walk a directory for supported files, honoring .gitignore
pub(super) fn collect_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .build();

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && FileCategory::from_path(path).is_supported() {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}
