//! Init command - write a commitgate.toml with the default settings

use crate::config::CONFIG_FILE_NAME;
use anyhow::{Context, Result};
use console::style;
use std::path::Path;

/// Default config file; every value matches the built-in default
pub(super) const DEFAULT_CONFIG: &str = r#"# Commitgate configuration
# Keys left out keep their built-in defaults.

# Worker threads (0 = available cores, capped at 8)
parallelism = 0

# Deadline for the whole batch, in seconds. Files still running are dropped
# from the report.
timeout_secs = 30

[cache]
enabled = true
# Defaults to the user cache directory; relative paths are resolved against
# the repository root.
# directory = ".commitgate-cache"
# Entries older than this are pruned after each run
ttl_days = 30
# Also hash file contents into the cache key (slower, exact)
verify_content = false

[rules]
# Enabled rules per category (default: all)
# markup = ["unclosed-tags", "missing-alt", "lazy-loading", "blocking-script", "heading-hierarchy"]
# stylesheet = ["brace-balance", "selector-count", "property-repetition", "deep-selectors"]
# script = ["paren-balance", "complexity", "unused-variables", "promise-chains", "counted-loops", "string-concat-loop"]

[thresholds]
max_selectors = 50
max_complexity = 10
# Files scoring below this need review
min_score = 70
"#;

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    let repo_path = path
        .canonicalize()
        .with_context(|| format!("Path does not exist: {}", path.display()))?;

    if !repo_path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", repo_path.display());
    }

    let config_path = repo_path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        println!(
            "{} Already initialized at {} (use --force to overwrite)",
            style("✓").green(),
            style(config_path.display()).cyan()
        );
        return Ok(());
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!(
        "{} Created {}",
        style("✓").green(),
        style(config_path.display()).cyan()
    );
    println!(
        "\nAdd {} to your pre-commit hook to gate commits.",
        style("commitgate check --staged").bold()
    );
    Ok(())
}
