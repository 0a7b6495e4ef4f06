//! CLI command definitions and handlers

mod cache;
mod check;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Commitgate - pre-commit quality gate for web sources
#[derive(Parser, Debug)]
#[command(name = "commitgate")]
#[command(
    version,
    about = "Pre-commit quality gate: heuristic checks and scores for HTML, CSS and JavaScript/TypeScript",
    long_about = "Commitgate scans markup, stylesheet and script files with fast heuristic \
rules, scores every file from 0 to 100 and blocks the commit when any file carries a \
high-severity issue.\n\n\
Run without a subcommand to check the whole repository:\n  \
commitgate",
    after_help = "\
Examples:
  commitgate check --staged            Check files staged for commit (pre-commit hook)
  commitgate check src/ index.html     Check specific files and directories
  commitgate check --format json       JSON output for scripting
  commitgate init                      Write a commitgate.toml with the defaults
  commitgate cache prune               Drop cache entries past their TTL"
)]
pub struct Cli {
    /// Repository root (default: current directory)
    #[arg(long, short = 'C', global = true, default_value = ".")]
    pub repo: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: from config)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check files and exit non-zero when any high-severity issue is found
    Check {
        /// Files or directories to check (default: the whole repository)
        paths: Vec<PathBuf>,

        /// Check the files staged in the git index instead of PATHS
        #[arg(long, conflicts_with = "paths")]
        staged: bool,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Ignore and do not update the result cache
        #[arg(long)]
        no_cache: bool,

        /// Batch deadline in seconds (default: from config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,
    },

    /// Initialize a commitgate.toml config file with the default settings
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Remove entries older than the TTL, plus broken entries
    Prune {
        /// Maximum entry age in days (default: cache.ttl_days, or 30)
        #[arg(long)]
        days: Option<u64>,
    },
    /// Remove every entry
    Clear,
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Some(Commands::Init { force }) => init::run(&cli.repo, force),

        Some(Commands::Cache { action }) => match action {
            CacheAction::Prune { days } => cache::prune(&cli.repo, days),
            CacheAction::Clear => cache::clear(&cli.repo),
        },

        Some(Commands::Check {
            paths,
            staged,
            format,
            no_cache,
            timeout,
        }) => {
            let options = check::CheckOptions {
                paths,
                staged,
                format: format.parse()?,
                no_cache,
                workers: cli.workers,
                timeout,
            };
            exit_with(check::run(&cli.repo, options)?)
        }

        None => {
            let options = check::CheckOptions {
                workers: cli.workers,
                ..Default::default()
            };
            exit_with(check::run(&cli.repo, options)?)
        }
    }
}

fn exit_with(code: i32) -> Result<()> {
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::OutputFormat;

    #[test]
    fn test_parse_workers() {
        assert_eq!(parse_workers("4"), Ok(4));
        assert!(parse_workers("0").is_err());
        assert!(parse_workers("65").is_err());
        assert!(parse_workers("many").is_err());
    }

    #[test]
    fn test_check_flags() {
        let cli = Cli::try_parse_from([
            "commitgate",
            "check",
            "a.css",
            "b.js",
            "--format",
            "json",
            "--no-cache",
            "--timeout",
            "5",
            "--workers",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.workers, Some(3));
        match cli.command {
            Some(Commands::Check {
                paths,
                staged,
                format,
                no_cache,
                timeout,
            }) => {
                assert_eq!(paths.len(), 2);
                assert!(!staged);
                assert_eq!(format.parse::<OutputFormat>().unwrap(), OutputFormat::Json);
                assert!(no_cache);
                assert_eq!(timeout, Some(5));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_staged_conflicts_with_paths() {
        assert!(Cli::try_parse_from(["commitgate", "check", "--staged", "a.css"]).is_err());
        assert!(Cli::try_parse_from(["commitgate", "check", "--staged"]).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["commitgate", "check", "--timeout", "0"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["commitgate"]).unwrap();
        assert_eq!(cli.repo, PathBuf::from("."));
        assert_eq!(cli.log_level, "warn");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cache_subcommands() {
        let cli = Cli::try_parse_from(["commitgate", "cache", "prune", "--days", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cache {
                action: CacheAction::Prune { days: Some(7) }
            })
        ));
    }
}
