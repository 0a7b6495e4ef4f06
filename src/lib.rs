//! Commitgate - pre-commit quality gate for web sources
//!
//! Scans markup, stylesheet and script files with heuristic rules, scores
//! each file and folds the batch into a pass/fail verdict.
//!
//! ```no_run
//! use commitgate::config::Config;
//! use commitgate::pipeline::Orchestrator;
//! use commitgate::summary::summarize;
//! use std::path::PathBuf;
//!
//! let config = Config::default();
//! let outcome = Orchestrator::new(config.clone()).run(&[PathBuf::from("index.html")], None);
//! let summary = summarize(&outcome.results, &config);
//! std::process::exit(summary.exit_code());
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod git;
pub mod models;
pub mod pipeline;
pub mod reporters;
pub mod rules;
pub mod scoring;
pub mod summary;
