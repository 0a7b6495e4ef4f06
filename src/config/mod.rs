//! Configuration module for commitgate
//!
//! This module handles:
//! - Project-level configuration (commitgate.toml)
//! - Per-category rule selection
//! - Score and rule thresholds
//! - Worker pool, deadline and cache settings

mod project_config;

pub use project_config::{
    default_parallelism, load_config, normalize_rule_id, CacheConfig, Config, ConfigError,
    RulesConfig, Thresholds, CONFIG_FILE_NAME,
};
