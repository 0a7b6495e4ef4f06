//! Rule catalog and checker
//!
//! Every check is a row in a declarative table: a rule id, the category it
//! applies to, what it produces (an [`Issue`] with a severity or a
//! [`Suggestion`] with an impact), the remediation text, and a small
//! detection function that returns one message per finding.
//!
//! Detection is deliberately heuristic. Rules match text patterns and simple
//! counts; nothing here builds a syntax tree, and false positives are part of
//! the contract.
//!
//! [`Issue`]: crate::models::Issue
//! [`Suggestion`]: crate::models::Suggestion

mod engine;
mod markup;
mod script;
mod stylesheet;

pub use engine::{CheckOutput, Checker};

use crate::config::Thresholds;
use crate::models::{FileCategory, Impact, Metrics, Severity};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Failure of a single rule. Never aborts the file: the engine records it
/// as a `rule-failure` issue and keeps running the remaining rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },

    #[error("{0}")]
    Evaluation(String),
}

/// What a rule produces when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Issue(Severity),
    Suggestion(Impact),
}

/// Input handed to every detection function
pub struct RuleContext<'a> {
    pub content: &'a str,
    /// Category metrics, computed once before any rule runs
    pub metrics: &'a Metrics,
    pub thresholds: &'a Thresholds,
}

impl RuleContext<'_> {
    /// Read a metric as an integer count (0 when absent)
    pub fn count(&self, name: &str) -> usize {
        self.metrics.get(name).copied().unwrap_or(0.0) as usize
    }
}

/// Detection function: one message per finding
pub type Detect = fn(&RuleContext<'_>) -> Result<Vec<String>, RuleError>;

/// One row of the rule table
#[derive(Clone)]
pub struct Rule {
    pub id: &'static str,
    pub category: FileCategory,
    pub outcome: Outcome,
    /// Remediation text attached to every finding of this rule
    pub suggestion: &'static str,
    pub detect: Detect,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// The full built-in rule table, in evaluation order
pub fn catalog() -> Vec<Rule> {
    let mut rules = markup::rules();
    rules.extend(stylesheet::rules());
    rules.extend(script::rules());
    rules
}

/// Ids of every built-in rule for a category (the default enabled set)
pub fn default_rule_ids(category: FileCategory) -> Vec<String> {
    catalog()
        .into_iter()
        .filter(|r| r.category == category)
        .map(|r| r.id.to_string())
        .collect()
}

/// Compute the metrics of a category
pub fn metrics_for(category: FileCategory, content: &str) -> Metrics {
    let mut metrics = Metrics::new();
    metrics.insert("lines".to_string(), content.lines().count() as f64);
    metrics.insert("size_kb".to_string(), size_kb(content.len()));

    match category {
        FileCategory::Markup => markup::metrics(content, &mut metrics),
        FileCategory::Stylesheet => stylesheet::metrics(content, &mut metrics),
        FileCategory::Script => script::metrics(content, &mut metrics),
        FileCategory::Unsupported => {}
    }
    metrics
}

fn size_kb(bytes: usize) -> f64 {
    (bytes as f64 / 1024.0 * 100.0).round() / 100.0
}

/// Lazily compile a pattern held in a static cell
pub(crate) fn pattern(
    cell: &'static OnceLock<Result<Regex, regex::Error>>,
    source: &str,
) -> Result<&'static Regex, RuleError> {
    cell.get_or_init(|| Regex::new(source))
        .as_ref()
        .map_err(|e| RuleError::Pattern {
            pattern: source.to_string(),
            message: e.to_string(),
        })
}
