//! Rule engine: applies the catalog to one file's content
//!
//! Each enabled rule for the file's category runs in isolation. A rule that
//! returns an error or panics is recorded as a `rule-failure` issue and the
//! remaining rules still contribute their findings.

use super::{catalog, metrics_for, Outcome, Rule, RuleContext};
use crate::config::Config;
use crate::models::{FileCategory, Issue, Metrics, Severity, Suggestion};
use tracing::{debug, warn};

/// Kind tag of the issue recorded when a rule fails
pub const RULE_FAILURE_KIND: &str = "rule-failure";

/// Everything the rules found in one file (no score yet)
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutput {
    pub category: FileCategory,
    pub metrics: Metrics,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
}

/// Applies a rule table to file contents
#[derive(Debug, Clone)]
pub struct Checker {
    rules: Vec<Rule>,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    /// Checker over the built-in catalog
    pub fn new() -> Self {
        Self { rules: catalog() }
    }

    /// Checker over a custom rule table
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Run every enabled rule of `category` over `content`
    pub fn check(&self, category: FileCategory, content: &str, config: &Config) -> CheckOutput {
        let metrics = metrics_for(category, content);
        let mut issues = Vec::new();
        let mut suggestions = Vec::new();

        let ctx = RuleContext {
            content,
            metrics: &metrics,
            thresholds: &config.thresholds,
        };

        for rule in self
            .rules
            .iter()
            .filter(|r| r.category == category && config.rules.is_enabled(category, r.id))
        {
            match run_rule(rule, &ctx) {
                Ok(messages) => {
                    debug!("Rule {} produced {} finding(s)", rule.id, messages.len());
                    for message in messages {
                        match rule.outcome {
                            Outcome::Issue(severity) => issues.push(Issue {
                                kind: rule.id.to_string(),
                                severity,
                                message,
                                suggestion: rule.suggestion.to_string(),
                            }),
                            Outcome::Suggestion(impact) => suggestions.push(Suggestion {
                                kind: rule.id.to_string(),
                                impact,
                                message,
                                suggestion: rule.suggestion.to_string(),
                            }),
                        }
                    }
                }
                Err(reason) => {
                    warn!("Rule {} failed: {}", rule.id, reason);
                    issues.push(Issue {
                        kind: RULE_FAILURE_KIND.to_string(),
                        severity: Severity::Medium,
                        message: format!("Rule '{}' could not be evaluated: {}", rule.id, reason),
                        suggestion: "Report this input; the remaining rules still ran.".to_string(),
                    });
                }
            }
        }

        CheckOutput {
            category,
            metrics,
            issues,
            suggestions,
        }
    }
}

/// Run one rule, turning both errors and panics into a failure reason
fn run_rule(rule: &Rule, ctx: &RuleContext<'_>) -> Result<Vec<String>, String> {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (rule.detect)(ctx)));
    match outcome {
        Ok(Ok(messages)) => Ok(messages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            Err(format!("panic: {}", panic_msg))
        }
    }
}
