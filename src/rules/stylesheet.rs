//! Stylesheet rules: brace balance, selector budget, repeated properties, deep selectors

use super::{pattern, Outcome, Rule, RuleContext, RuleError};
use crate::models::{FileCategory, Impact, Metrics, Severity};
use regex::Regex;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

type Cell = OnceLock<Result<Regex, regex::Error>>;

static COMMENT: Cell = OnceLock::new();
static PRELUDE: Cell = OnceLock::new();
static CLASS_OR_ID: Cell = OnceLock::new();
static PROPERTY: Cell = OnceLock::new();

/// A property repeated more often than this is reported
const MAX_PROPERTY_REPEATS: usize = 5;

/// Selectors with at least this many space-separated segments are reported
const DEEP_SELECTOR_SEGMENTS: usize = 4;

fn strip_comments(content: &str) -> Result<Cow<'_, str>, RuleError> {
    Ok(pattern(&COMMENT, r"(?s)/\*.*?\*/")?.replace_all(content, " "))
}

/// Text before each `{`, skipping at-rules
fn selector_preludes(content: &str) -> Result<Vec<String>, RuleError> {
    let re = pattern(&PRELUDE, r"([^{};]+)\{")?;
    Ok(re
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|p| !p.is_empty() && !p.starts_with('@'))
        .collect())
}

fn distinct_selectors(preludes: &[String]) -> Result<BTreeSet<String>, RuleError> {
    let re = pattern(&CLASS_OR_ID, r"[.#]-?[_a-zA-Z][\w-]*")?;
    Ok(preludes
        .iter()
        .flat_map(|p| re.find_iter(p).map(|m| m.as_str().to_string()))
        .collect())
}

/// Property name -> number of declarations
fn property_counts(content: &str) -> Result<BTreeMap<String, usize>, RuleError> {
    let re = pattern(&PROPERTY, r"(?:^|[{;\s])([-a-zA-Z]+)\s*:\s*[^;{}]+")?;
    let mut counts = BTreeMap::new();
    for caps in re.captures_iter(content) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        // `a:hover {` is a selector, not a declaration
        if content[whole.end()..].starts_with('{') {
            continue;
        }
        *counts.entry(name.as_str().to_ascii_lowercase()).or_insert(0) += 1;
    }
    Ok(counts)
}

pub(super) fn metrics(content: &str, metrics: &mut Metrics) {
    let Ok(stripped) = strip_comments(content) else {
        return;
    };
    let preludes = selector_preludes(&stripped).unwrap_or_default();
    let selectors = distinct_selectors(&preludes).map(|s| s.len()).unwrap_or(0);
    let declarations: usize = property_counts(&stripped)
        .map(|c| c.values().sum())
        .unwrap_or(0);

    metrics.insert("rules".to_string(), preludes.len() as f64);
    metrics.insert("selectors".to_string(), selectors as f64);
    metrics.insert("declarations".to_string(), declarations as f64);
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "brace-balance",
            category: FileCategory::Stylesheet,
            outcome: Outcome::Issue(Severity::High),
            suggestion: "Make sure every rule block is closed with `}`.",
            detect: detect_unbalanced_braces,
        },
        Rule {
            id: "selector-count",
            category: FileCategory::Stylesheet,
            outcome: Outcome::Suggestion(Impact::Medium),
            suggestion: "Split the stylesheet or consolidate selectors into reusable utility classes.",
            detect: detect_selector_budget,
        },
        Rule {
            id: "property-repetition",
            category: FileCategory::Stylesheet,
            outcome: Outcome::Suggestion(Impact::Low),
            suggestion: "Extract repeated declarations into a shared class or custom property.",
            detect: detect_repeated_properties,
        },
        Rule {
            id: "deep-selectors",
            category: FileCategory::Stylesheet,
            outcome: Outcome::Suggestion(Impact::Medium),
            suggestion: "Flatten overly specific selectors; target elements with a single class.",
            detect: detect_deep_selectors,
        },
    ]
}

fn detect_unbalanced_braces(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let stripped = strip_comments(ctx.content)?;
    let opening = stripped.matches('{').count();
    let closing = stripped.matches('}').count();
    Ok(if opening != closing {
        vec![format!(
            "Unbalanced braces: {} opening, {} closing",
            opening, closing
        )]
    } else {
        vec![]
    })
}

fn detect_selector_budget(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let selectors = ctx.count("selectors");
    let max = ctx.thresholds.max_selectors;
    Ok(if selectors > max {
        vec![format!(
            "{} distinct class/id selectors (maximum {})",
            selectors, max
        )]
    } else {
        vec![]
    })
}

fn detect_repeated_properties(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let stripped = strip_comments(ctx.content)?;
    Ok(property_counts(&stripped)?
        .into_iter()
        .filter(|(_, count)| *count > MAX_PROPERTY_REPEATS)
        .map(|(name, count)| format!("Property '{}' declared {} times", name, count))
        .collect())
}

fn detect_deep_selectors(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let stripped = strip_comments(ctx.content)?;
    let deep = selector_preludes(&stripped)?
        .iter()
        .flat_map(|p| p.split(','))
        .filter(|sel| sel.split_whitespace().count() >= DEEP_SELECTOR_SEGMENTS)
        .count();
    Ok(if deep > 0 {
        vec![format!(
            "{} selector(s) with {} or more segments",
            deep, DEEP_SELECTOR_SEGMENTS
        )]
    } else {
        vec![]
    })
}
