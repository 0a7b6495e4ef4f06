//! Markup rules: tag balance, image attributes, script loading, heading order

use super::{pattern, Outcome, Rule, RuleContext, RuleError};
use crate::models::{FileCategory, Impact, Metrics, Severity};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

type Cell = OnceLock<Result<Regex, regex::Error>>;

static OPEN_TAG: Cell = OnceLock::new();
static CLOSE_TAG: Cell = OnceLock::new();
static IMG_TAG: Cell = OnceLock::new();
static ALT_ATTR: Cell = OnceLock::new();
static LAZY_ATTR: Cell = OnceLock::new();
static SCRIPT_TAG: Cell = OnceLock::new();
static SRC_ATTR: Cell = OnceLock::new();
static DEFER_ATTR: Cell = OnceLock::new();
static HEADING: Cell = OnceLock::new();

/// Elements that never take a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

fn open_tag() -> Result<&'static Regex, RuleError> {
    pattern(&OPEN_TAG, r"<([a-zA-Z][a-zA-Z0-9-]*)(?:\s[^<>]*)?>")
}

fn close_tag() -> Result<&'static Regex, RuleError> {
    pattern(&CLOSE_TAG, r"</([a-zA-Z][a-zA-Z0-9-]*)\s*>")
}

fn img_tags(content: &str) -> Result<Vec<&str>, RuleError> {
    let re = pattern(&IMG_TAG, r"(?i)<img\b[^>]*>")?;
    Ok(re.find_iter(content).map(|m| m.as_str()).collect())
}

fn script_tags(content: &str) -> Result<Vec<&str>, RuleError> {
    let re = pattern(&SCRIPT_TAG, r"(?i)<script\b[^>]*>")?;
    Ok(re.find_iter(content).map(|m| m.as_str()).collect())
}

fn heading_levels(content: &str) -> Result<Vec<u8>, RuleError> {
    let re = pattern(&HEADING, r"(?i)<h([1-6])\b")?;
    Ok(re
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .filter_map(|m| m.as_str().parse().ok())
        .collect())
}

pub(super) fn metrics(content: &str, metrics: &mut Metrics) {
    let count = |r: Result<usize, RuleError>| r.unwrap_or(0) as f64;
    metrics.insert(
        "tags".to_string(),
        count(open_tag().map(|re| re.find_iter(content).count())),
    );
    metrics.insert("images".to_string(), count(img_tags(content).map(|t| t.len())));
    metrics.insert("scripts".to_string(), count(script_tags(content).map(|t| t.len())));
    metrics.insert(
        "headings".to_string(),
        count(heading_levels(content).map(|h| h.len())),
    );
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "unclosed-tags",
            category: FileCategory::Markup,
            outcome: Outcome::Issue(Severity::High),
            suggestion: "Close every non-void element with a matching end tag.",
            detect: detect_unclosed_tags,
        },
        Rule {
            id: "missing-alt",
            category: FileCategory::Markup,
            outcome: Outcome::Issue(Severity::Medium),
            suggestion: "Add descriptive alt text (or alt=\"\" for decorative images).",
            detect: detect_missing_alt,
        },
        Rule {
            id: "lazy-loading",
            category: FileCategory::Markup,
            outcome: Outcome::Suggestion(Impact::Medium),
            suggestion: "Add loading=\"lazy\" to images below the fold.",
            detect: detect_eager_images,
        },
        Rule {
            id: "blocking-script",
            category: FileCategory::Markup,
            outcome: Outcome::Suggestion(Impact::High),
            suggestion: "Load external scripts with defer or async so they do not block rendering.",
            detect: detect_blocking_scripts,
        },
        Rule {
            id: "heading-hierarchy",
            category: FileCategory::Markup,
            outcome: Outcome::Issue(Severity::Low),
            suggestion: "Do not skip heading levels; step down one level at a time.",
            detect: detect_heading_jumps,
        },
    ]
}

fn detect_unclosed_tags(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let mut opened: BTreeMap<String, usize> = BTreeMap::new();
    for m in open_tag()?.captures_iter(ctx.content) {
        let (Some(whole), Some(name)) = (m.get(0), m.get(1)) else {
            continue;
        };
        let name = name.as_str().to_ascii_lowercase();
        if whole.as_str().ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str()) {
            continue;
        }
        *opened.entry(name).or_insert(0) += 1;
    }

    let mut closed: BTreeMap<String, usize> = BTreeMap::new();
    for m in close_tag()?.captures_iter(ctx.content) {
        if let Some(name) = m.get(1) {
            *closed.entry(name.as_str().to_ascii_lowercase()).or_insert(0) += 1;
        }
    }

    Ok(opened
        .into_iter()
        .filter_map(|(name, opens)| {
            let closes = closed.get(&name).copied().unwrap_or(0);
            (opens > closes).then(|| {
                format!(
                    "Unclosed <{}> tag: {} opened, {} closed",
                    name, opens, closes
                )
            })
        })
        .collect())
}

fn detect_missing_alt(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let alt = pattern(&ALT_ATTR, r"(?i)\balt\s*=")?;
    let missing = img_tags(ctx.content)?
        .into_iter()
        .filter(|tag| !alt.is_match(tag))
        .count();
    Ok(if missing > 0 {
        vec![format!("{} image(s) missing an alt attribute", missing)]
    } else {
        vec![]
    })
}

fn detect_eager_images(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let lazy = pattern(&LAZY_ATTR, r#"(?i)\bloading\s*=\s*["']?lazy"#)?;
    let eager = img_tags(ctx.content)?
        .into_iter()
        .filter(|tag| !lazy.is_match(tag))
        .count();
    Ok(if eager > 0 {
        vec![format!("{} image(s) without lazy loading", eager)]
    } else {
        vec![]
    })
}

fn detect_blocking_scripts(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let src = pattern(&SRC_ATTR, r"(?i)\bsrc\s*=")?;
    let deferred = pattern(&DEFER_ATTR, r"(?i)\b(?:defer|async)\b")?;
    let blocking = script_tags(ctx.content)?
        .into_iter()
        .filter(|tag| src.is_match(tag) && !deferred.is_match(tag))
        .count();
    Ok(if blocking > 0 {
        vec![format!(
            "{} external script(s) loaded without defer or async",
            blocking
        )]
    } else {
        vec![]
    })
}

/// Headings are compared pairwise in document order
fn detect_heading_jumps(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let levels = heading_levels(ctx.content)?;
    Ok(levels
        .windows(2)
        .filter(|pair| pair[1] > pair[0] + 1)
        .map(|pair| {
            format!(
                "Heading level jumps from h{} to h{}",
                pair[0], pair[1]
            )
        })
        .collect())
}
