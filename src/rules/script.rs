//! Script rules: paren balance, complexity, unused declarations, promise
//! chains, counted loops, string building inside loops

use super::{pattern, Outcome, Rule, RuleContext, RuleError};
use crate::models::{FileCategory, Impact, Metrics, Severity};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

type Cell = OnceLock<Result<Regex, regex::Error>>;

static BRANCH_KEYWORD: Cell = OnceLock::new();
static DECLARATION: Cell = OnceLock::new();
static IDENTIFIER: Cell = OnceLock::new();
static ASYNC_AWAIT: Cell = OnceLock::new();
static COUNTED_LOOP: Cell = OnceLock::new();
static LOOP_START: Cell = OnceLock::new();
static STRING_APPEND: Cell = OnceLock::new();
static FUNCTION: Cell = OnceLock::new();

/// More `.then(` calls than this without async/await is reported
const MAX_THEN_CHAINS: usize = 3;

fn declared_identifiers(content: &str) -> Result<Vec<&str>, RuleError> {
    let re = pattern(&DECLARATION, r"\b(?:var|let|const)\s+([A-Za-z_$][\w$]*)")?;
    let mut seen = HashSet::new();
    Ok(re
        .captures_iter(content)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .collect())
}

/// Cyclomatic complexity estimate: 1 + branch keywords + `&&`, `||`, `?`
pub(crate) fn complexity(content: &str) -> Result<usize, RuleError> {
    let keywords = pattern(
        &BRANCH_KEYWORD,
        r"(?i)\b(?:if|else|for|while|switch|case|catch)\b",
    )?;
    Ok(1 + keywords.find_iter(content).count() + operator_count(content))
}

/// Count `&&`, `||` and the ternary `?` as whole tokens. `??` and `?.` are
/// different operators and do not count.
fn operator_count(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1).copied()) {
            (b'&', Some(b'&')) | (b'|', Some(b'|')) => {
                count += 1;
                i += 2;
            }
            (b'?', Some(b'?')) => i += 2,
            (b'?', Some(b'.')) => i += 2,
            (b'?', _) => {
                count += 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    count
}

pub(super) fn metrics(content: &str, metrics: &mut Metrics) {
    let functions = pattern(&FUNCTION, r"\bfunction\b|=>")
        .map(|re| re.find_iter(content).count())
        .unwrap_or(0);
    let declarations = declared_identifiers(content).map(|d| d.len()).unwrap_or(0);

    if let Ok(c) = complexity(content) {
        metrics.insert("complexity".to_string(), c as f64);
    }
    metrics.insert("functions".to_string(), functions as f64);
    metrics.insert("declarations".to_string(), declarations as f64);
}

pub(super) fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "paren-balance",
            category: FileCategory::Script,
            outcome: Outcome::Issue(Severity::High),
            suggestion: "Check for a missing or extra parenthesis.",
            detect: detect_unbalanced_parens,
        },
        Rule {
            id: "complexity",
            category: FileCategory::Script,
            outcome: Outcome::Suggestion(Impact::High),
            suggestion: "Split branching logic into smaller functions or use lookup tables.",
            detect: detect_complexity,
        },
        Rule {
            id: "unused-variables",
            category: FileCategory::Script,
            outcome: Outcome::Suggestion(Impact::Low),
            suggestion: "Remove the unused declaration.",
            detect: detect_unused_variables,
        },
        Rule {
            id: "promise-chains",
            category: FileCategory::Script,
            outcome: Outcome::Suggestion(Impact::Medium),
            suggestion: "Rewrite long .then() chains with async/await.",
            detect: detect_promise_chains,
        },
        Rule {
            id: "counted-loops",
            category: FileCategory::Script,
            outcome: Outcome::Suggestion(Impact::Medium),
            suggestion: "Prefer for...of or array methods (map, filter, forEach) over index loops.",
            detect: detect_counted_loops,
        },
        Rule {
            id: "string-concat-loop",
            category: FileCategory::Script,
            outcome: Outcome::Suggestion(Impact::High),
            suggestion: "Collect parts in an array and join() once after the loop.",
            detect: detect_string_concat_in_loop,
        },
    ]
}

fn detect_unbalanced_parens(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let opening = ctx.content.matches('(').count();
    let closing = ctx.content.matches(')').count();
    Ok(if opening != closing {
        vec![format!(
            "Unbalanced parentheses: {} opening, {} closing",
            opening, closing
        )]
    } else {
        vec![]
    })
}

fn detect_complexity(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let complexity = match ctx.metrics.get("complexity") {
        Some(c) => *c as usize,
        None => complexity(ctx.content)?,
    };
    let max = ctx.thresholds.max_complexity;
    Ok(if complexity > max {
        vec![format!(
            "Cyclomatic complexity {} exceeds maximum {}",
            complexity, max
        )]
    } else {
        vec![]
    })
}

/// A declared identifier that appears exactly once in the file is unused
fn detect_unused_variables(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let ident = pattern(&IDENTIFIER, r"[A-Za-z_$][\w$]*")?;
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for m in ident.find_iter(ctx.content) {
        *occurrences.entry(m.as_str()).or_insert(0) += 1;
    }

    Ok(declared_identifiers(ctx.content)?
        .into_iter()
        .filter(|name| occurrences.get(name).copied().unwrap_or(0) == 1)
        .map(|name| format!("Variable '{}' is declared but never used", name))
        .collect())
}

fn detect_promise_chains(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let thens = ctx.content.matches(".then(").count();
    let uses_async = pattern(&ASYNC_AWAIT, r"\b(?:async|await)\b")?.is_match(ctx.content);
    Ok(if thens > MAX_THEN_CHAINS && !uses_async {
        vec![format!(
            "{} .then() calls and no async/await",
            thens
        )]
    } else {
        vec![]
    })
}

fn detect_counted_loops(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let re = pattern(&COUNTED_LOOP, r"\bfor\s*\([^;()]*;[^;]*;")?;
    let loops = re.find_iter(ctx.content).count();
    Ok(if loops > 0 {
        vec![format!("{} counted for-loop(s)", loops)]
    } else {
        vec![]
    })
}

/// Line scan: a loop header opens a region that ends when its braces close
fn detect_string_concat_in_loop(ctx: &RuleContext<'_>) -> Result<Vec<String>, RuleError> {
    let loop_start = pattern(
        &LOOP_START,
        r"\b(?:for|while)\s*\(|\.forEach\s*\(|\bdo\s*\{",
    )?;
    let append = pattern(
        &STRING_APPEND,
        r#"[\w$.\]]+\s*\+=\s*[^;\n]*["'`]|[\w$.\]]+\s*=\s*[\w$.\]]+\s*\+\s*[^;\n]*["'`]"#,
    )?;

    let mut hits = 0;
    let mut in_loop = false;
    let mut opened = false;
    let mut depth: i64 = 0;

    for line in ctx.content.lines() {
        let header = !in_loop && loop_start.is_match(line);
        if header {
            in_loop = true;
            opened = false;
            depth = 0;
        }
        if !in_loop {
            continue;
        }

        if append.is_match(line) {
            hits += 1;
        }

        let opens = line.matches('{').count() as i64;
        let closes = line.matches('}').count() as i64;
        depth += opens - closes;
        if opens > 0 {
            opened = true;
        }

        // Braceless loop bodies end at the first statement after the header
        let braceless_done = !opened && !header && line.contains(';');
        if (opened && depth <= 0) || braceless_done {
            in_loop = false;
        }
    }

    Ok(if hits > 0 {
        vec![format!(
            "{} string concatenation(s) inside loops",
            hits
        )]
    } else {
        vec![]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;

    fn run(detect: crate::rules::Detect, content: &str) -> Vec<String> {
        let mut m = Metrics::new();
        metrics(content, &mut m);
        let thresholds = Thresholds::default();
        let ctx = RuleContext {
            content,
            metrics: &m,
            thresholds: &thresholds,
        };
        detect(&ctx).unwrap()
    }

    #[test]
    fn test_complexity_of_loop_with_branch() {
        let js = "for (let i=0;...) { if (x) { } }";
        assert_eq!(complexity(js).unwrap(), 3);
        assert!(run(detect_complexity, js).is_empty());
    }

    #[test]
    fn test_complexity_whole_tokens_only() {
        // `iffy`, `format`, `elsewhere` and `cases` are not keywords
        let js = "const iffy = format(elsewhere, cases);";
        assert_eq!(complexity(js).unwrap(), 1);
        // keywords are matched case-insensitively
        assert_eq!(complexity("IF (a) {} Else {}").unwrap(), 3);
    }

    #[test]
    fn test_complexity_operators() {
        assert_eq!(complexity("a && b || c").unwrap(), 3);
        assert_eq!(complexity("x = a ? b : c").unwrap(), 2);
        // nullish coalescing and optional chaining are not branches
        assert_eq!(complexity("x = a ?? b; y = o?.p").unwrap(), 1);
    }

    #[test]
    fn test_complexity_over_threshold() {
        let js = "if (a) {}\n".repeat(12);
        assert_eq!(
            run(detect_complexity, &js),
            vec!["Cyclomatic complexity 13 exceeds maximum 10".to_string()]
        );
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(
            run(detect_unbalanced_parens, "call(a, (b);"),
            vec!["Unbalanced parentheses: 2 opening, 1 closing".to_string()]
        );
        assert!(run(detect_unbalanced_parens, "call(a, (b));").is_empty());
    }

    #[test]
    fn test_unused_variables() {
        let js = "const used = 1;\nlet unused = 2;\nvar $tmp = 3;\nconsole.log(used);";
        assert_eq!(
            run(detect_unused_variables, js),
            vec![
                "Variable 'unused' is declared but never used".to_string(),
                "Variable '$tmp' is declared but never used".to_string(),
            ]
        );
    }

    #[test]
    fn test_unused_variables_whole_identifier() {
        // `count` appears inside `counter` but that is a different identifier
        let js = "let count = 0;\nlet counter = 1;\nreturn counter;";
        assert_eq!(
            run(detect_unused_variables, js),
            vec!["Variable 'count' is declared but never used".to_string()]
        );
    }

    #[test]
    fn test_promise_chains() {
        let chain = "fetch(u).then(a).then(b).then(c).then(d);";
        assert_eq!(
            run(detect_promise_chains, chain),
            vec!["4 .then() calls and no async/await".to_string()]
        );
        let mixed = format!("async function f() {{ await g(); }}\n{}", chain);
        assert!(run(detect_promise_chains, &mixed).is_empty());
        assert!(run(detect_promise_chains, "p.then(a).then(b).then(c);").is_empty());
    }

    #[test]
    fn test_counted_loops() {
        let js = "for (let i = 0; i < n; i++) {}\nfor (const x of xs) {}\nfor(;;){}";
        assert_eq!(
            run(detect_counted_loops, js),
            vec!["2 counted for-loop(s)".to_string()]
        );
    }

    #[test]
    fn test_string_concat_in_loop() {
        let js = r#"
let html = "";
for (const item of items) {
    html += "<li>" + item + "</li>";
}
html += "</ul>";
"#;
        assert_eq!(
            run(detect_string_concat_in_loop, js),
            vec!["1 string concatenation(s) inside loops".to_string()]
        );
    }

    #[test]
    fn test_reassigned_concat_in_loop() {
        let js = "let s = '';\nfor (let i = 0; i < n; i++) {\n  s = s + \"x\";\n  csv = csv + row + ',';\n}\n";
        assert_eq!(
            run(detect_string_concat_in_loop, js),
            vec!["2 string concatenation(s) inside loops".to_string()]
        );
    }

    #[test]
    fn test_numeric_accumulation_not_flagged() {
        let js = "let sum = 0;\nwhile (i < n) {\n  sum += values[i];\n  i++;\n}\n";
        assert!(run(detect_string_concat_in_loop, js).is_empty());
    }

    #[test]
    fn test_concat_after_loop_not_flagged() {
        let js = "items.forEach((x) => { n++; });\nout += 'done';\n";
        assert!(run(detect_string_concat_in_loop, js).is_empty());
    }
}
