//! Per-file analysis run by pipeline workers

use crate::config::Config;
use crate::models::{AnalysisResult, FileCategory};
use crate::rules::Checker;
use crate::scoring::score_output;
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Turns one file into an [`AnalysisResult`]
///
/// Implementations must not panic on bad input: unreadable files become
/// `Error` results.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, path: &Path, config: &Config) -> AnalysisResult;
}

/// Reads the file and runs the rule catalog followed by the scorer
#[derive(Debug, Clone, Default)]
pub struct RuleAnalyzer {
    checker: Checker,
}

impl RuleAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and score already-loaded content
    pub fn analyze_content(&self, path: &Path, content: &str, config: &Config) -> AnalysisResult {
        let category = FileCategory::from_path(path);
        if !category.is_supported() {
            return AnalysisResult::skipped(path);
        }
        if content.is_empty() {
            return AnalysisResult::read_error(path, category, "file is empty");
        }
        let output = self.checker.check(category, content, config);
        score_output(path, output, config)
    }
}

impl Analyzer for RuleAnalyzer {
    fn analyze(&self, path: &Path, config: &Config) -> AnalysisResult {
        match std::fs::read(path) {
            Ok(bytes) => {
                let content = String::from_utf8_lossy(&bytes);
                if matches!(content, Cow::Owned(_)) {
                    debug!("{} is not valid UTF-8; checking it lossily", path.display());
                }
                self.analyze_content(path, &content, config)
            }
            Err(e) => {
                AnalysisResult::read_error(path, FileCategory::from_path(path), &e.to_string())
            }
        }
    }
}

/// Check and score content with the built-in catalog
pub fn analyze_content(path: &Path, content: &str, config: &Config) -> AnalysisResult {
    RuleAnalyzer::new().analyze_content(path, content, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Severity, Status};
    use tempfile::TempDir;

    #[test]
    fn test_empty_content_is_error() {
        let result = analyze_content(Path::new("empty.js"), "", &Config::default());
        assert_eq!(result.status, Status::Error);
        assert_eq!(result.score, 0);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].kind, "read-error");
        assert!(result.metrics.is_empty());
    }

    #[test]
    fn test_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = RuleAnalyzer::new().analyze(&tmp.path().join("gone.css"), &Config::default());
        assert_eq!(result.status, Status::Error);
        assert_eq!(result.category, FileCategory::Stylesheet);
        assert_eq!(result.issues[0].severity, Severity::High);
    }

    #[test]
    fn test_unsupported_is_skipped() {
        let result = analyze_content(Path::new("notes.txt"), "hello", &Config::default());
        assert_eq!(result.status, Status::Skip);
    }

    #[test]
    fn test_markup_missing_alt_and_lazy() {
        let result =
            analyze_content(Path::new("index.html"), r#"<img src="x.png">"#, &Config::default());
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].severity, Severity::Medium);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.score, 90);
        assert_eq!(result.status, Status::Pass);
    }

    #[test]
    fn test_non_utf8_file_is_checked() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("latin1.html");
        // "café" in Latin-1
        std::fs::write(&path, b"<p>caf\xe9</p>\n<img src=\"x.png\" alt=\"x\" loading=\"lazy\">\n")
            .unwrap();
        let result = RuleAnalyzer::new().analyze(&path, &Config::default());
        assert_eq!(result.status, Status::Pass);
        assert!(result.issues.is_empty());
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_reads_file_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("site.css");
        std::fs::write(&path, ".a { color: red; }\n").unwrap();
        let result = RuleAnalyzer::new().analyze(&path, &Config::default());
        assert_eq!(result.status, Status::Pass);
        assert_eq!(result.score, 100);
        assert_eq!(result.file_path, path);
    }
}
