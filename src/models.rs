//! Core data models for commitgate
//!
//! These models flow from the rule engine through the scorer, the result
//! cache and the batch orchestrator into the summary and reporters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File category, derived from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Markup,
    Stylesheet,
    Script,
    Unsupported,
}

impl FileCategory {
    /// Extensions handled by each supported category
    pub const MARKUP_EXTENSIONS: &'static [&'static str] = &["html", "htm"];
    pub const STYLESHEET_EXTENSIONS: &'static [&'static str] = &["css"];
    pub const SCRIPT_EXTENSIONS: &'static [&'static str] = &["js", "mjs", "cjs", "jsx", "ts", "tsx"];

    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Self {
        if Self::MARKUP_EXTENSIONS.contains(&ext) {
            FileCategory::Markup
        } else if Self::STYLESHEET_EXTENSIONS.contains(&ext) {
            FileCategory::Stylesheet
        } else if Self::SCRIPT_EXTENSIONS.contains(&ext) {
            FileCategory::Script
        } else {
            FileCategory::Unsupported
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FileCategory::Unsupported)
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileCategory::Markup => write!(f, "markup"),
            FileCategory::Stylesheet => write!(f, "stylesheet"),
            FileCategory::Script => write!(f, "script"),
            FileCategory::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Severity of a blocking-class issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Impact of a non-blocking suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Low => write!(f, "low"),
            Impact::Medium => write!(f, "medium"),
            Impact::High => write!(f, "high"),
        }
    }
}

/// A defect that should block or strongly discourage the commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
}

/// A non-blocking improvement recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: String,
    pub impact: Impact,
    pub message: String,
    pub suggestion: String,
}

/// Metric name -> value. Ordered so serialized results are stable.
pub type Metrics = BTreeMap<String, f64>;

/// Per-file outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Review,
    Error,
    Skip,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Review => write!(f, "review"),
            Status::Error => write!(f, "error"),
            Status::Skip => write!(f, "skip"),
        }
    }
}

/// Result of analysing one file in one content state. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: PathBuf,
    pub category: FileCategory,
    pub metrics: Metrics,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
    pub score: u8,
    pub status: Status,
}

impl AnalysisResult {
    /// Result for a file whose content could not be read (or was empty)
    pub fn read_error(path: &Path, category: FileCategory, reason: &str) -> Self {
        Self {
            file_path: path.to_path_buf(),
            category,
            metrics: Metrics::new(),
            issues: vec![Issue {
                kind: "read-error".to_string(),
                severity: Severity::High,
                message: format!("Could not read {}: {}", path.display(), reason),
                suggestion: "Make sure the file exists, is readable UTF-8 text and is not empty."
                    .to_string(),
            }],
            suggestions: Vec::new(),
            score: 0,
            status: Status::Error,
        }
    }

    /// Result for a file whose category has no rules
    pub fn skipped(path: &Path) -> Self {
        Self {
            file_path: path.to_path_buf(),
            category: FileCategory::Unsupported,
            metrics: Metrics::new(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            score: 0,
            status: Status::Skip,
        }
    }

    /// Number of High-severity issues ("errors" in the aggregate sense)
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::High)
            .count()
    }

    /// Number of Medium/Low issues
    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }
}

/// Overall verdict for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    ProductionReady,
    ApprovedWithSuggestions,
    RequiresFixes,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::ProductionReady => write!(f, "production ready"),
            OverallStatus::ApprovedWithSuggestions => write!(f, "approved with suggestions"),
            OverallStatus::RequiresFixes => write!(f, "requires fixes"),
        }
    }
}

/// Summary statistics over a batch result mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_files: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_suggestions: usize,
    pub average_score: f64,
    pub overall_status: OverallStatus,
}

impl BatchSummary {
    /// Exit code the calling hook expects: 0 when no High-severity issues were found
    pub fn exit_code(&self) -> i32 {
        if self.total_errors == 0 {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_path() {
        assert_eq!(FileCategory::from_path(Path::new("a/index.html")), FileCategory::Markup);
        assert_eq!(FileCategory::from_path(Path::new("page.HTM")), FileCategory::Markup);
        assert_eq!(FileCategory::from_path(Path::new("site.css")), FileCategory::Stylesheet);
        assert_eq!(FileCategory::from_path(Path::new("app.tsx")), FileCategory::Script);
        assert_eq!(FileCategory::from_path(Path::new("README.md")), FileCategory::Unsupported);
        assert_eq!(FileCategory::from_path(Path::new("Makefile")), FileCategory::Unsupported);
    }

    #[test]
    fn test_read_error_result() {
        let r = AnalysisResult::read_error(Path::new("x.js"), FileCategory::Script, "missing");
        assert_eq!(r.status, Status::Error);
        assert_eq!(r.score, 0);
        assert_eq!(r.issues.len(), 1);
        assert_eq!(r.error_count(), 1);
        assert!(r.metrics.is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::Review).unwrap();
        assert_eq!(json, "\"review\"");
        let json = serde_json::to_string(&OverallStatus::RequiresFixes).unwrap();
        assert_eq!(json, "\"requires_fixes\"");
    }
}
