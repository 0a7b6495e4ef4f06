//! Output reporters for batch results
//!
//! Supports two output formats:
//! - `text` - Terminal output with colors
//! - `json` - Machine-readable JSON

mod json;
mod text;

use crate::models::{AnalysisResult, BatchSummary};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format '{}'. Valid formats: text, json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Everything a reporter renders for one batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// Per-file results, sorted by path
    pub results: Vec<AnalysisResult>,
    /// Files dropped at the batch deadline
    pub timed_out: Vec<PathBuf>,
}

impl BatchReport {
    pub fn new(
        summary: BatchSummary,
        results: HashMap<PathBuf, AnalysisResult>,
        mut timed_out: Vec<PathBuf>,
    ) -> Self {
        let mut results: Vec<AnalysisResult> = results.into_values().collect();
        results.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        timed_out.sort();
        Self {
            summary,
            results,
            timed_out,
        }
    }
}

/// Render a batch report using an OutputFormat enum
pub fn report_with_format(report: &BatchReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => text::render(report),
        OutputFormat::Json => json::render(report),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        FileCategory, Impact, Issue, Metrics, OverallStatus, Severity, Status, Suggestion,
    };

    /// Report with one failing stylesheet, one clean script and one timeout
    pub(crate) fn test_report() -> BatchReport {
        let mut metrics = Metrics::new();
        metrics.insert("lines".to_string(), 4.0);

        let failing = AnalysisResult {
            file_path: PathBuf::from("web/site.css"),
            category: FileCategory::Stylesheet,
            metrics: metrics.clone(),
            issues: vec![Issue {
                kind: "brace-balance".to_string(),
                severity: Severity::High,
                message: "Unbalanced braces: 3 opening, 2 closing".to_string(),
                suggestion: "Close every block.".to_string(),
            }],
            suggestions: vec![Suggestion {
                kind: "deep-selectors".to_string(),
                impact: Impact::Medium,
                message: "1 selector(s) with 4 or more segments".to_string(),
                suggestion: "Flatten selectors.".to_string(),
            }],
            score: 83,
            status: Status::Pass,
        };
        let clean = AnalysisResult {
            file_path: PathBuf::from("web/app.js"),
            category: FileCategory::Script,
            metrics,
            issues: vec![],
            suggestions: vec![],
            score: 100,
            status: Status::Pass,
        };

        let results = [failing, clean]
            .into_iter()
            .map(|r| (r.file_path.clone(), r))
            .collect();
        let summary = BatchSummary {
            total_files: 2,
            total_errors: 1,
            total_warnings: 0,
            total_suggestions: 1,
            average_score: 91.5,
            overall_status: OverallStatus::RequiresFixes,
        };
        BatchReport::new(summary, results, vec![PathBuf::from("web/slow.js")])
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_results_sorted_by_path() {
        let report = test_report();
        assert_eq!(report.results[0].file_path, PathBuf::from("web/app.js"));
        assert_eq!(report.results[1].file_path, PathBuf::from("web/site.css"));
    }
}
