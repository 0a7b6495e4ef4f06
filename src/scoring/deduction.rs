//! Deduction-based file scorer

use crate::config::Config;
use crate::models::{AnalysisResult, Impact, Issue, Severity, Status, Suggestion};
use crate::rules::CheckOutput;
use std::path::Path;

/// Score of a file with no findings
pub const MAX_SCORE: u8 = 100;

/// Points deducted for one issue
pub fn issue_deduction(severity: Severity) -> u32 {
    match severity {
        Severity::High => 15,
        Severity::Medium => 8,
        Severity::Low => 3,
    }
}

/// Points deducted for one suggestion
pub fn suggestion_deduction(impact: Impact) -> u32 {
    match impact {
        Impact::High => 5,
        Impact::Medium => 2,
        Impact::Low => 1,
    }
}

/// Score findings: start at 100, subtract every deduction, clamp at 0
pub fn score(issues: &[Issue], suggestions: &[Suggestion]) -> u8 {
    let penalty: u32 = issues
        .iter()
        .map(|i| issue_deduction(i.severity))
        .chain(suggestions.iter().map(|s| suggestion_deduction(s.impact)))
        .sum();
    u32::from(MAX_SCORE).saturating_sub(penalty) as u8
}

/// Pass at or above the minimum, otherwise review
pub fn status_for(score: u8, min_score: u8) -> Status {
    if score >= min_score {
        Status::Pass
    } else {
        Status::Review
    }
}

/// Turn checker output into the final, immutable per-file result
pub fn score_output(path: &Path, output: CheckOutput, config: &Config) -> AnalysisResult {
    let score = score(&output.issues, &output.suggestions);
    AnalysisResult {
        file_path: path.to_path_buf(),
        category: output.category,
        metrics: output.metrics,
        issues: output.issues,
        suggestions: output.suggestions,
        score,
        status: status_for(score, config.thresholds.min_score),
    }
}
