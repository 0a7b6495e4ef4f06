//! Batch aggregation
//!
//! Folds the orchestrator's result mapping into one [`BatchSummary`]. The
//! mapping is unordered; nothing here depends on iteration order.
//!
//! - `total_files` is the size of the mapping, so files dropped at the batch
//!   deadline are not counted
//! - errors are High-severity issues, warnings are the other issues;
//!   suggestions never count as errors
//! - the average score is taken over scored files (`Skip` results carry no
//!   score) and is 0 when there are none

use crate::config::Config;
use crate::models::{AnalysisResult, BatchSummary, OverallStatus, Status};
use std::collections::HashMap;
use std::path::PathBuf;

pub fn summarize(results: &HashMap<PathBuf, AnalysisResult>, config: &Config) -> BatchSummary {
    let mut total_errors = 0;
    let mut total_warnings = 0;
    let mut total_suggestions = 0;
    let mut score_sum = 0u64;
    let mut scored = 0u64;

    for result in results.values() {
        total_errors += result.error_count();
        total_warnings += result.warning_count();
        total_suggestions += result.suggestions.len();
        if result.status != Status::Skip {
            score_sum += u64::from(result.score);
            scored += 1;
        }
    }

    let average_score = if scored == 0 {
        0.0
    } else {
        score_sum as f64 / scored as f64
    };

    let overall_status = if total_errors > 0 {
        OverallStatus::RequiresFixes
    } else if average_score >= f64::from(config.thresholds.min_score) {
        OverallStatus::ProductionReady
    } else {
        OverallStatus::ApprovedWithSuggestions
    };

    BatchSummary {
        total_files: results.len(),
        total_errors,
        total_warnings,
        total_suggestions,
        average_score,
        overall_status,
    }
}
