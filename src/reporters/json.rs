//! JSON reporter
//!
//! Outputs the full BatchReport as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use super::BatchReport;
use anyhow::Result;

/// Render report as JSON
pub fn render(report: &BatchReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}
