//! Text (terminal) reporter with colors and formatting

use super::BatchReport;
use crate::models::{AnalysisResult, Impact, OverallStatus, Severity, Status};
use anyhow::Result;
use console::{style, StyledObject};
use std::fmt::Write;

fn severity_tag(severity: Severity) -> StyledObject<&'static str> {
    match severity {
        Severity::High => style("[H]").red().bold(),
        Severity::Medium => style("[M]").yellow(),
        Severity::Low => style("[L]").blue(),
    }
}

fn impact_tag(impact: Impact) -> StyledObject<&'static str> {
    match impact {
        Impact::High => style("[h]").magenta(),
        Impact::Medium => style("[m]").cyan(),
        Impact::Low => style("[l]").dim(),
    }
}

fn status_label(result: &AnalysisResult) -> StyledObject<String> {
    let label = result.status.to_string().to_uppercase();
    match result.status {
        Status::Pass => style(label).green(),
        Status::Review => style(label).yellow(),
        Status::Error => style(label).red().bold(),
        Status::Skip => style(label).dim(),
    }
}

fn format_score(score: f64) -> StyledObject<String> {
    let s = format!("{:.1}", score);
    if score >= 80.0 {
        style(s).green()
    } else if score >= 60.0 {
        style(s).yellow()
    } else {
        style(s).red()
    }
}

/// Render report as formatted terminal output
pub fn render(report: &BatchReport) -> Result<String> {
    let mut out = String::new();

    writeln!(out, "\n{}", style("Commit Gate").bold())?;
    writeln!(out, "{}", style("──────────────────────────────────────").dim())?;

    for result in &report.results {
        if result.status == Status::Skip {
            continue;
        }
        writeln!(
            out,
            "{} {} {}",
            status_label(result),
            style(result.file_path.display()).bold(),
            style(format!("({}/100)", result.score)).dim()
        )?;
        for issue in &result.issues {
            writeln!(out, "  {} {}", severity_tag(issue.severity), issue.message)?;
            writeln!(out, "      {}", style(&issue.suggestion).dim())?;
        }
        for suggestion in &result.suggestions {
            writeln!(out, "  {} {}", impact_tag(suggestion.impact), suggestion.message)?;
        }
    }

    let skipped = report
        .results
        .iter()
        .filter(|r| r.status == Status::Skip)
        .count();
    if skipped > 0 {
        writeln!(out, "{}", style(format!("{} unsupported file(s) skipped", skipped)).dim())?;
    }

    if !report.timed_out.is_empty() {
        writeln!(
            out,
            "\n{} {} file(s) not analyzed before the deadline:",
            style("!").yellow().bold(),
            report.timed_out.len()
        )?;
        for path in &report.timed_out {
            writeln!(out, "  {}", style(path.display()).yellow())?;
        }
    }

    let s = &report.summary;
    writeln!(out, "\n{}", style("SUMMARY").bold())?;
    writeln!(
        out,
        "  Files: {}  Errors: {}  Warnings: {}  Suggestions: {}",
        s.total_files,
        style(s.total_errors).red(),
        style(s.total_warnings).yellow(),
        style(s.total_suggestions).cyan()
    )?;
    writeln!(out, "  Average score: {}", format_score(s.average_score))?;

    let verdict = match s.overall_status {
        OverallStatus::ProductionReady => style(s.overall_status.to_string()).green().bold(),
        OverallStatus::ApprovedWithSuggestions => {
            style(s.overall_status.to_string()).yellow().bold()
        }
        OverallStatus::RequiresFixes => style(s.overall_status.to_string()).red().bold(),
    };
    writeln!(out, "  Status: {}", verdict)?;

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_report;

    #[test]
    fn test_text_render_contents() {
        let out = render(&test_report()).unwrap();
        let plain = console::strip_ansi_codes(&out);
        assert!(plain.contains("web/site.css"));
        assert!(plain.contains("[H] Unbalanced braces: 3 opening, 2 closing"));
        assert!(plain.contains("[m] 1 selector(s) with 4 or more segments"));
        assert!(plain.contains("web/slow.js"));
        assert!(plain.contains("Errors: 1"));
        assert!(plain.contains("Average score: 91.5"));
        assert!(plain.contains("requires fixes"));
    }

    #[test]
    fn test_text_render_clean_batch() {
        let mut report = test_report();
        report.results.retain(|r| r.issues.is_empty());
        report.timed_out.clear();
        let out = render(&report).unwrap();
        let plain = console::strip_ansi_codes(&out);
        assert!(plain.contains("PASS web/app.js"));
        assert!(!plain.contains("deadline"));
    }
}
