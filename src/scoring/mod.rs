//! Deduction scoring
//!
//! Reduces a file's findings to a single 0-100 integer.
//!
//! # Scoring Formula
//!
//! ```text
//! score = max(0, 100 - Σ issue_weight - Σ suggestion_weight)
//!
//!   issue weights:      High 15, Medium 8, Low 3
//!   suggestion weights: High 5,  Medium 2, Low 1
//! ```
//!
//! A file passes when its score reaches the configured minimum; otherwise it
//! needs review. Read failures keep the `Error` status and a score of 0.

mod deduction;

pub use deduction::{
    issue_deduction, score, score_output, status_for, suggestion_deduction, MAX_SCORE,
};
