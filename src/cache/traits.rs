//! Result store trait
//!
//! The orchestrator only needs two operations from a cache, so it talks to
//! this trait instead of the on-disk implementation.

use super::CacheKey;
use crate::models::AnalysisResult;

/// Keyed store of finished analysis results
///
/// Implementations must be safe to share between worker threads. Neither
/// operation may fail the surrounding analysis: a broken entry is a miss,
/// and a failed write is dropped.
pub trait ResultStore: Send + Sync {
    /// Name of this store (for logging)
    fn name(&self) -> &str;

    /// Cached result for the fingerprint, if a valid one exists
    fn lookup(&self, key: &CacheKey) -> Option<AnalysisResult>;

    /// Persist a result (best-effort)
    fn store(&self, key: &CacheKey, result: &AnalysisResult);
}
