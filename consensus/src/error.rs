//! Engine-level error taxonomy.
//!
//! Per-module operations carry their own error enums; this taxonomy is
//! what telemetry and operators see. Structural and budget failures are
//! recovered locally (repair loop, degraded fallback) and never surface
//! past the orchestrator; the only fatal condition at event level is
//! zero experts producing any usable bundle.

use serde::{Deserialize, Serialize};

/// Classification of a recoverable per-expert failure, retained in
/// telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed or incomplete bundle; handled by the repair loop.
    Structural,
    /// Time or call-count budget exhausted.
    BudgetExceeded,
    /// Context fetch or generation channel unreachable.
    UpstreamUnavailable,
}

/// Fatal event-level errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Every expert failed to produce even a fallback bundle. The
    /// event-level call fails explicitly rather than returning an empty
    /// or misleading consensus.
    #[error("No expert produced a usable bundle for event {0}")]
    NoUsableBundles(String),

    #[error("Weight computation failed: {0}")]
    Weights(#[from] crate::weights::WeightError),

    #[error("Aggregation failed: {0}")]
    Aggregation(#[from] crate::aggregate::AggregationError),
}

/// Result type for engine-level operations.
pub type EngineResult<T> = Result<T, EngineError>;
