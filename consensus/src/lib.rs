//! Panel Consensus Engine
//!
//! Turns a panel of expert forecast bundles for one game into a single
//! arithmetically coherent consensus forecast.
//!
//! # Pipeline
//!
//! ```text
//! experts ──▶ generate/validate/repair ──▶ bundles
//!                                            │
//!             track records ──▶ vote weights │
//!                                            ▼
//!                 per-category aggregation (draft)
//!                                            │
//!                  coherence projection      ▼
//!                 (constrained least squares, final)
//! ```
//!
//! - [`bundle`]: the fixed 12-category assertion bundle contract
//! - [`validator`]: structural validation with repair instructions
//! - [`weights`]: track-record scoring into normalized vote weights
//! - [`aggregate`]: typed per-category aggregation into a draft
//! - [`project`]: cross-category arithmetic repair via least squares
//! - [`orchestrator`]: bounded parallel expert loop with degraded
//!   fallback and a structurally isolated shadow path
//!
//! Generation backends, context retrieval, and persistence are seams
//! (`GenerationBackend`, `ContextProvider`, `ConsensusSink`) implemented
//! outside this crate.

pub mod aggregate;
pub mod bundle;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod project;
pub mod sink;
pub mod telemetry;
pub mod validator;
pub mod weights;

pub use aggregate::{aggregate, CategoryDraft, ConsensusDraft, Contribution};
pub use bundle::{
    Assertion, AssertionType, AssertionValue, Bundle, BundleSummary, Category, EventId, ExpertId,
    BUNDLE_SIZE,
};
pub use config::EngineConfig;
pub use context::{ContextProvider, EventContext, MemorySnippet};
pub use error::{EngineError, EngineResult, FailureKind};
pub use events::{EngineEvent, EventBus, SharedEventBus};
pub use orchestrator::shadow::{ShadowRun, ShadowSink};
pub use orchestrator::state::{ExpertState, TransitionRecord};
pub use orchestrator::{
    ConsensusOutcome, Expert, GenerationBackend, GenerationRequest, Orchestrator,
};
pub use project::{
    project, project_with_tolerance, Constraint, ConstraintSet, FinalConsensus,
};
pub use sink::ConsensusSink;
pub use telemetry::{ExpertTelemetry, RunTelemetry};
pub use validator::{validate, ValidationIssue, ValidationReport};
pub use weights::{compute_weights, ExpertProfile, ExpertStats, VoteWeight};
