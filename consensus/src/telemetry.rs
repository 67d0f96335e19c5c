//! Per-run telemetry for audit and operator visibility.
//!
//! Recoverable failures (repair iterations, degraded fallbacks,
//! unresolved constraints) are retained here; none of it is exposed to
//! the end consumer of the final consensus.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::bundle::{EventId, ExpertId};
use crate::error::FailureKind;
use crate::orchestrator::state::{ExpertState, TransitionRecord};

/// Telemetry for a single expert's orchestration attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertTelemetry {
    pub expert_id: ExpertId,
    pub final_state: ExpertState,
    /// Repair iterations consumed (0 = valid on first draft).
    pub repair_iterations: u32,
    /// Generation calls made, including the initial draft.
    pub generation_calls: u32,
    pub elapsed_ms: u64,
    pub degraded: bool,
    /// Failure classification when the expert degraded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    /// Last validation issue list, as repair-instruction text.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub last_issues: Vec<String>,
    /// Full state transition log for replay.
    pub transitions: Vec<TransitionRecord>,
}

/// Aggregate telemetry for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTelemetry {
    pub run_id: String,
    pub event_id: EventId,
    pub experts: usize,
    pub degraded_count: usize,
    pub shadow_runs: usize,
    /// Labels of constraints the projector left unsatisfied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_constraints: Vec<String>,
    pub elapsed_ms: u64,
    pub per_expert: Vec<ExpertTelemetry>,
    pub timestamp: String,
}

/// Accumulates telemetry during an orchestration run.
pub struct TelemetryCollector {
    run_id: String,
    event_id: EventId,
    started: Instant,
    per_expert: Vec<ExpertTelemetry>,
    shadow_runs: usize,
    unresolved_constraints: Vec<String>,
}

impl TelemetryCollector {
    pub fn new(event_id: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            event_id: event_id.to_string(),
            started: Instant::now(),
            per_expert: Vec::new(),
            shadow_runs: 0,
            unresolved_constraints: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record a settled expert task.
    pub fn record_expert(&mut self, telemetry: ExpertTelemetry) {
        self.per_expert.push(telemetry);
    }

    /// Record a completed shadow run.
    pub fn record_shadow(&mut self) {
        self.shadow_runs += 1;
    }

    /// Record constraints the projector could not satisfy.
    pub fn record_unresolved(&mut self, labels: &[String]) {
        self.unresolved_constraints.extend_from_slice(labels);
    }

    /// Finalize into the complete run telemetry.
    pub fn finalize(self) -> RunTelemetry {
        let degraded_count = self.per_expert.iter().filter(|e| e.degraded).count();
        RunTelemetry {
            run_id: self.run_id,
            event_id: self.event_id,
            experts: self.per_expert.len(),
            degraded_count,
            shadow_runs: self.shadow_runs,
            unresolved_constraints: self.unresolved_constraints,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            per_expert: self.per_expert,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
