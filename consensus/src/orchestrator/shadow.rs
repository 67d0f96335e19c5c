//! Shadow evaluation path.
//!
//! A shadow run exercises a candidate backend or prompt against live
//! traffic without influencing the consensus. Isolation is structural:
//! `ShadowRun` keeps its bundle private, no aggregation entry point
//! accepts the type, and results leave the engine only through
//! `ShadowSink`, a separate trait from the primary `ConsensusSink`.

use async_trait::async_trait;
use serde::Serialize;

use crate::bundle::{Bundle, EventId, ExpertId};
use crate::error::FailureKind;

/// Outcome of one shadow expert run. The produced bundle is private and
/// reachable only through serialization into a shadow sink.
#[derive(Debug, Clone, Serialize)]
pub struct ShadowRun {
    expert_id: ExpertId,
    event_id: EventId,
    bundle: Bundle,
    valid: bool,
    repair_iterations: u32,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureKind>,
}

impl ShadowRun {
    pub fn new(
        bundle: Bundle,
        valid: bool,
        elapsed_ms: u64,
        failure: Option<FailureKind>,
    ) -> Self {
        Self {
            expert_id: bundle.expert_id.clone(),
            event_id: bundle.event_id.clone(),
            repair_iterations: bundle.repair_iterations,
            bundle,
            valid,
            elapsed_ms,
            failure,
        }
    }

    pub fn expert_id(&self) -> &str {
        &self.expert_id
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn failure(&self) -> Option<FailureKind> {
        self.failure
    }
}

/// Offline comparison sink for shadow runs. Deliberately distinct from
/// the primary consensus sink so a wiring mistake cannot route shadow
/// output into the live path.
#[async_trait]
pub trait ShadowSink: Send + Sync {
    async fn record(&self, run: &ShadowRun) -> anyhow::Result<()>;
}
