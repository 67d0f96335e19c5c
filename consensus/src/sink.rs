//! Persistence seam for the live consensus path.
//!
//! Storage backends (files, databases, message queues) implement
//! `ConsensusSink` outside the core. Shadow results use a separate
//! trait in `orchestrator::shadow`.

use async_trait::async_trait;

use crate::bundle::Bundle;
use crate::project::FinalConsensus;
use crate::telemetry::RunTelemetry;
use crate::weights::VoteWeight;

/// Receives finalized expert bundles and event-level consensus.
#[async_trait]
pub trait ConsensusSink: Send + Sync {
    /// Record one expert's finalized bundle with its vote weight.
    async fn record_expert(&self, bundle: &Bundle, weight: &VoteWeight) -> anyhow::Result<()>;

    /// Record the final consensus and the run's telemetry.
    async fn record_consensus(
        &self,
        consensus: &FinalConsensus,
        telemetry: &RunTelemetry,
    ) -> anyhow::Result<()>;
}
