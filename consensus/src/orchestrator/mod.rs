//! Orchestration of the generate -> validate -> repair loop across the
//! expert panel, followed by weighting, aggregation, and coherence
//! projection.
//!
//! One expert task never blocks or corrupts another: each runs in its
//! own Tokio task under a wall-clock budget, and any failure degrades
//! that expert to a zero-influence fallback bundle instead of failing
//! the event. The only fatal condition is an empty panel.

pub mod shadow;
pub mod state;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::aggregate::{aggregate, ConsensusDraft};
use crate::bundle::{Bundle, EventId, ExpertId};
use crate::config::EngineConfig;
use crate::context::EventContext;
use crate::error::{EngineError, EngineResult, FailureKind};
use crate::events::{EngineEvent, EventBus, SharedEventBus};
use crate::project::{project_with_tolerance, ConstraintSet, FinalConsensus};
use crate::sink::ConsensusSink;
use crate::telemetry::{ExpertTelemetry, RunTelemetry, TelemetryCollector};
use crate::validator::validate;
use crate::weights::{compute_weights, ExpertProfile, VoteWeight};

use shadow::{ShadowRun, ShadowSink};
use state::{ExpertState, ExpertStateMachine, TransitionRecord};

/// One generation call's input: event context plus, on repair rounds,
/// the prior draft and the instructions derived from its violations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub event_id: EventId,
    pub expert_id: ExpertId,
    pub context: EventContext,
    /// The rejected draft, present on repair rounds only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<Bundle>,
    /// Imperative repair instructions, one per violation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repair_instructions: Vec<String>,
}

impl GenerationRequest {
    pub fn draft(expert_id: &str, context: &EventContext) -> Self {
        Self {
            event_id: context.event_id.clone(),
            expert_id: expert_id.to_string(),
            context: context.clone(),
            prior: None,
            repair_instructions: Vec::new(),
        }
    }

    pub fn repair(self, prior: Bundle, instructions: Vec<String>) -> Self {
        Self {
            prior: Some(prior),
            repair_instructions: instructions,
            ..self
        }
    }
}

/// Produces one bundle per generation call. Implementations live
/// outside the core (HTTP model backends, replay fixtures, stubs).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Bundle>;
}

/// One panel member: a track-record profile plus its generation channel.
#[derive(Clone)]
pub struct Expert {
    pub profile: ExpertProfile,
    pub backend: Arc<dyn GenerationBackend>,
}

impl Expert {
    pub fn new(profile: ExpertProfile, backend: Arc<dyn GenerationBackend>) -> Self {
        Self { profile, backend }
    }

    pub fn expert_id(&self) -> &str {
        &self.profile.expert_id
    }
}

/// Everything one orchestration run produces.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub consensus: FinalConsensus,
    pub draft: ConsensusDraft,
    pub bundles: Vec<Bundle>,
    pub weights: Vec<VoteWeight>,
    pub telemetry: RunTelemetry,
}

/// Drives the full per-event pipeline.
pub struct Orchestrator {
    config: EngineConfig,
    constraints: ConstraintSet,
    bus: SharedEventBus,
    sink: Option<Arc<dyn ConsensusSink>>,
    shadow_backend: Option<Arc<dyn GenerationBackend>>,
    shadow_sink: Option<Arc<dyn ShadowSink>>,
}

impl Orchestrator {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            constraints: ConstraintSet::game_default(),
            bus: EventBus::new().shared(),
            sink: None,
            shadow_backend: None,
            shadow_sink: None,
        }
    }

    pub fn with_constraints(mut self, constraints: ConstraintSet) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ConsensusSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach the shadow path: a candidate backend whose output goes
    /// only to the shadow sink, never into the consensus.
    pub fn with_shadow(
        mut self,
        backend: Arc<dyn GenerationBackend>,
        sink: Arc<dyn ShadowSink>,
    ) -> Self {
        self.shadow_backend = Some(backend);
        self.shadow_sink = Some(sink);
        self
    }

    pub fn event_bus(&self) -> SharedEventBus {
        Arc::clone(&self.bus)
    }

    /// Run the full pipeline for one event.
    ///
    /// Every expert settles to exactly one bundle (valid or degraded
    /// fallback); the set is then weighted, aggregated, and projected.
    pub async fn orchestrate(
        &self,
        context: &EventContext,
        experts: &[Expert],
    ) -> EngineResult<ConsensusOutcome> {
        if experts.is_empty() {
            return Err(EngineError::NoUsableBundles(context.event_id.clone()));
        }

        let started = Instant::now();
        let mut collector = TelemetryCollector::new(&context.event_id);
        info!(
            event_id = %context.event_id,
            run_id = %collector.run_id(),
            experts = experts.len(),
            "Orchestration started"
        );

        let shadow_handles = self.spawn_shadow_runs(context, experts);

        let handles: Vec<_> = experts
            .iter()
            .map(|expert| {
                let backend = Arc::clone(&expert.backend);
                let expert_id = expert.expert_id().to_string();
                let context = context.clone();
                let config = self.config.clone();
                let bus = Arc::clone(&self.bus);
                tokio::spawn(async move {
                    run_expert(backend, expert_id, context, config, bus).await
                })
            })
            .collect();

        let mut bundles = Vec::with_capacity(experts.len());
        let mut profiles = Vec::with_capacity(experts.len());
        for (expert, result) in experts.iter().zip(join_all(handles).await) {
            let (bundle, telemetry) = match result {
                Ok(settled) => settled,
                Err(join_err) => {
                    error!(
                        expert_id = expert.expert_id(),
                        error = %join_err,
                        "Expert task aborted"
                    );
                    degraded_outcome(
                        expert.expert_id(),
                        &context.event_id,
                        FailureKind::UpstreamUnavailable,
                        "task aborted",
                        0,
                        0,
                    )
                }
            };
            collector.record_expert(telemetry);
            bundles.push(bundle);
            profiles.push(expert.profile.clone());
        }

        let (weights, draft, consensus) = self.compute_consensus(&bundles, &profiles)?;

        let suppressed = draft.categories.iter().filter(|c| c.suppressed).count();
        self.bus.publish(EngineEvent::AggregationFinished {
            event_id: context.event_id.clone(),
            bundles: bundles.len(),
            suppressed_categories: suppressed,
            timestamp: Utc::now(),
        });
        self.bus.publish(EngineEvent::ProjectionApplied {
            event_id: context.event_id.clone(),
            total_adjustment: consensus.total_adjustment,
            unresolved: consensus.unresolved,
            timestamp: Utc::now(),
        });
        collector.record_unresolved(&consensus.unresolved_constraints);

        self.settle_shadow_runs(context, shadow_handles, &mut collector)
            .await;

        if let Some(sink) = &self.sink {
            for (bundle, weight) in bundles.iter().zip(&weights) {
                if let Err(err) = sink.record_expert(bundle, weight).await {
                    warn!(expert_id = %bundle.expert_id, error = %err, "Expert sink write failed");
                }
            }
        }

        let degraded = bundles.iter().filter(|b| b.degraded).count();
        self.bus.publish(EngineEvent::RunFinished {
            event_id: context.event_id.clone(),
            experts: experts.len(),
            degraded,
            elapsed_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });

        let telemetry = collector.finalize();
        if let Some(sink) = &self.sink {
            if let Err(err) = sink.record_consensus(&consensus, &telemetry).await {
                warn!(event_id = %context.event_id, error = %err, "Consensus sink write failed");
            }
        }

        info!(
            event_id = %context.event_id,
            degraded,
            unresolved = consensus.unresolved,
            elapsed_ms = telemetry.elapsed_ms,
            "Orchestration finished"
        );

        Ok(ConsensusOutcome {
            consensus,
            draft,
            bundles,
            weights,
            telemetry,
        })
    }

    /// Weight, aggregate, and project an already-settled bundle set.
    ///
    /// Exposed separately so replayed or persisted bundles can be
    /// re-scored without generation.
    pub fn compute_consensus(
        &self,
        bundles: &[Bundle],
        profiles: &[ExpertProfile],
    ) -> EngineResult<(Vec<VoteWeight>, ConsensusDraft, FinalConsensus)> {
        let weights = compute_weights(profiles)?;
        let draft = aggregate(bundles, &weights)?;
        let consensus = project_with_tolerance(
            &draft,
            &self.constraints,
            self.config.projection_tolerance,
        );
        Ok((weights, draft, consensus))
    }

    fn spawn_shadow_runs(
        &self,
        context: &EventContext,
        experts: &[Expert],
    ) -> Vec<tokio::task::JoinHandle<ShadowRun>> {
        if !self.config.shadow_enabled {
            return Vec::new();
        }
        let (Some(backend), Some(_)) = (&self.shadow_backend, &self.shadow_sink) else {
            return Vec::new();
        };

        experts
            .iter()
            .map(|expert| {
                let backend = Arc::clone(backend);
                let expert_id = expert.expert_id().to_string();
                let context = context.clone();
                let config = self.config.clone();
                tokio::spawn(
                    async move { run_shadow(backend, expert_id, context, config).await },
                )
            })
            .collect()
    }

    async fn settle_shadow_runs(
        &self,
        context: &EventContext,
        handles: Vec<tokio::task::JoinHandle<ShadowRun>>,
        collector: &mut TelemetryCollector,
    ) {
        let Some(sink) = &self.shadow_sink else {
            return;
        };
        for result in join_all(handles).await {
            match result {
                Ok(run) => {
                    self.bus.publish(EngineEvent::ShadowCompleted {
                        event_id: context.event_id.clone(),
                        expert_id: run.expert_id().to_string(),
                        valid: run.valid(),
                        timestamp: Utc::now(),
                    });
                    if let Err(err) = sink.record(&run).await {
                        warn!(expert_id = run.expert_id(), error = %err, "Shadow sink write failed");
                    }
                    collector.record_shadow();
                }
                Err(join_err) => {
                    warn!(error = %join_err, "Shadow task aborted");
                }
            }
        }
    }
}

/// Drive one expert to a settled bundle under its wall-clock budget.
async fn run_expert(
    backend: Arc<dyn GenerationBackend>,
    expert_id: ExpertId,
    context: EventContext,
    config: EngineConfig,
    bus: SharedEventBus,
) -> (Bundle, ExpertTelemetry) {
    let started = Instant::now();
    let timeout = config.expert_timeout;
    let drive = drive_expert(backend, expert_id.clone(), context.clone(), config, bus.clone());

    match tokio::time::timeout(timeout, drive).await {
        Ok(settled) => settled,
        Err(_) => {
            warn!(expert_id = %expert_id, "Expert exceeded wall-clock budget");
            bus.publish(EngineEvent::ExpertDegraded {
                event_id: context.event_id.clone(),
                expert_id: expert_id.clone(),
                reason: FailureKind::BudgetExceeded,
                timestamp: Utc::now(),
            });
            let mut settled = degraded_outcome(
                &expert_id,
                &context.event_id,
                FailureKind::BudgetExceeded,
                "wall-clock budget exhausted",
                0,
                0,
            );
            settled.1.elapsed_ms = started.elapsed().as_millis() as u64;
            settled
        }
    }
}

/// The generate -> validate -> repair loop for one expert.
async fn drive_expert(
    backend: Arc<dyn GenerationBackend>,
    expert_id: ExpertId,
    context: EventContext,
    config: EngineConfig,
    bus: SharedEventBus,
) -> (Bundle, ExpertTelemetry) {
    let started = Instant::now();
    let event_id = context.event_id.clone();
    let mut machine = ExpertStateMachine::new(&expert_id);
    let mut request = GenerationRequest::draft(&expert_id, &context);
    let mut calls: u32 = 0;
    let mut iterations: u32 = 0;
    let mut last_issues: Vec<String> = Vec::new();

    bus.publish(EngineEvent::ExpertDrafting {
        event_id: event_id.clone(),
        expert_id: expert_id.clone(),
        timestamp: Utc::now(),
    });

    loop {
        let generated = backend.generate(&request).await;
        calls += 1;

        let mut bundle = match generated {
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(expert_id = %expert_id, error = %err, "Generation call failed");
                return settle_degraded(
                    machine,
                    &bus,
                    &expert_id,
                    &event_id,
                    FailureKind::UpstreamUnavailable,
                    &format!("generation failed: {err}"),
                    calls,
                    iterations,
                    last_issues,
                    started,
                );
            }
        };
        // Identity fields are the orchestrator's, whatever the backend echoed.
        bundle.expert_id = expert_id.clone();
        bundle.event_id = event_id.clone();

        // Drafting or Repairing -> Validating.
        if machine.transition(ExpertState::Validating, "bundle received").is_err() {
            // Unreachable by construction of the loop.
            break settle_degraded(
                machine,
                &bus,
                &expert_id,
                &event_id,
                FailureKind::Structural,
                "state machine desync",
                calls,
                iterations,
                last_issues,
                started,
            );
        }

        let report = validate(&bundle);
        if report.valid {
            bundle.degraded = false;
            bundle.repair_iterations = iterations;
            let _ = machine.transition(ExpertState::Done, "bundle valid");
            bus.publish(EngineEvent::ExpertDone {
                event_id: event_id.clone(),
                expert_id: expert_id.clone(),
                repair_iterations: iterations,
                timestamp: Utc::now(),
            });
            debug!(expert_id = %expert_id, iterations, calls, "Expert settled valid");
            let telemetry = ExpertTelemetry {
                expert_id: expert_id.clone(),
                final_state: ExpertState::Done,
                repair_iterations: iterations,
                generation_calls: calls,
                elapsed_ms: started.elapsed().as_millis() as u64,
                degraded: false,
                failure: None,
                last_issues: Vec::new(),
                transitions: machine.into_transitions(),
            };
            break (bundle, telemetry);
        }

        last_issues = report.repair_instructions();
        if iterations >= config.max_repair_iterations || calls >= config.generation_call_budget {
            break settle_degraded(
                machine,
                &bus,
                &expert_id,
                &event_id,
                FailureKind::Structural,
                "repair budget exhausted",
                calls,
                iterations,
                last_issues,
                started,
            );
        }

        iterations += 1;
        let _ = machine.transition(
            ExpertState::Repairing,
            &format!("{} issues", report.issues.len()),
        );
        bus.publish(EngineEvent::ExpertRepairing {
            event_id: event_id.clone(),
            expert_id: expert_id.clone(),
            iteration: iterations,
            issue_count: report.issues.len(),
            timestamp: Utc::now(),
        });
        request = GenerationRequest::draft(&expert_id, &context)
            .repair(bundle, last_issues.clone());
    }
}

/// Single-pass shadow mirror of the expert loop. Publishes nothing on
/// the primary bus and returns a `ShadowRun` bound for the shadow sink.
async fn run_shadow(
    backend: Arc<dyn GenerationBackend>,
    expert_id: ExpertId,
    context: EventContext,
    config: EngineConfig,
) -> ShadowRun {
    let started = Instant::now();
    let event_id = context.event_id.clone();
    let mut request = GenerationRequest::draft(&expert_id, &context);
    let mut iterations: u32 = 0;

    let drive = async {
        loop {
            let mut bundle = match backend.generate(&request).await {
                Ok(bundle) => bundle,
                Err(_) => {
                    return (
                        Bundle::fallback(&expert_id, &event_id),
                        false,
                        Some(FailureKind::UpstreamUnavailable),
                    );
                }
            };
            bundle.expert_id = expert_id.clone();
            bundle.event_id = event_id.clone();

            let report = validate(&bundle);
            if report.valid {
                bundle.repair_iterations = iterations;
                return (bundle, true, None);
            }
            if iterations >= config.max_repair_iterations {
                bundle.degraded = true;
                return (bundle, false, Some(FailureKind::Structural));
            }
            iterations += 1;
            request = GenerationRequest::draft(&expert_id, &context)
                .repair(bundle, report.repair_instructions());
        }
    };

    let (bundle, valid, failure) = match tokio::time::timeout(config.expert_timeout, drive).await {
        Ok(outcome) => outcome,
        Err(_) => (
            Bundle::fallback(&expert_id, &event_id),
            false,
            Some(FailureKind::BudgetExceeded),
        ),
    };
    ShadowRun::new(bundle, valid, started.elapsed().as_millis() as u64, failure)
}

#[allow(clippy::too_many_arguments)]
fn settle_degraded(
    mut machine: ExpertStateMachine,
    bus: &SharedEventBus,
    expert_id: &str,
    event_id: &str,
    failure: FailureKind,
    reason: &str,
    calls: u32,
    iterations: u32,
    last_issues: Vec<String>,
    started: Instant,
) -> (Bundle, ExpertTelemetry) {
    let _ = machine.transition(ExpertState::DegradedFallback, reason);
    bus.publish(EngineEvent::ExpertDegraded {
        event_id: event_id.to_string(),
        expert_id: expert_id.to_string(),
        reason: failure,
        timestamp: Utc::now(),
    });
    let bundle = Bundle::fallback(expert_id, event_id);
    let telemetry = ExpertTelemetry {
        expert_id: expert_id.to_string(),
        final_state: ExpertState::DegradedFallback,
        repair_iterations: iterations,
        generation_calls: calls,
        elapsed_ms: started.elapsed().as_millis() as u64,
        degraded: true,
        failure: Some(failure),
        last_issues,
        transitions: machine.into_transitions(),
    };
    (bundle, telemetry)
}

/// Fallback bundle plus telemetry for paths where no state machine ran.
fn degraded_outcome(
    expert_id: &str,
    event_id: &str,
    failure: FailureKind,
    reason: &str,
    calls: u32,
    iterations: u32,
) -> (Bundle, ExpertTelemetry) {
    let bundle = Bundle::fallback(expert_id, event_id);
    let telemetry = ExpertTelemetry {
        expert_id: expert_id.to_string(),
        final_state: ExpertState::DegradedFallback,
        repair_iterations: iterations,
        generation_calls: calls,
        elapsed_ms: 0,
        degraded: true,
        failure: Some(failure),
        last_issues: Vec::new(),
        transitions: vec![TransitionRecord {
            from: ExpertState::Drafting,
            to: ExpertState::DegradedFallback,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        }],
    };
    (bundle, telemetry)
}
