//! Event bus for engine observability.
//!
//! Pub/sub over a Tokio broadcast channel. Publishing never blocks the
//! pipeline: an event with no subscribers is simply dropped.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::bundle::{EventId, ExpertId};
use crate::error::FailureKind;

/// Channel capacity for broadcast.
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to EventBus.
pub type SharedEventBus = Arc<EventBus>;

/// Engine lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum EngineEvent {
    ExpertDrafting {
        event_id: EventId,
        expert_id: ExpertId,
        timestamp: DateTime<Utc>,
    },
    ExpertRepairing {
        event_id: EventId,
        expert_id: ExpertId,
        iteration: u32,
        issue_count: usize,
        timestamp: DateTime<Utc>,
    },
    ExpertDone {
        event_id: EventId,
        expert_id: ExpertId,
        repair_iterations: u32,
        timestamp: DateTime<Utc>,
    },
    ExpertDegraded {
        event_id: EventId,
        expert_id: ExpertId,
        reason: FailureKind,
        timestamp: DateTime<Utc>,
    },
    ShadowCompleted {
        event_id: EventId,
        expert_id: ExpertId,
        valid: bool,
        timestamp: DateTime<Utc>,
    },
    AggregationFinished {
        event_id: EventId,
        bundles: usize,
        suppressed_categories: usize,
        timestamp: DateTime<Utc>,
    },
    ProjectionApplied {
        event_id: EventId,
        total_adjustment: f64,
        unresolved: bool,
        timestamp: DateTime<Utc>,
    },
    RunFinished {
        event_id: EventId,
        experts: usize,
        degraded: usize,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl EngineEvent {
    /// Stable event type tag for filtering and logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::ExpertDrafting { .. } => "expert_drafting",
            EngineEvent::ExpertRepairing { .. } => "expert_repairing",
            EngineEvent::ExpertDone { .. } => "expert_done",
            EngineEvent::ExpertDegraded { .. } => "expert_degraded",
            EngineEvent::ShadowCompleted { .. } => "shadow_completed",
            EngineEvent::AggregationFinished { .. } => "aggregation_finished",
            EngineEvent::ProjectionApplied { .. } => "projection_applied",
            EngineEvent::RunFinished { .. } => "run_finished",
        }
    }

    /// Event id this event belongs to.
    pub fn event_id(&self) -> &str {
        match self {
            EngineEvent::ExpertDrafting { event_id, .. }
            | EngineEvent::ExpertRepairing { event_id, .. }
            | EngineEvent::ExpertDone { event_id, .. }
            | EngineEvent::ExpertDegraded { event_id, .. }
            | EngineEvent::ShadowCompleted { event_id, .. }
            | EngineEvent::AggregationFinished { event_id, .. }
            | EngineEvent::ProjectionApplied { event_id, .. }
            | EngineEvent::RunFinished { event_id, .. } => event_id,
        }
    }
}

/// Broadcast event bus.
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus.
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish an event to all subscribers. No receivers is not an error.
    pub fn publish(&self, event: EngineEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => debug!(event_type, receivers = count, "Event published"),
            Err(_) => debug!(event_type, "Event published (no receivers)"),
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(EngineEvent::ExpertDone {
            event_id: "game-1".into(),
            expert_id: "expert-1".into(),
            repair_iterations: 1,
            timestamp: Utc::now(),
        });

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event_type(), "expert_done");
        assert_eq!(received.event_id(), "game-1");
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(EngineEvent::RunFinished {
            event_id: "game-1".into(),
            experts: 3,
            degraded: 0,
            elapsed_ms: 1200,
            timestamp: Utc::now(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_receive() {
        let bus = EventBus::new().shared();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(EngineEvent::AggregationFinished {
            event_id: "game-1".into(),
            bundles: 5,
            suppressed_categories: 0,
            timestamp: Utc::now(),
        });

        assert_eq!(rx1.recv().await.unwrap().event_type(), "aggregation_finished");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "aggregation_finished");
    }
}
