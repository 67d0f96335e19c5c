//! Event context: the structured game metadata and historical memory
//! snippets handed to every generation call.
//!
//! Context retrieval internals (similarity search, storage) live outside
//! this core; the `ContextProvider` trait is the seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::EventId;

/// A retrieved historical-memory snippet. Its id is usable verbatim as
/// an evidence reference in assertions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemorySnippet {
    pub id: String,
    pub text: String,
    /// Retrieval relevance, in [0, 1].
    pub relevance: f64,
}

/// Structured context for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    pub event_id: EventId,
    pub home_team: String,
    pub away_team: String,
    /// Situational metadata (venue, injuries, rest days, weather...)
    /// as free-form key/value pairs.
    #[serde(default)]
    pub metadata: Vec<(String, String)>,
    /// Bounded set of relevant memory snippets.
    #[serde(default)]
    pub memory: Vec<MemorySnippet>,
}

impl EventContext {
    /// Minimal context carrying only identities, for tests and degraded
    /// operation when the context service is unreachable.
    pub fn bare(event_id: &str, home_team: &str, away_team: &str) -> Self {
        Self {
            event_id: event_id.to_string(),
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            metadata: Vec::new(),
            memory: Vec::new(),
        }
    }
}

/// External context fetch. Implementations live outside the core.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Fetch context for an event. Errors are treated as upstream
    /// unavailability by the orchestrator.
    async fn fetch(&self, event_id: &EventId) -> anyhow::Result<EventContext>;
}
