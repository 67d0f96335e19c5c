//! Per-expert lifecycle state machine.
//!
//! Deterministic states with an explicit legal-transition table. Every
//! transition is recorded with a timestamp and reason so a run can be
//! replayed from telemetry alone.
//!
//! ```text
//! Drafting → Validating → Done
//!               │  ↑
//!               ↓  │
//!             Repairing
//! (any non-terminal state → DegradedFallback)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bundle::ExpertId;

/// Lifecycle state of one expert task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpertState {
    /// Initial generation call in flight.
    Drafting,
    /// Bundle received, structural validation running.
    Validating,
    /// Validation failed, repair generation call in flight.
    Repairing,
    /// Valid bundle produced.
    Done,
    /// Budgets exhausted or upstream failed; placeholder bundle used.
    DegradedFallback,
}

impl ExpertState {
    /// States reachable from this one.
    pub fn legal_next(self) -> &'static [ExpertState] {
        match self {
            Self::Drafting => &[Self::Validating, Self::DegradedFallback],
            Self::Validating => &[Self::Done, Self::Repairing, Self::DegradedFallback],
            Self::Repairing => &[Self::Validating, Self::DegradedFallback],
            Self::Done | Self::DegradedFallback => &[],
        }
    }

    pub fn can_transition(self, to: ExpertState) -> bool {
        self.legal_next().contains(&to)
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::DegradedFallback)
    }
}

impl std::fmt::Display for ExpertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Drafting => write!(f, "drafting"),
            Self::Validating => write!(f, "validating"),
            Self::Repairing => write!(f, "repairing"),
            Self::Done => write!(f, "done"),
            Self::DegradedFallback => write!(f, "degraded_fallback"),
        }
    }
}

/// One recorded transition, for replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ExpertState,
    pub to: ExpertState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Errors from state machine operations.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Illegal transition for expert {expert_id}: {from} -> {to}")]
    IllegalTransition {
        expert_id: ExpertId,
        from: ExpertState,
        to: ExpertState,
    },
}

pub type StateResult<T> = Result<T, StateError>;

/// Tracks one expert through its lifecycle, logging every transition.
#[derive(Debug, Clone)]
pub struct ExpertStateMachine {
    expert_id: ExpertId,
    state: ExpertState,
    transitions: Vec<TransitionRecord>,
}

impl ExpertStateMachine {
    pub fn new(expert_id: &str) -> Self {
        Self {
            expert_id: expert_id.to_string(),
            state: ExpertState::Drafting,
            transitions: Vec::new(),
        }
    }

    pub fn state(&self) -> ExpertState {
        self.state
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Consume the machine, yielding the transition log.
    pub fn into_transitions(self) -> Vec<TransitionRecord> {
        self.transitions
    }

    /// Apply a transition, rejecting anything outside the legal table.
    pub fn transition(&mut self, to: ExpertState, reason: &str) -> StateResult<()> {
        if !self.state.can_transition(to) {
            return Err(StateError::IllegalTransition {
                expert_id: self.expert_id.clone(),
                from: self.state,
                to,
            });
        }
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut machine = ExpertStateMachine::new("expert-1");
        machine.transition(ExpertState::Validating, "draft received").unwrap();
        machine.transition(ExpertState::Done, "bundle valid").unwrap();
        assert_eq!(machine.state(), ExpertState::Done);
        assert_eq!(machine.transitions().len(), 2);
    }

    #[test]
    fn test_repair_cycle() {
        let mut machine = ExpertStateMachine::new("expert-1");
        machine.transition(ExpertState::Validating, "draft received").unwrap();
        machine.transition(ExpertState::Repairing, "2 issues").unwrap();
        machine.transition(ExpertState::Validating, "repair received").unwrap();
        machine.transition(ExpertState::Done, "bundle valid").unwrap();
        assert_eq!(machine.transitions().len(), 4);
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut machine = ExpertStateMachine::new("expert-1");
        let err = machine.transition(ExpertState::Done, "skip validation");
        assert!(matches!(
            err,
            Err(StateError::IllegalTransition {
                from: ExpertState::Drafting,
                to: ExpertState::Done,
                ..
            })
        ));
        assert_eq!(machine.state(), ExpertState::Drafting);
        assert!(machine.transitions().is_empty());
    }

    #[test]
    fn test_terminal_states_accept_nothing() {
        let mut machine = ExpertStateMachine::new("expert-1");
        machine.transition(ExpertState::DegradedFallback, "timeout").unwrap();
        assert!(machine.state().is_terminal());
        assert!(machine.transition(ExpertState::Drafting, "restart").is_err());
    }

    #[test]
    fn test_degraded_reachable_from_every_nonterminal() {
        for from in [ExpertState::Drafting, ExpertState::Validating, ExpertState::Repairing] {
            assert!(from.can_transition(ExpertState::DegradedFallback));
        }
    }
}
