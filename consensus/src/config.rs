//! Engine configuration: budgets and tunables passed explicitly per run.
//!
//! There is no process-wide mutable state; every orchestration call
//! receives its budgets as parameters.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Budgets and tunables for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Repair iterations allowed after the first failed validation.
    pub max_repair_iterations: u32,
    /// Hard cap on generation calls per expert (draft + repairs).
    pub generation_call_budget: u32,
    /// Wall-clock budget per expert task.
    #[serde(with = "duration_secs")]
    pub expert_timeout: Duration,
    /// Whether the parallel shadow path runs.
    pub shadow_enabled: bool,
    /// Numeric tolerance for constraint satisfaction.
    pub projection_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_repair_iterations: 2,
            generation_call_budget: 10,
            expert_timeout: Duration::from_secs(45),
            shadow_enabled: false,
            projection_tolerance: crate::project::PROJECTION_TOLERANCE,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_budgets() {
        let config = EngineConfig::default();
        assert_eq!(config.max_repair_iterations, 2);
        assert_eq!(config.generation_call_budget, 10);
        assert_eq!(config.expert_timeout, Duration::from_secs(45));
        assert!(!config.shadow_enabled);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EngineConfig {
            expert_timeout: Duration::from_secs(30),
            shadow_enabled: true,
            ..EngineConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.expert_timeout, Duration::from_secs(30));
        assert!(restored.shadow_enabled);
    }
}
