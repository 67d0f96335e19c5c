//! Per-event trust weighting for experts.
//!
//! Converts an expert's historical performance signals into a normalized
//! influence weight for one event. The component scores arrive from the
//! external performance registry; this module only combines and
//! normalizes them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bundle::ExpertId;

/// Fixed component proportions for the raw combination.
pub const CATEGORY_ACCURACY_SHARE: f64 = 0.4;
pub const OVERALL_PERFORMANCE_SHARE: f64 = 0.3;
pub const RECENT_TREND_SHARE: f64 = 0.2;
pub const CONFIDENCE_CALIBRATION_SHARE: f64 = 0.1;

/// Neutral component score for experts with no prior history.
pub const NEUTRAL_COMPONENT: f64 = 0.5;

/// Error type for weight computation.
#[derive(Debug, thiserror::Error)]
pub enum WeightError {
    #[error("Cannot compute weights for an empty expert set")]
    NoExperts,

    #[error("Component score out of range for expert {expert_id}: {component} = {value}")]
    ComponentOutOfRange {
        expert_id: ExpertId,
        component: &'static str,
        value: f64,
    },
}

/// Result type for weight computation.
pub type WeightResult<T> = Result<T, WeightError>;

/// Historical performance statistics for one expert, read-only here.
///
/// All scores are bounded [0, 1] and derived externally; this core treats
/// them as opaque numeric inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpertStats {
    /// Accuracy on the categories this event cares about.
    pub category_accuracy: f64,
    /// Lifetime overall performance score.
    pub overall_performance: f64,
    /// Recent-window trend score.
    pub recent_trend: f64,
    /// How well stated confidences matched realized outcomes.
    pub confidence_calibration: f64,
    /// Number of prior graded events.
    pub tenure_events: u32,
}

/// An expert identity plus its historical statistics.
///
/// `stats` is `None` for an expert with no prior history; such experts
/// receive the neutral default for every component rather than failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertProfile {
    pub expert_id: ExpertId,
    pub stats: Option<ExpertStats>,
}

impl ExpertProfile {
    pub fn new(expert_id: &str, stats: Option<ExpertStats>) -> Self {
        Self {
            expert_id: expert_id.to_string(),
            stats,
        }
    }

    /// Profile for an expert with no graded history.
    pub fn rookie(expert_id: &str) -> Self {
        Self::new(expert_id, None)
    }
}

/// The four named weight components, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightComponents {
    pub category_accuracy: f64,
    pub overall_performance: f64,
    pub recent_trend: f64,
    pub confidence_calibration: f64,
}

impl WeightComponents {
    /// Neutral components for a zero-history expert.
    pub fn neutral() -> Self {
        Self {
            category_accuracy: NEUTRAL_COMPONENT,
            overall_performance: NEUTRAL_COMPONENT,
            recent_trend: NEUTRAL_COMPONENT,
            confidence_calibration: NEUTRAL_COMPONENT,
        }
    }

    /// Raw combination under the fixed proportions.
    pub fn raw_score(&self) -> f64 {
        self.category_accuracy * CATEGORY_ACCURACY_SHARE
            + self.overall_performance * OVERALL_PERFORMANCE_SHARE
            + self.recent_trend * RECENT_TREND_SHARE
            + self.confidence_calibration * CONFIDENCE_CALIBRATION_SHARE
    }
}

/// Per (expert, event) influence record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteWeight {
    pub expert_id: ExpertId,
    pub components: WeightComponents,
    /// Raw combined score before normalization.
    pub raw: f64,
    /// Normalized weight; sums to 1.0 across the event's expert set.
    pub normalized: f64,
}

/// Compute normalized vote weights for an event's expert set.
///
/// Output order matches input order (stable — identical raw scores keep
/// their original relative position). Weights are normalized so that the
/// sum over all returned records is 1.0.
pub fn compute_weights(profiles: &[ExpertProfile]) -> WeightResult<Vec<VoteWeight>> {
    if profiles.is_empty() {
        return Err(WeightError::NoExperts);
    }

    let mut weights = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let components = match &profile.stats {
            Some(stats) => {
                validate_components(&profile.expert_id, stats)?;
                WeightComponents {
                    category_accuracy: stats.category_accuracy,
                    overall_performance: stats.overall_performance,
                    recent_trend: stats.recent_trend,
                    confidence_calibration: stats.confidence_calibration,
                }
            }
            None => {
                debug!(expert = %profile.expert_id, "No history; using neutral components");
                WeightComponents::neutral()
            }
        };

        let raw = components.raw_score();
        weights.push(VoteWeight {
            expert_id: profile.expert_id.clone(),
            components,
            raw,
            normalized: 0.0,
        });
    }

    let total: f64 = weights.iter().map(|w| w.raw).sum();
    if total > 0.0 {
        for weight in &mut weights {
            weight.normalized = weight.raw / total;
        }
    } else {
        // All raw scores zero: split influence evenly.
        let even = 1.0 / weights.len() as f64;
        for weight in &mut weights {
            weight.normalized = even;
        }
    }

    debug!(experts = weights.len(), total_raw = total, "Computed vote weights");
    Ok(weights)
}

fn validate_components(expert_id: &ExpertId, stats: &ExpertStats) -> WeightResult<()> {
    for (component, value) in [
        ("category_accuracy", stats.category_accuracy),
        ("overall_performance", stats.overall_performance),
        ("recent_trend", stats.recent_trend),
        ("confidence_calibration", stats.confidence_calibration),
    ] {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            return Err(WeightError::ComponentOutOfRange {
                expert_id: expert_id.clone(),
                component,
                value,
            });
        }
    }
    Ok(())
}
