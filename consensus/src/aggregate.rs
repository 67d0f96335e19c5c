//! Weighted cross-expert aggregation, category by category.
//!
//! Each category is reduced by a pure aggregation rule selected by its
//! declared type: weighted mean for numeric, weighted log-odds pooling
//! for binary, weighted plurality for enumerated. The output is a draft —
//! cross-category arithmetic is not yet guaranteed to hold until the
//! coherence projector runs.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bundle::{AssertionType, AssertionValue, Bundle, Category, EventId, ExpertId};
use crate::weights::VoteWeight;

/// Confidence clamp bound for log-odds conversion. Keeps logits finite.
const LOGIT_CLAMP: f64 = 1e-6;

/// Error type for aggregation.
#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("No vote weight found for expert {0}")]
    MissingWeight(ExpertId),

    #[error("Bundle for expert {0} belongs to event {1}, expected {2}")]
    EventMismatch(ExpertId, EventId, EventId),
}

/// Result type for aggregation.
pub type AggregationResult<T> = Result<T, AggregationError>;

/// One expert's contribution to a category, retained for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub expert_id: ExpertId,
    pub value: AssertionValue,
    /// The weight this contribution carried in the aggregation rule.
    pub weight: f64,
}

/// Draft consensus for one category, before constraint repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub category: Category,
    pub value: AssertionValue,
    pub confidence: f64,
    /// Dispersion measure across contributing experts, in [0, 1].
    pub agreement: f64,
    pub contributors: Vec<Contribution>,
    /// True when no expert contributed usable information; downstream
    /// consumers must not present this category.
    pub suppressed: bool,
}

/// The full per-event draft consensus, one entry per category in
/// canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDraft {
    pub event_id: EventId,
    pub categories: Vec<CategoryDraft>,
}

impl ConsensusDraft {
    pub fn category(&self, category: Category) -> Option<&CategoryDraft> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// A single gathered (weight, confidence, value) observation.
struct Observation<'a> {
    expert_id: &'a str,
    normalized_weight: f64,
    confidence: f64,
    value: &'a AssertionValue,
}

/// Aggregate validated bundles into a draft consensus.
///
/// Deterministic: contributions are folded in input order, so identical
/// `(bundles, weights)` inputs yield bit-identical drafts. Assertions
/// with zero confidence (degraded fallback placeholders) are treated as
/// abstentions; a category where every expert abstained is suppressed
/// rather than failing the aggregation.
pub fn aggregate(
    bundles: &[Bundle],
    weights: &[VoteWeight],
) -> AggregationResult<ConsensusDraft> {
    let event_id = bundles
        .first()
        .map(|b| b.event_id.clone())
        .unwrap_or_default();

    for bundle in bundles {
        if bundle.event_id != event_id {
            return Err(AggregationError::EventMismatch(
                bundle.expert_id.clone(),
                bundle.event_id.clone(),
                event_id,
            ));
        }
    }

    let mut categories = Vec::with_capacity(Category::ALL.len());
    for category in Category::ALL {
        let mut observations = Vec::new();
        for bundle in bundles {
            let Some(assertion) = bundle.assertion(category) else {
                continue;
            };
            if assertion.confidence <= 0.0 {
                // Abstention: placeholder values carry no information.
                continue;
            }
            let weight = weights
                .iter()
                .find(|w| w.expert_id == bundle.expert_id)
                .ok_or_else(|| AggregationError::MissingWeight(bundle.expert_id.clone()))?;

            observations.push(Observation {
                expert_id: &bundle.expert_id,
                normalized_weight: weight.normalized,
                confidence: assertion.confidence,
                value: &assertion.value,
            });
        }

        let draft = if observations.is_empty() {
            warn!(category = %category, "No contributing experts; suppressing category");
            suppressed_category(category)
        } else {
            match category.declared_type() {
                AssertionType::Numeric => aggregate_numeric(category, &observations),
                AssertionType::Binary => aggregate_binary(category, &observations),
                AssertionType::Enumerated => aggregate_enumerated(category, &observations),
            }
        };
        categories.push(draft);
    }

    debug!(
        event_id = %event_id,
        bundles = bundles.len(),
        suppressed = categories.iter().filter(|c| c.suppressed).count(),
        "Aggregated draft consensus"
    );

    Ok(ConsensusDraft {
        event_id,
        categories,
    })
}

fn suppressed_category(category: Category) -> CategoryDraft {
    let value = match category.declared_type() {
        AssertionType::Binary => AssertionValue::Binary(false),
        AssertionType::Numeric => AssertionValue::Numeric(0.0),
        AssertionType::Enumerated => AssertionValue::Enumerated(String::new()),
    };
    CategoryDraft {
        category,
        value,
        confidence: 0.0,
        agreement: 0.0,
        contributors: Vec::new(),
        suppressed: true,
    }
}

/// Weighted mean, each expert weighted by normalized vote weight times
/// the assertion's own confidence. Agreement is one minus the weighted
/// coefficient of variation, clamped to [0, 1].
fn aggregate_numeric(category: Category, observations: &[Observation<'_>]) -> CategoryDraft {
    let mut weight_sum = 0.0;
    let mut value_sum = 0.0;
    let mut vote_weight_sum = 0.0;
    let mut confidence_sum = 0.0;
    let mut contributors = Vec::with_capacity(observations.len());

    for obs in observations {
        let value = obs.value.as_numeric().unwrap_or(0.0);
        let effective = obs.normalized_weight * obs.confidence;
        weight_sum += effective;
        value_sum += effective * value;
        vote_weight_sum += obs.normalized_weight;
        confidence_sum += obs.normalized_weight * obs.confidence;
        contributors.push(Contribution {
            expert_id: obs.expert_id.to_string(),
            value: obs.value.clone(),
            weight: effective,
        });
    }

    if weight_sum <= 0.0 {
        return suppressed_category(category);
    }

    let mean = value_sum / weight_sum;

    let mut variance_sum = 0.0;
    for obs in observations {
        let value = obs.value.as_numeric().unwrap_or(0.0);
        let effective = obs.normalized_weight * obs.confidence;
        variance_sum += effective * (value - mean) * (value - mean);
    }
    let std_dev = (variance_sum / weight_sum).sqrt();

    // Weighted coefficient of variation; a near-zero mean gives no
    // meaningful dispersion scale, treated as full disagreement.
    let agreement = if mean.abs() > f64::EPSILON {
        (1.0 - std_dev / mean.abs()).clamp(0.0, 1.0)
    } else if std_dev <= f64::EPSILON {
        1.0
    } else {
        0.0
    };

    let confidence = (confidence_sum / vote_weight_sum).clamp(0.0, 1.0);

    CategoryDraft {
        category,
        value: AssertionValue::Numeric(mean),
        confidence,
        agreement,
        contributors,
        suppressed: false,
    }
}

/// Weighted log-odds pooling: each (value, confidence) pair becomes a
/// signed logit, pooled under the normalized vote weights and mapped
/// back through the sigmoid. The categorical value thresholds at 0.5.
fn aggregate_binary(category: Category, observations: &[Observation<'_>]) -> CategoryDraft {
    let mut logit_sum = 0.0;
    let mut vote_weight_sum = 0.0;
    let mut contributors = Vec::with_capacity(observations.len());

    for obs in observations {
        let value = obs.value.as_binary().unwrap_or(false);
        let p = obs.confidence.clamp(LOGIT_CLAMP, 1.0 - LOGIT_CLAMP);
        let logit = (p / (1.0 - p)).ln();
        let signed = if value { logit } else { -logit };
        logit_sum += obs.normalized_weight * signed;
        vote_weight_sum += obs.normalized_weight;
        contributors.push(Contribution {
            expert_id: obs.expert_id.to_string(),
            value: obs.value.clone(),
            weight: obs.normalized_weight,
        });
    }

    if vote_weight_sum <= 0.0 {
        return suppressed_category(category);
    }

    // Pool in the renormalized weight space of the contributing experts.
    let pooled = 1.0 / (1.0 + (-logit_sum / vote_weight_sum).exp());
    let outcome = pooled >= 0.5;
    let confidence = if outcome { pooled } else { 1.0 - pooled };

    let agreeing: f64 = observations
        .iter()
        .filter(|obs| obs.value.as_binary().unwrap_or(false) == outcome)
        .map(|obs| obs.normalized_weight)
        .sum();
    let agreement = (agreeing / vote_weight_sum).clamp(0.0, 1.0);

    CategoryDraft {
        category,
        value: AssertionValue::Binary(outcome),
        confidence,
        agreement,
        contributors,
        suppressed: false,
    }
}

/// Weighted plurality vote over the distinct enumerated values.
/// Confidence and agreement are both the winning share of total weight.
fn aggregate_enumerated(category: Category, observations: &[Observation<'_>]) -> CategoryDraft {
    // Vec tally keeps first-seen order so ties resolve deterministically
    // toward the earlier input.
    let mut tally: Vec<(String, f64)> = Vec::new();
    let mut vote_weight_sum = 0.0;
    let mut contributors = Vec::with_capacity(observations.len());

    for obs in observations {
        let value = obs.value.as_enumerated().unwrap_or("").to_string();
        vote_weight_sum += obs.normalized_weight;
        match tally.iter_mut().find(|(v, _)| *v == value) {
            Some((_, weight)) => *weight += obs.normalized_weight,
            None => tally.push((value, obs.normalized_weight)),
        }
        contributors.push(Contribution {
            expert_id: obs.expert_id.to_string(),
            value: obs.value.clone(),
            weight: obs.normalized_weight,
        });
    }

    if vote_weight_sum <= 0.0 || tally.is_empty() {
        return suppressed_category(category);
    }

    let mut winner = 0;
    for (i, (_, weight)) in tally.iter().enumerate() {
        if *weight > tally[winner].1 {
            winner = i;
        }
    }
    let (value, winning_weight) = tally.swap_remove(winner);
    let share = (winning_weight / vote_weight_sum).clamp(0.0, 1.0);

    CategoryDraft {
        category,
        value: AssertionValue::Enumerated(value),
        confidence: share,
        agreement: share,
        contributors,
        suppressed: false,
    }
}
