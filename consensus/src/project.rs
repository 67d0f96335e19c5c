//! Coherence projection: repair the draft consensus so cross-category
//! arithmetic holds exactly.
//!
//! The draft's numeric values are projected onto the constraint surface
//! by constrained least squares: minimize the sum of squared deviations
//! from the draft subject to every linear constraint holding exactly.
//! For equality constraints `Ax = b` the minimizer has the closed form
//! `x = d − Aᵀ(AAᵀ)⁻¹(Ad − b)`; the small normal system is solved by
//! Gaussian elimination with partial pivoting. Sign consistency between
//! the binary winner and the signed margin is restored after the linear
//! solve by re-deriving the winner from the projected margin.
//!
//! Projection never fails: a singular or infeasible system falls back to
//! the unprojected draft with the offending constraints flagged
//! `unresolved`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::ConsensusDraft;
use crate::bundle::{AssertionValue, Category, EventId};

/// Numeric tolerance for treating a constraint as satisfied.
pub const PROJECTION_TOLERANCE: f64 = 1e-6;

/// Pivot threshold below which the normal system is considered singular.
const SINGULAR_EPS: f64 = 1e-12;

/// A hard cross-category relationship that must hold in the final
/// consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "family")]
pub enum Constraint {
    /// Σ parts = whole (half totals to game total, quarter totals to
    /// game total, home + away to combined total).
    PartsSumToWhole {
        parts: Vec<Category>,
        whole: Category,
    },
    /// minuend − subtrahend = result (home − away = margin).
    Difference {
        minuend: Category,
        subtrahend: Category,
        result: Category,
    },
    /// The binary category must agree with the sign of its numeric
    /// proxy. Handled post-projection, not as a linear row.
    SignConsistency {
        binary: Category,
        proxy: Category,
    },
}

impl Constraint {
    /// Human-readable label used in audit output and logs.
    pub fn label(&self) -> String {
        match self {
            Constraint::PartsSumToWhole { parts, whole } => {
                let parts: Vec<String> = parts.iter().map(|c| c.to_string()).collect();
                format!("{} = {}", parts.join(" + "), whole)
            }
            Constraint::Difference {
                minuend,
                subtrahend,
                result,
            } => format!("{minuend} - {subtrahend} = {result}"),
            Constraint::SignConsistency { binary, proxy } => {
                format!("{binary} agrees with sign({proxy})")
            }
        }
    }

    /// Categories this constraint touches.
    pub fn categories(&self) -> Vec<Category> {
        match self {
            Constraint::PartsSumToWhole { parts, whole } => {
                let mut cats = parts.clone();
                cats.push(*whole);
                cats
            }
            Constraint::Difference {
                minuend,
                subtrahend,
                result,
            } => vec![*minuend, *subtrahend, *result],
            Constraint::SignConsistency { binary, proxy } => vec![*binary, *proxy],
        }
    }
}

/// The closed list of constraints for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new(constraints: Vec<Constraint>) -> Self {
        Self { constraints }
    }

    /// The normative constraint set for a game forecast.
    pub fn game_default() -> Self {
        Self::new(vec![
            Constraint::PartsSumToWhole {
                parts: vec![Category::HomePoints, Category::AwayPoints],
                whole: Category::TotalPoints,
            },
            Constraint::PartsSumToWhole {
                parts: vec![Category::FirstHalfPoints, Category::SecondHalfPoints],
                whole: Category::TotalPoints,
            },
            Constraint::PartsSumToWhole {
                parts: vec![
                    Category::Q1Points,
                    Category::Q2Points,
                    Category::Q3Points,
                    Category::Q4Points,
                ],
                whole: Category::TotalPoints,
            },
            Constraint::Difference {
                minuend: Category::HomePoints,
                subtrahend: Category::AwayPoints,
                result: Category::Margin,
            },
            Constraint::SignConsistency {
                binary: Category::Winner,
                proxy: Category::Margin,
            },
        ])
    }
}

/// Final value for one category with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFinal {
    pub category: Category,
    /// The projected, constraint-satisfying value.
    pub value: AssertionValue,
    /// The aggregator's draft value, retained for audit.
    pub draft_value: AssertionValue,
    /// projected − draft for numeric categories; 0.0 otherwise.
    pub delta: f64,
    pub confidence: f64,
    pub agreement: f64,
    pub suppressed: bool,
}

/// The constraint-satisfying consensus for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalConsensus {
    pub event_id: EventId,
    pub categories: Vec<CategoryFinal>,
    /// True when some constraints could not be satisfied and the draft
    /// was returned unprojected for that subgraph.
    pub unresolved: bool,
    /// Labels of the constraints left unsatisfied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_constraints: Vec<String>,
    /// Sum of squared numeric adjustments applied by the projector.
    pub total_adjustment: f64,
}

impl FinalConsensus {
    pub fn category(&self, category: Category) -> Option<&CategoryFinal> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// One linear equality row over the numeric category vector.
struct LinearRow {
    coefficients: Vec<(Category, f64)>,
    rhs: f64,
    label: String,
}

/// Project a draft consensus onto the constraint surface with the
/// default tolerance.
pub fn project(draft: &ConsensusDraft, constraints: &ConstraintSet) -> FinalConsensus {
    project_with_tolerance(draft, constraints, PROJECTION_TOLERANCE)
}

/// Project a draft consensus onto the constraint surface.
///
/// `tolerance` bounds both the post-solve constraint residual check and
/// the dead-even band for sign consistency.
pub fn project_with_tolerance(
    draft: &ConsensusDraft,
    constraints: &ConstraintSet,
    tolerance: f64,
) -> FinalConsensus {
    // Numeric categories that actually carry information participate in
    // the solve; constraints touching a suppressed category are skipped.
    let active: Vec<Category> = draft
        .categories
        .iter()
        .filter(|c| !c.suppressed && c.value.as_numeric().is_some())
        .map(|c| c.category)
        .collect();

    let mut rows = Vec::new();
    let mut sign_constraints = Vec::new();
    for constraint in &constraints.constraints {
        match constraint {
            Constraint::SignConsistency { binary, proxy } => {
                sign_constraints.push((*binary, *proxy));
            }
            _ => {
                if constraint.categories().iter().all(|c| active.contains(c)) {
                    rows.push(linear_row(constraint));
                } else {
                    debug!(
                        constraint = %constraint.label(),
                        "Skipping constraint with suppressed participants"
                    );
                }
            }
        }
    }

    let draft_values: Vec<f64> = active
        .iter()
        .map(|&c| {
            draft
                .category(c)
                .and_then(|d| d.value.as_numeric())
                .unwrap_or(0.0)
        })
        .collect();

    let (projected_values, unresolved_labels) =
        solve_projection(&active, &draft_values, &rows, tolerance);

    let mut unresolved = !unresolved_labels.is_empty();
    let mut unresolved_constraints = unresolved_labels;

    // Assemble the final per-category records.
    let mut categories: Vec<CategoryFinal> = draft
        .categories
        .iter()
        .map(|d| {
            let (value, delta) = match active.iter().position(|&c| c == d.category) {
                Some(i) => {
                    let projected = projected_values[i];
                    (
                        AssertionValue::Numeric(projected),
                        projected - draft_values[i],
                    )
                }
                None => (d.value.clone(), 0.0),
            };
            CategoryFinal {
                category: d.category,
                value,
                draft_value: d.value.clone(),
                delta,
                confidence: d.confidence,
                agreement: d.agreement,
                suppressed: d.suppressed,
            }
        })
        .collect();

    // Sign consistency: re-derive the binary value from the projected
    // numeric proxy.
    for (binary, proxy) in sign_constraints {
        let proxy_value = categories
            .iter()
            .find(|c| c.category == proxy && !c.suppressed)
            .and_then(|c| c.value.as_numeric());
        let Some(proxy_value) = proxy_value else {
            continue;
        };
        if proxy_value.abs() <= tolerance {
            // A dead-even proxy carries no sign; leave the draft value.
            continue;
        }
        let derived = proxy_value > 0.0;
        if let Some(entry) = categories
            .iter_mut()
            .find(|c| c.category == binary && !c.suppressed)
        {
            if entry.value.as_binary() == Some(!derived) {
                warn!(
                    binary = %binary,
                    proxy = %proxy,
                    proxy_value,
                    "Binary category disagreed with projected proxy sign; re-derived"
                );
                entry.value = AssertionValue::Binary(derived);
                // The drafted confidence backed the opposite outcome.
                // Reflect it, floored at even odds since the projected
                // proxy now supports this side.
                entry.confidence = (1.0 - entry.confidence).max(0.5);
            } else if entry.value.as_binary().is_none() && !entry.suppressed {
                // Non-binary value in a sign constraint is a malformed
                // set; flag rather than guess.
                unresolved = true;
                unresolved_constraints.push(
                    Constraint::SignConsistency { binary, proxy }.label(),
                );
            }
        }
    }

    let total_adjustment: f64 = categories.iter().map(|c| c.delta * c.delta).sum();

    debug!(
        event_id = %draft.event_id,
        total_adjustment,
        unresolved,
        "Projected consensus"
    );

    FinalConsensus {
        event_id: draft.event_id.clone(),
        categories,
        unresolved,
        unresolved_constraints,
        total_adjustment,
    }
}

fn linear_row(constraint: &Constraint) -> LinearRow {
    match constraint {
        Constraint::PartsSumToWhole { parts, whole } => {
            let mut coefficients: Vec<(Category, f64)> =
                parts.iter().map(|&c| (c, 1.0)).collect();
            coefficients.push((*whole, -1.0));
            LinearRow {
                coefficients,
                rhs: 0.0,
                label: constraint.label(),
            }
        }
        Constraint::Difference {
            minuend,
            subtrahend,
            result,
        } => LinearRow {
            coefficients: vec![(*minuend, 1.0), (*subtrahend, -1.0), (*result, -1.0)],
            rhs: 0.0,
            label: constraint.label(),
        },
        Constraint::SignConsistency { .. } => {
            unreachable!("sign constraints are not linear rows")
        }
    }
}

/// Run the least-squares projection. Returns the projected vector and
/// the labels of constraints left unsatisfied (empty on success).
fn solve_projection(
    active: &[Category],
    draft: &[f64],
    rows: &[LinearRow],
    tolerance: f64,
) -> (Vec<f64>, Vec<String>) {
    if rows.is_empty() || active.is_empty() {
        return (draft.to_vec(), Vec::new());
    }

    // A is m×n over the active numeric categories.
    let m = rows.len();
    let a: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| {
            let mut dense = vec![0.0; active.len()];
            for (category, coefficient) in &row.coefficients {
                if let Some(i) = active.iter().position(|c| c == category) {
                    dense[i] += coefficient;
                }
            }
            dense
        })
        .collect();

    // Residual r = Ad − b.
    let residual: Vec<f64> = (0..m)
        .map(|i| {
            let ad: f64 = a[i].iter().zip(draft).map(|(c, d)| c * d).sum();
            ad - rows[i].rhs
        })
        .collect();

    // Normal system (AAᵀ)λ = r.
    let gram: Vec<Vec<f64>> = (0..m)
        .map(|i| {
            (0..m)
                .map(|j| a[i].iter().zip(&a[j]).map(|(x, y)| x * y).sum())
                .collect()
        })
        .collect();

    let Some(lambda) = solve_linear_system(gram, residual) else {
        warn!("Constraint normal system is singular; returning draft unprojected");
        return (
            draft.to_vec(),
            rows.iter().map(|r| r.label.clone()).collect(),
        );
    };

    // x = d − Aᵀλ.
    let mut projected = draft.to_vec();
    for (i, row) in a.iter().enumerate() {
        for (j, coefficient) in row.iter().enumerate() {
            projected[j] -= coefficient * lambda[i];
        }
    }

    // Verify feasibility; fall back wholesale if anything still violates.
    let violated: Vec<String> = rows
        .iter()
        .zip(&a)
        .filter_map(|(row, dense)| {
            let value: f64 = dense.iter().zip(&projected).map(|(c, x)| c * x).sum();
            if (value - row.rhs).abs() > tolerance {
                Some(row.label.clone())
            } else {
                None
            }
        })
        .collect();

    if violated.is_empty() {
        (projected, Vec::new())
    } else {
        warn!(
            violated = violated.len(),
            "Projection left constraints unsatisfied; returning draft unprojected"
        );
        (draft.to_vec(), violated)
    }
}

/// Gaussian elimination with partial pivoting over a small dense system.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < SINGULAR_EPS {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = b[row];
        for col in (row + 1)..n {
            sum -= a[row][col] * x[col];
        }
        x[row] = sum / a[row][row];
    }
    Some(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{CategoryDraft, ConsensusDraft};
    use crate::bundle::AssertionType;

    fn draft_from(values: &[(Category, AssertionValue)]) -> ConsensusDraft {
        let categories = Category::ALL
            .iter()
            .map(|&category| {
                let value = values
                    .iter()
                    .find(|(c, _)| *c == category)
                    .map(|(_, v)| v.clone());
                match value {
                    Some(value) => CategoryDraft {
                        category,
                        value,
                        confidence: 0.7,
                        agreement: 0.8,
                        contributors: Vec::new(),
                        suppressed: false,
                    },
                    None => CategoryDraft {
                        category,
                        value: match category.declared_type() {
                            AssertionType::Binary => AssertionValue::Binary(false),
                            AssertionType::Numeric => AssertionValue::Numeric(0.0),
                            AssertionType::Enumerated => {
                                AssertionValue::Enumerated(String::new())
                            }
                        },
                        confidence: 0.0,
                        agreement: 0.0,
                        contributors: Vec::new(),
                        suppressed: true,
                    },
                }
            })
            .collect();
        ConsensusDraft {
            event_id: "game-1".to_string(),
            categories,
        }
    }

    #[test]
    fn test_minimal_repair_scenario() {
        // home=21, away=17, total=40 violates home + away = total by 2.
        // The projector spreads the correction evenly: each value moves
        // by 2/3.
        let draft = draft_from(&[
            (Category::HomePoints, AssertionValue::Numeric(21.0)),
            (Category::AwayPoints, AssertionValue::Numeric(17.0)),
            (Category::TotalPoints, AssertionValue::Numeric(40.0)),
        ]);
        let constraints = ConstraintSet::new(vec![Constraint::PartsSumToWhole {
            parts: vec![Category::HomePoints, Category::AwayPoints],
            whole: Category::TotalPoints,
        }]);

        let final_consensus = project(&draft, &constraints);
        assert!(!final_consensus.unresolved);

        let home = final_consensus
            .category(Category::HomePoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();
        let away = final_consensus
            .category(Category::AwayPoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();
        let total = final_consensus
            .category(Category::TotalPoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();

        assert!((home + away - total).abs() < PROJECTION_TOLERANCE);
        assert!((home - (21.0 + 2.0 / 3.0)).abs() < 1e-9);
        assert!((away - (17.0 + 2.0 / 3.0)).abs() < 1e-9);
        assert!((total - (40.0 - 2.0 / 3.0)).abs() < 1e-9);
        // Minimal adjustment: 3 × (2/3)² = 4/3.
        assert!((final_consensus.total_adjustment - 4.0 / 3.0).abs() < 1e-9);
    }

    fn full_numeric_draft() -> ConsensusDraft {
        draft_from(&[
            (Category::Winner, AssertionValue::Binary(true)),
            (Category::Margin, AssertionValue::Numeric(4.0)),
            (Category::TotalPoints, AssertionValue::Numeric(44.0)),
            (Category::HomePoints, AssertionValue::Numeric(25.0)),
            (Category::AwayPoints, AssertionValue::Numeric(20.0)),
            (Category::FirstHalfPoints, AssertionValue::Numeric(20.0)),
            (Category::SecondHalfPoints, AssertionValue::Numeric(26.0)),
            (Category::Q1Points, AssertionValue::Numeric(10.0)),
            (Category::Q2Points, AssertionValue::Numeric(12.0)),
            (Category::Q3Points, AssertionValue::Numeric(11.0)),
            (Category::Q4Points, AssertionValue::Numeric(13.0)),
            (
                Category::GameScript,
                AssertionValue::Enumerated("back_and_forth".to_string()),
            ),
        ])
    }

    fn assert_game_constraints_hold(consensus: &FinalConsensus) {
        let value = |c: Category| {
            consensus
                .category(c)
                .unwrap()
                .value
                .as_numeric()
                .unwrap()
        };
        let total = value(Category::TotalPoints);
        assert!(
            (value(Category::HomePoints) + value(Category::AwayPoints) - total).abs()
                < PROJECTION_TOLERANCE
        );
        assert!(
            (value(Category::FirstHalfPoints) + value(Category::SecondHalfPoints) - total)
                .abs()
                < PROJECTION_TOLERANCE
        );
        assert!(
            (value(Category::Q1Points)
                + value(Category::Q2Points)
                + value(Category::Q3Points)
                + value(Category::Q4Points)
                - total)
                .abs()
                < PROJECTION_TOLERANCE
        );
        assert!(
            (value(Category::HomePoints) - value(Category::AwayPoints)
                - value(Category::Margin))
            .abs()
                < PROJECTION_TOLERANCE
        );
    }

    #[test]
    fn test_game_default_restores_all_constraints() {
        let draft = full_numeric_draft();
        let consensus = project(&draft, &ConstraintSet::game_default());
        assert!(!consensus.unresolved, "{:?}", consensus.unresolved_constraints);
        assert_game_constraints_hold(&consensus);
    }

    #[test]
    fn test_consistent_draft_is_untouched() {
        let draft = draft_from(&[
            (Category::HomePoints, AssertionValue::Numeric(24.0)),
            (Category::AwayPoints, AssertionValue::Numeric(20.0)),
            (Category::TotalPoints, AssertionValue::Numeric(44.0)),
            (Category::Margin, AssertionValue::Numeric(4.0)),
        ]);
        let constraints = ConstraintSet::new(vec![
            Constraint::PartsSumToWhole {
                parts: vec![Category::HomePoints, Category::AwayPoints],
                whole: Category::TotalPoints,
            },
            Constraint::Difference {
                minuend: Category::HomePoints,
                subtrahend: Category::AwayPoints,
                result: Category::Margin,
            },
        ]);

        let consensus = project(&draft, &constraints);
        assert!(consensus.total_adjustment < 1e-18);
        assert_eq!(
            consensus
                .category(Category::HomePoints)
                .unwrap()
                .value
                .as_numeric(),
            Some(24.0)
        );
    }

    #[test]
    fn test_winner_rederived_from_projected_margin() {
        // Draft says home wins but every numeric points the other way.
        let draft = draft_from(&[
            (Category::Winner, AssertionValue::Binary(true)),
            (Category::Margin, AssertionValue::Numeric(-6.0)),
            (Category::HomePoints, AssertionValue::Numeric(18.0)),
            (Category::AwayPoints, AssertionValue::Numeric(24.0)),
            (Category::TotalPoints, AssertionValue::Numeric(42.0)),
        ]);
        let constraints = ConstraintSet::new(vec![
            Constraint::Difference {
                minuend: Category::HomePoints,
                subtrahend: Category::AwayPoints,
                result: Category::Margin,
            },
            Constraint::SignConsistency {
                binary: Category::Winner,
                proxy: Category::Margin,
            },
        ]);

        let consensus = project(&draft, &constraints);
        let winner = consensus.category(Category::Winner).unwrap();
        assert_eq!(winner.value, AssertionValue::Binary(false));
        // The drafted 0.7 backed the losing side; the re-derived winner
        // must not inherit it.
        assert!((winner.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_flipped_winner_confidence_reflects_weak_draft() {
        // A draft barely leaning home (0.55) flips on a negative margin;
        // the reflected confidence floors at even odds.
        let mut draft = draft_from(&[
            (Category::Winner, AssertionValue::Binary(true)),
            (Category::Margin, AssertionValue::Numeric(-4.0)),
        ]);
        for category in &mut draft.categories {
            if category.category == Category::Winner {
                category.confidence = 0.55;
            }
        }
        let constraints = ConstraintSet::new(vec![Constraint::SignConsistency {
            binary: Category::Winner,
            proxy: Category::Margin,
        }]);

        let consensus = project(&draft, &constraints);
        let winner = consensus.category(Category::Winner).unwrap();
        assert_eq!(winner.value, AssertionValue::Binary(false));
        assert!((winner.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_margin_inside_tolerance_band_keeps_draft_winner() {
        let draft = draft_from(&[
            (Category::Winner, AssertionValue::Binary(true)),
            (Category::Margin, AssertionValue::Numeric(-0.1)),
        ]);
        let constraints = ConstraintSet::new(vec![Constraint::SignConsistency {
            binary: Category::Winner,
            proxy: Category::Margin,
        }]);

        // Default tolerance: -0.1 carries a real sign, winner flips.
        let strict = project(&draft, &constraints);
        assert_eq!(
            strict.category(Category::Winner).unwrap().value,
            AssertionValue::Binary(false)
        );

        // A wide tolerance treats the margin as dead even and keeps the
        // drafted winner and its confidence.
        let loose = project_with_tolerance(&draft, &constraints, 0.5);
        let winner = loose.category(Category::Winner).unwrap();
        assert_eq!(winner.value, AssertionValue::Binary(true));
        assert!((winner.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_winner_kept_when_margin_agrees() {
        let draft = draft_from(&[
            (Category::Winner, AssertionValue::Binary(true)),
            (Category::Margin, AssertionValue::Numeric(3.0)),
        ]);
        let constraints = ConstraintSet::new(vec![Constraint::SignConsistency {
            binary: Category::Winner,
            proxy: Category::Margin,
        }]);

        let consensus = project(&draft, &constraints);
        assert_eq!(
            consensus.category(Category::Winner).unwrap().value,
            AssertionValue::Binary(true)
        );
        assert!(!consensus.unresolved);
    }

    #[test]
    fn test_constraints_with_suppressed_categories_are_skipped() {
        // Quarters suppressed: the quarter-sum constraint must not fire,
        // but home/away/total still projects.
        let draft = draft_from(&[
            (Category::HomePoints, AssertionValue::Numeric(21.0)),
            (Category::AwayPoints, AssertionValue::Numeric(17.0)),
            (Category::TotalPoints, AssertionValue::Numeric(40.0)),
        ]);

        let consensus = project(&draft, &ConstraintSet::game_default());
        assert!(!consensus.unresolved);
        let home = consensus
            .category(Category::HomePoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();
        let away = consensus
            .category(Category::AwayPoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();
        let total = consensus
            .category(Category::TotalPoints)
            .unwrap()
            .value
            .as_numeric()
            .unwrap();
        assert!((home + away - total).abs() < PROJECTION_TOLERANCE);
        // Suppressed categories keep their draft values and deltas of zero.
        assert_eq!(consensus.category(Category::Q1Points).unwrap().delta, 0.0);
    }

    #[test]
    fn test_empty_constraint_set_returns_draft() {
        let draft = full_numeric_draft();
        let consensus = project(&draft, &ConstraintSet::new(Vec::new()));
        assert!(!consensus.unresolved);
        assert_eq!(consensus.total_adjustment, 0.0);
    }

    #[test]
    fn test_deltas_are_recorded_for_audit() {
        let draft = draft_from(&[
            (Category::HomePoints, AssertionValue::Numeric(21.0)),
            (Category::AwayPoints, AssertionValue::Numeric(17.0)),
            (Category::TotalPoints, AssertionValue::Numeric(40.0)),
        ]);
        let constraints = ConstraintSet::new(vec![Constraint::PartsSumToWhole {
            parts: vec![Category::HomePoints, Category::AwayPoints],
            whole: Category::TotalPoints,
        }]);

        let consensus = project(&draft, &constraints);
        let home = consensus.category(Category::HomePoints).unwrap();
        assert_eq!(home.draft_value, AssertionValue::Numeric(21.0));
        assert!((home.delta - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_solve_linear_system_simple() {
        // 2x + y = 5, x − y = 1 → x = 2, y = 1.
        let a = vec![vec![2.0, 1.0], vec![1.0, -1.0]];
        let b = vec![5.0, 1.0];
        let x = solve_linear_system(a, b).unwrap();
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_linear_system_singular() {
        let a = vec![vec![1.0, 1.0], vec![2.0, 2.0]];
        let b = vec![1.0, 3.0];
        assert!(solve_linear_system(a, b).is_none());
    }

    #[test]
    fn test_singular_gram_falls_back_to_draft() {
        // Duplicate constraints make AAᵀ singular; the projector must
        // return the draft flagged unresolved instead of panicking.
        let draft = draft_from(&[
            (Category::HomePoints, AssertionValue::Numeric(21.0)),
            (Category::AwayPoints, AssertionValue::Numeric(17.0)),
            (Category::TotalPoints, AssertionValue::Numeric(40.0)),
        ]);
        let row = Constraint::PartsSumToWhole {
            parts: vec![Category::HomePoints, Category::AwayPoints],
            whole: Category::TotalPoints,
        };
        let constraints = ConstraintSet::new(vec![row.clone(), row]);

        let consensus = project(&draft, &constraints);
        assert!(consensus.unresolved);
        assert_eq!(
            consensus
                .category(Category::HomePoints)
                .unwrap()
                .value
                .as_numeric(),
            Some(21.0)
        );
    }
}
