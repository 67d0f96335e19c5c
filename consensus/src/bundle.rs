//! Assertion bundle data model.
//!
//! A `Bundle` is one expert's complete, fixed-cardinality set of typed
//! assertions about a single game, plus an overall summary. Bundles are
//! immutable once produced; corrections happen by generating a new bundle,
//! never by mutating an existing one.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for an expert persona. Owned by the external registry.
pub type ExpertId = String;

/// Identifier for a game/event.
pub type EventId = String;

/// The closed forecast category set, in canonical bundle order.
///
/// Every valid bundle carries exactly one assertion per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Does the home side win? Paired with the sign of `Margin`.
    Winner,
    /// Home score minus away score (signed).
    Margin,
    /// Combined final score.
    TotalPoints,
    HomePoints,
    AwayPoints,
    FirstHalfPoints,
    SecondHalfPoints,
    Q1Points,
    Q2Points,
    Q3Points,
    Q4Points,
    /// Narrative shape of the game (enumerated).
    GameScript,
}

impl Category {
    /// All categories in canonical order. Bundles must carry exactly these.
    pub const ALL: [Category; BUNDLE_SIZE] = [
        Category::Winner,
        Category::Margin,
        Category::TotalPoints,
        Category::HomePoints,
        Category::AwayPoints,
        Category::FirstHalfPoints,
        Category::SecondHalfPoints,
        Category::Q1Points,
        Category::Q2Points,
        Category::Q3Points,
        Category::Q4Points,
        Category::GameScript,
    ];

    /// The declared assertion type for this category.
    pub fn declared_type(self) -> AssertionType {
        match self {
            Category::Winner => AssertionType::Binary,
            Category::GameScript => AssertionType::Enumerated,
            _ => AssertionType::Numeric,
        }
    }

    /// Allowed values for enumerated categories; `None` for other types.
    pub fn allowed_values(self) -> Option<&'static [&'static str]> {
        match self {
            Category::GameScript => Some(GAME_SCRIPT_VALUES),
            _ => None,
        }
    }

    /// Stable index into `Category::ALL`.
    pub fn index(self) -> usize {
        Category::ALL
            .iter()
            .position(|c| *c == self)
            .expect("category is a member of ALL")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Winner => "winner",
            Category::Margin => "margin",
            Category::TotalPoints => "total_points",
            Category::HomePoints => "home_points",
            Category::AwayPoints => "away_points",
            Category::FirstHalfPoints => "first_half_points",
            Category::SecondHalfPoints => "second_half_points",
            Category::Q1Points => "q1_points",
            Category::Q2Points => "q2_points",
            Category::Q3Points => "q3_points",
            Category::Q4Points => "q4_points",
            Category::GameScript => "game_script",
        };
        write!(f, "{name}")
    }
}

/// Fixed assertion count per bundle (the N of the bundle contract).
pub const BUNDLE_SIZE: usize = 12;

/// Allowed values for the `game_script` enumerated category.
pub const GAME_SCRIPT_VALUES: &[&str] =
    &["wire_to_wire", "back_and_forth", "comeback", "blowout"];

/// Declared value type of an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionType {
    Binary,
    Numeric,
    Enumerated,
}

impl fmt::Display for AssertionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionType::Binary => write!(f, "binary"),
            AssertionType::Numeric => write!(f, "numeric"),
            AssertionType::Enumerated => write!(f, "enumerated"),
        }
    }
}

/// A typed assertion value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionValue {
    Binary(bool),
    Numeric(f64),
    Enumerated(String),
}

impl AssertionValue {
    /// The actual type of the carried value.
    pub fn actual_type(&self) -> AssertionType {
        match self {
            AssertionValue::Binary(_) => AssertionType::Binary,
            AssertionValue::Numeric(_) => AssertionType::Numeric,
            AssertionValue::Enumerated(_) => AssertionType::Enumerated,
        }
    }

    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            AssertionValue::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<bool> {
        match self {
            AssertionValue::Binary(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_enumerated(&self) -> Option<&str> {
        match self {
            AssertionValue::Enumerated(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

/// A single typed prediction within a bundle. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    pub category: Category,
    /// The type the expert declared; must match the value's actual type.
    #[serde(rename = "type")]
    pub declared_type: AssertionType,
    pub value: AssertionValue,
    /// Expert's confidence in this assertion, in [0, 1].
    pub confidence: f64,
    /// Optional stake/weight hint, >= 0. Defaults to 1.0.
    #[serde(default = "default_stake")]
    pub stake: f64,
    /// Memory snippet ids cited as evidence.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

fn default_stake() -> f64 {
    1.0
}

impl Assertion {
    pub fn numeric(category: Category, value: f64, confidence: f64) -> Self {
        Self {
            category,
            declared_type: AssertionType::Numeric,
            value: AssertionValue::Numeric(value),
            confidence,
            stake: 1.0,
            evidence: Vec::new(),
        }
    }

    pub fn binary(category: Category, value: bool, confidence: f64) -> Self {
        Self {
            category,
            declared_type: AssertionType::Binary,
            value: AssertionValue::Binary(value),
            confidence,
            stake: 1.0,
            evidence: Vec::new(),
        }
    }

    pub fn enumerated(category: Category, value: &str, confidence: f64) -> Self {
        Self {
            category,
            declared_type: AssertionType::Enumerated,
            value: AssertionValue::Enumerated(value.to_string()),
            confidence,
            stake: 1.0,
            evidence: Vec::new(),
        }
    }

    pub fn with_evidence(mut self, evidence: Vec<String>) -> Self {
        self.evidence = evidence;
        self
    }
}

/// Overall summary carried alongside the per-category assertions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleSummary {
    /// The side the expert expects to win ("home" or "away").
    pub projected_winner: String,
    /// Probability the home side wins, in [0, 1].
    pub home_win_probability: f64,
    /// Probability the away side wins, in [0, 1].
    pub away_win_probability: f64,
    /// Expert's overall confidence across the bundle, in [0, 1].
    pub overall_confidence: f64,
}

/// One expert's complete forecast for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub expert_id: ExpertId,
    pub event_id: EventId,
    pub summary: BundleSummary,
    /// Exactly `BUNDLE_SIZE` assertions, one per category, in canonical order.
    pub assertions: Vec<Assertion>,
    /// True when this bundle was synthesized as a degraded fallback.
    #[serde(default)]
    pub degraded: bool,
    /// Repair iterations consumed before this bundle validated.
    #[serde(default)]
    pub repair_iterations: u32,
}

impl Bundle {
    /// Look up the assertion for a category, if present.
    pub fn assertion(&self, category: Category) -> Option<&Assertion> {
        self.assertions.iter().find(|a| a.category == category)
    }

    /// Synthesize a minimal schema-valid bundle with placeholder values.
    ///
    /// Used when generation fails or budgets run out so that downstream
    /// aggregation never receives a malformed or short bundle. Placeholder
    /// confidences are zero so the bundle carries no aggregation influence
    /// beyond keeping the expert present in telemetry.
    pub fn fallback(expert_id: &str, event_id: &str) -> Self {
        let assertions = Category::ALL
            .iter()
            .map(|&category| match category.declared_type() {
                AssertionType::Binary => Assertion::binary(category, true, 0.0),
                AssertionType::Numeric => Assertion::numeric(category, 0.0, 0.0),
                AssertionType::Enumerated => {
                    let value = category
                        .allowed_values()
                        .and_then(|vals| vals.first().copied())
                        .unwrap_or("unknown");
                    Assertion::enumerated(category, value, 0.0)
                }
            })
            .collect();

        Self {
            expert_id: expert_id.to_string(),
            event_id: event_id.to_string(),
            summary: BundleSummary {
                projected_winner: "home".to_string(),
                home_win_probability: 0.5,
                away_win_probability: 0.5,
                overall_confidence: 0.0,
            },
            assertions,
            degraded: true,
            repair_iterations: 0,
        }
    }
}
