//! Structural and semantic contract checks for one expert's bundle.
//!
//! A single pass collects every violation rather than short-circuiting,
//! so the resulting issue list can be fed back verbatim as repair
//! instructions for the next generation call.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bundle::{AssertionType, Bundle, Category, BUNDLE_SIZE};

/// A single contract violation found in a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ValidationIssue {
    /// Summary field out of range or inconsistent.
    SummaryInvalid { detail: String },
    /// Assertion count differs from the fixed bundle size.
    WrongAssertionCount { expected: usize, got: usize },
    /// A category from the closed set has no assertion.
    MissingCategory { category: Category },
    /// A category appears more than once.
    DuplicateCategory { category: Category },
    /// The declared type does not match the category's contract type.
    DeclaredTypeMismatch {
        category: Category,
        expected: AssertionType,
        declared: AssertionType,
    },
    /// The carried value's type does not match the declared type.
    ValueTypeMismatch {
        category: Category,
        declared: AssertionType,
        actual: AssertionType,
    },
    /// Enumerated value outside the allowed set.
    EnumValueNotAllowed { category: Category, value: String },
    /// Confidence outside [0, 1].
    ConfidenceOutOfRange { category: Category, confidence: f64 },
    /// Stake hint is negative or non-finite.
    InvalidStake { category: Category, stake: f64 },
}

impl fmt::Display for ValidationIssue {
    /// Rendered as an imperative repair instruction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::SummaryInvalid { detail } => {
                write!(f, "fix the bundle summary: {detail}")
            }
            ValidationIssue::WrongAssertionCount { expected, got } => write!(
                f,
                "bundle must contain exactly {expected} assertions, got {got}"
            ),
            ValidationIssue::MissingCategory { category } => {
                write!(f, "add the missing assertion for category '{category}'")
            }
            ValidationIssue::DuplicateCategory { category } => {
                write!(f, "remove duplicate assertions for category '{category}'")
            }
            ValidationIssue::DeclaredTypeMismatch {
                category,
                expected,
                declared,
            } => write!(
                f,
                "category '{category}' must declare type '{expected}', not '{declared}'"
            ),
            ValidationIssue::ValueTypeMismatch {
                category,
                declared,
                actual,
            } => write!(
                f,
                "category '{category}' declares type '{declared}' but carries a '{actual}' value"
            ),
            ValidationIssue::EnumValueNotAllowed { category, value } => write!(
                f,
                "category '{category}' value '{value}' is not in the allowed set"
            ),
            ValidationIssue::ConfidenceOutOfRange {
                category,
                confidence,
            } => write!(
                f,
                "category '{category}' confidence {confidence} must be within [0, 1]"
            ),
            ValidationIssue::InvalidStake { category, stake } => write!(
                f,
                "category '{category}' stake {stake} must be finite and >= 0"
            ),
        }
    }
}

/// Outcome of validating one bundle. Zero issues means valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Issue texts formatted as repair instructions for the next
    /// generation call.
    pub fn repair_instructions(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }
}

/// Validate a bundle against the fixed contract.
///
/// Checks run in order: summary, cardinality, closed category set,
/// declared/actual type agreement, confidence range, stake range. All
/// violations are collected in one pass.
pub fn validate(bundle: &Bundle) -> ValidationReport {
    let mut issues = Vec::new();

    check_summary(bundle, &mut issues);

    if bundle.assertions.len() != BUNDLE_SIZE {
        issues.push(ValidationIssue::WrongAssertionCount {
            expected: BUNDLE_SIZE,
            got: bundle.assertions.len(),
        });
    }

    check_category_set(bundle, &mut issues);

    for assertion in &bundle.assertions {
        let category = assertion.category;
        let expected = category.declared_type();

        if assertion.declared_type != expected {
            issues.push(ValidationIssue::DeclaredTypeMismatch {
                category,
                expected,
                declared: assertion.declared_type,
            });
        }

        let actual = assertion.value.actual_type();
        if actual != assertion.declared_type {
            issues.push(ValidationIssue::ValueTypeMismatch {
                category,
                declared: assertion.declared_type,
                actual,
            });
        } else if let Some(allowed) = category.allowed_values() {
            if let Some(value) = assertion.value.as_enumerated() {
                if !allowed.contains(&value) {
                    issues.push(ValidationIssue::EnumValueNotAllowed {
                        category,
                        value: value.to_string(),
                    });
                }
            }
        }

        if !(0.0..=1.0).contains(&assertion.confidence) || assertion.confidence.is_nan() {
            issues.push(ValidationIssue::ConfidenceOutOfRange {
                category,
                confidence: assertion.confidence,
            });
        }

        if !assertion.stake.is_finite() || assertion.stake < 0.0 {
            issues.push(ValidationIssue::InvalidStake {
                category,
                stake: assertion.stake,
            });
        }
    }

    ValidationReport {
        valid: issues.is_empty(),
        issues,
    }
}

fn check_summary(bundle: &Bundle, issues: &mut Vec<ValidationIssue>) {
    let summary = &bundle.summary;

    if summary.projected_winner != "home" && summary.projected_winner != "away" {
        issues.push(ValidationIssue::SummaryInvalid {
            detail: format!(
                "projected_winner must be 'home' or 'away', got '{}'",
                summary.projected_winner
            ),
        });
    }

    for (name, value) in [
        ("home_win_probability", summary.home_win_probability),
        ("away_win_probability", summary.away_win_probability),
        ("overall_confidence", summary.overall_confidence),
    ] {
        if !(0.0..=1.0).contains(&value) || value.is_nan() {
            issues.push(ValidationIssue::SummaryInvalid {
                detail: format!("{name} must be within [0, 1], got {value}"),
            });
        }
    }

    let prob_sum = summary.home_win_probability + summary.away_win_probability;
    if (prob_sum - 1.0).abs() > 0.01 {
        issues.push(ValidationIssue::SummaryInvalid {
            detail: format!("win probabilities must sum to 1.0, got {prob_sum}"),
        });
    }
}

fn check_category_set(bundle: &Bundle, issues: &mut Vec<ValidationIssue>) {
    let mut seen: HashSet<Category> = HashSet::new();

    for assertion in &bundle.assertions {
        if !seen.insert(assertion.category) {
            issues.push(ValidationIssue::DuplicateCategory {
                category: assertion.category,
            });
        }
    }

    for category in Category::ALL {
        if !seen.contains(&category) {
            issues.push(ValidationIssue::MissingCategory { category });
        }
    }
}
