//! Evaluation trace types for debugging rule behavior.
//!
//! [`ConditionEvaluator::evaluate_with_trace`](crate::ConditionEvaluator::evaluate_with_trace)
//! reports the step that decided the result instead of a bare boolean. Use it
//! to answer "why does this rule never match?".
//!
//! # INV: `matched` == `evaluate()` result
//!
//! [`EvalTrace::matched`] always equals what
//! [`ConditionEvaluator::evaluate`](crate::ConditionEvaluator::evaluate) returns
//! for the same input.
//!
//! # Example
//!
//! ```ignore
//! let trace = ConditionEvaluator::evaluate_with_trace(&entity, &rule);
//! if let Some(reason) = trace.rejection {
//!     eprintln!("no match: {reason}");
//! }
//! ```

use crate::CompareMethod;
use serde::Serialize;
use std::fmt;

/// Why an entity did not satisfy a rule.
///
/// Every variant is a valid negative answer, never an error. The first three
/// describe an incomplete rule, the next two a schema that drifted away from
/// the rule, the last a genuine value mismatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    /// The rule has no entity type.
    Unconfigured,
    /// The entity is of another type.
    EntityTypeMismatch {
        /// Type the rule expects.
        expected: String,
        /// Type of the entity.
        actual: String,
    },
    /// The rule selects no bundle.
    NoBundles,
    /// The entity's bundle is not selected.
    BundleMismatch {
        /// Bundle of the entity.
        actual: String,
    },
    /// The rule has no field, or the entity does not carry it.
    FieldMissing {
        /// Field the rule names, if any.
        field: Option<String>,
    },
    /// Nothing was ever captured for the field.
    NoCapturedValues,
    /// Values were compared and did not satisfy the compare method.
    ValuesMismatch,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured => f.write_str("rule has no entity type"),
            Self::EntityTypeMismatch { expected, actual } => {
                write!(f, "entity type is \"{actual}\", rule expects \"{expected}\"")
            }
            Self::NoBundles => f.write_str("rule selects no bundle"),
            Self::BundleMismatch { actual } => {
                write!(f, "bundle \"{actual}\" is not selected by the rule")
            }
            Self::FieldMissing { field: Some(field) } => {
                write!(f, "entity has no field \"{field}\"")
            }
            Self::FieldMissing { field: None } => f.write_str("rule has no field"),
            Self::NoCapturedValues => f.write_str("no values were captured for the field"),
            Self::ValuesMismatch => f.write_str("field values do not match"),
        }
    }
}

/// The value comparison that was performed, if evaluation got that far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonTrace {
    /// Method used.
    pub method: CompareMethod,
    /// Property compared by the relaxed methods.
    pub primary_property: String,
    /// Live primary values, in delta order.
    pub live: Vec<String>,
    /// Captured primary values, in delta order.
    pub captured: Vec<String>,
}

/// Trace of one rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvalTrace {
    /// The evaluator's answer (before caller-level negation).
    pub matched: bool,
    /// Why it did not match; `None` iff `matched`.
    pub rejection: Option<Rejection>,
    /// The comparison, when preconditions passed.
    pub comparison: Option<ComparisonTrace>,
}

impl EvalTrace {
    pub(crate) fn rejected(reason: Rejection) -> Self {
        Self {
            matched: false,
            rejection: Some(reason),
            comparison: None,
        }
    }

    pub(crate) fn compared(matched: bool, comparison: ComparisonTrace) -> Self {
        Self {
            matched,
            rejection: (!matched).then_some(Rejection::ValuesMismatch),
            comparison: Some(comparison),
        }
    }

    /// Returns `true` if a precondition (not the comparison) rejected the entity.
    #[must_use]
    pub fn rejected_early(&self) -> bool {
        self.comparison.is_none()
    }
}
