//! `ConditionEvaluator` — Does this entity satisfy this rule?
//!
//! Evaluation is a pure function of an [`EntitySnapshot`] and a
//! [`RuleConfiguration`]. It never mutates the rule, never fetches anything,
//! and fails closed: every unmet precondition answers `false`.
//!
//! # Steps (short-circuit on first failure)
//!
//! 1. rule has an entity type
//! 2. entity type matches
//! 3. rule selects bundles, and the entity's bundle is one of them
//! 4. rule names a field the entity carries
//! 5. values were captured for that field
//! 6. live values satisfy the compare method
//!
//! Negation is not part of this; [`Condition`] applies it on top.

use crate::{
    trace::ComparisonTrace, EntitySnapshot, EvalTrace, Rejection, RuleConfiguration, RuleError,
};

/// Stateless rule evaluator.
///
/// # Example
///
/// ```
/// use fieldrule::prelude::*;
///
/// let title = FieldDescriptor::new("title", "Title");
/// let entity = EntityFieldSnapshot::new("node", "article").with_values(title, ["Hello "]);
///
/// let rule = RuleConfiguration::new()
///     .with_entity_type("node")
///     .with_bundles(["article"])
///     .with_field("title")
///     .with_captured(CapturedValueList::of("value", ["Hello"]));
///
/// assert!(ConditionEvaluator::evaluate(&entity, &rule));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate `config` against `entity`. Total; never panics.
    pub fn evaluate<E: EntitySnapshot + ?Sized>(entity: &E, config: &RuleConfiguration) -> bool {
        Self::evaluate_with_trace(entity, config).matched
    }

    /// Evaluate with the deciding step recorded.
    #[must_use]
    pub fn evaluate_with_trace<E: EntitySnapshot + ?Sized>(
        entity: &E,
        config: &RuleConfiguration,
    ) -> EvalTrace {
        let trace = Self::run(entity, config);
        if let Some(reason) = &trace.rejection {
            tracing::trace!(
                entity_type = entity.entity_type(),
                bundle = entity.bundle(),
                %reason,
                "rule did not match"
            );
        }
        trace
    }

    fn run<E: EntitySnapshot + ?Sized>(entity: &E, config: &RuleConfiguration) -> EvalTrace {
        let Some(entity_type) = &config.entity_type else {
            return EvalTrace::rejected(Rejection::Unconfigured);
        };

        if entity.entity_type() != entity_type {
            return EvalTrace::rejected(Rejection::EntityTypeMismatch {
                expected: entity_type.clone(),
                actual: entity.entity_type().to_owned(),
            });
        }

        if config.entity_bundles.is_empty() {
            return EvalTrace::rejected(Rejection::NoBundles);
        }

        if !config.entity_bundles.contains(entity.bundle()) {
            return EvalTrace::rejected(Rejection::BundleMismatch {
                actual: entity.bundle().to_owned(),
            });
        }

        let Some((field, descriptor)) = config
            .entity_field
            .as_deref()
            .and_then(|f| entity.field(f).map(|d| (f, d)))
        else {
            return EvalTrace::rejected(Rejection::FieldMissing {
                field: config.entity_field.clone(),
            });
        };

        let Some(captured) = config.current_captured() else {
            return EvalTrace::rejected(Rejection::NoCapturedValues);
        };

        let live = entity.field_values(field);
        let primary = descriptor.primary_property.as_str();
        let matched = config
            .compare_method
            .comparator()
            .compare(&live, captured, primary);

        EvalTrace::compared(
            matched,
            ComparisonTrace {
                method: config.compare_method,
                primary_property: primary.to_owned(),
                live: live.property_values(primary).map(str::to_owned).collect(),
                captured: captured
                    .property_values(primary)
                    .map(str::to_owned)
                    .collect(),
            },
        )
    }
}

/// A loaded rule: validated once, evaluated many times, negation applied.
///
/// # INV: unconfigured rules are inert
///
/// A rule without an entity type evaluates to `false` whether or not it is
/// negated. A configured rule that no longer fits the entity (field gone,
/// bundle dropped) is a non-match, so negating it yields `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    config: RuleConfiguration,
}

impl Condition {
    /// Load a rule.
    ///
    /// # Errors
    ///
    /// Returns the [`RuleConfiguration::validate`] error for structurally
    /// broken rules. These are programming errors in whatever stored the
    /// rule; they are surfaced here rather than folded into `false`.
    pub fn new(config: RuleConfiguration) -> Result<Self, RuleError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The underlying rule.
    #[must_use]
    pub fn config(&self) -> &RuleConfiguration {
        &self.config
    }

    /// Evaluate against an entity, applying negation.
    pub fn evaluate<E: EntitySnapshot + ?Sized>(&self, entity: &E) -> bool {
        self.evaluate_with_trace(entity).0
    }

    /// Evaluate, returning the final answer and the evaluator's trace.
    pub fn evaluate_with_trace<E: EntitySnapshot + ?Sized>(&self, entity: &E) -> (bool, EvalTrace) {
        let trace = ConditionEvaluator::evaluate_with_trace(entity, &self.config);
        let result = self.config.is_configured() && (trace.matched != self.config.negate);
        (result, trace)
    }

    /// Human summary of the rule.
    #[must_use]
    pub fn summary(&self) -> String {
        self.config.summary()
    }
}
