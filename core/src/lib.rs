//! fieldrule - Entity field value conditions
//!
//! A reusable boolean rule: "does this entity, of a chosen type and bundle,
//! carry a chosen field whose value matches the reference values captured for
//! it?"
//!
//! # Architecture
//!
//! Two flows share one persisted [`RuleConfiguration`]:
//!
//! - **Configuration time** (interactive, multi-round):
//!   [`ConfigurationSession`] → [`SelectionResolver`] → [`ValueCapture`].
//!   The resolver keeps the entity type → bundles → field cascade consistent
//!   with a [`SchemaCatalog`], discarding stale downstream state whenever an
//!   upstream level changes or drifts.
//! - **Evaluation time** (stateless, once per entity):
//!   [`ConditionEvaluator`] compares an [`EntitySnapshot`]'s live values with
//!   the captured values through a [`ValueComparator`].
//!
//! # Key Design Insights
//!
//! 1. **Stale selections are discarded, not narrowed.** Losing one stored
//!    bundle invalidates the whole bundle selection and everything below it.
//!
//! 2. **Captured values carry their context.** Values are reused only against
//!    the exact selection they were entered for.
//!
//! 3. **Evaluation fails closed.** Every unmet precondition answers `false`;
//!    structural breakage is reported by [`Condition::new`] at load time
//!    instead of being folded into a boolean.
//!
//! # Example
//!
//! ```
//! use fieldrule::prelude::*;
//!
//! let tags = FieldDescriptor::new("field_tags", "Tags").unlimited();
//! let entity = EntityFieldSnapshot::new("node", "article")
//!     .with_values(tags, ["A", "B", "C"]);
//!
//! let rule = RuleConfiguration::new()
//!     .with_entity_type("node")
//!     .with_bundles(["article", "page"])
//!     .with_field("field_tags")
//!     .with_compare_method(CompareMethod::MatchAll)
//!     .with_captured(CapturedValueList::of("value", ["A", "B"]));
//!
//! let condition = Condition::new(rule).unwrap();
//! assert!(condition.evaluate(&entity));
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod capture;
mod compare;
mod config;
mod evaluator;
mod resolver;
mod schema;
mod session;
mod snapshot;
mod trace;
mod value;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Data model
pub use config::{CaptureContext, CompareMethod, ConfigState, Level, RuleConfiguration};
pub use value::{CapturedValue, CapturedValueList};

// Collaborator seams
pub use schema::{
    BundleInfo, Cardinality, EntityGroup, EntityTypeInfo, FieldDescriptor, SchemaCatalog,
    SelectOption,
};
pub use snapshot::{EntityFieldSnapshot, EntitySnapshot, SnapshotField};

// Configuration time
pub use capture::{ValueCapture, ValueWidget};
pub use resolver::{LevelResolution, Repair, ResolutionPass, SelectionResolver};
pub use session::{Choice, ConfigurationSession, Round};

// Evaluation time
pub use compare::{MatchAll, MatchOne, StrictPositional, ValueComparator};
pub use evaluator::{Condition, ConditionEvaluator};

// Trace types
pub use trace::{ComparisonTrace, EvalTrace, Rejection};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use fieldrule::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CapturedValue,
        CapturedValueList,
        Choice,
        CompareMethod,
        Condition,
        ConditionEvaluator,
        ConfigState,
        ConfigurationSession,
        EntityFieldSnapshot,
        EntitySnapshot,
        EvalTrace,
        FieldDescriptor,
        Level,
        Rejection,
        Round,
        RuleConfiguration,
        RuleError,
        SchemaCatalog,
        SelectionResolver,
        ValueCapture,
        ValueWidget,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Property compared by the relaxed compare methods when a field does not
/// name one.
pub const DEFAULT_PRIMARY_PROPERTY: &str = "value";

/// Maximum number of captured values stored on one rule.
///
/// Evaluation cost is proportional to the number of captured values; checked
/// when values are captured and when a stored rule is loaded.
pub const MAX_CAPTURED_VALUES: usize = 256;

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from building, loading and repairing rule configurations.
///
/// None of these is ever produced by evaluation: a rule that cannot match
/// simply evaluates to `false`. These are caught at configuration or load
/// time. Fix the input and try again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// A level was registered twice in one resolution pass.
    #[error("level {level} registered twice in one resolution pass")]
    DuplicateLevel {
        /// The repeated level.
        level: Level,
    },

    /// A level was resolved or chosen before the levels above it.
    #[error("cannot resolve {level} before {missing} is set to a valid value")]
    UpstreamUnresolved {
        /// The level being resolved.
        level: Level,
        /// The first upstream level that is empty or invalid.
        missing: Level,
    },

    /// A stored rule breaks a structural invariant.
    #[error("inconsistent rule configuration: {reason}")]
    InconsistentConfiguration {
        /// What is inconsistent.
        reason: String,
    },

    /// A widget or command-line submission could not be read or applied.
    #[error("invalid submission: {reason}")]
    InvalidSubmission {
        /// What is wrong with it.
        reason: String,
    },

    /// A document could not be parsed or written.
    #[error("invalid {format}: {reason}")]
    Parse {
        /// `"JSON"` or `"YAML"`.
        format: &'static str,
        /// The underlying error message.
        reason: String,
    },

    /// A name (compare method, level) is not known.
    #[error("unknown {kind} \"{name}\", expected one of: {}", .available.join(", "))]
    UnknownName {
        /// What kind of name.
        kind: &'static str,
        /// The name given.
        name: String,
        /// Names that are known (for self-correcting error messages).
        available: Vec<String>,
    },

    /// More captured values than [`MAX_CAPTURED_VALUES`].
    #[error("rule captures {count} values, but maximum allowed is {max}")]
    TooManyValues {
        /// Actual count.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
}
