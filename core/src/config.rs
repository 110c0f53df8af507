//! `RuleConfiguration` — The persisted rule
//!
//! A rule names an entity type, one or more of its bundles, a field shared by
//! those bundles, the reference values captured for that field, and how to
//! compare them. It is built incrementally by a
//! [`ConfigurationSession`](crate::ConfigurationSession) and read-only once
//! stored.
//!
//! # Wire form
//!
//! ```yaml
//! entity_type: node
//! entity_bundles: [article, page]
//! entity_field: field_tags
//! compare_method: match_all
//! captured_values: [{ target_id: "4" }, { target_id: "7" }]
//! captured_against: { entity_type: node, entity_bundles: [article, page], entity_field: field_tags }
//! negate: false
//! ```
//!
//! Older stored rules are read as well: `entity_bundle` as a single string or
//! a keyed map, and captured values nested under `form_display.widget`.
//! Writing always produces the form above.

use crate::{CapturedValueList, RuleError, MAX_CAPTURED_VALUES};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Compare method
// ═══════════════════════════════════════════════════════════════════════════════

/// How live values are compared against captured values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareMethod {
    /// Every captured primary value must appear among the live values.
    #[default]
    MatchAll,
    /// At least one captured primary value must appear among the live values.
    MatchOne,
    /// Same length, and every captured property equal at the same delta.
    StrictPositional,
}

impl CompareMethod {
    /// All methods, in display order.
    pub const ALL: [Self; 3] = [Self::MatchAll, Self::MatchOne, Self::StrictPositional];

    /// Methods offered for multi-valued fields.
    pub const RELAXED: [Self; 2] = [Self::MatchAll, Self::MatchOne];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MatchAll => "match_all",
            Self::MatchOne => "match_one",
            Self::StrictPositional => "strict_positional",
        }
    }

    /// Human label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::MatchAll => "Match all",
            Self::MatchOne => "Match one",
            Self::StrictPositional => "Match exactly, in order",
        }
    }
}

impl fmt::Display for CompareMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareMethod {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| RuleError::UnknownName {
                kind: "compare method",
                name: s.to_owned(),
                available: Self::ALL.iter().map(|m| m.as_str().to_owned()).collect(),
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Cascade levels and states
// ═══════════════════════════════════════════════════════════════════════════════

/// A level of the selection cascade. Ordered: upstream levels compare less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Which entity type.
    EntityType,
    /// Which bundle(s) of that type.
    EntityBundle,
    /// Which field shared by those bundles.
    EntityField,
}

impl Level {
    /// All levels, upstream first.
    pub const ALL: [Self; 3] = [Self::EntityType, Self::EntityBundle, Self::EntityField];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EntityType => "entity_type",
            Self::EntityBundle => "entity_bundle",
            Self::EntityField => "entity_field",
        }
    }

    /// Human label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::EntityType => "Entity type",
            Self::EntityBundle => "Entity bundle",
            Self::EntityField => "Entity field",
        }
    }

    /// Whether more than one value may be selected.
    #[must_use]
    pub fn is_multiple(self) -> bool {
        self == Self::EntityBundle
    }

    /// Levels that must be resolved before this one.
    #[must_use]
    pub fn upstream(self) -> &'static [Level] {
        match self {
            Self::EntityType => &[],
            Self::EntityBundle => &[Self::EntityType],
            Self::EntityField => &[Self::EntityType, Self::EntityBundle],
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entity_type" => Ok(Self::EntityType),
            "entity_bundle" | "entity_bundles" => Ok(Self::EntityBundle),
            "entity_field" => Ok(Self::EntityField),
            other => Err(RuleError::UnknownName {
                kind: "level",
                name: other.to_owned(),
                available: Self::ALL.iter().map(|l| l.as_str().to_owned()).collect(),
            }),
        }
    }
}

/// Where a configuration sits in the cascade.
///
/// ```text
/// Empty → TypeChosen → BundlesChosen → FieldChosen → ValuesCaptured
/// ```
///
/// Only `ValuesCaptured` rules can ever evaluate to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigState {
    /// Nothing chosen.
    Empty,
    /// Entity type chosen.
    TypeChosen,
    /// Bundle(s) chosen.
    BundlesChosen,
    /// Field chosen, no values captured against it.
    FieldChosen,
    /// Values captured against the chosen field.
    ValuesCaptured,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Capture context
// ═══════════════════════════════════════════════════════════════════════════════

/// The selection that captured values were recorded against.
///
/// Captured values are only meaningful for the exact field they were entered
/// for; a different type, bundle set or field invalidates them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureContext {
    /// Entity type at capture time.
    pub entity_type: String,
    /// Bundles at capture time.
    pub entity_bundles: BTreeSet<String>,
    /// Field at capture time.
    pub entity_field: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rule configuration
// ═══════════════════════════════════════════════════════════════════════════════

/// A stored entity field condition.
///
/// # INV: cascade order
///
/// A level is only set when every upstream level is set. Checked by
/// [`validate`](Self::validate); the resolver additionally checks that every
/// set level is still valid against the live catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRuleConfiguration")]
pub struct RuleConfiguration {
    /// Entity type id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    /// Selected bundle ids. Empty blocks the rest of the cascade.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub entity_bundles: BTreeSet<String>,

    /// Field id, present on every selected bundle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_field: Option<String>,

    /// Comparison policy.
    pub compare_method: CompareMethod,

    /// Reference values. `None` means nothing was ever captured, which is
    /// different from capturing an empty list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_values: Option<CapturedValueList>,

    /// Selection the captured values belong to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_against: Option<CaptureContext>,

    /// Invert the final result.
    pub negate: bool,
}

impl RuleConfiguration {
    /// An empty rule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entity type (builder pattern).
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the bundles (builder pattern).
    #[must_use]
    pub fn with_bundles<S: Into<String>>(mut self, bundles: impl IntoIterator<Item = S>) -> Self {
        self.entity_bundles = bundles.into_iter().map(Into::into).collect();
        self
    }

    /// Set the field (builder pattern).
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.entity_field = Some(field.into());
        self
    }

    /// Set the compare method (builder pattern).
    #[must_use]
    pub fn with_compare_method(mut self, method: CompareMethod) -> Self {
        self.compare_method = method;
        self
    }

    /// Record captured values against the current selection (builder pattern).
    #[must_use]
    pub fn with_captured(mut self, values: CapturedValueList) -> Self {
        self.captured_against = self.selection_context();
        self.captured_values = Some(values);
        self
    }

    /// Set negation (builder pattern).
    #[must_use]
    pub fn negated(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    /// Returns `true` once an entity type is chosen.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.entity_type.is_some()
    }

    /// The values stored at a level (at most one for single-valued levels).
    #[must_use]
    pub fn selected(&self, level: Level) -> Vec<String> {
        match level {
            Level::EntityType => self.entity_type.iter().cloned().collect(),
            Level::EntityBundle => self.entity_bundles.iter().cloned().collect(),
            Level::EntityField => self.entity_field.iter().cloned().collect(),
        }
    }

    /// Returns `true` if the level holds a value.
    #[must_use]
    pub fn is_set(&self, level: Level) -> bool {
        match level {
            Level::EntityType => self.entity_type.is_some(),
            Level::EntityBundle => !self.entity_bundles.is_empty(),
            Level::EntityField => self.entity_field.is_some(),
        }
    }

    /// Clear `level` and everything downstream of it.
    ///
    /// Clearing the bundle level also resets the compare method; clearing
    /// only the field keeps it.
    pub fn discard_from(&mut self, level: Level) {
        if level <= Level::EntityType {
            self.entity_type = None;
        }
        if level <= Level::EntityBundle {
            self.entity_bundles.clear();
            self.compare_method = CompareMethod::default();
        }
        self.entity_field = None;
        self.captured_values = None;
        self.captured_against = None;
    }

    /// The context captured values would be recorded against right now.
    #[must_use]
    pub fn selection_context(&self) -> Option<CaptureContext> {
        match (&self.entity_type, &self.entity_field) {
            (Some(entity_type), Some(entity_field)) if !self.entity_bundles.is_empty() => {
                Some(CaptureContext {
                    entity_type: entity_type.clone(),
                    entity_bundles: self.entity_bundles.clone(),
                    entity_field: entity_field.clone(),
                })
            }
            _ => None,
        }
    }

    /// Captured values, if they were recorded against the current selection.
    #[must_use]
    pub fn current_captured(&self) -> Option<&CapturedValueList> {
        let current = self.selection_context()?;
        match (&self.captured_values, &self.captured_against) {
            (Some(values), Some(context)) if *context == current => Some(values),
            _ => None,
        }
    }

    /// Position in the configuration state machine.
    #[must_use]
    pub fn state(&self) -> ConfigState {
        if self.entity_type.is_none() {
            ConfigState::Empty
        } else if self.entity_bundles.is_empty() {
            ConfigState::TypeChosen
        } else if self.entity_field.is_none() {
            ConfigState::BundlesChosen
        } else if self.current_captured().is_none() {
            ConfigState::FieldChosen
        } else {
            ConfigState::ValuesCaptured
        }
    }

    /// Check the structural invariants of a stored rule.
    ///
    /// This does not consult a catalog; staleness against the live schema is
    /// the resolver's job.
    ///
    /// # Errors
    ///
    /// - [`RuleError::InconsistentConfiguration`] if a level is set while an
    ///   upstream level is empty, or values are captured with no context.
    /// - [`RuleError::TooManyValues`] if more than [`MAX_CAPTURED_VALUES`]
    ///   values are captured.
    pub fn validate(&self) -> Result<(), RuleError> {
        for level in Level::ALL {
            if !self.is_set(level) {
                continue;
            }
            if let Some(missing) = level.upstream().iter().find(|up| !self.is_set(**up)) {
                return Err(RuleError::InconsistentConfiguration {
                    reason: format!("{level} is set but upstream {missing} is empty"),
                });
            }
        }

        if let Some(values) = &self.captured_values {
            if self.entity_field.is_none() {
                return Err(RuleError::InconsistentConfiguration {
                    reason: "captured_values is set but entity_field is empty".into(),
                });
            }
            if self.captured_against.is_none() {
                return Err(RuleError::InconsistentConfiguration {
                    reason: "captured_values is set without captured_against".into(),
                });
            }
            if values.len() > MAX_CAPTURED_VALUES {
                return Err(RuleError::TooManyValues {
                    count: values.len(),
                    max: MAX_CAPTURED_VALUES,
                });
            }
        }

        Ok(())
    }

    /// One-line human summary of the selection.
    #[must_use]
    pub fn summary(&self) -> String {
        let or_none = |v: Option<&String>| v.map_or("(none)", String::as_str).to_owned();
        let bundles = if self.entity_bundles.is_empty() {
            "(none)".to_owned()
        } else {
            self.entity_bundles
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "Entity type: {}, entity bundle: {}, entity field: {}",
            or_none(self.entity_type.as_ref()),
            bundles,
            or_none(self.entity_field.as_ref()),
        )
    }

    /// Parse a stored rule from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the document is not a rule.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|e| RuleError::Parse {
            format: "JSON",
            reason: e.to_string(),
        })
    }

    /// Parse a stored rule from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the document is not a rule.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        serde_yaml::from_str(yaml).map_err(|e| RuleError::Parse {
            format: "YAML",
            reason: e.to_string(),
        })
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if serialization fails.
    pub fn to_json(&self) -> Result<String, RuleError> {
        serde_json::to_string_pretty(self).map_err(|e| RuleError::Parse {
            format: "JSON",
            reason: e.to_string(),
        })
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, RuleError> {
        serde_yaml::to_string(self).map_err(|e| RuleError::Parse {
            format: "YAML",
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for RuleConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Backward-compatible read form
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct RawRuleConfiguration {
    #[serde(default, deserialize_with = "blank_as_none")]
    entity_type: Option<String>,
    #[serde(default, alias = "entity_bundle")]
    entity_bundles: Option<RawBundles>,
    #[serde(default, deserialize_with = "blank_as_none")]
    entity_field: Option<String>,
    #[serde(default)]
    compare_method: Option<CompareMethod>,
    #[serde(default)]
    captured_values: Option<CapturedValueList>,
    #[serde(default)]
    form_display: Option<LegacyFormDisplay>,
    #[serde(default)]
    captured_against: Option<CaptureContext>,
    #[serde(default)]
    negate: bool,
}

/// Bundle selection as stored by different revisions.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBundles {
    One(String),
    Many(Vec<String>),
    Keyed(BTreeMap<String, String>),
}

#[derive(Deserialize)]
struct LegacyFormDisplay {
    #[serde(default)]
    widget: Option<CapturedValueList>,
}

fn blank_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl From<RawRuleConfiguration> for RuleConfiguration {
    fn from(raw: RawRuleConfiguration) -> Self {
        let single_bundle_form = matches!(raw.entity_bundles, Some(RawBundles::One(_)));

        let entity_bundles: BTreeSet<String> = match raw.entity_bundles {
            None => BTreeSet::new(),
            Some(RawBundles::One(b)) => std::iter::once(b).collect(),
            Some(RawBundles::Many(bs)) => bs.into_iter().collect(),
            Some(RawBundles::Keyed(map)) => map.into_values().collect(),
        }
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .collect();

        let compare_method = raw.compare_method.unwrap_or(if single_bundle_form {
            CompareMethod::StrictPositional
        } else {
            CompareMethod::MatchAll
        });

        let captured_values = raw
            .captured_values
            .or_else(|| raw.form_display.map(|f| f.widget.unwrap_or_default()));

        let mut config = Self {
            entity_type: raw.entity_type,
            entity_bundles,
            entity_field: raw.entity_field,
            compare_method,
            captured_values,
            captured_against: raw.captured_against,
            negate: raw.negate,
        };

        // Rules stored before the capture context existed were captured
        // against whatever they select.
        if config.captured_values.is_some() && config.captured_against.is_none() {
            config.captured_against = config.selection_context();
        }

        config
    }
}
