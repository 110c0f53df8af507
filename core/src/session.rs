//! `ConfigurationSession` — One configuration round at a time
//!
//! A rule is configured interactively: the operator picks an entity type, the
//! host re-renders with bundle options, the operator picks bundles, and so on.
//! Each of those round-trips is a [`Round`]: the stored configuration plus at
//! most one new [`Choice`] in, a repaired configuration plus everything needed
//! to render the next form out.
//!
//! ```text
//! stored config ──► apply choice ──► discard downstream ──► resolve levels ──► prefill
//!                    (one level)      (if value changed)     (ResolutionPass)   (ValueCapture)
//! ```
//!
//! Rounds of one configuration are sequential; rounds of different
//! configurations share nothing but the read-only catalog.

use crate::{
    CapturedValueList, CompareMethod, ConfigState, FieldDescriptor, Level, LevelResolution,
    RuleConfiguration, RuleError, SchemaCatalog, SelectionResolver, ValueCapture,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::str::FromStr;

/// One operator decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// Pick (or, with an empty id, clear) the entity type.
    EntityType(String),
    /// Pick the bundle set.
    Bundles(BTreeSet<String>),
    /// Pick (or clear) the field.
    Field(String),
    /// Pick the compare method. Only offered for multi-valued fields.
    CompareMethod(CompareMethod),
    /// Submit reference values for the resolved field.
    Values(CapturedValueList),
    /// Set negation.
    Negate(bool),
}

impl Choice {
    /// The cascade level this choice sets, if it sets one.
    #[must_use]
    pub fn level(&self) -> Option<Level> {
        match self {
            Self::EntityType(_) => Some(Level::EntityType),
            Self::Bundles(_) => Some(Level::EntityBundle),
            Self::Field(_) => Some(Level::EntityField),
            Self::CompareMethod(_) | Self::Values(_) | Self::Negate(_) => None,
        }
    }
}

/// Parses `level=value` as typed on a command line.
///
/// ```text
/// entity_type=node
/// entity_bundles=article,page
/// entity_field=field_tags
/// compare_method=match_one
/// negate=true
/// ```
///
/// Values are not parseable this way; they go through a
/// [`ValueWidget`](crate::ValueWidget).
impl FromStr for Choice {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s.split_once('=').ok_or_else(|| RuleError::InvalidSubmission {
            reason: format!("expected level=value, got \"{s}\""),
        })?;
        let value = value.trim();

        match key.trim() {
            "compare_method" => value.parse().map(Self::CompareMethod),
            "negate" => value
                .parse()
                .map(Self::Negate)
                .map_err(|_| RuleError::InvalidSubmission {
                    reason: format!("negate expects true or false, got \"{value}\""),
                }),
            level => Ok(match level.parse::<Level>()? {
                Level::EntityType => Self::EntityType(value.to_owned()),
                Level::EntityBundle => Self::Bundles(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|b| !b.is_empty())
                        .map(str::to_owned)
                        .collect(),
                ),
                Level::EntityField => Self::Field(value.to_owned()),
            }),
        }
    }
}

/// Everything produced by one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    /// The configuration to store.
    pub config: RuleConfiguration,
    /// Per-level options and current values, up to the first open level.
    pub levels: Vec<LevelResolution>,
    /// Compare methods to offer. Empty unless the field is multi-valued.
    pub compare_methods: Vec<CompareMethod>,
    /// The resolved field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldDescriptor>,
    /// Widget prefill for the resolved field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefill: Option<CapturedValueList>,
    /// Where the configuration now sits.
    pub state: ConfigState,
}

impl Round {
    /// The resolution of one level, if it was reached.
    #[must_use]
    pub fn level(&self, level: Level) -> Option<&LevelResolution> {
        self.levels.iter().find(|r| r.level == level)
    }

    /// Levels that were found stale and discarded this round.
    pub fn stale_levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.levels.iter().filter(|r| r.stale).map(|r| r.level)
    }
}

/// Drives configuration rounds against one catalog.
///
/// # Example
///
/// ```ignore
/// let session = ConfigurationSession::new(&catalog);
/// let round = session.round(&RuleConfiguration::new(), Some(Choice::EntityType("node".into())))?;
/// let round = session.round(&round.config, Some("entity_bundles=article".parse()?))?;
/// assert_eq!(round.state, ConfigState::BundlesChosen);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigurationSession<C> {
    resolver: SelectionResolver<C>,
}

impl<C: SchemaCatalog> ConfigurationSession<C> {
    /// Create a session over a catalog.
    pub fn new(catalog: C) -> Self {
        Self {
            resolver: SelectionResolver::new(catalog),
        }
    }

    /// The resolver used for every round.
    pub fn resolver(&self) -> &SelectionResolver<C> {
        &self.resolver
    }

    /// Run one round.
    ///
    /// # Errors
    ///
    /// - [`RuleError::UpstreamUnresolved`] if `choice` sets a level whose
    ///   upstream levels are not set.
    /// - [`RuleError::InvalidSubmission`] for a compare method that is not
    ///   offered, or values with no resolved field.
    /// - Whatever [`ValueCapture::capture`] rejects.
    pub fn round(
        &self,
        config: &RuleConfiguration,
        choice: Option<Choice>,
    ) -> Result<Round, RuleError> {
        let mut next = config.clone();
        let mut submitted = None;
        let mut method = None;

        match choice {
            Some(Choice::Values(values)) => submitted = Some(values),
            Some(Choice::CompareMethod(m)) => method = Some(m),
            Some(Choice::Negate(negate)) => next.negate = negate,
            Some(choice) => Self::apply_selection(&mut next, choice)?,
            None => {}
        }

        let repair = self.resolver.repair(&next)?;
        let mut next = repair.config;
        ValueCapture::reconcile(&mut next);
        let field = repair.field;

        let compare_methods = match &field {
            Some(f) if f.is_multi_valued() => CompareMethod::RELAXED.to_vec(),
            _ => Vec::new(),
        };

        if let Some(m) = method {
            if !compare_methods.contains(&m) {
                return Err(RuleError::InvalidSubmission {
                    reason: format!("compare method {m} is not offered for this field"),
                });
            }
            next.compare_method = m;
        }

        if let Some(values) = submitted {
            let Some(f) = &field else {
                return Err(RuleError::InvalidSubmission {
                    reason: "values submitted before a field is resolved".into(),
                });
            };
            next = ValueCapture::capture(&next, f, values)?;
        }

        let prefill = field
            .as_ref()
            .map(|f| ValueCapture::capture_defaults(&next, f));

        Ok(Round {
            state: next.state(),
            config: next,
            levels: repair.pass.into_levels(),
            compare_methods,
            field,
            prefill,
        })
    }

    /// Set one cascade level, discarding downstream state if the value changed.
    fn apply_selection(config: &mut RuleConfiguration, choice: Choice) -> Result<(), RuleError> {
        let Some(level) = choice.level() else {
            return Ok(());
        };
        if let Some(missing) = level.upstream().iter().find(|up| !config.is_set(**up)) {
            return Err(RuleError::UpstreamUnresolved {
                level,
                missing: *missing,
            });
        }

        match choice {
            Choice::EntityType(id) => {
                let id = Some(id).filter(|id| !id.trim().is_empty());
                if config.entity_type != id {
                    config.discard_from(Level::EntityType);
                    config.entity_type = id;
                }
            }
            Choice::Bundles(bundles) => {
                if config.entity_bundles != bundles {
                    config.discard_from(Level::EntityBundle);
                    config.entity_bundles = bundles;
                }
            }
            Choice::Field(id) => {
                let id = Some(id).filter(|id| !id.trim().is_empty());
                if config.entity_field != id {
                    config.discard_from(Level::EntityField);
                    config.entity_field = id;
                }
            }
            Choice::CompareMethod(_) | Choice::Values(_) | Choice::Negate(_) => {}
        }
        Ok(())
    }
}
