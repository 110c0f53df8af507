//! `SelectionResolver` — Keeps the type → bundle → field cascade consistent
//!
//! Each level's options depend on the level above it. When the catalog changes
//! (a bundle is deleted, a field removed from a bundle) a stored selection can
//! point at options that no longer exist. The resolver recomputes the options
//! for each level from the live catalog and flags any stored value that is no
//! longer among them as **stale**.
//!
//! # INV: stale selections are discarded, never narrowed
//!
//! If even one stored bundle disappears, the whole bundle selection is stale
//! and everything below it is discarded. Silently dropping the missing bundle
//! would leave a rule that means something the operator never chose.
//!
//! # INV: resolution is pure
//!
//! Same catalog state and same configuration → same options and same current
//! values. The resolver holds no cache between calls.

use crate::{
    EntityGroup, FieldDescriptor, Level, RuleConfiguration, RuleError, SchemaCatalog,
    SelectOption,
};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// The outcome of resolving one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelResolution {
    /// Which level.
    pub level: Level,
    /// Valid options, in catalog order.
    pub options: Vec<SelectOption>,
    /// The stored value(s) that are still valid. Empty when nothing is stored
    /// or the stored value is stale.
    pub current: Vec<String>,
    /// A stored value existed but is no longer valid.
    pub stale: bool,
}

impl LevelResolution {
    /// Returns `true` if the level holds a valid, non-empty value.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.current.is_empty()
    }

    /// The single current value of a single-valued level.
    #[must_use]
    pub fn current_one(&self) -> Option<&str> {
        self.current.first().map(String::as_str)
    }

    /// Returns `true` if `id` is among the options.
    #[must_use]
    pub fn offers(&self, id: &str) -> bool {
        self.options.iter().any(|o| o.id == id)
    }
}

/// The levels resolved in one pass, in cascade order.
///
/// A pass is the configuration-time equivalent of building one form: each
/// level is registered at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionPass {
    levels: Vec<LevelResolution>,
}

impl ResolutionPass {
    /// Start an empty pass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved level.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::DuplicateLevel`] if the level was already
    /// registered in this pass.
    pub fn register(&mut self, resolution: LevelResolution) -> Result<(), RuleError> {
        if self.get(resolution.level).is_some() {
            return Err(RuleError::DuplicateLevel {
                level: resolution.level,
            });
        }
        self.levels.push(resolution);
        Ok(())
    }

    /// The resolution of a level, if registered.
    #[must_use]
    pub fn get(&self, level: Level) -> Option<&LevelResolution> {
        self.levels.iter().find(|r| r.level == level)
    }

    /// All registered resolutions, in registration order.
    #[must_use]
    pub fn levels(&self) -> &[LevelResolution] {
        &self.levels
    }

    /// Levels that were found stale.
    pub fn stale_levels(&self) -> impl Iterator<Item = Level> + '_ {
        self.levels.iter().filter(|r| r.stale).map(|r| r.level)
    }

    /// Consume into the list of resolutions.
    #[must_use]
    pub fn into_levels(self) -> Vec<LevelResolution> {
        self.levels
    }
}

/// A configuration checked against the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// The configuration with every stale suffix discarded.
    pub config: RuleConfiguration,
    /// Per-level resolutions, up to the first unresolved level.
    pub pass: ResolutionPass,
    /// Descriptor of the resolved field, if the cascade got that far.
    pub field: Option<FieldDescriptor>,
}

impl Repair {
    /// Returns `true` if anything had to be discarded.
    #[must_use]
    pub fn was_stale(&self) -> bool {
        self.pass.stale_levels().next().is_some()
    }
}

/// Computes valid options per level and detects stale selections.
///
/// # Example
///
/// ```ignore
/// let resolver = SelectionResolver::new(&catalog);
/// let repair = resolver.repair(&stored)?;
/// if repair.was_stale() {
///     // re-prompt for the discarded levels
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SelectionResolver<C> {
    catalog: C,
}

impl<C: SchemaCatalog> SelectionResolver<C> {
    /// Create a resolver over a catalog.
    pub fn new(catalog: C) -> Self {
        Self { catalog }
    }

    /// The underlying catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    // ───────────────────────────────────────────────────────────────────────
    // Options per level
    // ───────────────────────────────────────────────────────────────────────

    /// Content entity types.
    pub fn entity_type_options(&self) -> Vec<SelectOption> {
        self.catalog
            .entity_types()
            .into_iter()
            .filter(|t| t.group == EntityGroup::Content)
            .map(|t| SelectOption::new(t.id, t.label))
            .collect()
    }

    /// Labelled bundles of an entity type.
    pub fn bundle_options(&self, entity_type: &str) -> Vec<SelectOption> {
        self.catalog
            .bundles(entity_type)
            .into_iter()
            .filter_map(|b| b.label.map(|label| SelectOption::new(b.id, label)))
            .collect()
    }

    /// Selectable fields present, by id, on every given bundle.
    ///
    /// Order and labels follow the first bundle.
    pub fn field_options(&self, entity_type: &str, bundles: &BTreeSet<String>) -> Vec<SelectOption> {
        let mut groups = bundles.iter().map(|bundle| {
            self.catalog
                .fields(entity_type, bundle)
                .into_iter()
                .filter(FieldDescriptor::is_selectable)
                .collect::<Vec<_>>()
        });

        let Some(first) = groups.next() else {
            return Vec::new();
        };

        let others: Vec<HashSet<String>> = groups
            .map(|g| g.into_iter().map(|f| f.id).collect())
            .collect();

        first
            .into_iter()
            .filter(|f| others.iter().all(|ids| ids.contains(&f.id)))
            .map(|f| SelectOption::new(f.id, f.label))
            .collect()
    }

    /// Descriptor of a field shared by the given bundles.
    pub fn field_descriptor(
        &self,
        entity_type: &str,
        bundles: &BTreeSet<String>,
        field: &str,
    ) -> Option<FieldDescriptor> {
        if !self
            .field_options(entity_type, bundles)
            .iter()
            .any(|o| o.id == field)
        {
            return None;
        }
        let first = bundles.iter().next()?;
        self.catalog.field(entity_type, first, field)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Resolution
    // ───────────────────────────────────────────────────────────────────────

    /// Resolve one level of `config` against the catalog.
    ///
    /// Does not modify `config`; a stale level is reported, and
    /// [`repair`](Self::repair) is what discards it.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UpstreamUnresolved`] if a level above `level` is
    /// empty or itself invalid.
    pub fn resolve_level(
        &self,
        config: &RuleConfiguration,
        level: Level,
    ) -> Result<LevelResolution, RuleError> {
        match level {
            Level::EntityType => {
                let options = self.entity_type_options();
                Ok(Self::single(level, options, config.entity_type.as_deref()))
            }
            Level::EntityBundle => {
                let entity_type = self.require(config, level, Level::EntityType)?;
                let options = self.bundle_options(entity_type.current_one().unwrap_or_default());
                Ok(Self::multiple(level, options, &config.entity_bundles))
            }
            Level::EntityField => {
                let entity_type = self.require(config, level, Level::EntityType)?;
                self.require(config, level, Level::EntityBundle)?;
                let options = self.field_options(
                    entity_type.current_one().unwrap_or_default(),
                    &config.entity_bundles,
                );
                Ok(Self::single(level, options, config.entity_field.as_deref()))
            }
        }
    }

    /// Resolve every level in order, discarding stale suffixes.
    ///
    /// Stops at the first level that holds no valid value; levels below it
    /// cannot be offered yet.
    ///
    /// # Errors
    ///
    /// Only programming errors (see [`ResolutionPass::register`]); stale
    /// selections are repaired, not reported as errors.
    pub fn repair(&self, config: &RuleConfiguration) -> Result<Repair, RuleError> {
        let mut repaired = config.clone();
        let mut pass = ResolutionPass::new();

        for level in Level::ALL {
            let resolution = self.resolve_level(&repaired, level)?;
            if resolution.stale {
                tracing::debug!(
                    %level,
                    stored = ?repaired.selected(level),
                    "discarding stale selection and everything below it"
                );
                repaired.discard_from(level);
            }
            let resolved = resolution.is_resolved();
            pass.register(resolution)?;
            if !resolved {
                break;
            }
        }

        let field = match (&repaired.entity_type, &repaired.entity_field) {
            (Some(entity_type), Some(field)) => {
                self.field_descriptor(entity_type, &repaired.entity_bundles, field)
            }
            _ => None,
        };

        Ok(Repair {
            config: repaired,
            pass,
            field,
        })
    }

    /// Resolve an upstream level, failing unless it is set and valid.
    fn require(
        &self,
        config: &RuleConfiguration,
        level: Level,
        upstream: Level,
    ) -> Result<LevelResolution, RuleError> {
        let resolution = self.resolve_level(config, upstream)?;
        if resolution.stale || !resolution.is_resolved() {
            return Err(RuleError::UpstreamUnresolved {
                level,
                missing: upstream,
            });
        }
        Ok(resolution)
    }

    fn single(level: Level, options: Vec<SelectOption>, stored: Option<&str>) -> LevelResolution {
        let valid = stored.filter(|id| options.iter().any(|o| o.id == *id));
        LevelResolution {
            level,
            stale: stored.is_some() && valid.is_none(),
            current: valid.map(str::to_owned).into_iter().collect(),
            options,
        }
    }

    fn multiple(
        level: Level,
        options: Vec<SelectOption>,
        stored: &BTreeSet<String>,
    ) -> LevelResolution {
        let all_valid = stored.iter().all(|id| options.iter().any(|o| o.id == *id));
        LevelResolution {
            level,
            stale: !all_valid,
            current: if all_valid {
                stored.iter().cloned().collect()
            } else {
                Vec::new()
            },
            options,
        }
    }
}
