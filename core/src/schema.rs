//! `SchemaCatalog` — The read-only source of entity types, bundles and fields
//!
//! The catalog is an external collaborator: the host application knows which
//! entity types exist, how they are partitioned into bundles, and which fields
//! each bundle carries. This crate only queries it.
//!
//! Implementations are expected to be cheap to query repeatedly; the resolver
//! holds no cache and asks again on every round. Callers that need caching own
//! it on their side of this trait.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Storage group of an entity type. Only content entities can be configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityGroup {
    /// Content entities (nodes, users, terms...).
    #[default]
    Content,
    /// Configuration entities (views, blocks...). Never offered.
    Config,
}

/// An entity type as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeInfo {
    /// Machine id, e.g. `"node"`.
    pub id: String,
    /// Human label, e.g. `"Content"`.
    pub label: String,
    /// Storage group.
    #[serde(default)]
    pub group: EntityGroup,
}

impl EntityTypeInfo {
    /// A content entity type.
    pub fn content(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group: EntityGroup::Content,
        }
    }

    /// A configuration entity type.
    pub fn config(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            group: EntityGroup::Config,
        }
    }
}

/// A bundle as reported by the catalog.
///
/// Bundles without a label are internal and are not offered for selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// Machine id, e.g. `"article"`.
    pub id: String,
    /// Human label, e.g. `"Article"`.
    #[serde(default)]
    pub label: Option<String>,
}

impl BundleInfo {
    /// A labelled bundle.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
        }
    }
}

/// How many values a field holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one value (delta 0).
    #[default]
    Single,
    /// An arbitrary-length list of values.
    Unlimited,
}

/// Field metadata needed to offer, capture and compare a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Machine id, e.g. `"field_tags"`.
    pub id: String,
    /// Human label.
    pub label: String,
    /// The property compared by the relaxed compare methods (`"value"`,
    /// `"target_id"`, `"uri"`...).
    #[serde(default = "default_primary_property")]
    pub primary_property: String,
    /// Single or unlimited.
    #[serde(default)]
    pub cardinality: Cardinality,
    /// Value is derived at runtime rather than stored.
    #[serde(default)]
    pub computed: bool,
    /// Value is exposed through the typed data layer.
    #[serde(default = "default_true")]
    pub typed_data: bool,
}

fn default_primary_property() -> String {
    crate::DEFAULT_PRIMARY_PROPERTY.to_owned()
}

fn default_true() -> bool {
    true
}

impl FieldDescriptor {
    /// A stored, single-valued field with primary property `value`.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            primary_property: default_primary_property(),
            cardinality: Cardinality::Single,
            computed: false,
            typed_data: true,
        }
    }

    /// Set the cardinality (builder pattern).
    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Shorthand for `with_cardinality(Cardinality::Unlimited)`.
    #[must_use]
    pub fn unlimited(self) -> Self {
        self.with_cardinality(Cardinality::Unlimited)
    }

    /// Set the primary property (builder pattern).
    #[must_use]
    pub fn with_primary_property(mut self, property: impl Into<String>) -> Self {
        self.primary_property = property.into();
        self
    }

    /// Mark the field as computed, optionally still exposed as typed data.
    #[must_use]
    pub fn computed(mut self, typed_data: bool) -> Self {
        self.computed = true;
        self.typed_data = typed_data;
        self
    }

    /// Returns `true` if the field may be offered for selection.
    ///
    /// Computed fields are offered only while they are still exposed as typed
    /// data; a computed field outside the typed data layer has no readable
    /// value to compare against.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !(self.computed && !self.typed_data)
    }

    /// Returns `true` for unlimited-cardinality fields.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.cardinality == Cardinality::Unlimited
    }
}

/// One selectable option at a cascade level: id plus human label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Machine id.
    pub id: String,
    /// Human label.
    pub label: String,
}

impl SelectOption {
    /// Create an option.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Read-only schema source.
///
/// # Thread Safety
///
/// `Send + Sync` so one catalog can back concurrent resolutions of
/// independent rule configurations.
///
/// # Example
///
/// ```ignore
/// impl SchemaCatalog for MySite {
///     fn entity_types(&self) -> Vec<EntityTypeInfo> { ... }
///     fn bundles(&self, entity_type: &str) -> Vec<BundleInfo> { ... }
///     fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldDescriptor> { ... }
/// }
/// ```
pub trait SchemaCatalog: Send + Sync + Debug {
    /// All entity types, in display order. Config entities included; the
    /// resolver filters them.
    fn entity_types(&self) -> Vec<EntityTypeInfo>;

    /// Bundles of an entity type, in display order. Unknown type → empty.
    fn bundles(&self, entity_type: &str) -> Vec<BundleInfo>;

    /// Fields of one bundle, in display order. Unknown type/bundle → empty.
    fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldDescriptor>;

    /// Look up a single field on a bundle.
    fn field(&self, entity_type: &str, bundle: &str, field: &str) -> Option<FieldDescriptor> {
        self.fields(entity_type, bundle)
            .into_iter()
            .find(|f| f.id == field)
    }
}

impl<T: SchemaCatalog + ?Sized> SchemaCatalog for &T {
    fn entity_types(&self) -> Vec<EntityTypeInfo> {
        (**self).entity_types()
    }

    fn bundles(&self, entity_type: &str) -> Vec<BundleInfo> {
        (**self).bundles(entity_type)
    }

    fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldDescriptor> {
        (**self).fields(entity_type, bundle)
    }
}
