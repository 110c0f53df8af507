//! `EntitySnapshot` — The live entity a rule is evaluated against
//!
//! Evaluation never fetches entities. The caller pre-fetches the entity and
//! hands over a snapshot: type, bundle, schema and current field values.

use crate::{CapturedValue, CapturedValueList, FieldDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Read access to one concrete entity.
///
/// # INV: values are normalized like captured values
///
/// [`field_values`](Self::field_values) returns [`CapturedValue`]s, which are
/// trimmed on construction, so live and captured values compare directly.
pub trait EntitySnapshot: Send + Sync + Debug {
    /// Entity type id, e.g. `"node"`.
    fn entity_type(&self) -> &str;

    /// Bundle id, e.g. `"article"`.
    fn bundle(&self) -> &str;

    /// Schema of a field on this entity, `None` if the entity has no such field.
    fn field(&self, field: &str) -> Option<&FieldDescriptor>;

    /// Returns `true` if the entity's schema has the field.
    fn has_field(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// Current values of a field, in delta order. Missing field → empty list.
    fn field_values(&self, field: &str) -> CapturedValueList;
}

/// Owned snapshot of one entity: the plain-data [`EntitySnapshot`].
///
/// Deserializable, so fixtures and the CLI can load entities from YAML/JSON:
///
/// ```yaml
/// entity_type: node
/// bundle: article
/// fields:
///   title:
///     descriptor: { id: title, label: Title }
///     values: [{ value: "Hello" }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityFieldSnapshot {
    /// Entity type id.
    pub entity_type: String,
    /// Bundle id.
    pub bundle: String,
    /// Fields keyed by id.
    #[serde(default)]
    pub fields: BTreeMap<String, SnapshotField>,
}

/// One field on an [`EntityFieldSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotField {
    /// Field schema.
    pub descriptor: FieldDescriptor,
    /// Current values.
    #[serde(default)]
    pub values: CapturedValueList,
}

impl EntityFieldSnapshot {
    /// Create a snapshot with no fields.
    pub fn new(entity_type: impl Into<String>, bundle: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field with its values (builder pattern).
    #[must_use]
    pub fn with_field(mut self, descriptor: FieldDescriptor, values: CapturedValueList) -> Self {
        self.fields
            .insert(descriptor.id.clone(), SnapshotField { descriptor, values });
        self
    }

    /// Add a field whose values are single strings on the primary property.
    #[must_use]
    pub fn with_values<S: AsRef<str>>(
        self,
        descriptor: FieldDescriptor,
        values: impl IntoIterator<Item = S>,
    ) -> Self {
        let values = values
            .into_iter()
            .map(|v| CapturedValue::single(descriptor.primary_property.clone(), v))
            .collect();
        self.with_field(descriptor, values)
    }
}

impl EntitySnapshot for EntityFieldSnapshot {
    fn entity_type(&self) -> &str {
        &self.entity_type
    }

    fn bundle(&self) -> &str {
        &self.bundle
    }

    fn field(&self, field: &str) -> Option<&FieldDescriptor> {
        self.fields.get(field).map(|f| &f.descriptor)
    }

    fn field_values(&self, field: &str) -> CapturedValueList {
        self.fields
            .get(field)
            .map(|f| f.values.clone())
            .unwrap_or_default()
    }
}
