//! fieldrule-test: Plain-data collaborators for conformance testing
//!
//! Provides a [`StaticCatalog`] (a [`SchemaCatalog`] loaded from YAML/JSON or
//! built in code) and a [`TextWidget`] (a [`ValueWidget`] reading one value
//! per line). Together with [`EntityFieldSnapshot`] from the core crate they
//! are everything needed to drive a rule end to end without a host
//! application.
//!
//! # Example
//!
//! ```
//! use fieldrule_test::prelude::*;
//!
//! let catalog = StaticCatalog::new()
//!     .with_entity_type(EntityTypeInfo::content("node", "Content"))
//!     .with_bundle("node", BundleInfo::new("article", "Article"))
//!     .with_field("node", "article", FieldDescriptor::new("title", "Title"));
//!
//! let session = ConfigurationSession::new(&catalog);
//! let round = session
//!     .round(&RuleConfiguration::new(), Some("entity_type=node".parse().unwrap()))
//!     .unwrap();
//! assert_eq!(round.state, ConfigState::TypeChosen);
//! ```

use fieldrule::{
    BundleInfo, CapturedValue, CapturedValueList, EntityTypeInfo, FieldDescriptor, RuleError,
    SchemaCatalog, ValueWidget,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "fixtures")]
pub mod fixture;

// ═══════════════════════════════════════════════════════════════════════════════
// Static catalog
// ═══════════════════════════════════════════════════════════════════════════════

/// An in-memory schema catalog.
///
/// ```yaml
/// entity_types:
///   - { id: node, label: Content }
///   - { id: view, label: View, group: config }
/// bundles:
///   node: [{ id: article, label: Article }, { id: page, label: Basic page }]
/// fields:
///   node:
///     article: [{ id: title, label: Title }, { id: field_tags, label: Tags, cardinality: unlimited }]
///     page: [{ id: title, label: Title }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticCatalog {
    /// Entity types in display order.
    #[serde(default)]
    pub entity_types: Vec<EntityTypeInfo>,
    /// Bundles per entity type, in display order.
    #[serde(default)]
    pub bundles: BTreeMap<String, Vec<BundleInfo>>,
    /// Fields per entity type, then per bundle, in display order.
    #[serde(default)]
    pub fields: BTreeMap<String, BTreeMap<String, Vec<FieldDescriptor>>>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from YAML.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the document is not a catalog.
    pub fn from_yaml(yaml: &str) -> Result<Self, RuleError> {
        serde_yaml::from_str(yaml).map_err(|e| RuleError::Parse {
            format: "YAML",
            reason: e.to_string(),
        })
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Parse`] if the document is not a catalog.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        serde_json::from_str(json).map_err(|e| RuleError::Parse {
            format: "JSON",
            reason: e.to_string(),
        })
    }

    /// Add an entity type (builder pattern).
    #[must_use]
    pub fn with_entity_type(mut self, info: EntityTypeInfo) -> Self {
        self.entity_types.push(info);
        self
    }

    /// Add a bundle to an entity type (builder pattern).
    #[must_use]
    pub fn with_bundle(mut self, entity_type: &str, bundle: BundleInfo) -> Self {
        self.bundles
            .entry(entity_type.to_owned())
            .or_default()
            .push(bundle);
        self
    }

    /// Add a field to a bundle (builder pattern).
    #[must_use]
    pub fn with_field(mut self, entity_type: &str, bundle: &str, field: FieldDescriptor) -> Self {
        self.fields
            .entry(entity_type.to_owned())
            .or_default()
            .entry(bundle.to_owned())
            .or_default()
            .push(field);
        self
    }

    /// Delete a bundle and its fields.
    pub fn remove_bundle(&mut self, entity_type: &str, bundle: &str) {
        if let Some(bundles) = self.bundles.get_mut(entity_type) {
            bundles.retain(|b| b.id != bundle);
        }
        if let Some(fields) = self.fields.get_mut(entity_type) {
            fields.remove(bundle);
        }
    }

    /// Delete a field from one bundle.
    pub fn remove_field(&mut self, entity_type: &str, bundle: &str, field: &str) {
        if let Some(fields) = self
            .fields
            .get_mut(entity_type)
            .and_then(|bundles| bundles.get_mut(bundle))
        {
            fields.retain(|f| f.id != field);
        }
    }
}

impl SchemaCatalog for StaticCatalog {
    fn entity_types(&self) -> Vec<EntityTypeInfo> {
        self.entity_types.clone()
    }

    fn bundles(&self, entity_type: &str) -> Vec<BundleInfo> {
        self.bundles.get(entity_type).cloned().unwrap_or_default()
    }

    fn fields(&self, entity_type: &str, bundle: &str) -> Vec<FieldDescriptor> {
        self.fields
            .get(entity_type)
            .and_then(|bundles| bundles.get(bundle))
            .cloned()
            .unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Text widget
// ═══════════════════════════════════════════════════════════════════════════════

/// What [`TextWidget::render`] produces: one text line per delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextInputSpec {
    /// Field the input is for.
    pub field: String,
    /// Property a bare line is stored under.
    pub primary_property: String,
    /// Whether more than one line is accepted.
    pub multiple: bool,
    /// Pre-filled lines.
    pub lines: Vec<String>,
}

/// A widget that reads one value per line.
///
/// A line is either a bare value, stored under the field's primary property,
/// or `property=value` pairs separated by `;`. A blank line is a cleared delta.
///
/// ```text
/// Hello
/// uri=/about;title=About us
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextWidget;

impl TextWidget {
    fn render_line(value: &CapturedValue, primary: &str) -> String {
        match (value.len(), value.get(primary)) {
            (1, Some(v)) if !v.contains(['=', ';']) => v.to_owned(),
            _ => value
                .properties()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }

    fn parse_line(line: &str, primary: &str) -> Result<CapturedValue, RuleError> {
        if !line.contains('=') {
            return Ok(CapturedValue::single(primary, line));
        }
        line.split(';')
            .filter(|pair| !pair.trim().is_empty())
            .map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.trim().to_owned(), v))
                    .ok_or_else(|| RuleError::InvalidSubmission {
                        reason: format!("expected property=value, got \"{pair}\""),
                    })
            })
            .collect()
    }
}

impl ValueWidget for TextWidget {
    type InputSpec = TextInputSpec;

    fn render(&self, field: &FieldDescriptor, prefill: &CapturedValueList) -> TextInputSpec {
        TextInputSpec {
            field: field.id.clone(),
            primary_property: field.primary_property.clone(),
            multiple: field.is_multi_valued(),
            lines: prefill
                .iter()
                .map(|v| Self::render_line(v, &field.primary_property))
                .collect(),
        }
    }

    fn parse_submission(
        &self,
        spec: &TextInputSpec,
        raw: &str,
    ) -> Result<CapturedValueList, RuleError> {
        let values = raw
            .lines()
            .map(|line| Self::parse_line(line.trim(), &spec.primary_property))
            .collect::<Result<CapturedValueList, _>>()?;

        let filled = values.iter().filter(|v| !v.is_empty()).count();
        if !spec.multiple && filled > 1 {
            return Err(RuleError::InvalidSubmission {
                reason: format!("field \"{}\" accepts one value, got {filled}", spec.field),
            });
        }
        Ok(values)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{StaticCatalog, TextInputSpec, TextWidget};
    pub use fieldrule::prelude::*;
    pub use fieldrule::{BundleInfo, EntityTypeInfo};
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn link() -> FieldDescriptor {
        FieldDescriptor::new("field_link", "Link")
            .unlimited()
            .with_primary_property("uri")
    }

    #[test]
    fn catalog_from_yaml() {
        let catalog = StaticCatalog::from_yaml(
            r#"
entity_types:
  - { id: node, label: Content }
  - { id: view, label: View, group: config }
bundles:
  node: [{ id: article, label: Article }, { id: internal }]
fields:
  node:
    article: [{ id: field_tags, label: Tags, cardinality: unlimited, primary_property: target_id }]
"#,
        )
        .unwrap();

        assert_eq!(catalog.entity_types().len(), 2);
        assert_eq!(catalog.bundles("node")[1].label, None);
        let tags = catalog.field("node", "article", "field_tags").unwrap();
        assert!(tags.is_multi_valued());
        assert_eq!(tags.primary_property, "target_id");
        assert!(catalog.fields("node", "page").is_empty());
    }

    #[test]
    fn catalog_removals() {
        let mut catalog = StaticCatalog::new()
            .with_entity_type(EntityTypeInfo::content("node", "Content"))
            .with_bundle("node", BundleInfo::new("article", "Article"))
            .with_bundle("node", BundleInfo::new("page", "Page"))
            .with_field("node", "article", FieldDescriptor::new("title", "Title"))
            .with_field("node", "page", FieldDescriptor::new("title", "Title"));

        catalog.remove_field("node", "article", "title");
        assert!(catalog.fields("node", "article").is_empty());

        catalog.remove_bundle("node", "page");
        assert_eq!(catalog.bundles("node").len(), 1);
        assert!(catalog.fields("node", "page").is_empty());
    }

    #[test]
    fn catalog_parse_error() {
        let err = StaticCatalog::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, RuleError::Parse { format: "JSON", .. }));
    }

    #[test]
    fn widget_renders_bare_and_structured_lines() {
        let prefill: CapturedValueList = vec![
            CapturedValue::single("uri", "/home"),
            CapturedValue::new().with("uri", "/about").with("title", "About"),
        ]
        .into();

        let spec = TextWidget.render(&link(), &prefill);

        assert!(spec.multiple);
        assert_eq!(spec.lines, vec!["/home", "title=About;uri=/about"]);
    }

    #[test]
    fn widget_round_trips_its_own_rendering() {
        let prefill: CapturedValueList = vec![
            CapturedValue::single("uri", "/home"),
            CapturedValue::new().with("uri", "/about").with("title", "About"),
        ]
        .into();
        let spec = TextWidget.render(&link(), &prefill);

        let parsed = TextWidget
            .parse_submission(&spec, &spec.lines.join("\n"))
            .unwrap();
        assert_eq!(parsed, prefill);
    }

    #[test]
    fn widget_keeps_blank_lines_as_empty_deltas() {
        let spec = TextWidget.render(&link(), &CapturedValueList::new());
        let parsed = TextWidget.parse_submission(&spec, "/a\n\n/b").unwrap();
        assert_eq!(parsed.len(), 3);
        assert!(parsed.get(1).is_some_and(CapturedValue::is_empty));
        assert_eq!(parsed.without_empty().len(), 2);
    }

    #[test]
    fn widget_rejects_malformed_pair() {
        let spec = TextWidget.render(&link(), &CapturedValueList::new());
        let err = TextWidget
            .parse_submission(&spec, "uri=/a;title")
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidSubmission { .. }));
    }

    #[test]
    fn widget_single_field_accepts_one_line() {
        let title = FieldDescriptor::new("title", "Title");
        let spec = TextWidget.render(&title, &CapturedValueList::new());
        assert!(!spec.multiple);
        assert!(TextWidget.parse_submission(&spec, "Hello\n").is_ok());
        assert!(TextWidget.parse_submission(&spec, "Hello\nWorld").is_err());
    }
}
