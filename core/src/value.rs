//! `CapturedValue` — One field value, as a property → trimmed string map
//!
//! A field value can carry several properties (a link has `url` and `title`,
//! an entity reference has `target_id`). Both the reference values stored in a
//! rule and the live values read off an entity use this shape, so comparison is
//! always between like and like.
//!
//! # INV: values are trimmed
//!
//! Every constructor trims property values. Comparators rely on this and never
//! re-trim.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value: property name → trimmed string value.
///
/// Deserialization accepts any scalar (strings, numbers, booleans) so stored
/// rules written by hand in YAML (`target_id: 5`) read the same as rules
/// written by a form. `null` and nested structures are dropped.
///
/// # Example
///
/// ```
/// use fieldrule::CapturedValue;
///
/// let v = CapturedValue::new().with("url", " https://example.com ").with("title", "Home");
/// assert_eq!(v.get("url"), Some("https://example.com"));
/// assert_eq!(v.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, serde_json::Value>")]
#[serde(into = "BTreeMap<String, String>")]
pub struct CapturedValue {
    properties: BTreeMap<String, String>,
}

impl CapturedValue {
    /// Create a value with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for the common single-property value (`{"value": ...}`).
    pub fn single(property: impl Into<String>, value: impl AsRef<str>) -> Self {
        Self::new().with(property, value)
    }

    /// Set a property (builder pattern). The value is trimmed.
    #[must_use]
    pub fn with(mut self, property: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.set(property, value);
        self
    }

    /// Set a property in place. The value is trimmed.
    pub fn set(&mut self, property: impl Into<String>, value: impl AsRef<str>) {
        self.properties
            .insert(property.into(), value.as_ref().trim().to_owned());
    }

    /// Get a property value.
    #[must_use]
    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    /// Iterate over `(property, value)` pairs in property-name order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of properties recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no property holds a non-empty value.
    ///
    /// An empty entry is what a widget submits for a delta the user cleared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.values().all(String::is_empty)
    }
}

impl From<BTreeMap<String, serde_json::Value>> for CapturedValue {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        let mut value = Self::new();
        for (property, v) in raw {
            match v {
                serde_json::Value::String(s) => value.set(property, s),
                serde_json::Value::Number(n) => value.set(property, n.to_string()),
                serde_json::Value::Bool(b) => value.set(property, b.to_string()),
                _ => {}
            }
        }
        value
    }
}

impl From<CapturedValue> for BTreeMap<String, String> {
    fn from(value: CapturedValue) -> Self {
        value.properties
    }
}

impl<K: Into<String>, V: AsRef<str>> FromIterator<(K, V)> for CapturedValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut value = Self::new();
        for (k, v) in iter {
            value.set(k, v);
        }
        value
    }
}

/// Ordered list of field values. The index of an entry is its *delta*.
///
/// Delta alignment only matters under
/// [`CompareMethod::StrictPositional`](crate::CompareMethod::StrictPositional).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedValueList(Vec<CapturedValue>);

impl CapturedValueList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list of single-property values, one per delta.
    pub fn of(property: &str, values: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        values
            .into_iter()
            .map(|v| CapturedValue::single(property, v))
            .collect()
    }

    /// Append a value at the next delta.
    pub fn push(&mut self, value: CapturedValue) {
        self.0.push(value);
    }

    /// Value at the given delta.
    #[must_use]
    pub fn get(&self, delta: usize) -> Option<&CapturedValue> {
        self.0.get(delta)
    }

    /// Number of deltas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no deltas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over values in delta order.
    pub fn iter(&self) -> std::slice::Iter<'_, CapturedValue> {
        self.0.iter()
    }

    /// Drop entries that hold no value. Remaining entries are re-indexed.
    #[must_use]
    pub fn without_empty(self) -> Self {
        self.0.into_iter().filter(|v| !v.is_empty()).collect()
    }

    /// Values of one property across all deltas, skipping deltas that lack it.
    pub fn property_values<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0.iter().filter_map(move |v| v.get(property))
    }

    /// Borrow the underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &[CapturedValue] {
        &self.0
    }
}

impl FromIterator<CapturedValue> for CapturedValueList {
    fn from_iter<I: IntoIterator<Item = CapturedValue>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<CapturedValue>> for CapturedValueList {
    fn from(values: Vec<CapturedValue>) -> Self {
        Self(values)
    }
}

impl IntoIterator for CapturedValueList {
    type Item = CapturedValue;
    type IntoIter = std::vec::IntoIter<CapturedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a CapturedValueList {
    type Item = &'a CapturedValue;
    type IntoIter = std::slice::Iter<'a, CapturedValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
