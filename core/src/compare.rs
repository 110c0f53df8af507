//! `ValueComparator` — Live values vs captured values
//!
//! One comparator per [`CompareMethod`]. Comparators are stateless and
//! non-generic: they see two [`CapturedValueList`]s and the field's primary
//! property, nothing else, so the same instance serves every rule.
//!
//! # Available Comparators
//!
//! - [`MatchAll`] — captured primary values ⊆ live primary values
//! - [`MatchOne`] — captured ∩ live primary values ≠ ∅
//! - [`StrictPositional`] — same length, every captured property equal per delta
//!
//! # Empty lists
//!
//! | captured | live | `MatchAll` | `MatchOne` | `StrictPositional` |
//! |----------|------|------------|------------|--------------------|
//! | empty    | empty | true      | false      | true               |
//! | empty    | some  | true      | false      | false              |

use crate::{CapturedValueList, CompareMethod};
use std::collections::HashSet;
use std::fmt::Debug;

/// Decides whether live field values satisfy captured reference values.
///
/// # Example
///
/// ```
/// use fieldrule::{CapturedValueList, MatchAll, ValueComparator};
///
/// let live = CapturedValueList::of("value", ["A", "B", "C"]);
/// let captured = CapturedValueList::of("value", ["A", "B"]);
/// assert!(MatchAll.compare(&live, &captured, "value"));
/// ```
pub trait ValueComparator: Send + Sync + Debug {
    /// Compare `live` against `captured`. `primary` is the field's primary
    /// property, used by the relaxed methods.
    fn compare(&self, live: &CapturedValueList, captured: &CapturedValueList, primary: &str)
        -> bool;

    /// The method this comparator implements.
    fn method(&self) -> CompareMethod;
}

impl CompareMethod {
    /// The comparator for this method.
    #[must_use]
    pub fn comparator(self) -> &'static dyn ValueComparator {
        match self {
            Self::MatchAll => &MatchAll,
            Self::MatchOne => &MatchOne,
            Self::StrictPositional => &StrictPositional,
        }
    }
}

fn primary_set<'a>(values: &'a CapturedValueList, primary: &'a str) -> HashSet<&'a str> {
    values.property_values(primary).collect()
}

/// Every captured primary value must appear somewhere among the live values.
///
/// Order and multiplicity are ignored. A captured entry without the primary
/// property can never be found.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchAll;

impl ValueComparator for MatchAll {
    fn compare(
        &self,
        live: &CapturedValueList,
        captured: &CapturedValueList,
        primary: &str,
    ) -> bool {
        let live = primary_set(live, primary);
        captured
            .iter()
            .all(|c| c.get(primary).is_some_and(|v| live.contains(v)))
    }

    fn method(&self) -> CompareMethod {
        CompareMethod::MatchAll
    }
}

/// At least one captured primary value must appear among the live values.
///
/// There is no "match one of nothing": an empty capture never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOne;

impl ValueComparator for MatchOne {
    fn compare(
        &self,
        live: &CapturedValueList,
        captured: &CapturedValueList,
        primary: &str,
    ) -> bool {
        let live = primary_set(live, primary);
        captured
            .iter()
            .any(|c| c.get(primary).is_some_and(|v| live.contains(v)))
    }

    fn method(&self) -> CompareMethod {
        CompareMethod::MatchOne
    }
}

/// Lists must have equal length, and at every delta each property recorded in
/// the captured entry must equal the same property of the live entry.
///
/// Properties present only on the live entry are not compared.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPositional;

impl ValueComparator for StrictPositional {
    fn compare(
        &self,
        live: &CapturedValueList,
        captured: &CapturedValueList,
        _primary: &str,
    ) -> bool {
        live.len() == captured.len()
            && live.iter().zip(captured).all(|(l, c)| {
                c.properties()
                    .all(|(property, value)| l.get(property) == Some(value))
            })
    }

    fn method(&self) -> CompareMethod {
        CompareMethod::StrictPositional
    }
}
