//! `ValueCapture` — Reference values entered for the chosen field
//!
//! Captured values belong to the selection they were entered against. When
//! the field changes identity (another field, another bundle set, another
//! entity type) the old values describe something else and are discarded
//! instead of being offered again as the widget prefill.
//!
//! Rendering and reading the input controls is delegated to a
//! [`ValueWidget`]; this module only decides what the widget is pre-filled with
//! and what is stored from its submission.

use crate::{CapturedValueList, FieldDescriptor, RuleConfiguration, RuleError, MAX_CAPTURED_VALUES};

/// Input controls for one field.
///
/// The host renders `InputSpec` however it likes and later hands the raw
/// submission back together with the spec it rendered.
pub trait ValueWidget {
    /// Whatever the widget needs to remember between render and submit.
    type InputSpec;

    /// Describe the controls for `field`, filled with `prefill`.
    fn render(&self, field: &FieldDescriptor, prefill: &CapturedValueList) -> Self::InputSpec;

    /// Read a submission.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSubmission`] for input the widget cannot
    /// read.
    fn parse_submission(
        &self,
        spec: &Self::InputSpec,
        raw: &str,
    ) -> Result<CapturedValueList, RuleError>;
}

/// Prefill and storage rules for captured values.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCapture;

impl ValueCapture {
    /// The values to pre-fill the widget for `field` with.
    ///
    /// Stored values are reused only if they were captured against the
    /// configuration's current selection and that selection names `field`.
    /// Anything else yields an empty list.
    #[must_use]
    pub fn capture_defaults(config: &RuleConfiguration, field: &FieldDescriptor) -> CapturedValueList {
        if config.entity_field.as_deref() != Some(field.id.as_str()) {
            return CapturedValueList::new();
        }
        match config.current_captured() {
            Some(values) => values.clone(),
            None => {
                if let (Some(values), Some(context)) =
                    (&config.captured_values, &config.captured_against)
                {
                    tracing::debug!(
                        field = %field.id,
                        discarded = values.len(),
                        captured_for = %context.entity_field,
                        "not reusing values captured against another selection"
                    );
                }
                CapturedValueList::new()
            }
        }
    }

    /// Store a widget submission on `config`.
    ///
    /// Empty entries are removed before storing; the values are recorded
    /// against the current selection.
    ///
    /// # Errors
    ///
    /// - [`RuleError::InconsistentConfiguration`] if `config` does not
    ///   currently select `field`.
    /// - [`RuleError::InvalidSubmission`] if a single-valued field receives
    ///   more than one value.
    /// - [`RuleError::TooManyValues`] above [`MAX_CAPTURED_VALUES`].
    pub fn capture(
        config: &RuleConfiguration,
        field: &FieldDescriptor,
        submitted: CapturedValueList,
    ) -> Result<RuleConfiguration, RuleError> {
        if config.selection_context().is_none()
            || config.entity_field.as_deref() != Some(field.id.as_str())
        {
            return Err(RuleError::InconsistentConfiguration {
                reason: format!("values submitted for \"{}\", which is not selected", field.id),
            });
        }

        let submitted_len = submitted.len();
        let values = submitted.without_empty();
        if values.len() < submitted_len {
            tracing::debug!(
                field = %field.id,
                removed = submitted_len - values.len(),
                "dropped empty entries from submission"
            );
        }

        if !field.is_multi_valued() && values.len() > 1 {
            return Err(RuleError::InvalidSubmission {
                reason: format!(
                    "field \"{}\" holds one value, {} were submitted",
                    field.id,
                    values.len()
                ),
            });
        }
        if values.len() > MAX_CAPTURED_VALUES {
            return Err(RuleError::TooManyValues {
                count: values.len(),
                max: MAX_CAPTURED_VALUES,
            });
        }

        Ok(config.clone().with_captured(values))
    }

    /// Drop stored values that were captured against another selection.
    ///
    /// Returns `true` if anything was dropped.
    pub fn reconcile(config: &mut RuleConfiguration) -> bool {
        if config.captured_values.is_none() || config.current_captured().is_some() {
            return false;
        }
        tracing::debug!(
            summary = %config.summary(),
            "discarding values captured against a previous selection"
        );
        config.captured_values = None;
        config.captured_against = None;
        true
    }
}
