//! Conformance test fixture runner
//!
//! Loads YAML fixtures and runs them against the fieldrule engine. A fixture
//! holds a rule and either evaluation cases (entity in, boolean out) or
//! configuration rounds (choice in, repaired rule and level options out), or
//! both.
//!
//! ```yaml
//! name: match_one_disjoint
//! description: No captured tag is present
//! rule: { entity_type: node, entity_bundles: [article], entity_field: field_tags, ... }
//! cases:
//!   - name: other tags
//!     entity: { entity_type: node, bundle: article, fields: { ... } }
//!     expect: false
//!     rejection: values_mismatch
//! ---
//! name: bundle_shrinks
//! catalog: { ... }
//! rule: { ... }
//! rounds:
//!   - name: repair
//!     expect: { state: type_chosen, stale: [entity_bundle] }
//! ```

use crate::{StaticCatalog, TextWidget};
use fieldrule::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A complete test fixture
#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub catalog: StaticCatalog,
    #[serde(default)]
    pub rule: RuleConfiguration,
    #[serde(default)]
    pub cases: Vec<EvalCase>,
    #[serde(default)]
    pub rounds: Vec<RoundCase>,
}

/// One evaluation of the fixture's rule
#[derive(Debug, Deserialize)]
pub struct EvalCase {
    pub name: String,
    pub entity: EntityFieldSnapshot,
    /// Final answer, negation applied.
    pub expect: bool,
    /// Expected rejection reason (wire name), if checked.
    #[serde(default)]
    pub rejection: Option<String>,
}

/// One configuration round. Rounds run in order, each on the previous result.
#[derive(Debug, Deserialize)]
pub struct RoundCase {
    pub name: String,
    /// `level=value`, as parsed by [`Choice`]'s `FromStr`.
    #[serde(default)]
    pub choose: Option<String>,
    /// Raw [`TextWidget`] submission for the resolved field.
    #[serde(default)]
    pub submit: Option<String>,
    /// Catalog edits applied before the round, written `- remove_bundle: { ... }`.
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub drift: Vec<Drift>,
    pub expect: RoundExpect,
}

/// A catalog change between rounds
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Drift {
    RemoveBundle { entity_type: String, bundle: String },
    RemoveField { entity_type: String, bundle: String, field: String },
}

/// Expected round outcome; only the keys present are checked.
#[derive(Debug, Default, Deserialize)]
pub struct RoundExpect {
    #[serde(default)]
    pub state: Option<ConfigState>,
    #[serde(default)]
    pub stale: Option<Vec<Level>>,
    #[serde(default)]
    pub options: BTreeMap<Level, Vec<String>>,
    #[serde(default)]
    pub current: BTreeMap<Level, Vec<String>>,
    #[serde(default)]
    pub compare_methods: Option<Vec<CompareMethod>>,
    #[serde(default)]
    pub compare_method: Option<CompareMethod>,
    /// Expected prefill as primary-property values.
    #[serde(default)]
    pub prefill: Option<Vec<String>>,
    /// Expected error kind; the configuration is left unchanged.
    #[serde(default)]
    pub error: Option<String>,
}

/// Result of running a single test case
#[derive(Debug)]
pub struct CaseResult {
    pub case_name: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

impl CaseResult {
    fn check(case_name: &str, expected: String, actual: String) -> Self {
        Self {
            case_name: case_name.to_owned(),
            passed: expected == actual,
            expected,
            actual,
        }
    }
}

/// Wire name of an error kind, as written in fixtures.
#[must_use]
pub fn error_kind(err: &RuleError) -> &'static str {
    match err {
        RuleError::DuplicateLevel { .. } => "duplicate_level",
        RuleError::UpstreamUnresolved { .. } => "upstream_unresolved",
        RuleError::InconsistentConfiguration { .. } => "inconsistent_configuration",
        RuleError::InvalidSubmission { .. } => "invalid_submission",
        RuleError::Parse { .. } => "parse",
        RuleError::UnknownName { .. } => "unknown_name",
        RuleError::TooManyValues { .. } => "too_many_values",
    }
}

fn rejection_name(rejection: &Rejection) -> String {
    serde_json::to_value(rejection)
        .ok()
        .and_then(|v| v.get("reason").and_then(|r| r.as_str()).map(str::to_owned))
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Runner
// ═══════════════════════════════════════════════════════════════════════════════

impl Fixture {
    /// Parse a fixture from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Parse multiple fixtures from a YAML file with `---` separators
    pub fn from_yaml_multi(yaml: &str) -> Result<Vec<Self>, serde_yaml::Error> {
        let mut fixtures = Vec::new();
        for doc in serde_yaml::Deserializer::from_str(yaml) {
            fixtures.push(Self::deserialize(doc)?);
        }
        Ok(fixtures)
    }

    /// Run all cases and rounds and return results
    pub fn run(&self) -> Vec<CaseResult> {
        let mut results = self.run_cases();
        results.extend(self.run_rounds());
        results
    }

    fn run_cases(&self) -> Vec<CaseResult> {
        let condition = match Condition::new(self.rule.clone()) {
            Ok(condition) => condition,
            Err(e) => {
                return vec![CaseResult::check(
                    "load rule",
                    "valid rule".into(),
                    e.to_string(),
                )]
            }
        };

        let mut results = Vec::new();
        for case in &self.cases {
            let (actual, trace) = condition.evaluate_with_trace(&case.entity);
            results.push(CaseResult::check(
                &case.name,
                case.expect.to_string(),
                actual.to_string(),
            ));
            if let Some(expected) = &case.rejection {
                let actual = trace
                    .rejection
                    .as_ref()
                    .map(rejection_name)
                    .unwrap_or_else(|| "none".into());
                results.push(CaseResult::check(
                    &format!("{} (rejection)", case.name),
                    expected.clone(),
                    actual,
                ));
            }
        }
        results
    }

    fn run_rounds(&self) -> Vec<CaseResult> {
        let mut catalog = self.catalog.clone();
        let mut config = self.rule.clone();
        let mut results = Vec::new();

        for round in &self.rounds {
            for drift in &round.drift {
                match drift {
                    Drift::RemoveBundle {
                        entity_type,
                        bundle,
                    } => catalog.remove_bundle(entity_type, bundle),
                    Drift::RemoveField {
                        entity_type,
                        bundle,
                        field,
                    } => catalog.remove_field(entity_type, bundle, field),
                }
            }

            let session = ConfigurationSession::new(&catalog);
            match run_round(&session, &config, round) {
                Ok(outcome) => {
                    results.extend(check_round(round, &outcome));
                    config = outcome.config;
                }
                Err(e) => results.push(CaseResult::check(
                    &format!("{} (error)", round.name),
                    round.expect.error.clone().unwrap_or_else(|| "none".into()),
                    error_kind(&e).to_owned(),
                )),
            }
        }
        results
    }

    /// Run all cases and rounds and panic on first failure
    pub fn run_and_assert(&self) {
        let results = self.run();
        for result in results {
            assert!(
                result.passed,
                "Fixture '{}' case '{}' failed: expected {}, got {}",
                self.name, result.case_name, result.expected, result.actual
            );
        }
    }
}

fn run_round(
    session: &ConfigurationSession<&StaticCatalog>,
    config: &RuleConfiguration,
    round: &RoundCase,
) -> Result<Round, RuleError> {
    let choice = round.choose.as_deref().map(str::parse::<Choice>).transpose()?;
    let outcome = session.round(config, choice)?;

    let Some(raw) = &round.submit else {
        return Ok(outcome);
    };
    let field = outcome.field.as_ref().ok_or_else(|| RuleError::InvalidSubmission {
        reason: "no field to submit values for".into(),
    })?;
    let prefill = outcome.prefill.clone().unwrap_or_default();
    let spec = TextWidget.render(field, &prefill);
    let values = TextWidget.parse_submission(&spec, raw)?;
    session.round(&outcome.config, Some(Choice::Values(values)))
}

fn check_round(round: &RoundCase, outcome: &Round) -> Vec<CaseResult> {
    let expect = &round.expect;
    let label = |what: &str| format!("{} ({what})", round.name);
    let mut results = Vec::new();

    if let Some(error) = &expect.error {
        results.push(CaseResult::check(
            &label("error"),
            error.clone(),
            "none".into(),
        ));
    }
    if let Some(state) = expect.state {
        results.push(CaseResult::check(
            &label("state"),
            format!("{state:?}"),
            format!("{:?}", outcome.state),
        ));
    }
    if let Some(stale) = &expect.stale {
        results.push(CaseResult::check(
            &label("stale"),
            format!("{stale:?}"),
            format!("{:?}", outcome.stale_levels().collect::<Vec<_>>()),
        ));
    }
    for (level, ids) in &expect.options {
        let actual = outcome.level(*level).map(|r| {
            r.options
                .iter()
                .map(|o| o.id.clone())
                .collect::<Vec<_>>()
        });
        results.push(CaseResult::check(
            &label(&format!("{level} options")),
            format!("{:?}", Some(ids)),
            format!("{:?}", actual.as_ref()),
        ));
    }
    for (level, ids) in &expect.current {
        results.push(CaseResult::check(
            &label(&format!("{level} current")),
            format!("{ids:?}"),
            format!("{:?}", outcome.config.selected(*level)),
        ));
    }
    if let Some(methods) = &expect.compare_methods {
        results.push(CaseResult::check(
            &label("compare methods"),
            format!("{methods:?}"),
            format!("{:?}", outcome.compare_methods),
        ));
    }
    if let Some(method) = expect.compare_method {
        results.push(CaseResult::check(
            &label("compare method"),
            method.to_string(),
            outcome.config.compare_method.to_string(),
        ));
    }
    if let Some(prefill) = &expect.prefill {
        let actual: Option<Vec<&str>> = outcome.prefill.as_ref().zip(outcome.field.as_ref()).map(
            |(values, field)| values.property_values(&field.primary_property).collect(),
        );
        results.push(CaseResult::check(
            &label("prefill"),
            format!("{:?}", Some(prefill)),
            format!("{actual:?}"),
        ));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
name: smoke
catalog:
  entity_types: [{ id: node, label: Content }]
  bundles: { node: [{ id: article, label: Article }] }
  fields: { node: { article: [{ id: title, label: Title }] } }
rounds:
  - name: pick type
    choose: entity_type=node
    expect: { state: type_chosen, options: { entity_bundle: [article] } }
  - name: pick bundle
    choose: entity_bundles=article
    expect: { state: bundles_chosen }
  - name: pick field and submit
    choose: entity_field=title
    submit: "Hello"
    expect: { state: values_captured, prefill: [Hello], compare_methods: [] }
  - name: method on single-valued field
    choose: compare_method=match_one
    expect: { error: invalid_submission }
---
name: evaluation
rule:
  entity_type: node
  entity_bundles: [article]
  entity_field: title
  captured_values: [{ value: Hello }]
cases:
  - name: trimmed match
    entity:
      entity_type: node
      bundle: article
      fields: { title: { descriptor: { id: title, label: Title }, values: [{ value: "Hello " }] } }
    expect: true
  - name: wrong bundle
    entity: { entity_type: node, bundle: page }
    expect: false
    rejection: bundle_mismatch
"#;

    #[test]
    fn runs_inline_fixtures() {
        let fixtures = Fixture::from_yaml_multi(FIXTURE).unwrap();
        assert_eq!(fixtures.len(), 2);
        for fixture in fixtures {
            fixture.run_and_assert();
        }
    }

    #[test]
    fn drift_entries_parse_as_maps() {
        let fixture = Fixture::from_yaml(
            r#"
name: drift
catalog:
  entity_types: [{ id: node, label: Content }]
  bundles: { node: [{ id: article, label: Article }, { id: page, label: Page }] }
  fields:
    node:
      article: [{ id: title, label: Title }]
      page: [{ id: title, label: Title }]
rule: { entity_type: node, entity_bundles: [article, page], entity_field: title }
rounds:
  - name: field leaves page
    drift:
      - remove_field: { entity_type: node, bundle: page, field: title }
    expect: { state: bundles_chosen, stale: [entity_field] }
  - name: page deleted
    drift:
      - remove_bundle: { entity_type: node, bundle: page }
    expect: { state: type_chosen, stale: [entity_bundle], options: { entity_bundle: [article] } }
"#,
        )
        .unwrap();

        assert_eq!(fixture.rounds[0].drift.len(), 1);
        assert!(matches!(fixture.rounds[1].drift[0], Drift::RemoveBundle { .. }));
        fixture.run_and_assert();
    }

    #[test]
    fn round_outcome_is_checked() {
        let catalog = StaticCatalog::new()
            .with_entity_type(fieldrule::EntityTypeInfo::content("node", "Content"));
        let session = ConfigurationSession::new(&catalog);
        let round = RoundCase {
            name: "pick type".into(),
            choose: Some("entity_type=node".into()),
            submit: None,
            drift: Vec::new(),
            expect: RoundExpect {
                state: Some(ConfigState::TypeChosen),
                ..RoundExpect::default()
            },
        };

        let outcome: Round = run_round(&session, &RuleConfiguration::new(), &round).unwrap();
        let results = check_round(&round, &outcome);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
    }

    #[test]
    fn reports_mismatch() {
        let fixture = Fixture::from_yaml(
            r#"
name: wrong expectation
rule: { entity_type: node, entity_bundles: [article], entity_field: title, captured_values: [{ value: A }] }
cases:
  - name: mismatch
    entity: { entity_type: node, bundle: article }
    expect: true
"#,
        )
        .unwrap();
        let results = fixture.run();
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
    }

    #[test]
    fn error_kinds_are_snake_case() {
        let err = RuleError::DuplicateLevel {
            level: Level::EntityType,
        };
        assert_eq!(error_kind(&err), "duplicate_level");
    }
}
