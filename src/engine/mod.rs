//! Evaluate QC rules against each sample and derive its outcomes and action.

#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::data::SAMPLE_NAME;
use crate::mapping::Mapping;
use crate::outcomes::{QcTests, Resolved, PASS};
use crate::rules::{Operator, Rule, Rules};
use crate::utils::is_missing;
use color_eyre::eyre::{Report, Result};
use itertools::Itertools;
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uqcme_table::Table;

/// Column of the run data with the species of each sample.
pub const SPECIES: &str = "species";
/// Column of the run data with the assembly type of each sample.
pub const ASSEMBLY_TYPE: &str = "assembly_type";

// ----------------------------------------------------------------------------
// Results
// ----------------------------------------------------------------------------

/// Result of evaluating one rule against one sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RuleResult {
    Pass,
    Fail,
    /// The field of the rule is not a column of the data.
    Skip,
}

/// QC result of one sample.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SampleResult {
    pub sample_name: String,
    /// Failed rule ids, in rule file order.
    pub failed_rules: Vec<String>,
    /// Passed rule ids, in rule file order.
    pub passed_rules: Vec<String>,
    /// Ids of all matched QC tests.
    pub outcomes: Vec<String>,
    /// The single outcome and the action it requires.
    pub resolved: Resolved,
}

impl SampleResult {
    /// Comma-joined matched outcomes, or `PASS` when nothing matched.
    pub fn qc_outcome(&self) -> String {
        match self.outcomes.is_empty() {
            true => PASS.to_string(),
            false => self.outcomes.join(","),
        }
    }
}

/// Results of all samples plus what could not be evaluated.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Evaluation {
    /// One result per sample, in data order.
    pub results: Vec<SampleResult>,
    /// Unique warnings, sorted.
    pub warnings: BTreeSet<String>,
    /// Rules skipped for at least one sample, sorted.
    pub skipped_rules: BTreeSet<String>,
}

// ----------------------------------------------------------------------------
// Operators
// ----------------------------------------------------------------------------

/// Apply a rule operator to a sample value and the rule threshold.
///
/// Missing values never satisfy a rule. Numeric operators fail (with a
/// logged warning) when either side isn't a number. A precompiled `pattern`
/// is used for [`Operator::Regex`] when given.
///
/// ## Examples
///
/// ```rust
/// use uqcme::engine::apply_operator;
/// use uqcme::rules::Operator;
///
/// assert!(apply_operator("52.1", Operator::GreaterEqual, "50", None));
/// assert!(apply_operator("50.0", Operator::Equal, "50", None));
/// assert!(apply_operator("short", Operator::NotEqual, "long", None));
/// assert!(apply_operator("Escherichia coli", Operator::Regex, "Escherichia", None));
/// assert!(!apply_operator("E. Escherichia", Operator::Regex, "Escherichia", None));
/// assert!(!apply_operator("NaN", Operator::NotEqual, "50", None));
/// assert!(!apply_operator("high", Operator::Greater, "50", None));
/// ```
pub fn apply_operator(value: &str, operator: Operator, threshold: &str, pattern: Option<&Regex>) -> bool {
    if is_missing(value) {
        debug!("Missing value, {operator} {threshold:?} fails.");
        return false;
    }

    let numbers = || match (value.trim().parse::<f64>(), threshold.trim().parse::<f64>()) {
        (Ok(value), Ok(threshold)) => Some((value, threshold)),
        _ => None,
    };

    match operator {
        Operator::Greater | Operator::Less | Operator::GreaterEqual | Operator::LessEqual => {
            let Some((value, threshold)) = numbers() else {
                warn!("Error applying operator {operator}: value={value:?}, threshold={threshold:?} are not both numbers.");
                return false;
            };
            match operator {
                Operator::Greater => value > threshold,
                Operator::Less => value < threshold,
                Operator::GreaterEqual => value >= threshold,
                _ => value <= threshold,
            }
        }
        Operator::Equal => match numbers() {
            Some((value, threshold)) => value == threshold,
            None => value.trim() == threshold.trim(),
        },
        Operator::NotEqual => match numbers() {
            Some((value, threshold)) => value != threshold,
            None => value.trim() != threshold.trim(),
        },
        Operator::Regex => match pattern {
            Some(regex) => regex.is_match(value),
            None => match Regex::new(&format!("^(?:{threshold})")) {
                Ok(regex) => regex.is_match(value),
                Err(e) => {
                    warn!("Invalid regex {threshold:?}: {e}");
                    false
                }
            },
        },
        Operator::Contains => value.contains(threshold),
    }
}

// ----------------------------------------------------------------------------
// Engine
// ----------------------------------------------------------------------------

/// Rules, tests, and mapping ready for evaluation.
#[derive(Clone, Debug)]
pub struct Engine {
    pub rules: Rules,
    pub tests: QcTests,
    pub mapping: Mapping,
    /// Rule field => data column.
    field_mapping: BTreeMap<String, String>,
    /// Compiled patterns of regex rules, by rule id.
    patterns: BTreeMap<String, Regex>,
}

impl Engine {
    /// Prepare an [`Engine`], compiling the patterns of regex rules.
    pub fn new(rules: Rules, tests: QcTests, mapping: Mapping) -> Result<Engine, Report> {
        let patterns = rules.compile()?;
        let field_mapping = mapping.field_mapping();
        let engine = Engine { rules, tests, mapping, field_mapping, patterns };
        engine.check_references().iter().for_each(|w| warn!("{w}"));
        Ok(engine)
    }

    /// Load the mapping, rules, and tests named by the QC section of the config.
    ///
    /// Configured `outcome_priorities` replace the priorities of the tests.
    pub fn from_config(config: &Config) -> Result<Engine, Report> {
        let qc = config.qc()?;
        let mapping = Mapping::read(&qc.input.mapping)?;
        let rules = Rules::read(&qc.input.qc_rules)?;
        let mut tests = QcTests::read(&qc.input.qc_tests)?;
        tests.apply_priorities(&config.outcome_priorities)?;
        Engine::new(rules, tests, mapping)
    }

    /// Returns a message for every test condition that names an unknown rule.
    pub fn check_references(&self) -> Vec<String> {
        self.tests
            .iter()
            .flat_map(|test| {
                test.passed_conditions()
                    .into_iter()
                    .chain(test.failed_conditions())
                    .filter(move |rule_id| self.rules.get(rule_id).is_none())
                    .map(move |rule_id| {
                        format!("QC test {} refers to unknown rule {rule_id}", test.outcome_id)
                    })
            })
            .unique()
            .collect()
    }

    /// Returns the data column a rule field is read from.
    pub fn resolve_field<'f>(&'f self, field: &'f str) -> &'f str {
        self.field_mapping.get(field).map(String::as_str).unwrap_or(field)
    }

    /// Species and assembly type of a sample.
    ///
    /// The assembly type defaults to the first configured override, then `short`.
    pub fn sample_attributes(&self, data: &Table<String>, row: usize) -> (String, String) {
        let species = data.get(SPECIES, row).map(|s| s.trim().to_string()).unwrap_or_default();
        let assembly_type = data
            .get(ASSEMBLY_TYPE, row)
            .ok()
            .filter(|value| !is_missing(value))
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| self.mapping.default_assembly_type().to_string());
        (species, assembly_type)
    }

    /// Evaluate one rule against one sample.
    ///
    /// A rule whose field isn't a column of the data is skipped, and the
    /// reason is recorded in the `evaluation` warnings.
    pub fn evaluate_rule(
        &self,
        rule: &Rule,
        data: &Table<String>,
        row: usize,
        evaluation: &mut Evaluation,
    ) -> Result<RuleResult, Report> {
        let column = self.resolve_field(&rule.field);

        if !data.has_header(column) {
            let warning = match self.field_mapping.contains_key(&rule.field) {
                true => format!("Field '{}' (mapped to '{column}') not found in sample data", rule.field),
                false => format!(
                    "Field '{}' not found in sample data (no mapping defined in config)",
                    rule.field
                ),
            };
            evaluation.warnings.insert(warning);
            evaluation.skipped_rules.insert(rule.rule_id.clone());
            return Ok(RuleResult::Skip);
        }

        let value = data.get(column, row)?;
        let pattern = self.patterns.get(&rule.rule_id);
        match apply_operator(value, rule.operator, &rule.value, pattern) {
            true => Ok(RuleResult::Pass),
            false => Ok(RuleResult::Fail),
        }
    }

    /// Evaluate every sample against every rule in scope.
    pub fn evaluate(&self, data: &Table<String>) -> Result<Evaluation, Report> {
        info!("Processing {} samples through {} QC rules.", data.len(), self.rules.len());
        let software = self.mapping.qc_overrides.software.as_deref();
        let mut evaluation = Evaluation::default();

        for row in 0..data.len() {
            let sample_name = data.get(SAMPLE_NAME, row)?.clone();
            let (species, assembly_type) = self.sample_attributes(data, row);

            let mut failed_rules = Vec::new();
            let mut passed_rules = Vec::new();

            for rule in self.rules.iter().filter(|r| r.in_scope(&species, &assembly_type, software)) {
                match self.evaluate_rule(rule, data, row, &mut evaluation)? {
                    RuleResult::Pass => passed_rules.push(rule.rule_id.clone()),
                    RuleResult::Fail => failed_rules.push(rule.rule_id.clone()),
                    RuleResult::Skip => (),
                }
            }

            let outcomes = self.tests.determine(&failed_rules, &passed_rules);
            let resolved = self.tests.resolve(&outcomes, &failed_rules);
            debug!("{sample_name}: failed={failed_rules:?} outcome={}", resolved.outcome_id);

            evaluation.results.push(SampleResult {
                sample_name,
                failed_rules,
                passed_rules,
                outcomes,
                resolved,
            });
        }

        info!("Processed {} samples.", evaluation.results.len());
        Ok(evaluation)
    }
}
