//! QC [`Rule`]s: a comparison of one sample field against a threshold or pattern.

#[cfg(test)]
mod tests;

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};
use uqcme_table::Table;

/// Rule scope value that matches every species or assembly type.
pub const ALL: &str = "all";

// ----------------------------------------------------------------------------
// Operator
// ----------------------------------------------------------------------------

/// Comparison of a sample value (left) against a rule value (right).
///
/// ```rust
/// use uqcme::rules::Operator;
/// use std::str::FromStr;
///
/// assert_eq!(Operator::from_str(">=")?, Operator::GreaterEqual);
/// assert_eq!(Operator::Contains.to_string(), "contains");
/// assert!(Operator::from_str("~").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Display, EnumIter, EnumString, Eq, PartialEq, Serialize)]
pub enum Operator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Equal,
    #[serde(rename = "!=")]
    #[strum(serialize = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Greater,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Less,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    LessEqual,
    #[serde(rename = "regex")]
    #[strum(serialize = "regex")]
    Regex,
    #[serde(rename = "contains")]
    #[strum(serialize = "contains")]
    Contains,
}

// ----------------------------------------------------------------------------
// Rule
// ----------------------------------------------------------------------------

/// A row of the QC rules table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Rule {
    pub rule_id: String,
    /// Target species, or `all`.
    pub species: String,
    /// Target assembly type, or `all`.
    pub assembly_type: String,
    /// Software that produced the metric.
    #[serde(default)]
    pub software: String,
    /// Metric name, resolved to a data column through the mapping.
    pub field: String,
    pub operator: Operator,
    /// Threshold or pattern.
    #[serde(default)]
    pub value: String,
    /// Informational only.
    #[serde(default)]
    pub special_field: String,
}

impl Rule {
    /// Returns true if the rule should be evaluated for a sample.
    ///
    /// ## Arguments
    ///
    /// - `species` - Species of the sample, may be empty.
    /// - `assembly_type` - Assembly type of the sample.
    /// - `software` - Allowed software, [`None`] allows all.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use uqcme::rules::{Operator, Rule};
    ///
    /// let rule = Rule {
    ///     rule_id: "R1".to_string(),
    ///     species: "Escherichia coli".to_string(),
    ///     assembly_type: "all".to_string(),
    ///     software: String::new(),
    ///     field: "GC".to_string(),
    ///     operator: Operator::Greater,
    ///     value: "50".to_string(),
    ///     special_field: String::new(),
    /// };
    /// assert!(rule.in_scope("escherichia COLI", "long", None));
    /// assert!(!rule.in_scope("", "short", None));
    /// ```
    pub fn in_scope(&self, species: &str, assembly_type: &str, software: Option<&[String]>) -> bool {
        let rule_species = self.species.trim();
        let species = species.trim();
        let species_match = rule_species.eq_ignore_ascii_case(ALL)
            || (!rule_species.is_empty()
                && !species.is_empty()
                && rule_species.to_lowercase() == species.to_lowercase());

        let rule_assembly = self.assembly_type.trim();
        let assembly_match = rule_assembly.eq_ignore_ascii_case(ALL)
            || rule_assembly.to_lowercase() == assembly_type.trim().to_lowercase();

        let rule_software = self.software.trim();
        let software_match = match software {
            Some(allowed) if !rule_software.is_empty() => allowed
                .iter()
                .any(|s| s.trim().to_lowercase() == rule_software.to_lowercase()),
            _ => true,
        };

        species_match && assembly_match && software_match
    }

    /// Compile the pattern of a regex rule.
    ///
    /// Patterns are anchored at the start of the value.
    pub fn compile(&self) -> Result<Option<Regex>, Report> {
        if self.operator != Operator::Regex {
            return Ok(None);
        }
        let regex = Regex::new(&format!("^(?:{})", self.value))
            .wrap_err_with(|| eyre!("Invalid regex in rule {}: {:?}", self.rule_id, self.value))?;
        Ok(Some(regex))
    }
}

// ----------------------------------------------------------------------------
// Rules
// ----------------------------------------------------------------------------

/// The QC rules table, in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Rules {
    pub rules: Vec<Rule>,
    pub path: Option<PathBuf>,
}

impl Rules {
    /// Read and validate the QC rules from a TSV file.
    pub fn read<P>(path: &P) -> Result<Rules, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| eyre!("Failed to load QC rules: {path:?}"))
            .suggestion("Check 'qc_rules' in the input section of the config.")?;
        let mut rules = Rules::from_reader(file)
            .wrap_err_with(|| eyre!("QC rules validation failed: {path:?}"))?;
        rules.path = Some(path.as_ref().to_path_buf());
        info!("QC rules loaded: {} rules from {path:?}", rules.len());
        Ok(rules)
    }

    /// Parse and validate QC rules from tab-separated text.
    pub fn from_reader<R: Read>(reader: R) -> Result<Rules, Report> {
        let rules = Table::from_reader(reader, b'\t')?.deserialize().wrap_err("Invalid QC rules.")?;

        let rules = Rules { rules, path: None };
        rules.validate()?;
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Returns the rule with this id.
    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.rule_id == rule_id)
    }

    /// Check that rule ids are unique and regex patterns compile.
    pub fn validate(&self) -> Result<(), Report> {
        let duplicates = self.rules.iter().map(|rule| &rule.rule_id).duplicates().collect_vec();
        if !duplicates.is_empty() {
            return Err(eyre!("Duplicate rule_id: {}", duplicates.iter().join(", ")))
                .suggestion("Every rule_id in the QC rules must be unique.");
        }
        self.compile()?;
        Ok(())
    }

    /// Compile the patterns of all regex rules, keyed by rule id.
    pub fn compile(&self) -> Result<BTreeMap<String, Regex>, Report> {
        let mut patterns = BTreeMap::new();
        for rule in &self.rules {
            if let Some(regex) = rule.compile()? {
                patterns.insert(rule.rule_id.clone(), regex);
            }
        }
        Ok(patterns)
    }
}

impl<'r> IntoIterator for &'r Rules {
    type Item = &'r Rule;
    type IntoIter = std::slice::Iter<'r, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

impl FromIterator<Rule> for Rules {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Rules { rules: iter.into_iter().collect(), path: None }
    }
}
