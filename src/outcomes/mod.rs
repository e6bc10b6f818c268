//! QC tests: outcome definitions matched against the failed and passed rules of a sample.

#[cfg(test)]
mod tests;

use crate::utils::split_list;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use uqcme_table::Table;

/// Outcome of a sample that failed no rules.
pub const PASS: &str = "PASS";
/// Outcome of a sample that failed rules no QC test accounts for.
pub const FAIL: &str = "FAIL";
/// Action of an outcome that has no QC test.
pub const NO_ACTION: &str = "none";

// ----------------------------------------------------------------------------
// QC Test
// ----------------------------------------------------------------------------

/// A row of the QC tests table.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct QcTest {
    pub outcome_id: String,
    pub outcome_name: String,
    pub description: String,
    /// Higher is more important, at least 1.
    pub priority: u32,
    /// Comma-separated rules that must have been evaluated without failing.
    #[serde(default)]
    pub passed_rule_conditions: String,
    /// Comma-separated rules, any failure matches.
    #[serde(default)]
    pub failed_rule_conditions: String,
    pub action_required: String,
}

impl QcTest {
    pub fn passed_conditions(&self) -> Vec<&str> {
        split_list(&self.passed_rule_conditions)
    }

    pub fn failed_conditions(&self) -> Vec<&str> {
        split_list(&self.failed_rule_conditions)
    }

    /// Returns true if the failed and passed rules of a sample match this test.
    ///
    /// - With no conditions, the test matches when nothing failed.
    /// - Passed conditions need at least one of their rules evaluated and none failed.
    /// - Failed conditions need any of their rules failed.
    /// - When both are given, both must hold.
    ///
    /// ```rust
    /// use uqcme::outcomes::QcTest;
    ///
    /// let test = QcTest {
    ///     outcome_id: "LOW_GC".to_string(),
    ///     outcome_name: "Low GC".to_string(),
    ///     description: String::new(),
    ///     priority: 2,
    ///     passed_rule_conditions: String::new(),
    ///     failed_rule_conditions: "R1, R2".to_string(),
    ///     action_required: "review".to_string(),
    /// };
    /// let failed = vec!["R2".to_string()];
    /// assert!(test.matches(&failed, &[]));
    /// assert!(!test.matches(&[], &failed));
    /// ```
    pub fn matches(&self, failed: &[String], passed: &[String]) -> bool {
        let passed_conditions = self.passed_conditions();
        let failed_conditions = self.failed_conditions();
        let has_failed = |rule: &&str| failed.iter().any(|f| f == rule);
        let has_passed = |rule: &&str| passed.iter().any(|p| p == rule);

        if passed_conditions.is_empty() && failed_conditions.is_empty() {
            return failed.is_empty();
        }

        let passed_match = passed_conditions.is_empty()
            || (passed_conditions.iter().any(|r| has_passed(r) || has_failed(r))
                && !passed_conditions.iter().any(has_failed));
        let failed_match = failed_conditions.is_empty() || failed_conditions.iter().any(has_failed);

        passed_match && failed_match
    }
}

// ----------------------------------------------------------------------------
// Resolved Outcome
// ----------------------------------------------------------------------------

/// The single outcome of a sample and the action it requires.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolved {
    pub outcome_id: String,
    /// Priority of the QC test, [`None`] if the outcome has no test.
    pub priority: Option<u32>,
    pub action: String,
}

// ----------------------------------------------------------------------------
// QC Tests
// ----------------------------------------------------------------------------

/// The QC tests table, in file order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QcTests {
    pub tests: Vec<QcTest>,
    pub path: Option<PathBuf>,
}

impl QcTests {
    /// Read and validate the QC tests from a TSV file.
    pub fn read<P>(path: &P) -> Result<QcTests, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| eyre!("Failed to load QC tests: {path:?}"))
            .suggestion("Check 'qc_tests' in the input section of the config.")?;
        let mut tests = QcTests::from_reader(file)
            .wrap_err_with(|| eyre!("QC tests validation failed: {path:?}"))?;
        tests.path = Some(path.as_ref().to_path_buf());
        info!("QC tests loaded: {} tests from {path:?}", tests.len());
        Ok(tests)
    }

    /// Parse and validate QC tests from tab-separated text.
    pub fn from_reader<R: Read>(reader: R) -> Result<QcTests, Report> {
        let tests = Table::from_reader(reader, b'\t')?.deserialize().wrap_err("Invalid QC tests.")?;

        let tests = QcTests { tests, path: None };
        tests.validate()?;
        Ok(tests)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QcTest> {
        self.tests.iter()
    }

    /// Returns the test of an outcome.
    pub fn get(&self, outcome_id: &str) -> Option<&QcTest> {
        self.tests.iter().find(|test| test.outcome_id == outcome_id)
    }

    /// Check that outcome ids are unique and priorities are at least 1.
    pub fn validate(&self) -> Result<(), Report> {
        let duplicates = self.tests.iter().map(|test| &test.outcome_id).duplicates().collect_vec();
        if !duplicates.is_empty() {
            return Err(eyre!("Duplicate outcome_id: {}", duplicates.iter().join(", ")))
                .suggestion("Every outcome_id in the QC tests must be unique.");
        }
        if let Some(test) = self.tests.iter().find(|test| test.priority < 1) {
            return Err(eyre!("Priority of {} must be at least 1.", test.outcome_id));
        }
        Ok(())
    }

    /// Replace test priorities with configured ones.
    pub fn apply_priorities(&mut self, priorities: &BTreeMap<String, u32>) -> Result<(), Report> {
        for (outcome_id, priority) in priorities {
            if *priority < 1 {
                return Err(eyre!("Priority of {outcome_id} must be at least 1."))
                    .suggestion("Check 'outcome_priorities' in the config.");
            }
            match self.tests.iter_mut().find(|test| &test.outcome_id == outcome_id) {
                Some(test) => test.priority = *priority,
                None => warn!("Outcome priority configured for unknown outcome: {outcome_id}"),
            }
        }
        Ok(())
    }

    /// Returns the ids of all tests matched by a sample, in file order.
    ///
    /// When nothing matched but rules failed, the outcome is [`FAIL`].
    pub fn determine(&self, failed: &[String], passed: &[String]) -> Vec<String> {
        let mut outcomes = self
            .tests
            .iter()
            .filter(|test| test.matches(failed, passed))
            .map(|test| test.outcome_id.clone())
            .collect_vec();
        if outcomes.is_empty() && !failed.is_empty() {
            outcomes.push(FAIL.to_string());
        }
        outcomes
    }

    /// Resolve the single outcome of a sample.
    ///
    /// A sample with no failed rules passes. Otherwise the matched test with
    /// the highest priority wins, the first in file order on ties.
    pub fn resolve(&self, matched: &[String], failed: &[String]) -> Resolved {
        let test = if failed.is_empty() {
            self.get(PASS)
        } else {
            matched
                .iter()
                .filter_map(|outcome_id| self.get(outcome_id))
                // max_by_key keeps the last maximum, so compare in reverse
                .rev()
                .max_by_key(|test| test.priority)
        };

        match test {
            Some(test) => Resolved {
                outcome_id: test.outcome_id.clone(),
                priority: Some(test.priority),
                action: test.action_required.clone(),
            },
            None => Resolved {
                outcome_id: if failed.is_empty() { PASS } else { FAIL }.to_string(),
                priority: None,
                action: NO_ACTION.to_string(),
            },
        }
    }
}

impl<'t> IntoIterator for &'t QcTests {
    type Item = &'t QcTest;
    type IntoIter = std::slice::Iter<'t, QcTest>;

    fn into_iter(self) -> Self::IntoIter {
        self.tests.iter()
    }
}

impl FromIterator<QcTest> for QcTests {
    fn from_iter<I: IntoIterator<Item = QcTest>>(iter: I) -> Self {
        QcTests { tests: iter.into_iter().collect(), path: None }
    }
}
