//! Write QC results and warnings, and summarize an [`Evaluation`].


use crate::engine::Evaluation;
use crate::outcomes::PASS;
use crate::utils::create_parent_dir;
use chrono::{Local, SecondsFormat};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;
use uqcme_table::Table;

pub const FAILED_RULES: &str = "failed_rules";
pub const PASSED_RULES: &str = "passed_rules";
pub const QC_OUTCOME: &str = "qc_outcome";
pub const QC_ACTION: &str = "qc_action";

/// Columns appended to the run data, in order.
pub const RESULT_COLUMNS: [&str; 4] = [FAILED_RULES, PASSED_RULES, QC_OUTCOME, QC_ACTION];

/// Columns of the warnings table.
pub const WARNING_COLUMNS: [&str; 3] = ["warning_type", "warning_message", "timestamp"];

/// Number of failed rules listed in the summary.
pub const TOP_FAILED_RULES: usize = 10;

// ----------------------------------------------------------------------------
// Results
// ----------------------------------------------------------------------------

/// Returns the run data with the QC result columns of every sample.
///
/// Result columns that already exist in the data are overwritten in place,
/// otherwise they are appended.
pub fn results_table(data: &Table<String>, evaluation: &Evaluation) -> Result<Table<String>, Report> {
    if data.len() != evaluation.results.len() {
        return Err(eyre!(
            "Number of results ({}) does not match the number of samples ({}).",
            evaluation.results.len(),
            data.len()
        ));
    }

    let mut table = data.clone();
    for header in RESULT_COLUMNS {
        let column = evaluation
            .results
            .iter()
            .map(|result| match header {
                FAILED_RULES => result.failed_rules.join(","),
                PASSED_RULES => result.passed_rules.join(","),
                QC_OUTCOME => result.qc_outcome(),
                _ => result.resolved.action.clone(),
            })
            .collect_vec();

        match table.has_header(header) {
            true => {
                for (row, value) in column.into_iter().enumerate() {
                    table.set(header, row, value)?;
                }
            }
            false => table.add_column(header.to_string(), column)?,
        }
    }

    Ok(table)
}

/// Write the results table as TSV.
pub fn write_results<P>(table: &Table<String>, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    create_parent_dir(path)?;
    table.write(path, Some(b'\t')).wrap_err_with(|| eyre!("Failed to save results: {path:?}"))?;
    info!("Results saved to {path:?}");
    Ok(())
}

// ----------------------------------------------------------------------------
// Warnings
// ----------------------------------------------------------------------------

/// Returns one row per unique warning, followed by one row per skipped rule.
pub fn warnings_table(evaluation: &Evaluation) -> Result<Table<String>, Report> {
    let timestamp = Local::now().to_rfc3339_opts(SecondsFormat::Micros, false);

    let mut table = Table::new();
    table.headers = WARNING_COLUMNS.iter().map(|c| c.to_string()).collect();

    for warning in &evaluation.warnings {
        table.add_row(["processing".to_string(), warning.clone(), timestamp.clone()])?;
    }
    for rule_id in &evaluation.skipped_rules {
        let message = format!("Rule {rule_id} skipped due to missing fields");
        table.add_row(["skipped_rule".to_string(), message, timestamp.clone()])?;
    }

    Ok(table)
}

/// Write the warnings table as TSV, headers are written even without warnings.
pub fn write_warnings<P>(evaluation: &Evaluation, path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let table = warnings_table(evaluation)?;
    create_parent_dir(path)?;
    table.write(path, Some(b'\t')).wrap_err_with(|| eyre!("Failed to save warnings: {path:?}"))?;
    match table.is_empty() {
        true => info!("No warnings, empty file created at {path:?}"),
        false => info!("Warnings saved to {path:?}"),
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Summary
// ----------------------------------------------------------------------------

/// Counts that describe an [`Evaluation`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub samples: usize,
    /// Matched outcome => samples, samples that plainly passed are not counted.
    pub outcomes: BTreeMap<String, usize>,
    /// Most commonly failed rules, count descending then rule id.
    pub failed_rules: Vec<(String, usize)>,
    pub warnings: Vec<String>,
    pub skipped_rules: Vec<String>,
}

impl Summary {
    pub fn new(evaluation: &Evaluation) -> Self {
        let outcomes = evaluation
            .results
            .iter()
            .filter(|result| result.qc_outcome() != PASS)
            .flat_map(|result| &result.outcomes)
            .cloned()
            .counts()
            .into_iter()
            .collect();

        let failed_rules = evaluation
            .results
            .iter()
            .flat_map(|result| &result.failed_rules)
            .counts()
            .into_iter()
            .sorted_by(|(a, a_n), (b, b_n)| b_n.cmp(a_n).then(a.cmp(b)))
            .take(TOP_FAILED_RULES)
            .map(|(rule_id, count)| (rule_id.clone(), count))
            .collect();

        Summary {
            samples: evaluation.results.len(),
            outcomes,
            failed_rules,
            warnings: evaluation.warnings.iter().cloned().collect(),
            skipped_rules: evaluation.skipped_rules.iter().cloned().collect(),
        }
    }

    /// Log the summary at the info level.
    pub fn log(&self) {
        info!("Processing Summary:");
        info!("  Total samples processed: {}", self.samples);

        if !self.outcomes.is_empty() {
            info!("  QC Outcomes:");
            self.outcomes.iter().for_each(|(outcome, n)| info!("    {outcome}: {n}"));
        }
        if !self.failed_rules.is_empty() {
            info!("  Most common failed rules:");
            self.failed_rules.iter().for_each(|(rule_id, n)| info!("    {rule_id}: {n}"));
        }
        if !self.warnings.is_empty() {
            info!("Warnings encountered:");
            self.warnings.iter().for_each(|warning| info!("  {warning}"));
        }
        if !self.skipped_rules.is_empty() {
            info!("Skipped rules (due to missing fields):");
            info!("  {}", self.skipped_rules.join(", "));
        }
    }
}
