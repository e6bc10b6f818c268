//! Terminal dashboard over a QC results file.


use crate::config::{Config, DashboardConfig};
use crate::data::{DataSource, SAMPLE_NAME};
use crate::engine::SPECIES;
use crate::mapping::Mapping;
use crate::outcomes::{QcTests, PASS};
use crate::output::{FAILED_RULES, QC_ACTION, QC_OUTCOME, RESULT_COLUMNS};
use crate::rules::Rules;
use crate::utils::{is_missing, split_list};
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tabled::builder::Builder;
use tabled::settings::Style;
use uqcme_table::Table;

/// Number of species listed in the species distribution.
pub const TOP_SPECIES: usize = 10;
/// Width of the longest bar of the failed rules chart.
const BAR_WIDTH: usize = 30;

// ----------------------------------------------------------------------------
// Report Args
// ----------------------------------------------------------------------------

/// Print a dashboard of QC results.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
pub struct ReportArgs {
    /// Configuration file.
    #[cfg_attr(feature = "cli", clap(short = 'c', long, default_value = "config.yaml"))]
    pub config: PathBuf,

    /// QC results to report on, instead of the configured results.
    #[cfg_attr(feature = "cli", clap(short = 'r', long))]
    pub results: Option<PathBuf>,

    /// Mapping sections to show in the sample table.
    #[cfg_attr(feature = "cli", clap(short = 's', long))]
    pub section: Vec<String>,

    /// Show all mapping sections in the sample table.
    #[cfg_attr(feature = "cli", clap(long))]
    pub all_sections: bool,

    /// Only show samples with this outcome.
    #[cfg_attr(feature = "cli", clap(long))]
    pub outcome: Option<String>,

    /// Only show samples that require this action.
    #[cfg_attr(feature = "cli", clap(long))]
    pub action: Option<String>,

    /// Only show samples where a categorical column has a value (COLUMN=VALUE).
    #[cfg_attr(feature = "cli", clap(short = 'f', long))]
    pub filter: Vec<String>,

    /// Print markdown tables instead of boxes.
    #[cfg_attr(feature = "cli", clap(long))]
    pub markdown: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        ReportArgs {
            config: PathBuf::from("config.yaml"),
            results: None,
            section: Vec::new(),
            all_sections: false,
            outcome: None,
            action: None,
            filter: Vec::new(),
            markdown: false,
        }
    }
}

/// Print the dashboard of QC results.
pub async fn report(args: &ReportArgs, config: &Config) -> Result<(), Report> {
    let dashboard = Dashboard::load(args, config).await?;
    println!("{}", dashboard.render(args)?);
    Ok(())
}

// ----------------------------------------------------------------------------
// Dashboard
// ----------------------------------------------------------------------------

/// QC results with the reference files needed to describe them.
#[derive(Clone, Debug)]
pub struct Dashboard {
    pub title: String,
    pub results: Table<String>,
    pub mapping: Mapping,
    pub rules: Rules,
    pub tests: QcTests,
    pub settings: DashboardConfig,
    /// Number of warnings written alongside the results.
    pub warnings: Option<usize>,
}

impl Dashboard {
    /// Check that the results hold the QC columns.
    pub fn new(
        title: &str,
        results: Table<String>,
        mapping: Mapping,
        rules: Rules,
        tests: QcTests,
        settings: DashboardConfig,
    ) -> Result<Dashboard, Report> {
        if let Some(missing) = RESULT_COLUMNS.iter().find(|c| !results.has_header(**c)) {
            return Err(eyre!("QC results are missing column '{missing}'."))
                .suggestion("Create QC results with 'uqcme run' first.");
        }
        let title = title.to_string();
        Ok(Dashboard { title, results, mapping, rules, tests, settings, warnings: None })
    }

    /// Load the results and reference files named by the config.
    ///
    /// Report inputs fall back to the inputs and outputs of the QC section.
    pub async fn load(args: &ReportArgs, config: &Config) -> Result<Dashboard, Report> {
        let app = config.app.clone().unwrap_or_default();
        let qc = config.qc.as_ref();

        let source = match (&args.results, &app.input.data, qc) {
            (Some(path), _, _) => DataSource::File(path.clone()),
            (None, Some(source), _) => source.clone(),
            (None, None, Some(qc)) => DataSource::File(qc.output.results.clone()),
            (None, None, None) => {
                return Err(eyre!("No QC results to report on."))
                    .suggestion("Set 'app.input.data' in the config, or pass --results.")
            }
        };
        info!("Loading QC results: {source}");
        let results = source.load().await.wrap_err("Failed to load QC results.")?;

        let mapping = match app.input.mapping.as_ref().or(qc.map(|qc| &qc.input.mapping)) {
            Some(path) => Mapping::read(path)?,
            None => Mapping::default(),
        };
        let rules = match app.input.qc_rules.as_ref().or(qc.map(|qc| &qc.input.qc_rules)) {
            Some(path) => Rules::read(path)?,
            None => Rules::default(),
        };
        let mut tests = match app.input.qc_tests.as_ref().or(qc.map(|qc| &qc.input.qc_tests)) {
            Some(path) => QcTests::read(path)?,
            None => QcTests::default(),
        };
        tests.apply_priorities(&config.outcome_priorities)?;

        let mut dashboard =
            Dashboard::new(&config.title, results, mapping, rules, tests, app.dashboard)?;

        let warnings = app.input.warnings.or(qc.map(|qc| qc.output.warnings.clone()));
        if let Some(path) = warnings.filter(|path| path.exists()) {
            let warnings = Table::read(&path, Some(b'\t'))
                .wrap_err_with(|| eyre!("Failed to load warnings: {path:?}"))?;
            dashboard.warnings = Some(warnings.len());
        }

        Ok(dashboard)
    }

    /// Resolve the single outcome of a results row.
    pub fn resolved_outcome(&self, table: &Table<String>, row: usize) -> Result<String, Report> {
        let matched = split_list(table.get(QC_OUTCOME, row)?).into_iter().map(String::from).collect_vec();
        let failed = split_list(table.get(FAILED_RULES, row)?).into_iter().map(String::from).collect_vec();
        Ok(self.tests.resolve(&matched, &failed).outcome_id)
    }

    /// Returns the columns with few enough distinct values to filter on.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.results
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let distinct = self.results.rows.iter().map(|row| row[*i].trim()).unique().count();
                distinct <= self.settings.categorical_filter_threshold
            })
            .map(|(_, header)| header.as_str())
            .collect()
    }

    /// Returns the results that pass the outcome, action, and column filters.
    pub fn filter(&self, args: &ReportArgs) -> Result<Table<String>, Report> {
        let mut table = self.results.clone();

        if let Some(outcome) = &args.outcome {
            let keep = (0..table.len())
                .map(|row| -> Result<bool, Report> {
                    let listed = split_list(table.get(QC_OUTCOME, row)?).contains(&outcome.as_str());
                    Ok(listed || &self.resolved_outcome(&table, row)? == outcome)
                })
                .collect::<Result<Vec<bool>, Report>>()?;
            table.rows = table.rows.into_iter().zip(keep).filter(|(_, k)| *k).map(|(r, _)| r).collect();
        }

        if let Some(action) = &args.action {
            let i = table.get_header_index(QC_ACTION)?;
            table = table.filter(|row| row[i].trim() == action);
        }

        let categorical = self.categorical_columns();
        for filter in &args.filter {
            let (column, value) = filter
                .split_once('=')
                .ok_or_else(|| eyre!("Invalid filter: {filter:?}"))
                .suggestion("Filters are written as COLUMN=VALUE.")?;
            let (column, value) = (column.trim(), value.trim());
            if !categorical.contains(&column) {
                return Err(eyre!("Column {column:?} can't be filtered on."))
                    .suggestion(format!("Categorical columns: {}", categorical.iter().join(", ")));
            }
            let i = table.get_header_index(column)?;
            table = table.filter(|row| row[i].trim() == value);
        }

        debug!("{} of {} samples after filtering.", table.len(), self.results.len());
        Ok(table)
    }

    // ------------------------------------------------------------------------
    // Panels

    /// Total samples, passed samples, and samples per action.
    pub fn overview(&self, table: &Table<String>) -> Result<Vec<Vec<String>>, Report> {
        let passed = (0..table.len())
            .map(|row| self.resolved_outcome(table, row))
            .filter_ok(|outcome| outcome == PASS)
            .collect::<Result<Vec<_>, Report>>()?
            .len();

        let mut rows = vec![
            vec!["Total samples".to_string(), table.len().to_string()],
            vec!["Passed".to_string(), passed.to_string()],
        ];
        let actions = table.get_column(QC_ACTION)?.into_iter().map(|a| a.trim()).counts();
        actions
            .into_iter()
            .sorted()
            .for_each(|(action, n)| rows.push(vec![format!("Action: {action}"), n.to_string()]));
        if let Some(warnings) = self.warnings {
            rows.push(vec!["Warnings".to_string(), warnings.to_string()]);
        }
        Ok(rows)
    }

    /// Samples per resolved outcome, highest priority first.
    pub fn outcome_distribution(&self, table: &Table<String>) -> Result<Vec<Vec<String>>, Report> {
        let counts = (0..table.len())
            .map(|row| self.resolved_outcome(table, row))
            .collect::<Result<Vec<_>, Report>>()?
            .into_iter()
            .counts();

        let rows = counts
            .into_iter()
            .map(|(outcome_id, n)| (self.tests.get(&outcome_id).cloned(), outcome_id, n))
            .sorted_by(|(a, a_id, _), (b, b_id, _)| {
                let a_priority = a.as_ref().map(|t| t.priority);
                let b_priority = b.as_ref().map(|t| t.priority);
                b_priority.cmp(&a_priority).then(a_id.cmp(b_id))
            })
            .map(|(test, outcome_id, n)| {
                let name = test.as_ref().map(|t| t.outcome_name.clone()).unwrap_or(outcome_id.clone());
                let priority = test.as_ref().map(|t| t.priority.to_string()).unwrap_or("-".to_string());
                vec![outcome_id, name, priority, n.to_string(), percent(n, table.len())]
            })
            .collect();
        Ok(rows)
    }

    /// Most commonly failed rules, with a bar of their count.
    pub fn failed_rules(&self, table: &Table<String>) -> Result<Vec<Vec<String>>, Report> {
        let counts = table
            .get_column(FAILED_RULES)?
            .into_iter()
            .flat_map(|failed| split_list(failed))
            .counts()
            .into_iter()
            .sorted_by(|(a, a_n), (b, b_n)| b_n.cmp(a_n).then(a.cmp(b)))
            .take(self.settings.max_displayed_rules)
            .collect_vec();

        let max = counts.first().map(|(_, n)| *n).unwrap_or(1).max(1);
        let rows = counts
            .into_iter()
            .map(|(rule_id, n)| {
                let condition = self
                    .rules
                    .get(rule_id)
                    .map(|r| format!("{} {} {}", r.field, r.operator, r.value))
                    .unwrap_or_default();
                let bar = "#".repeat((n * BAR_WIDTH).div_ceil(max));
                vec![rule_id.to_string(), condition, n.to_string(), bar]
            })
            .collect();
        Ok(rows)
    }

    /// Samples per species, most common first.
    pub fn species(&self, table: &Table<String>) -> Result<Vec<Vec<String>>, Report> {
        if !table.has_header(SPECIES) {
            return Ok(Vec::new());
        }
        let rows = table
            .get_column(SPECIES)?
            .into_iter()
            .map(|s| if is_missing(s) { "unknown" } else { s.trim() })
            .counts()
            .into_iter()
            .sorted_by(|(a, a_n), (b, b_n)| b_n.cmp(a_n).then(a.cmp(b)))
            .take(TOP_SPECIES)
            .map(|(species, n)| vec![species.to_string(), n.to_string(), percent(n, table.len())])
            .collect();
        Ok(rows)
    }

    /// Sample rows with their outcome and the columns of the selected sections.
    pub fn samples(&self, table: &Table<String>, sections: &[&str]) -> Result<Vec<Vec<String>>, Report> {
        let exclude = [SAMPLE_NAME].into_iter().chain(RESULT_COLUMNS).collect_vec();
        let mut columns = Vec::new();
        for section in sections {
            for column in self.mapping.section_columns(section, &table.headers, &exclude)? {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }

        let mut headers = vec![SAMPLE_NAME, "outcome", QC_OUTCOME, QC_ACTION]
            .into_iter()
            .map(String::from)
            .collect_vec();
        headers.extend(columns.iter().map(|c| c.to_string()));

        let mut rows = vec![headers];
        for row in 0..table.len() {
            let mut values = vec![
                table.get(SAMPLE_NAME, row)?.clone(),
                self.resolved_outcome(table, row)?,
                table.get(QC_OUTCOME, row)?.clone(),
                table.get(QC_ACTION, row)?.clone(),
            ];
            for column in &columns {
                values.push(table.get(*column, row)?.clone());
            }
            rows.push(values);
        }
        Ok(rows)
    }

    /// Render every panel of the dashboard.
    pub fn render(&self, args: &ReportArgs) -> Result<String, Report> {
        let table = self.filter(args)?;

        let sections = match args.all_sections {
            true => self.mapping.section_names(),
            false => args.section.iter().map(String::as_str).collect(),
        };

        let mut output = format!("{}\n", self.title);

        let overview = self.overview(&table)?;
        output.push_str(&panel("Overview", ["Metric", "Value"], overview, args.markdown));

        let outcomes = self.outcome_distribution(&table)?;
        let headers = ["Outcome", "Name", "Priority", "Samples", "Percent"];
        output.push_str(&panel("Outcome Distribution", headers, outcomes, args.markdown));

        let failed = self.failed_rules(&table)?;
        if !failed.is_empty() {
            let headers = ["Rule", "Condition", "Samples", ""];
            output.push_str(&panel("Most Common Failed Rules", headers, failed, args.markdown));
        }

        let species = self.species(&table)?;
        if !species.is_empty() {
            let headers = ["Species", "Samples", "Percent"];
            output.push_str(&panel("Species Distribution", headers, species, args.markdown));
        }

        let mut samples = self.samples(&table, &sections)?;
        let headers = samples.remove(0);
        output.push_str(&panel("Samples", headers, samples, args.markdown));

        Ok(output)
    }
}

/// Format a titled table of rows.
fn panel<H, S>(title: &str, headers: H, rows: Vec<Vec<String>>, markdown: bool) -> String
where
    H: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut builder = Builder::default();
    builder.push_record(headers);
    rows.into_iter().for_each(|row| builder.push_record(row));
    let mut table = builder.build();
    match markdown {
        true => table.with(Style::markdown()),
        false => table.with(Style::rounded()),
    };
    format!("\n{title}\n{table}\n")
}

fn percent(n: usize, total: usize) -> String {
    match total {
        0 => "0.0%".to_string(),
        _ => format!("{:.1}%", n as f64 * 100.0 / total as f64),
    }
}
