//! Run QC over the configured run data, or validate the configuration.


use crate::config::Config;
use crate::data::DataSource;
use crate::engine::{Engine, Evaluation};
use crate::output::{self, Summary};
#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uqcme_table::Table;

// ----------------------------------------------------------------------------
// Run Args
// ----------------------------------------------------------------------------

/// Run QC arguments, shared by the `run` and `validate` commands.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", clap(verbatim_doc_comment))]
pub struct RunArgs {
    /// Configuration file.
    #[cfg_attr(feature = "cli", clap(short = 'c', long, default_value = "config.yaml"))]
    pub config: PathBuf,

    /// Run data file, instead of the configured data.
    ///
    /// Comma-delimited for .csv, tab-delimited otherwise, optionally zstd compressed (.zst).
    #[cfg_attr(feature = "cli", clap(short = 'f', long, conflicts_with = "api_call"))]
    pub file: Option<PathBuf>,

    /// URL that returns run data, instead of the configured data.
    #[cfg_attr(feature = "cli", clap(short = 'a', long))]
    pub api_call: Option<String>,
}

impl Default for RunArgs {
    fn default() -> Self {
        RunArgs { config: PathBuf::from("config.yaml"), file: None, api_call: None }
    }
}

impl RunArgs {
    /// Returns the data source given on the command-line, if any.
    pub fn data_source(&self) -> Option<DataSource> {
        match (&self.file, &self.api_call) {
            (_, Some(url)) => Some(DataSource::ApiCall(url.clone())),
            (Some(path), None) => Some(DataSource::File(path.clone())),
            (None, None) => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Run
// ----------------------------------------------------------------------------

/// Load the rules, tests, mapping, and run data named by the config.
///
/// A data source from the command-line replaces the configured one.
pub async fn load(args: &RunArgs, config: &mut Config) -> Result<(Engine, Table<String>), Report> {
    if let Some(source) = args.data_source() {
        config.override_data(source)?;
    }

    let engine = Engine::from_config(config).wrap_err("Failed to load QC reference files.")?;

    let source = config
        .qc()?
        .input
        .data
        .as_ref()
        .ok_or_else(|| eyre!("No run data to process."))
        .suggestion("Set 'qc.input.data' in the config, or pass --file or --api-call.")?;
    info!("Loading run data: {source}");
    let data = source.load().await.wrap_err("Failed to load run data.")?;

    Ok((engine, data))
}

/// Evaluate every sample and write the results and warnings.
pub async fn run(args: &RunArgs, config: &mut Config) -> Result<Summary, Report> {
    info!("{} v{}", config.title, config.version);
    let (engine, data) = load(args, config).await?;

    let evaluation = engine.evaluate(&data).wrap_err("Failed to process samples.")?;
    let results = output::results_table(&data, &evaluation)?;

    let qc_output = &config.qc()?.output;
    output::write_results(&results, &qc_output.results)?;
    output::write_warnings(&evaluation, &qc_output.warnings)?;

    let summary = Summary::new(&evaluation);
    summary.log();
    info!("Done.");
    Ok(summary)
}

// ----------------------------------------------------------------------------
// Validate
// ----------------------------------------------------------------------------

/// Load everything a run needs and evaluate it without writing outputs.
///
/// Returns the problems found that would not stop a run, such as tests
/// that refer to unknown rules and rule fields missing from the data.
pub async fn validate(args: &RunArgs, config: &mut Config) -> Result<Vec<String>, Report> {
    let (engine, data) = load(args, config).await?;
    let Evaluation { results, warnings, skipped_rules } =
        engine.evaluate(&data).wrap_err("Failed to process samples.")?;

    let mut problems = engine.check_references();
    problems.extend(warnings);
    problems.extend(skipped_rules.iter().map(|rule_id| format!("Rule {rule_id} would be skipped")));

    info!(
        "Validated {} rules and {} tests against {} samples.",
        engine.rules.len(),
        engine.tests.len(),
        results.len()
    );
    match problems.is_empty() {
        true => info!("Configuration is valid."),
        false => {
            problems.iter().for_each(|problem| warn!("{problem}"));
            warn!("Configuration is valid, with {} warnings.", problems.len());
        }
    }
    Ok(problems)
}
