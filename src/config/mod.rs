//! YAML [`Config`] that ties together the run data, reference files, and outputs.
//!
//! ```yaml
//! title: uQCme - Microbial QC Reporter
//! qc:
//!   input:
//!     data: example_run_data.tsv   # or {file: ...} or {api_call: https://...}
//!     mapping: mapping.yaml
//!     qc_rules: QC_rules.tsv
//!     qc_tests: QC_tests.tsv
//!   output:
//!     results: qc_results.tsv
//!     warnings: qc_warnings.tsv
//! app:
//!   input:
//!     data: qc_results.tsv
//!   dashboard:
//!     max_displayed_rules: 10
//! log:
//!   file: uqcme.log
//! ```


use crate::data::DataSource;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

// ----------------------------------------------------------------------------
// Config
// ----------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Title shown in summaries and reports.
    pub title: String,
    /// Version of the configuration.
    pub version: String,
    /// Inputs and outputs of QC processing.
    pub qc: Option<QcConfig>,
    /// Inputs and settings of the report.
    pub app: Option<AppConfig>,
    /// Log file settings.
    pub log: LogConfig,
    /// Outcome priorities that replace the priorities of the QC tests file.
    pub outcome_priorities: BTreeMap<String, u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Returns a new [`Config`] with no inputs.
    pub fn new() -> Self {
        Config {
            title: String::from("uQCme - Microbial QC Reporter"),
            version: env!("CARGO_PKG_VERSION").to_string(),
            qc: None,
            app: None,
            log: LogConfig::default(),
            outcome_priorities: BTreeMap::new(),
        }
    }

    /// Read [`Config`] from a YAML file.
    ///
    /// Relative paths inside the file are resolved against the directory
    /// that contains the config file.
    pub fn read<P>(path: &P) -> Result<Config, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| eyre!("Failed to load configuration from {path:?}."))
            .suggestion("Pass an existing YAML file with --config.")?;
        let mut config: Config = serde_yaml::from_reader(file)
            .wrap_err_with(|| eyre!("Failed to parse configuration: {path:?}."))?;

        let base_dir = path.as_ref().parent().unwrap_or(Path::new(""));
        config.resolve_paths(base_dir);

        Ok(config)
    }

    /// Parse [`Config`] from a YAML string, leaving paths as written.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use uqcme::Config;
    ///
    /// let config = Config::from_yaml("title: My QC\n")?;
    /// assert_eq!(config.title, "My QC");
    /// assert!(config.qc().is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Config, Report> {
        let config = serde_yaml::from_str(yaml).wrap_err("Failed to parse configuration.")?;
        Ok(config)
    }

    /// Returns the QC section of the [`Config`].
    pub fn qc(&self) -> Result<&QcConfig, Report> {
        self.qc
            .as_ref()
            .ok_or_else(|| eyre!("Invalid configuration: 'qc' section missing."))
            .suggestion("Add a 'qc' section with 'input' and 'output' to the config.")
    }

    /// Replace the run data source of the QC section (ex. from the command-line).
    pub fn override_data(&mut self, source: DataSource) -> Result<(), Report> {
        let qc = self
            .qc
            .as_mut()
            .ok_or_else(|| eyre!("Invalid configuration: 'qc' section missing."))?;
        log::info!("Data source overridden: {source}");
        qc.input.data = Some(source);
        Ok(())
    }

    /// Resolve all relative paths against a base directory.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(qc) = self.qc.as_mut() {
            let input = &mut qc.input;
            if let Some(data) = input.data.as_mut() {
                data.resolve(base_dir);
            }
            resolve(base_dir, &mut input.mapping);
            resolve(base_dir, &mut input.qc_rules);
            resolve(base_dir, &mut input.qc_tests);
            resolve(base_dir, &mut qc.output.results);
            resolve(base_dir, &mut qc.output.warnings);
        }
        if let Some(app) = self.app.as_mut() {
            let input = &mut app.input;
            if let Some(data) = input.data.as_mut() {
                data.resolve(base_dir);
            }
            [&mut input.mapping, &mut input.qc_rules, &mut input.qc_tests, &mut input.warnings]
                .into_iter()
                .flatten()
                .for_each(|path| resolve(base_dir, path));
        }
        if let Some(file) = self.log.file.as_mut() {
            resolve(base_dir, file);
        }
    }
}

/// Join a relative path onto the base directory.
pub(crate) fn resolve(base_dir: &Path, path: &mut PathBuf) {
    if path.is_relative() && !base_dir.as_os_str().is_empty() {
        *path = base_dir.join(&path);
    }
}

// ----------------------------------------------------------------------------
// QC Section
// ----------------------------------------------------------------------------

/// Inputs and outputs of QC processing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct QcConfig {
    pub input: QcInput,
    #[serde(default)]
    pub output: QcOutput,
}

/// Input files of QC processing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct QcInput {
    /// Run data with one row per sample.
    #[serde(default)]
    pub data: Option<DataSource>,
    /// Mapping YAML of sections, fields, and QC overrides.
    pub mapping: PathBuf,
    /// QC rules TSV.
    pub qc_rules: PathBuf,
    /// QC tests (outcome definitions) TSV.
    pub qc_tests: PathBuf,
}

/// Output files of QC processing.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct QcOutput {
    pub results: PathBuf,
    pub warnings: PathBuf,
}

impl Default for QcOutput {
    fn default() -> Self {
        QcOutput {
            results: PathBuf::from("qc_results.tsv"),
            warnings: PathBuf::from("qc_warnings.tsv"),
        }
    }
}

// ----------------------------------------------------------------------------
// App Section
// ----------------------------------------------------------------------------

/// Inputs and settings of the report.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: AppInput,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Report inputs, any that are missing fall back to the QC section.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct AppInput {
    /// QC results to display.
    pub data: Option<DataSource>,
    pub mapping: Option<PathBuf>,
    pub qc_rules: Option<PathBuf>,
    pub qc_tests: Option<PathBuf>,
    /// Warnings written alongside the results.
    pub warnings: Option<PathBuf>,
}

/// Display settings of the report.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Maximum number of distinct values for a column to be filterable.
    pub categorical_filter_threshold: usize,
    /// Maximum number of failed rules to display.
    pub max_displayed_rules: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig { categorical_filter_threshold: 20, max_displayed_rules: 10 }
    }
}

// ----------------------------------------------------------------------------
// Log Section
// ----------------------------------------------------------------------------

/// Log file settings, `file: null` disables the log file.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LogConfig {
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig { file: Some(PathBuf::from("uqcme.log")) }
    }
}
