//! Run data: one row of sequencing metrics per sample, from a file or an HTTP API.

#[cfg(test)]
mod tests;

use crate::utils::{decompress_file, is_missing, Decompress};
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};
use uqcme_table::{get_delimiter, Table};

/// Column that identifies each sample, required and unique.
pub const SAMPLE_NAME: &str = "sample_name";

// ----------------------------------------------------------------------------
// Data Source
// ----------------------------------------------------------------------------

/// Where run data comes from.
///
/// In YAML, either a bare path or a map with `file` or `api_call`.
///
/// ```rust
/// use uqcme::DataSource;
/// use std::path::PathBuf;
///
/// let source: DataSource = serde_yaml::from_str("run.tsv")?;
/// assert_eq!(source, DataSource::File(PathBuf::from("run.tsv")));
///
/// let source: DataSource = serde_yaml::from_str("api_call: https://example.org/runs/1")?;
/// assert_eq!(source.to_string(), "https://example.org/runs/1");
///
/// assert!(serde_yaml::from_str::<DataSource>("url: https://example.org").is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "DataSourceSpec", into = "DataSourceSpec")]
pub enum DataSource {
    /// Delimited text file, optionally zstd compressed.
    File(PathBuf),
    /// URL that returns JSON records (or delimited text).
    ApiCall(String),
}

/// Serialized forms of a [`DataSource`].
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DataSourceSpec {
    Path(PathBuf),
    Source {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_call: Option<String>,
    },
}

impl TryFrom<DataSourceSpec> for DataSource {
    type Error = Report;

    fn try_from(spec: DataSourceSpec) -> Result<Self, Report> {
        match spec {
            DataSourceSpec::Path(path) => Ok(DataSource::File(path)),
            // api_call takes precedence over file
            DataSourceSpec::Source { api_call: Some(url), .. } => Ok(DataSource::ApiCall(url)),
            DataSourceSpec::Source { file: Some(path), .. } => Ok(DataSource::File(path)),
            DataSourceSpec::Source { .. } => {
                Err(eyre!("Either 'file' or 'api_call' must be specified for data input."))
            }
        }
    }
}

impl From<DataSource> for DataSourceSpec {
    fn from(source: DataSource) -> Self {
        match source {
            DataSource::File(path) => DataSourceSpec::Source { file: Some(path), api_call: None },
            DataSource::ApiCall(url) => DataSourceSpec::Source { file: None, api_call: Some(url) },
        }
    }
}

impl Display for DataSource {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::ApiCall(url) => write!(f, "{url}"),
        }
    }
}

impl DataSource {
    /// Resolve a relative file path against a base directory.
    pub fn resolve(&mut self, base_dir: &Path) {
        if let DataSource::File(path) = self {
            crate::config::resolve(base_dir, path);
        }
    }

    /// Load and validate the run data.
    pub async fn load(&self) -> Result<Table<String>, Report> {
        let table = match self {
            DataSource::File(path) => read_file(path)?,
            DataSource::ApiCall(url) => fetch(url).await?,
        };
        validate(&table).wrap_err_with(|| eyre!("Data validation failed: {self}"))?;
        info!("Run data loaded: {} samples", table.len());
        Ok(table)
    }
}

// ----------------------------------------------------------------------------
// Loaders
// ----------------------------------------------------------------------------

/// Read run data from a delimited file, decompressing `.zst` files in memory.
pub fn read_file<P>(path: &P) -> Result<Table<String>, Report>
where
    P: AsRef<Path> + Debug,
{
    if Decompress::from_path(path).is_none() {
        return Table::read(path, None)
            .wrap_err_with(|| eyre!("Failed to load data: {path:?}"))
            .suggestion("Check 'data' in the input section of the config, or pass --file.");
    }

    let (text, inner) = decompress_file(path)?;
    let delim = get_delimiter(&inner);
    let mut table = Table::from_reader(text.as_bytes(), delim)
        .wrap_err_with(|| eyre!("Failed to load data: {path:?}"))?;
    table.path = Some(path.as_ref().to_path_buf());
    Ok(table)
}

/// Fetch run data from an API endpoint.
///
/// An HTTPS request that can't connect is retried once without certificate verification.
#[cfg(feature = "download")]
pub async fn fetch(url: &str) -> Result<Table<String>, Report> {
    info!("Loading data from API: {url}");

    let response = match request(url, false).await {
        Ok(response) => response,
        Err(e) if url.starts_with("https") && e.is_connect() => {
            log::warn!("SSL verification failed, retrying without SSL verification: {e}");
            request(url, true).await.wrap_err_with(|| eyre!("API request failed: {url}"))?
        }
        Err(e) => return Err(e).wrap_err_with(|| eyre!("API request failed: {url}")),
    };

    let status = response.status();
    if !status.is_success() {
        return Err(eyre!("API request failed: {url}"))
            .suggestion(format!("Status code: {status}"));
    }

    let body = response.text().await.wrap_err_with(|| eyre!("Invalid API response: {url}"))?;
    parse_body(&body).wrap_err_with(|| eyre!("Invalid API response: {url}"))
}

#[cfg(not(feature = "download"))]
pub async fn fetch(url: &str) -> Result<Table<String>, Report> {
    Err(eyre!("Unable to load data from API: {url}"))
        .suggestion("Rebuild uqcme with the 'download' feature enabled.")
}

#[cfg(feature = "download")]
async fn request(url: &str, accept_invalid_certs: bool) -> Result<reqwest::Response, reqwest::Error> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()?;
    client.get(url).header(reqwest::header::ACCEPT, "application/json").send().await
}

/// Parse an API response body into a [`Table`].
///
/// JSON bodies may be a list of records, an object with a `data` list, an
/// object with any other list of records, or a single record. Other bodies
/// are read as CSV if they contain a comma and a newline, otherwise as TSV.
///
/// ```rust
/// use uqcme::data::parse_body;
///
/// let table = parse_body(r#"{"data": [{"sample_name": "s1", "GC": 50.5}, {"sample_name": "s2", "GC": null}]}"#)?;
/// assert_eq!(table.headers, ["sample_name", "GC"]);
/// assert_eq!(table.rows, [["s1", "50.5"], ["s2", ""]]);
///
/// let table = parse_body("sample_name,GC\ns1,50.5\n")?;
/// assert_eq!(table.get("GC", 0)?, "50.5");
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
pub fn parse_body(body: &str) -> Result<Table<String>, Report> {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => json_to_table(json),
        Err(e) => {
            debug!("Response is not JSON ({e}), reading as delimited text.");
            let delim = if body.contains(',') && body.contains('\n') { b',' } else { b'\t' };
            Table::from_reader(body.as_bytes(), delim)
        }
    }
}

/// Convert JSON records into a [`Table`], headers in first-seen order.
fn json_to_table(json: Value) -> Result<Table<String>, Report> {
    let records = match json {
        Value::Array(items) => items,
        Value::Object(mut object) => {
            let key = match object.get("data") {
                Some(Value::Array(_)) => Some("data".to_string()),
                _ => object.iter().find(|(_, value)| is_records(value)).map(|(key, _)| key.clone()),
            };
            match key.and_then(|key| object.remove(&key)) {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(object)],
            }
        }
        other => return Err(eyre!("Unexpected API response format: {other}")),
    };

    let records: Vec<Map<String, Value>> = records
        .into_iter()
        .enumerate()
        .map(|(i, record)| match record {
            Value::Object(record) => Ok(record),
            other => Err(eyre!("Record {i} of the API response is not an object: {other}")),
        })
        .collect::<Result<_, Report>>()?;

    let mut table = Table::new();
    table.headers = records.iter().flat_map(|record| record.keys()).unique().cloned().collect();
    for record in &records {
        let row = table.headers.iter().map(|header| match record.get(header) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(value)) => value.clone(),
            Some(value) => value.to_string(),
        });
        let row = row.collect_vec();
        table.add_row(row)?;
    }

    Ok(table)
}

/// A non-empty list whose first element is an object.
fn is_records(value: &Value) -> bool {
    matches!(value, Value::Array(items) if matches!(items.first(), Some(Value::Object(_))))
}

// ----------------------------------------------------------------------------
// Validation
// ----------------------------------------------------------------------------

/// Check that every sample has a unique, non-missing `sample_name`.
pub fn validate(table: &Table<String>) -> Result<(), Report> {
    if !table.has_header(SAMPLE_NAME) {
        return Err(eyre!("Column '{SAMPLE_NAME}' is missing."))
            .suggestion("Run data needs a 'sample_name' column with one unique name per sample.");
    }
    let names = table.get_column(SAMPLE_NAME)?;
    if let Some(i) = names.iter().position(|name| is_missing(name)) {
        return Err(eyre!("Row {} has no '{SAMPLE_NAME}'.", i + 1));
    }
    let duplicates = names.iter().duplicates().collect_vec();
    if !duplicates.is_empty() {
        return Err(eyre!("Duplicate {SAMPLE_NAME}: {}", duplicates.iter().join(", ")));
    }
    Ok(())
}
