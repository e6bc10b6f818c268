//! Mapping of data columns into display [`Section`]s and QC rule fields.
//!
//! ```yaml
//! Sections:
//!   Assembly:
//!     N50:
//!       data:
//!         mapping: assembly_n50     # column of the run data
//!       QC:
//!         mapping: [N50, n50]       # rule fields that read this column
//! QC_overrides:
//!   assembly_type: short            # first value is the default assembly type
//!   software: [spades, skesa]       # rules of other software are out of scope
//! ```


use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use color_eyre::Help;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::Path;

/// Name of the section that holds data columns not claimed by any other section.
pub const UNMAPPED_SECTION: &str = "unmapped";

/// Assembly type of samples when neither the data nor the overrides name one.
pub const DEFAULT_ASSEMBLY_TYPE: &str = "short";

// ----------------------------------------------------------------------------
// One Or Many
// ----------------------------------------------------------------------------

/// A YAML value that may be written as a single string or as a list.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// Normalize to a list, a single string becomes a one-item list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

// ----------------------------------------------------------------------------
// Mapping
// ----------------------------------------------------------------------------

/// A named group of [`Field`]s, in the order of the mapping file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Section {
    pub name: String,
    pub fields: Vec<Field>,
}

/// A field of a [`Section`].
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    /// Column of the run data that holds this field.
    pub data_column: Option<String>,
    /// Rule fields that resolve to the data column.
    pub qc_fields: Vec<String>,
}

impl Field {
    /// Column of the run data this field displays, falling back to the field name.
    pub fn column(&self) -> &str {
        self.data_column.as_deref().unwrap_or(&self.name)
    }
}

/// Settings that narrow which rules apply to the run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QcOverrides {
    /// Assembly types, the first is the default for samples without one.
    pub assembly_type: Vec<String>,
    /// Allowed software, [`None`] allows rules of any software.
    pub software: Option<Vec<String>>,
    /// Remaining overrides, kept as written.
    pub other: BTreeMap<String, Value>,
}

/// Parsed mapping file.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Mapping {
    pub sections: Vec<Section>,
    pub qc_overrides: QcOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct RawMapping {
    #[serde(rename = "Sections", default)]
    sections: Option<serde_yaml::Mapping>,
    #[serde(rename = "QC_overrides", default)]
    qc_overrides: Option<serde_yaml::Mapping>,
}

#[derive(Debug, Default, Deserialize)]
struct RawField {
    #[serde(default)]
    data: Option<RawTarget>,
    #[serde(rename = "QC", default)]
    qc: Option<RawTarget>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTarget {
    #[serde(default)]
    mapping: Option<OneOrMany>,
}

impl Mapping {
    /// Read a [`Mapping`] from a YAML file.
    pub fn read<P>(path: &P) -> Result<Mapping, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let yaml = std::fs::read_to_string(path)
            .wrap_err_with(|| eyre!("Failed to load mapping file: {path:?}"))
            .suggestion("Check 'mapping' in the input section of the config.")?;
        let mapping = Mapping::from_yaml(&yaml)
            .wrap_err_with(|| eyre!("Failed to parse mapping file: {path:?}"))?;
        info!("Mapping configuration loaded from {path:?}");
        debug!("QC overrides: {:?}", mapping.qc_overrides);
        Ok(mapping)
    }

    /// Parse a [`Mapping`] from a YAML string.
    ///
    /// ## Examples
    ///
    /// ```rust
    /// use uqcme::Mapping;
    ///
    /// let mapping = Mapping::from_yaml("
    /// Sections:
    ///   Assembly:
    ///     N50:
    ///       data: {mapping: assembly_n50}
    ///       QC: {mapping: N50}
    /// QC_overrides:
    ///   assembly_type: long
    /// ")?;
    /// assert_eq!(mapping.resolve_field("N50"), Some("assembly_n50"));
    /// assert_eq!(mapping.default_assembly_type(), "long");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Mapping, Report> {
        // an empty file is an empty mapping
        let raw: Option<RawMapping> = serde_yaml::from_str(yaml)?;
        let raw = raw.unwrap_or_default();

        let mut mapping = Mapping::default();

        for (name, fields) in raw.sections.unwrap_or_default() {
            let name = yaml_key(&name)?;
            let mut section = Section { name: name.clone(), fields: Vec::new() };
            let fields = match fields {
                Value::Mapping(fields) => fields,
                Value::Null => serde_yaml::Mapping::new(),
                _ => return Err(eyre!("Section {name:?} must be a map of fields.")),
            };
            for (field, config) in fields {
                let field = yaml_key(&field)?;
                // fields without a map of settings are display-only
                let raw_field: RawField = match config {
                    Value::Mapping(_) => serde_yaml::from_value(config)
                        .wrap_err_with(|| eyre!("Invalid field {field:?} in section {name:?}"))?,
                    _ => RawField::default(),
                };
                let data_column = match raw_field.data.and_then(|d| d.mapping) {
                    Some(OneOrMany::One(column)) => Some(column),
                    Some(OneOrMany::Many(_)) => {
                        return Err(eyre!(
                            "Field {field:?} in section {name:?} must map to a single data column."
                        ))
                    }
                    None => None,
                };
                let qc_fields = raw_field
                    .qc
                    .and_then(|qc| qc.mapping)
                    .map(OneOrMany::into_vec)
                    .unwrap_or_default();
                section.fields.push(Field { name: field, data_column, qc_fields });
            }
            mapping.sections.push(section);
        }

        for (key, value) in raw.qc_overrides.unwrap_or_default() {
            let key = yaml_key(&key)?;
            match key.as_str() {
                "assembly_type" => {
                    mapping.qc_overrides.assembly_type = override_list(&key, value)?.unwrap_or_default()
                }
                "software" => mapping.qc_overrides.software = override_list(&key, value)?,
                _ => {
                    mapping.qc_overrides.other.insert(key, value);
                }
            }
        }

        Ok(mapping)
    }

    /// Build the lookup of rule field => data column.
    ///
    /// Only fields that name both a data column and QC fields contribute.
    /// When several fields claim the same rule field, the last one wins.
    pub fn field_mapping(&self) -> BTreeMap<String, String> {
        self.sections
            .iter()
            .flat_map(|section| &section.fields)
            .filter_map(|field| field.data_column.as_ref().map(|column| (field, column)))
            .flat_map(|(field, column)| {
                field.qc_fields.iter().map(move |qc| (qc.clone(), column.clone()))
            })
            .collect()
    }

    /// Returns the data column a rule field is mapped to, if any.
    pub fn resolve_field(&self, field: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|section| &section.fields)
            .rev()
            .find(|f| f.data_column.is_some() && f.qc_fields.iter().any(|qc| qc == field))
            .and_then(|f| f.data_column.as_deref())
    }

    /// Assembly type assumed for samples that don't specify one.
    pub fn default_assembly_type(&self) -> &str {
        self.qc_overrides
            .assembly_type
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_ASSEMBLY_TYPE)
    }

    /// Returns the section names in file order, followed by [`UNMAPPED_SECTION`].
    pub fn section_names(&self) -> Vec<&str> {
        self.sections
            .iter()
            .map(|section| section.name.as_str())
            .chain([UNMAPPED_SECTION])
            .collect()
    }

    /// Returns the columns of a section that are present in the headers.
    ///
    /// The [`UNMAPPED_SECTION`] holds every header not claimed by a section,
    /// other than those listed in `exclude`.
    pub fn section_columns<'h>(
        &self,
        section: &str,
        headers: &'h [String],
        exclude: &[&str],
    ) -> Result<Vec<&'h str>, Report> {
        if section == UNMAPPED_SECTION {
            let claimed: Vec<&str> = self
                .sections
                .iter()
                .flat_map(|s| &s.fields)
                .map(|field| field.column())
                .collect();
            let columns = headers
                .iter()
                .map(String::as_str)
                .filter(|h| !claimed.contains(h) && !exclude.contains(h))
                .collect();
            return Ok(columns);
        }

        let section = self
            .sections
            .iter()
            .find(|s| s.name == section)
            .ok_or_else(|| eyre!("Unknown section: {section:?}"))
            .suggestion(format!("Available sections: {}", self.section_names().join(", ")))?;

        let columns = section
            .fields
            .iter()
            .filter_map(|field| headers.iter().find(|h| *h == field.column()))
            .map(String::as_str)
            .filter(|h| !exclude.contains(h))
            .collect();
        Ok(columns)
    }
}

/// Mapping keys are expected to be strings, numbers are accepted as written.
fn yaml_key(key: &Value) -> Result<String, Report> {
    match key {
        Value::String(key) => Ok(key.clone()),
        Value::Number(key) => Ok(key.to_string()),
        Value::Bool(key) => Ok(key.to_string()),
        _ => Err(eyre!("Mapping keys must be strings: {key:?}")),
    }
}

/// Parse an override that is a single string or list of strings, null disables it.
fn override_list(key: &str, value: Value) -> Result<Option<Vec<String>>, Report> {
    if value.is_null() {
        return Ok(None);
    }
    let values: OneOrMany = serde_yaml::from_value(value)
        .wrap_err_with(|| eyre!("QC override {key:?} must be a string or a list of strings."))?;
    Ok(Some(values.into_vec()))
}
