//! `uqcme` evaluates **microbial** sequencing **QC** metrics against configurable rules.
//!
//! ## How it works
//!
//! 1. Run data has one row per sample, keyed by `sample_name`, and comes from a
//!    delimited file (optionally zstd compressed) or an HTTP API that returns JSON.
//!
//! 1. A [`Mapping`] groups data columns into sections, and maps the fields named by QC
//!    rules onto data columns.
//!
//! 1. QC [rules](rules::Rules) compare one field of a sample to a threshold or pattern.
//!    Rules can be limited to a species, an assembly type, and the software that produced
//!    the metric.
//!
//! 1. QC [tests](outcomes::QcTests) turn the passed and failed rules of a sample into
//!    outcomes. The outcome with the highest priority decides the action to take.
//!
//! 1. The [`Engine`] writes a results table (the run data plus `failed_rules`,
//!    `passed_rules`, `qc_outcome`, and `qc_action`) and a warnings table, which the
//!    [report](report::report()) summarizes in the terminal.
//!
//! ```rust
//! use uqcme::{Engine, Mapping, Table};
//! use uqcme::outcomes::QcTests;
//! use uqcme::rules::Rules;
//!
//! let rules = Rules::from_reader("rule_id\tspecies\tassembly_type\tfield\toperator\tvalue\nR1\tall\tall\tN50\t>=\t50000\n".as_bytes())?;
//! let tests = QcTests::from_reader("outcome_id\toutcome_name\tdescription\tpriority\tfailed_rule_conditions\taction_required\nSMALL\tSmall assembly\t\t2\tR1\tresequence\n".as_bytes())?;
//! let mapping = Mapping::from_yaml("Sections:\n  Assembly:\n    N50:\n      data: {mapping: assembly_n50}\n      QC: {mapping: N50}\n")?;
//!
//! let engine = Engine::new(rules, tests, mapping)?;
//! let data = Table::from_reader("sample_name\tassembly_n50\ns1\t120000\ns2\t20000\n".as_bytes(), b'\t')?;
//! let evaluation = engine.evaluate(&data)?;
//!
//! assert_eq!(evaluation.results[0].qc_outcome(), "PASS");
//! assert_eq!(evaluation.results[1].resolved.action, "resequence");
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod mapping;
pub mod outcomes;
pub mod output;
pub mod report;
pub mod rules;
pub mod run;
pub mod utils;

#[doc(inline)]
pub use crate::config::Config;
#[doc(inline)]
pub use crate::data::DataSource;
#[doc(inline)]
pub use crate::engine::Engine;
#[doc(inline)]
pub use crate::mapping::Mapping;
#[doc(inline)]
pub use uqcme_table::Table;
#[doc(inline)]
pub use utils::verbosity::Verbosity;
