//! [Command-line interface](Cli) (CLI) of the main binary.

use crate::report::ReportArgs;
use crate::run::RunArgs;
use crate::Verbosity;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ----------------------------------------------------------------------------
// CLI Entry Point
// ----------------------------------------------------------------------------

/// The command-line interface (CLI).
/// ---
/// The CLI is intended for parsing user input from the command-line in the main function. This is achieved with the `parse` function, which parses the command line arguments from [`std::env::args`](https://doc.rust-lang.org/std/env/fn.args.html).
/// ```no_run
/// use clap::Parser;
/// let args = uqcme::cli::Cli::parse();
/// ```
/// The command-line arguments from `std::env::args` are simply a vector of space separated strings. Here is a manual example of setting the command-line input:
/// ```rust
/// use clap::Parser;
/// use uqcme::cli::{Cli, Command};
///
/// let input = ["uqcme", "run", "--config", "config.yaml", "--file", "run.tsv"];
/// let args = Cli::parse_from(input);
/// assert_eq!(args.command.config().to_str(), Some("config.yaml"));
///
/// // data can come from a file or an api call, not both
/// let input = ["uqcme", "run", "--file", "run.tsv", "--api-call", "https://example.org"];
/// assert!(Cli::try_parse_from(input).is_err());
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Debug, Deserialize, Parser, Serialize)]
#[clap(name = "uqcme", author, version)]
#[clap(about = "uqcme evaluates microbial sequencing QC metrics against configurable rules.")]
pub struct Cli {
    #[clap(subcommand)]
    /// Pass CLI arguments to a particular [Command].
    #[clap(help = "Set the command.")]
    pub command: Command,

    /// Set the output [Verbosity] level.
    #[clap(short = 'v', long)]
    #[clap(value_enum, default_value_t = Verbosity::default())]
    #[clap(hide_possible_values = false)]
    #[clap(global = true)]
    #[clap(help = "Set the output verbosity level.")]
    pub verbosity: Verbosity,
}

/// CLI [commands](#variants). Used to decide which runtime [Command](#variants) the CLI arguments should be passed to.
#[derive(Debug, Deserialize, Serialize, Subcommand)]
pub enum Command {
    /// Pass CLI arguments to the [run](crate::run::run()) method.
    #[clap(about = "Evaluate run data and write QC results and warnings.")]
    Run(RunArgs),

    /// Pass CLI arguments to the [report](crate::report::report()) method.
    #[clap(about = "Print a dashboard of QC results.")]
    Report(ReportArgs),

    /// Pass CLI arguments to the [validate](crate::run::validate()) method.
    #[clap(about = "Check the configuration, reference files, and run data without writing results.")]
    Validate(RunArgs),
}

impl Command {
    /// Returns the configuration file of the command.
    pub fn config(&self) -> &Path {
        match self {
            Command::Run(args) | Command::Validate(args) => &args.config,
            Command::Report(args) => &args.config,
        }
    }
}
