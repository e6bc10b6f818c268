#[cfg(feature = "cli")]
use clap::Parser;
use color_eyre::eyre::{Report, Result};
#[cfg(feature = "cli")]
use log::debug;
#[cfg(feature = "cli")]
use uqcme::{cli, cli::Cli, utils::logging, Config};

#[tokio::main]
async fn main() -> Result<(), Report> {
    // ------------------------------------------------------------------------
    // CLI Setup

    #[cfg(feature = "cli")]
    {
        // Parse CLI parameters
        let args = Cli::parse();

        // initialize color_eyre crate for colorized logs
        color_eyre::install()?;

        // the config names the log file, so it's read before logging starts
        let mut config = Config::read(&args.command.config())?;

        // initialize env_logger crate for logging/verbosity level
        logging::init(args.verbosity, config.log.file.as_ref())?;
        debug!("Configuration: {config:?}");

        // check which CLI command we're running (run, report, validate)
        match args.command {
            cli::Command::Run(args) => _ = uqcme::run::run(&args, &mut config).await?,
            cli::Command::Report(args) => uqcme::report::report(&args, &config).await?,
            cli::Command::Validate(args) => _ = uqcme::run::validate(&args, &mut config).await?,
        }
    }

    Ok(())
}
