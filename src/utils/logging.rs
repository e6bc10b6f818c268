//! Logger setup: console output through [`env_logger`], optionally mirrored to a log file.

use crate::Verbosity;
use chrono::Local;
use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use log::{Log, Metadata, Record};
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Forwards records to the console logger and appends them to a file as TSV.
struct FileLogger {
    console: env_logger::Logger,
    file: Mutex<File>,
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.console.matches(record) {
            return;
        }
        self.console.log(record);
        if let Ok(mut file) = self.file.lock() {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
            // there is nowhere left to report a failed log write
            let _ = writeln!(
                file,
                "{timestamp}\t{}\t{}\t{}",
                record.target(),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Initialize the global logger.
///
/// ## Arguments
///
/// - `verbosity` - Minimum level to log, `RUST_LOG` can still refine it per module.
/// - `log_file` - Optional file that every record is appended to.
pub fn init<P>(verbosity: Verbosity, log_file: Option<&P>) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    let mut builder = env_logger::Builder::new();
    builder.filter_level(verbosity.into()).parse_default_env();

    match log_file {
        None => builder.try_init().wrap_err("Failed to initialize logger.")?,
        Some(path) => {
            crate::utils::create_parent_dir(path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| eyre!("Failed to open log file: {path:?}"))?;
            let console = builder.build();
            let max_level = console.filter();
            log::set_boxed_logger(Box::new(FileLogger { console, file: Mutex::new(file) }))
                .wrap_err("Failed to initialize logger.")?;
            log::set_max_level(max_level);
        }
    }

    Ok(())
}
