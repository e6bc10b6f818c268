#[cfg(feature = "cli")]
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::EnumIter;

// -----------------------------------------------------------------------------
// Verbosity
// -----------------------------------------------------------------------------

/// The output verbosity level.
#[derive(Clone, Copy, Debug, Default, Deserialize, EnumIter, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
pub enum Verbosity {
    #[default]
    Info,
    Warn,
    Debug,
    Error,
}

impl std::fmt::Display for Verbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        // Convert to lowercase for RUST_LOG env var compatibility
        let lowercase = format!("{:?}", self).to_lowercase();
        write!(f, "{lowercase}")
    }
}

impl From<Verbosity> for log::LevelFilter {
    /// Convert a [`Verbosity`] to a [`log::LevelFilter`].
    ///
    /// ```rust
    /// use strum::IntoEnumIterator;
    /// use uqcme::Verbosity;
    ///
    /// for verbosity in Verbosity::iter() {
    ///     let filter = log::LevelFilter::from(verbosity);
    ///     assert_eq!(filter.to_string().to_lowercase(), verbosity.to_string());
    /// }
    /// ```
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Warn => log::LevelFilter::Warn,
            Verbosity::Debug => log::LevelFilter::Debug,
            Verbosity::Error => log::LevelFilter::Error,
        }
    }
}
