//! Small file system and text helpers shared across modules.

#[cfg(feature = "cli")]
pub mod logging;
pub mod verbosity;


use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use zstd::stream::read::Decoder;

/// Supported compression formats, identified by file extension.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Decompress {
    Zst,
}

impl FromStr for Decompress {
    type Err = Report;
    fn from_str(s: &str) -> Result<Self, Report> {
        match s {
            "zst" => Ok(Decompress::Zst),
            _ext => Err(eyre!("Decompression for {_ext:?} is not implemented yet.")),
        }
    }
}

impl Decompress {
    /// Returns the compression format of a path, or [`None`] if it is not compressed.
    ///
    /// ```rust
    /// use uqcme::utils::Decompress;
    ///
    /// assert_eq!(Decompress::from_path(&"data.tsv.zst"), Some(Decompress::Zst));
    /// assert_eq!(Decompress::from_path(&"data.tsv"), None);
    /// ```
    pub fn from_path<P>(path: &P) -> Option<Decompress>
    where
        P: AsRef<Path>,
    {
        let ext = path.as_ref().extension()?.to_str()?;
        Decompress::from_str(ext).ok()
    }
}

/// Decompress a file into memory.
///
/// Returns the decompressed text and the file path with the compression
/// extension removed (ex. `data.tsv.zst` => `data.tsv`), which is useful
/// for detecting the delimiter of the inner file.
pub fn decompress_file<P>(path: &P) -> Result<(String, PathBuf), Report>
where
    P: AsRef<Path> + Debug,
{
    let inner = path.as_ref().with_extension("");
    let ext = path.as_ref().extension().and_then(|ext| ext.to_str()).unwrap_or_default();

    match Decompress::from_str(ext)? {
        Decompress::Zst => {
            let reader = std::fs::File::open(path).wrap_err(format!("Failed to open: {path:?}"))?;
            let mut decoder =
                Decoder::new(reader).wrap_err(format!("Failed to decode: {path:?}"))?;
            let mut buffer = String::new();
            decoder
                .read_to_string(&mut buffer)
                .wrap_err(format!("Failed to decompress: {path:?}"))?;
            Ok((buffer, inner))
        }
    }
}

/// Create the parent directory of a file path, if it doesn't exist yet.
pub fn create_parent_dir<P>(path: &P) -> Result<(), Report>
where
    P: AsRef<Path> + Debug,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| eyre!("Failed to create directory: {parent:?}"))?;
        }
    }
    Ok(())
}

/// Returns true if a table value should be treated as missing data.
///
/// ```rust
/// use uqcme::utils::is_missing;
///
/// assert!(is_missing(""));
/// assert!(is_missing(" NaN "));
/// assert!(is_missing("null"));
/// assert!(is_missing("None"));
/// assert!(!is_missing("0"));
/// ```
pub fn is_missing(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || ["null", "none", "nan"].iter().any(|missing| value.eq_ignore_ascii_case(missing))
}

/// Split a comma-separated list, trimming whitespace and dropping empty items.
///
/// ```rust
/// use uqcme::utils::split_list;
///
/// assert_eq!(split_list(" A1, A2 ,,A3"), ["A1", "A2", "A3"]);
/// assert!(split_list("").is_empty());
/// ```
pub fn split_list(list: &str) -> Vec<&str> {
    list.split(',').map(str::trim).filter(|item| !item.is_empty()).collect()
}
