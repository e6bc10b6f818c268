//! Create, read, and write a row-based [`Table`] of delimited text.

use color_eyre::eyre::{eyre, Report, Result, WrapErr};
use itertools::Itertools;
use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::PartialEq;
use std::fmt::{Debug, Display};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};


/// A row-based [`Table`] of generic data.
///
/// Every row has the same length as [`headers`](Table::headers).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Table<T> {
    /// Names of the table columns.
    pub headers: Vec<T>,
    /// Rows of table values.
    pub rows: Vec<Vec<T>>,
    /// Optional file path for where the table was read from.
    pub path: Option<PathBuf>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Table<T> {
    /// Returns a new row-based [`Table`] with empty headers and rows.
    ///
    /// ## Examples
    ///
    /// Let the compiler figure out the type from subsequent commands.
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(vec!["A", "B", "C"])?;
    /// # assert_eq!(table.rows, vec![vec!["A", "B", "C"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    ///
    /// | 1 | 2 | 3 |
    /// |---|---|---|
    /// | A | B | C |
    pub fn new() -> Self {
        Table { headers: Vec::new(), rows: Vec::new(), path: None }
    }

    /// Returns the number of rows (excluding headers).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> Table<T>
where
    T: Clone + Debug + Display + PartialEq,
{
    /// Add a new row to the table.
    ///
    /// ## Arguments
    ///
    /// * `row` - A iterable object of new data (`T`) to add as a row.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    /// table.add_row(["D", "E", "F"])?;
    /// # assert_eq!(table.rows, [["A", "B", "C"], ["D", "E", "F"]]);
    /// assert!(table.add_row(["G"]).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn add_row<I>(&mut self, row: I) -> Result<(), Report>
    where
        I: IntoIterator<Item = T>,
    {
        let row = row.into_iter().collect::<Vec<T>>();
        // rows must line up with the headers (or existing rows if headerless)
        let ex = match self.headers.is_empty() {
            true => self.rows.first().map(|r| r.len()),
            false => Some(self.headers.len()),
        };
        if let Some(ex) = ex {
            let new = row.len();
            if ex != new {
                return Err(eyre!("New row size ({new}) does not match existing table ({ex})."));
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// Adds a new column to the [`Table`].
    ///
    /// ## Arguments
    ///
    /// * `header` - Name of the new column.
    /// * `column` - An iterable object of new data (`T`) to add as a column.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    /// table.add_column("4", vec!["D"])?;
    ///
    /// assert_eq!(table.get_column(&"4")?, [&"D"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn add_column<I>(&mut self, header: T, column: I) -> Result<(), Report>
    where
        I: IntoIterator<Item = T>,
    {
        let column = column.into_iter().collect::<Vec<T>>();
        let ex = self.rows.len();
        let new = column.len();
        if ex != new {
            return Err(eyre!("New column size ({new}) does not match existing table ({ex})."));
        }

        self.headers.push(header);
        self.rows.iter_mut().zip(column).for_each(|(row, val)| row.push(val));
        Ok(())
    }

    /// Returns the [`Table`] value under a particular header and row index.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    ///
    /// assert_eq!(table.get(&"2", 0)?, &"B");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get<Q>(&self, header: &Q, row: usize) -> Result<&T, Report>
    where
        T: PartialEq<Q>,
        Q: Display + ?Sized,
    {
        let header_i = self.get_header_index(header)?;
        let row = self.get_row(row)?;
        Ok(&row[header_i])
    }

    /// Returns a [`Vec`] of [`Table`] values under a header.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    /// table.add_row(["D", "E", "F"])?;
    ///
    /// assert_eq!(table.get_column(&"1")?, [&"A", &"D"]);
    /// assert_eq!(table.get_column(&"3")?, [&"C", &"F"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_column<Q>(&self, header: &Q) -> Result<Vec<&T>, Report>
    where
        T: PartialEq<Q>,
        Q: Display + ?Sized,
    {
        let header_i = self.get_header_index(header)?;
        let column = self.rows.iter().map(|row| &row[header_i]).collect();
        Ok(column)
    }

    /// Returns the column index (0-based) of the header in the [`Table`].
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    ///
    /// assert_eq!(table.get_header_index(&"1")?, 0);
    /// assert_eq!(table.get_header_index(&"3")?, 2);
    /// assert!(table.get_header_index(&"4").is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_header_index<Q>(&self, header: &Q) -> Result<usize, Report>
    where
        T: PartialEq<Q>,
        Q: Display + ?Sized,
    {
        self.headers
            .iter()
            .position(|h| h == header)
            .ok_or_else(|| eyre!("Column '{header}' was not found in table: {:?}.", self.path))
    }

    /// Returns true if the header exists in the [`Table`].
    pub fn has_header<Q>(&self, header: &Q) -> bool
    where
        T: PartialEq<Q>,
        Q: ?Sized,
    {
        self.headers.iter().any(|h| h == header)
    }

    /// Return a row of [`Table`] values from a row index.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2", "3"];
    /// table.add_row(["A", "B", "C"])?;
    ///
    /// assert_eq!(table.get_row(0)?, ["A", "B", "C"]);
    /// assert!(table.get_row(1).is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn get_row(&self, i: usize) -> Result<&[T], Report> {
        self.rows.get(i).map(|row| row.as_slice()).ok_or_else(|| {
            eyre!("Row ({i}) does not exist in the table.")
        })
    }

    /// Update a single value under a header and row index.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["1", "2"];
    /// table.add_row(["A", "B"])?;
    /// table.set(&"2", 0, "Z")?;
    /// assert_eq!(table.get_row(0)?, ["A", "Z"]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn set<Q>(&mut self, header: &Q, row: usize, value: T) -> Result<(), Report>
    where
        T: PartialEq<Q>,
        Q: Display + ?Sized,
    {
        let header_i = self.get_header_index(header)?;
        let row = self.rows.get_mut(row).ok_or_else(|| eyre!("Row ({row}) does not exist in the table."))?;
        row[header_i] = value;
        Ok(())
    }

    /// Returns a new [`Table`] with only the rows that satisfy the predicate.
    ///
    /// ## Examples
    ///
    /// ```
    /// let mut table = uqcme_table::Table::new();
    /// table.headers = vec!["name", "species"];
    /// table.add_row(["s1", "E. coli"])?;
    /// table.add_row(["s2", "S. aureus"])?;
    ///
    /// let filtered = table.filter(|row| row[1] == "E. coli");
    /// assert_eq!(filtered.rows, [["s1", "E. coli"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn filter<F>(&self, mut predicate: F) -> Table<T>
    where
        F: FnMut(&[T]) -> bool,
    {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().filter(|row| predicate(row)).cloned().collect(),
            path: self.path.clone(),
        }
    }
}

/// Methods for tables of owned text, which is what delimited files hold.
impl Table<String> {
    /// Read a delimited file into a [`Table`].
    ///
    /// ## Arguments
    ///
    /// * `path` - File path.
    /// * `delim` - Optional delimiter. Otherwise, comma for `.csv` files and tab for the rest.
    ///
    /// ## Examples
    ///
    /// ```
    /// use std::io::Write;
    /// use uqcme_table::Table;
    ///
    /// let mut file = tempfile::Builder::new().suffix(".tsv").tempfile()?;
    /// writeln!(file, "1\t2\t3\nA\tB\tC")?;
    /// let table = Table::read(&file.path(), None)?;
    /// assert_eq!(table.headers, ["1", "2", "3"]);
    /// assert_eq!(table.rows, [["A", "B", "C"]]);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn read<P>(path: &P, delim: Option<u8>) -> Result<Table<String>, Report>
    where
        P: AsRef<Path> + Debug,
    {
        let delim = match delim {
            Some(d) => d,
            None => get_delimiter(path),
        };
        let file = File::open(path).wrap_err_with(|| eyre!("Failed to open table: {path:?}"))?;
        let mut table = Table::from_reader(file, delim)
            .wrap_err_with(|| eyre!("Failed to parse table: {path:?}"))?;
        table.path = Some(path.as_ref().to_path_buf());
        Ok(table)
    }

    /// Read delimited text from any reader into a [`Table`].
    ///
    /// The first record is used as the headers. Header names are trimmed of
    /// surrounding whitespace, values are kept verbatim. Rows with fewer
    /// fields than headers are padded with empty values.
    ///
    /// ## Examples
    ///
    /// ```
    /// use uqcme_table::Table;
    ///
    /// let table = Table::from_reader("a,b\n1,2\n3\n".as_bytes(), b',')?;
    /// assert_eq!(table.get_column("b")?, ["2", ""]);
    /// assert!(Table::from_reader("a,b\n1,2,3\n".as_bytes(), b',').is_err());
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn from_reader<R>(reader: R, delim: u8) -> Result<Table<String>, Report>
    where
        R: Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delim)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut table = Table::new();
        table.headers = reader
            .headers()
            .wrap_err("Failed to parse table headers.")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        reader.records().enumerate().try_for_each(|(i, record)| {
            // +2 to count the header line and report 1-based lines
            let line = i + 2;
            let record = record.wrap_err_with(|| eyre!("Failed to parse table line {line}."))?;
            if record.len() > table.headers.len() {
                return Err(eyre!(
                    "Table line {line} has {} fields, but there are {} headers.",
                    record.len(),
                    table.headers.len()
                ));
            }
            // trailing empty fields may have been stripped
            let mut row = record.iter().map(String::from).collect_vec();
            row.resize(table.headers.len(), String::new());
            table.rows.push(row);
            Ok::<(), Report>(())
        })?;

        Ok(table)
    }

    /// Deserialize every row into a record, with the headers as field names.
    ///
    /// Values are trimmed of surrounding whitespace first.
    ///
    /// ## Examples
    ///
    /// ```
    /// use serde::Deserialize;
    /// use uqcme_table::Table;
    ///
    /// #[derive(Deserialize)]
    /// struct Sample {
    ///     name: String,
    ///     #[serde(default)]
    ///     depth: Option<f64>,
    /// }
    ///
    /// let table = Table::from_reader("name\tdepth\n s1 \t 30.5\ns2\n".as_bytes(), b'\t')?;
    /// let samples: Vec<Sample> = table.deserialize()?;
    /// assert_eq!(samples[0].name, "s1");
    /// assert_eq!(samples[0].depth, Some(30.5));
    /// assert_eq!(samples[1].depth, None);
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn deserialize<D>(&self) -> Result<Vec<D>, Report>
    where
        D: DeserializeOwned,
    {
        let headers = csv::StringRecord::from(self.headers.clone());
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let record: csv::StringRecord = row.iter().map(|value| value.trim()).collect();
                record
                    .deserialize(Some(&headers))
                    .wrap_err_with(|| eyre!("Invalid record on table line {}.", i + 2))
            })
            .collect()
    }

    /// Write [`Table`] to file [`Path`].
    ///
    /// ## Examples
    ///
    /// ```
    /// use uqcme_table::Table;
    ///
    /// let mut table = Table::new();
    /// table.headers = vec!["1".to_string(), "2".to_string()];
    /// table.add_row(["A".to_string(), "B,C".to_string()])?;
    ///
    /// let file = tempfile::Builder::new().suffix(".tsv").tempfile()?;
    /// table.write(&file.path(), None)?;
    /// assert_eq!(std::fs::read_to_string(file.path())?, "1\t2\nA\tB,C\n");
    /// # Ok::<(), color_eyre::eyre::Report>(())
    /// ```
    pub fn write<P>(&self, path: &P, delim: Option<u8>) -> Result<(), Report>
    where
        P: AsRef<Path> + Debug,
    {
        let delim = match delim {
            Some(d) => d,
            None => get_delimiter(path),
        };
        let file = File::create(path).wrap_err_with(|| eyre!("Unable to create file: {path:?}"))?;
        self.to_writer(file, delim).wrap_err_with(|| eyre!("Unable to write table: {path:?}"))
    }

    /// Write [`Table`] as delimited text to any writer.
    pub fn to_writer<W>(&self, writer: W, delim: u8) -> Result<(), Report>
    where
        W: Write,
    {
        let mut writer = csv::WriterBuilder::new().delimiter(delim).from_writer(writer);
        writer.write_record(&self.headers).wrap_err("Unable to write table headers.")?;
        self.rows.iter().try_for_each(|row| {
            writer.write_record(row).wrap_err_with(|| eyre!("Unable to write table row: {row:?}"))
        })?;
        writer.flush().wrap_err("Unable to flush table.")?;
        Ok(())
    }
}

/// Get delimiter based on file extension.
///
/// - `.csv` => `,`
/// - anything else => `\t`
///
/// Extensions are matched ignoring case.
///
/// ```rust
/// use uqcme_table::get_delimiter;
///
/// assert_eq!(get_delimiter(&"file.csv"), b',');
/// assert_eq!(get_delimiter(&"file.CSV"), b',');
/// assert_eq!(get_delimiter(&"file.tsv"), b'\t');
/// assert_eq!(get_delimiter(&"file.TSV"), b'\t');
/// assert_eq!(get_delimiter(&"file.tab"), b'\t');
/// assert_eq!(get_delimiter(&"file"), b'\t');
/// ```
pub fn get_delimiter<P>(path: &P) -> u8
where
    P: AsRef<Path> + Debug,
{
    let ext = path.as_ref().extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
        "csv" => b',',
        "tsv" | "txt" => b'\t',
        _ => {
            debug!("Reading {path:?} as tab-delimited.");
            b'\t'
        }
    }
}
