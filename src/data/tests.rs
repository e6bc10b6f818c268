use crate::data::{parse_body, read_file, validate, DataSource};
use color_eyre::eyre::{Report, Result};
use std::path::{Path, PathBuf};
use uqcme_table::Table;

fn table(headers: &[&str], rows: &[&[&str]]) -> Result<Table<String>, Report> {
    let mut table = Table::new();
    table.headers = headers.iter().map(|h| h.to_string()).collect();
    for row in rows {
        table.add_row(row.iter().map(|v| v.to_string()))?;
    }
    Ok(table)
}

#[tokio::test]
async fn load_tsv_and_csv() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;

    let path = dir.path().join("run.tsv");
    std::fs::write(&path, "sample_name\tGC\tspecies\ns1\t50.1\tEscherichia coli\ns2\t\t\n")?;
    let data = DataSource::File(path).load().await?;
    assert_eq!(data.len(), 2);
    assert_eq!(data.get("species", 0)?, "Escherichia coli");
    assert_eq!(data.get("GC", 1)?, "");

    let path = dir.path().join("run.csv");
    std::fs::write(&path, "sample_name,GC\ns1,50.1\n")?;
    let data = DataSource::File(path).load().await?;
    assert_eq!(data.get("GC", 0)?, "50.1");
    Ok(())
}

#[test]
fn read_any_extension() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    for name in ["run.TSV", "run.tab", "run"] {
        let path = dir.path().join(name);
        std::fs::write(&path, "sample_name\tGC\ns1\t50.1\n")?;
        assert_eq!(read_file(&path)?.get("GC", 0)?, "50.1", "{name}");
    }
    let path = dir.path().join("run.CSV");
    std::fs::write(&path, "sample_name,GC\ns1,50.1\n")?;
    assert_eq!(read_file(&path)?.get("GC", 0)?, "50.1");
    Ok(())
}

#[test]
fn read_short_rows() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("short.tsv");
    std::fs::write(&path, "sample_name\tGC\tnotes\ns1\t50.1\tok\ns2\t49.0\n")?;
    let data = read_file(&path)?;
    assert_eq!(data.get("notes", 1)?, "");

    // too many fields is still an error
    std::fs::write(&path, "sample_name\tGC\ns1\t50.1\textra\n")?;
    assert!(read_file(&path).is_err());
    Ok(())
}

#[test]
fn read_zst() -> Result<(), Report> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.tsv.zst");
    let compressed = zstd::encode_all("sample_name\tN50\ns1\t120000\n".as_bytes(), 0)?;
    std::fs::write(&path, compressed)?;

    let data = read_file(&path)?;
    assert_eq!(data.get("N50", 0)?, "120000");
    assert_eq!(data.path, Some(path));
    Ok(())
}

#[tokio::test]
async fn load_errors() -> Result<(), Report> {
    let missing = DataSource::File(PathBuf::from("does/not/exist.tsv"));
    assert!(missing.load().await.is_err());

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("run.tsv");
    std::fs::write(&path, "name\tGC\ns1\t50\n")?;
    assert!(DataSource::File(path).load().await.is_err());
    Ok(())
}

#[test]
fn validate_sample_names() -> Result<(), Report> {
    validate(&table(&["sample_name", "GC"], &[&["s1", "50"], &["s2", "51"]])?)?;

    assert!(validate(&table(&["name"], &[&["s1"]])?).is_err());
    assert!(validate(&table(&["sample_name"], &[&["s1"], &["s1"]])?).is_err());
    assert!(validate(&table(&["sample_name"], &[&["s1"], &["NaN"]])?).is_err());
    Ok(())
}

#[test]
fn parse_json_bodies() -> Result<(), Report> {
    // list of records, keys unioned in first-seen order
    let data = parse_body(r#"[{"sample_name": "s1", "GC": 50}, {"sample_name": "s2", "N50": 1000, "pass": true}]"#)?;
    assert_eq!(data.headers, ["sample_name", "GC", "N50", "pass"]);
    assert_eq!(data.rows, [["s1", "50", "", ""], ["s2", "", "1000", "true"]]);

    // first list of records in an object
    let data = parse_body(r#"{"count": 1, "tags": ["a"], "samples": [{"sample_name": "s1"}]}"#)?;
    assert_eq!(data.rows, [["s1"]]);

    // a single record
    let data = parse_body(r#"{"sample_name": "s1", "GC": "50.5"}"#)?;
    assert_eq!(data.headers, ["sample_name", "GC"]);
    assert_eq!(data.rows, [["s1", "50.5"]]);

    assert!(parse_body("42").is_err());
    assert!(parse_body(r#"[1, 2]"#).is_err());
    Ok(())
}

#[test]
fn parse_text_bodies() -> Result<(), Report> {
    let data = parse_body("sample_name,GC\ns1,50.5\n")?;
    assert_eq!(data.rows, [["s1", "50.5"]]);

    // a comma and a newline make the body CSV, even if it was meant as TSV
    assert!(parse_body("sample_name\tGC\ns1\t50,5\n").is_err());

    let data = parse_body("sample_name\tGC")?;
    assert_eq!(data.headers, ["sample_name", "GC"]);
    assert!(data.is_empty());
    Ok(())
}

#[test]
fn resolve_relative_file() {
    let mut source = DataSource::File(PathBuf::from("run.tsv"));
    source.resolve(Path::new("/data"));
    assert_eq!(source, DataSource::File(PathBuf::from("/data/run.tsv")));

    let mut source = DataSource::ApiCall("https://example.org".to_string());
    source.resolve(Path::new("/data"));
    assert_eq!(source, DataSource::ApiCall("https://example.org".to_string()));
}
