//! Delimited-text loader.
//!
//! Reads an entire file into a [`Table`], inferring each column's kind from
//! its literal values once every row has been read. Row widths are checked
//! strictly: a ragged row is a [`SourceError::Csv`] naming the line. Header
//! names are trimmed; cell text is kept exactly as written.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crime_trends_source_models::{Column, Table};

use crate::SourceError;
use crate::parsing::infer_kind;

/// Loads a delimited file from disk.
///
/// The file is opened, fully read and closed before this returns.
///
/// # Errors
///
/// Returns [`SourceError::Io`] if the file cannot be opened,
/// [`SourceError::Csv`] if a row is malformed, or [`SourceError::Parse`] if
/// the file has no header row.
pub fn load_table(path: &Path, delimiter: u8) -> Result<Table, SourceError> {
    let origin = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| SourceError::Io {
        origin: origin.clone(),
        source,
    })?;
    read_table(std::io::BufReader::new(file), delimiter, &origin)
}

/// Reads a delimited table from any reader.
///
/// `origin` labels the input in error and log messages. Invalid UTF-8 is
/// replaced rather than rejected.
///
/// # Errors
///
/// Returns [`SourceError::Csv`] if a row is malformed, or
/// [`SourceError::Parse`] if there is no header row.
pub fn read_table<R: Read>(reader: R, delimiter: u8, origin: &str) -> Result<Table, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_reader(reader);

    let csv_err = |source: csv::Error| SourceError::Csv {
        origin: origin.to_string(),
        source,
    };

    let headers: Vec<String> = reader
        .byte_headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_owned())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(SourceError::Parse {
            message: format!("{origin}: file contains no header row"),
        });
    }

    let headers = disambiguate_headers(headers);

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(csv_err)?;
        rows.push(
            record
                .iter()
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect(),
        );
    }

    let columns: Vec<Column> = headers
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let kind = infer_kind(rows.iter().map(|r| r.get(i).map_or("", String::as_str)));
            Column::new(name, kind)
        })
        .collect();

    log::info!(
        "Loaded {} rows x {} columns from {origin}",
        rows.len(),
        columns.len()
    );

    Table::new(columns, rows).map_err(|e| SourceError::Parse {
        message: format!("{origin}: {e}"),
    })
}

/// Renames repeated header names to `name.1`, `name.2`, ... so that every
/// column stays addressable by name. A suffix that would collide with an
/// existing header is skipped.
fn disambiguate_headers(headers: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = headers.iter().cloned().collect();
    let mut assigned: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut next_suffix: HashMap<String, usize> = HashMap::new();

    headers
        .into_iter()
        .map(|name| {
            if assigned.insert(name.clone()) {
                return name;
            }
            let suffix = next_suffix.entry(name.clone()).or_insert(1);
            let renamed = loop {
                let candidate = format!("{name}.{suffix}");
                *suffix += 1;
                if !taken.contains(&candidate) {
                    break candidate;
                }
            };
            log::warn!("Duplicate header {name:?} renamed to {renamed:?}");
            taken.insert(renamed.clone());
            assigned.insert(renamed.clone());
            renamed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crime_trends_source_models::ColumnKind;

    use super::*;

    const DENVER_SAMPLE: &str = "\
incident_id,offense_category_id,reported_date,geo_lat,victim_count
1,theft,2013-01-05 10:00:00,39.7,1
2,assault,2014-02-06 11:00:00,,2
";

    #[test]
    fn reads_headers_rows_and_kinds() {
        let table = read_table(DENVER_SAMPLE.as_bytes(), b',', "denver").unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.column_names(),
            vec![
                "incident_id",
                "offense_category_id",
                "reported_date",
                "geo_lat",
                "victim_count"
            ]
        );
        let kinds: Vec<ColumnKind> = table.columns().iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ColumnKind::Integer,
                ColumnKind::Text,
                ColumnKind::DateTime,
                ColumnKind::Float,
                ColumnKind::Integer
            ]
        );
        assert_eq!(table.cell(1, 3), None);
    }

    #[test]
    fn ragged_row_is_a_csv_error() {
        let data = "a,b\n1,2\n3\n";
        let err = read_table(data.as_bytes(), b',', "ragged").unwrap_err();
        assert!(matches!(err, SourceError::Csv { .. }), "got {err:?}");
        assert!(err.to_string().contains("ragged"));
    }

    #[test]
    fn empty_input_has_no_header() {
        let err = read_table(&b""[..], b',', "empty").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }), "got {err:?}");
    }

    #[test]
    fn honours_delimiter() {
        let table = read_table("a;b\n1;x\n".as_bytes(), b';', "semi").unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.cell(0, 1), Some("x"));
    }

    #[test]
    fn renames_duplicate_headers() {
        let table = read_table("a,a,b\n1,2,3\n".as_bytes(), b',', "dup").unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.1", "b"]);
    }

    #[test]
    fn renamed_headers_never_collide() {
        let table = read_table("a,a,a.1\n1,2,3\n".as_bytes(), b',', "dup").unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.2", "a.1"]);
        assert_eq!(table.column_index("a.1"), Some(2));
        assert_eq!(table.column_index("a.2"), Some(1));

        let table = read_table("a,a,a,a.2\n1,2,3,4\n".as_bytes(), b',', "dup").unwrap();
        assert_eq!(table.column_names(), vec!["a", "a.1", "a.3", "a.2"]);
    }

    #[test]
    fn cells_are_kept_verbatim_and_headers_trimmed() {
        let data = " year , category\n2013,Theft\n2013,Theft \n2013, Theft\n2013,theft\n";
        let table = read_table(data.as_bytes(), b',', "padded").unwrap();
        assert_eq!(table.column_names(), vec!["year", "category"]);
        assert_eq!(table.cell(1, 1), Some("Theft "));
        assert_eq!(table.cell(2, 1), Some(" Theft"));

        let deduped = crate::clean::deduplicate(&table);
        assert_eq!(deduped.removed, 0);
        assert_eq!(deduped.table.row_count(), 4);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_table(Path::new("/nonexistent/crime.csv"), b',').unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }), "got {err:?}");
        assert!(err.to_string().contains("/nonexistent/crime.csv"));
    }

    #[test]
    fn loads_from_disk() {
        let tmp = std::env::temp_dir().join("crime_trends_loader_test");
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();

        let path = tmp.join("denver_crime.csv");
        std::fs::write(&path, DENVER_SAMPLE).unwrap();
        let table = load_table(&path, b',').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 5);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
