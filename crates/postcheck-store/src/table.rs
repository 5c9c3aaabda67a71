//! `;`-delimited text tables.
//!
//! Every file postcheck reads or writes is a header line followed by one row
//! per record. Writes are atomic: the table is written to a temporary file in
//! the same directory and renamed over the target.

use std::collections::HashSet;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use postcheck_core::Postcode;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};
use crate::traits::CacheRecord;

/// Field delimiter of every table.
pub const DELIMITER: u8 = b';';

/// Read all records of a cache table.
///
/// Returns `None` if the file does not exist. The header must name exactly
/// the record's columns, in any order. Each record is paired with the line
/// it was read from.
pub fn read_records<R: CacheRecord>(path: &Path) -> Result<Option<Vec<(u64, R)>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .from_reader(file);

    // Column order is free; rows are read by header name.
    let headers = reader.headers().map_err(|e| malformed(path, 1, e))?.clone();
    let found: HashSet<&str> = headers.iter().collect();
    if headers.len() != R::HEADERS.len() || R::HEADERS.iter().any(|h| !found.contains(h)) {
        return Err(StoreError::Malformed {
            path: path.to_path_buf(),
            line: 1,
            reason: format!(
                "expected columns {:?}, found {:?}",
                R::HEADERS,
                headers.iter().collect::<Vec<_>>()
            ),
        });
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            malformed(path, line, e)
        })?;
        let line = line_of(&row);
        let parsed: R::Row = row
            .deserialize(Some(&headers))
            .map_err(|e| malformed(path, line, e))?;
        let record = R::from_row(parsed).map_err(|reason| StoreError::Malformed {
            path: path.to_path_buf(),
            line,
            reason,
        })?;
        records.push((line, record));
    }

    Ok(Some(records))
}

/// Atomically replace `path` with a table of `rows` under `headers`.
///
/// The header line is written even when there are no rows.
pub fn write_table<S: Serialize>(
    path: &Path,
    headers: &[&str],
    rows: impl IntoIterator<Item = S>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;

    {
        let mut writer = WriterBuilder::new()
            .delimiter(DELIMITER)
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer.write_record(headers)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Read a one-column postcode list.
///
/// Blank lines are skipped. A first line that is not all digits is taken as
/// a header; any later invalid line is an error. Only the first
/// field of each line is used.
pub fn read_postcode_list(path: &Path) -> Result<Vec<Postcode>> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut postcodes = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            malformed(path, line, e)
        })?;
        let cell = row.get(0).unwrap_or("").trim();
        if cell.is_empty() {
            continue;
        }
        if i == 0 && !cell.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        match Postcode::new(cell) {
            Ok(postcode) => postcodes.push(postcode),
            Err(e) => return Err(malformed(path, line_of(&row), e)),
        }
    }
    Ok(postcodes)
}

fn line_of(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

fn malformed(path: &Path, line: u64, reason: impl ToString) -> StoreError {
    StoreError::Malformed {
        path: path.to_path_buf(),
        line,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Pair<'a> {
        name: &'a str,
        value: u64,
    }

    #[test]
    fn test_write_table_quotes_delimiters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_table(
            &path,
            &["name", "value"],
            [Pair { name: "a;b", value: 1 }, Pair { name: "c", value: 2 }],
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name;value\n\"a;b\";1\nc;2\n");
    }

    #[test]
    fn test_write_table_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale contents\n").unwrap();
        write_table(&path, &["name", "value"], Vec::<Pair>::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "name;value\n");
    }

    #[test]
    fn test_read_postcode_list_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        std::fs::write(&path, "INDEX\n101000\n\n630000;extra\n").unwrap();
        let list = read_postcode_list(&path).unwrap();
        let list: Vec<_> = list.iter().map(|p| p.as_str()).collect();
        assert_eq!(list, ["101000", "630000"]);
    }

    #[test]
    fn test_read_postcode_list_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.csv");
        std::fs::write(&path, "101000\nn/a\n").unwrap();
        assert!(matches!(
            read_postcode_list(&path),
            Err(StoreError::Malformed { line: 2, .. })
        ));
    }
}
