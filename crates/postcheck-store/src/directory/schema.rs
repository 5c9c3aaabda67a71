//! Schema of the SQLite address directory.
//!
//! The directory is normally an export produced elsewhere; postcheck only
//! reads it. [`create`] exists so fixtures and fresh databases get the same
//! layout the export uses.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Name of the directory table.
pub const TABLE: &str = "fias";

/// Address component columns, in `(type, name)` pairs followed by house parts.
pub const COMPONENT_COLUMNS: [&str; 17] = [
    "region_s", "region_f", "area_s", "area_f", "city_s", "city_f", "quarter_s", "quarter_f",
    "place_s", "place_f", "terr_s", "terr_f", "street_s", "street_f", "housenum", "buildnum",
    "strucnum",
];

/// Create the directory table and its postcode index if they do not exist.
///
/// Idempotent.
pub fn create(conn: &Connection) -> Result<()> {
    let columns = COMPONENT_COLUMNS
        .iter()
        .map(|c| format!("{c} TEXT"))
        .collect::<Vec<_>>()
        .join(",\n            ");

    conn.execute_batch(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {TABLE} (
            guid TEXT PRIMARY KEY,
            postalcode TEXT,
            {columns}
        );

        CREATE INDEX IF NOT EXISTS idx_{TABLE}_postalcode ON {TABLE}(postalcode);
        "#
    ))?;
    Ok(())
}

/// Fail unless the directory table exists.
pub fn verify(conn: &Connection) -> Result<()> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [TABLE],
            |row| row.get(0),
        )
        .optional()?;

    match found {
        Some(_) => Ok(()),
        None => Err(StoreError::Directory(format!("table `{TABLE}` not found"))),
    }
}
