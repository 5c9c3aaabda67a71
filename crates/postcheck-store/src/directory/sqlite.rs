//! SQLite implementation of the AddressSource trait.
//!
//! Reads the `fias` table of a local directory export. Queries run on
//! tokio's blocking pool so a slow directory does not stall the runtime.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, warn};

use postcheck_core::{AddressComponents, AddressId, AddressRecord, Postcode};

use crate::directory::schema::{self, COMPONENT_COLUMNS, TABLE};
use crate::error::{Result, StoreError};
use crate::traits::AddressSource;

/// SQLite-backed address directory.
///
/// Thread-safe via internal Mutex.
pub struct SqliteDirectory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDirectory {
    /// Open an existing directory export read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        schema::verify(&conn)?;
        Ok(Self::from_conn(conn))
    }

    /// Open or create a writable directory at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::create(&conn)?;
        Ok(Self::from_conn(conn))
    }

    /// Open an empty in-memory directory.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create(&conn)?;
        Ok(Self::from_conn(conn))
    }

    fn from_conn(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Add one address row. `postcode` may be absent, as in real exports.
    pub fn insert_address(
        &self,
        id: &AddressId,
        postcode: Option<&Postcode>,
        components: &AddressComponents,
    ) -> Result<()> {
        let conn = lock(&self.conn)?;
        let c = components;
        conn.execute(
            &format!(
                "INSERT INTO {TABLE} (guid, postalcode, {}) VALUES (?1, ?2, {})",
                COMPONENT_COLUMNS.join(", "),
                (3..=COMPONENT_COLUMNS.len() + 2)
                    .map(|i| format!("?{i}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            params![
                id.as_str(),
                postcode.map(|p| p.as_str()),
                c.region.0,
                c.region.1,
                c.area.0,
                c.area.1,
                c.city.0,
                c.city.1,
                c.quarter.0,
                c.quarter.1,
                c.place.0,
                c.place.1,
                c.terr.0,
                c.terr.1,
                c.street.0,
                c.street.1,
                c.housenum,
                c.buildnum,
                c.strucnum,
            ],
        )?;
        Ok(())
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            f(&conn)
        })
        .await
        .map_err(|e| StoreError::Task(format!("spawn_blocking failed: {e}")))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Directory(format!("connection mutex poisoned: {e}")))
}

// Helper to convert a row to address components. Column 0 is the guid.
fn row_to_components(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, AddressComponents)> {
    let text = |i: usize| row.get::<_, String>(i);
    Ok((
        text(0)?,
        AddressComponents {
            region: (text(1)?, text(2)?),
            area: (text(3)?, text(4)?),
            city: (text(5)?, text(6)?),
            quarter: (text(7)?, text(8)?),
            place: (text(9)?, text(10)?),
            terr: (text(11)?, text(12)?),
            street: (text(13)?, text(14)?),
            housenum: text(15)?,
            buildnum: text(16)?,
            strucnum: text(17)?,
        },
    ))
}

#[async_trait]
impl AddressSource for SqliteDirectory {
    async fn count_by_postcode(&self) -> Result<Vec<(Postcode, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT postalcode, COUNT(*) FROM {TABLE}
                 WHERE postalcode IS NOT NULL
                 GROUP BY postalcode
                 ORDER BY postalcode"
            ))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut counts = Vec::with_capacity(rows.len());
            for (raw, count) in rows {
                match Postcode::new(&raw) {
                    // addresses_for matches the stored text exactly
                    Ok(postcode) if postcode.as_str() == raw => {
                        counts.push((postcode, count as u64))
                    }
                    Ok(_) => warn!(postcode = ?raw, addresses = count, "skipping padded postcode"),
                    Err(e) => warn!(postcode = %raw, error = %e, "skipping unusable postcode"),
                }
            }
            debug!(postcodes = counts.len(), "directory summary loaded");
            Ok(counts)
        })
        .await
    }

    async fn addresses_for(&self, postcode: &Postcode) -> Result<Vec<AddressRecord>> {
        let target = postcode.clone();

        self.with_conn(move |conn| {
            let columns = COMPONENT_COLUMNS
                .iter()
                .map(|c| format!("COALESCE(CAST({c} AS TEXT), '')"))
                .collect::<Vec<_>>()
                .join(", ");
            let mut stmt = conn.prepare(&format!(
                "SELECT guid, {columns} FROM {TABLE} WHERE postalcode = ?1"
            ))?;

            let mut rows = stmt
                .query_map(params![target.as_str()], row_to_components)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.sort_by(|(_, a), (_, b)| a.sort_key().cmp(&b.sort_key()));

            rows.into_iter()
                .map(|(guid, components)| {
                    let id = AddressId::new(&guid)
                        .map_err(|e| StoreError::Directory(e.to_string()))?;
                    Ok(AddressRecord::new(id, components.compose(), target.clone()))
                })
                .collect()
        })
        .await
    }
}
