//! SQLite-backed city store.
//!
//! Readers share one connection guarded by a mutex. Every [`SqliteCityWriter`]
//! opens its own connection to the same database file so that uncommitted
//! state never leaks between writers. The database runs in WAL mode, which
//! lets readers proceed while a writer holds the write lock; writers queue on
//! SQLite's busy handler.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use log::warn;
use rusqlite::{
    Connection, OpenFlags, Row, TransactionBehavior, params, params_from_iter, types::Value,
};
use thiserror::Error;

use super::{CityStore, CityWriter, StoreError};
use crate::{City, CityPredicate, CitySort, SearchTerm, fold_search_text};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS cities (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        country TEXT NOT NULL,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL,
        is_favorite INTEGER NOT NULL DEFAULT 0,
        name_key TEXT NOT NULL,
        country_key TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS cities_by_country_name ON cities (country, name, id);
    CREATE INDEX IF NOT EXISTS cities_by_favorite ON cities (is_favorite, country, name, id);
";

const SELECT_CITY: &str = "SELECT id, name, country, latitude, longitude, is_favorite FROM cities";

const INSERT_CITY: &str = "INSERT OR REPLACE INTO cities (
        id, name, country, latitude, longitude, is_favorite, name_key, country_key
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

const MATCH_TERM: &str = "(instr(name_key, ?) > 0 OR instr(country_key, ?) > 0)";

/// Default time a connection waits for a competing writer to release the lock.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for [`SqliteCityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqliteStoreOptions {
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout: Duration,
}

impl Default for SqliteStoreOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl SqliteStoreOptions {
    /// Set the busy timeout.
    #[must_use]
    pub const fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Errors raised while opening a [`SqliteCityStore`].
#[derive(Debug, Error)]
pub enum SqliteCityStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path:?}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Applying connection settings failed.
    #[error("failed to configure SQLite database at {path:?}: {source}")]
    Configure {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// Creating the `cities` table failed.
    #[error("failed to create cities schema in {path:?}: {source}")]
    CreateSchema {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
}

/// City store persisted in a SQLite database file.
pub struct SqliteCityStore {
    path: PathBuf,
    options: SqliteStoreOptions,
    connection: Mutex<Connection>,
}

impl fmt::Debug for SqliteCityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCityStore")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SqliteCityStore {
    /// Open or create the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteCityStoreError> {
        Self::open_with_options(path, SqliteStoreOptions::default())
    }

    /// Open or create the database at `path` with explicit options.
    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        options: SqliteStoreOptions,
    ) -> Result<Self, SqliteCityStoreError> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let connection = open_connection(path, flags, options)?;
        connection
            .execute_batch(SCHEMA)
            .map_err(|source| SqliteCityStoreError::CreateSchema {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_parts(path, options, connection))
    }

    /// Open an existing database without creating the schema.
    ///
    /// Operations on a database that was never refreshed fail with
    /// [`StoreError::Uninitialised`].
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, SqliteCityStoreError> {
        let path = path.as_ref();
        let options = SqliteStoreOptions::default();
        let connection = open_connection(path, OpenFlags::SQLITE_OPEN_READ_WRITE, options)?;
        Ok(Self::from_parts(path, options, connection))
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn from_parts(path: &Path, options: SqliteStoreOptions, connection: Connection) -> Self {
        Self {
            path: path.to_path_buf(),
            options,
            connection: Mutex::new(connection),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::backend("lock reader connection", "connection mutex poisoned"))
    }
}

fn open_connection(
    path: &Path,
    flags: OpenFlags,
    options: SqliteStoreOptions,
) -> Result<Connection, SqliteCityStoreError> {
    let connection = Connection::open_with_flags(path, flags).map_err(|source| {
        SqliteCityStoreError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        }
    })?;
    let configure = |source| SqliteCityStoreError::Configure {
        path: path.to_path_buf(),
        source,
    };
    connection
        .busy_timeout(options.busy_timeout)
        .map_err(configure)?;
    connection
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .map_err(configure)?;
    Ok(connection)
}

impl CityStore for SqliteCityStore {
    type Writer = SqliteCityWriter;

    fn writer(&self) -> Result<Self::Writer, StoreError> {
        let connection =
            open_connection(&self.path, OpenFlags::SQLITE_OPEN_READ_WRITE, self.options)
                .map_err(|err| StoreError::backend("open writer connection", err))?;
        Ok(SqliteCityWriter { connection })
    }

    fn query(
        &self,
        sort: CitySort,
        predicate: &CityPredicate,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<City>, StoreError> {
        let mut sql = String::from(SELECT_CITY);
        let mut values = Vec::new();
        push_filter(&mut sql, &mut values, predicate);
        sql.push_str(order_by(sort));
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(saturating_i64(limit)));
        values.push(Value::Integer(saturating_i64(offset)));

        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(&sql)
            .map_err(|err| classify("prepare city query", err))?;
        let rows = statement
            .query_map(params_from_iter(values.iter()), read_city)
            .map_err(|err| classify("query cities", err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| classify("read city row", err))
    }

    fn count(&self, predicate: &CityPredicate) -> Result<usize, StoreError> {
        let mut sql = String::from("SELECT COUNT(*) FROM cities");
        let mut values = Vec::new();
        push_filter(&mut sql, &mut values, predicate);

        let connection = self.lock()?;
        let count: i64 = connection
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))
            .map_err(|err| classify("count cities", err))?;
        usize::try_from(count).map_err(|err| StoreError::backend("convert city count", err))
    }

    fn toggle_favorite(&self, id: i64) -> Result<City, StoreError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| classify("begin favorite update", err))?;
        let changed = transaction
            .execute(
                "UPDATE cities SET is_favorite = NOT is_favorite WHERE id = ?1",
                [id],
            )
            .map_err(|err| classify("toggle favorite", err))?;
        if changed == 0 {
            return Err(StoreError::MissingCity { id });
        }
        let city = transaction
            .query_row(&format!("{SELECT_CITY} WHERE id = ?1"), [id], read_city)
            .map_err(|err| classify("reload favorite city", err))?;
        transaction
            .commit()
            .map_err(|err| classify("commit favorite update", err))?;
        Ok(city)
    }
}

/// Write context holding its own SQLite connection.
///
/// The first write opens an immediate transaction; [`CityWriter::save`]
/// commits it. Dropping the writer rolls back anything uncommitted.
pub struct SqliteCityWriter {
    connection: Connection,
}

impl fmt::Debug for SqliteCityWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteCityWriter")
            .field("in_transaction", &!self.connection.is_autocommit())
            .finish()
    }
}

impl SqliteCityWriter {
    fn begin(&self) -> Result<(), StoreError> {
        if self.connection.is_autocommit() {
            self.connection
                .execute_batch("BEGIN IMMEDIATE")
                .map_err(|err| classify("begin write transaction", err))?;
        }
        Ok(())
    }
}

impl CityWriter for SqliteCityWriter {
    fn delete_all(&mut self) -> Result<usize, StoreError> {
        self.begin()?;
        self.connection
            .execute("DELETE FROM cities", [])
            .map_err(|err| classify("delete cities", err))
    }

    fn insert(&mut self, city: &City) -> Result<(), StoreError> {
        self.begin()?;
        let mut statement = self
            .connection
            .prepare_cached(INSERT_CITY)
            .map_err(|err| classify("prepare city insert", err))?;
        statement
            .execute(params![
                city.id,
                city.name,
                city.country,
                city.latitude,
                city.longitude,
                city.is_favorite,
                fold_search_text(&city.name),
                fold_search_text(&city.country),
            ])
            .map_err(|err| classify("insert city", err))?;
        Ok(())
    }

    fn save(self) -> Result<(), StoreError> {
        if !self.connection.is_autocommit() {
            self.connection
                .execute_batch("COMMIT")
                .map_err(|err| classify("commit cities", err))?;
        }
        Ok(())
    }
}

impl Drop for SqliteCityWriter {
    fn drop(&mut self) {
        if self.connection.is_autocommit() {
            return;
        }
        if let Err(err) = self.connection.execute_batch("ROLLBACK") {
            warn!("failed to roll back uncommitted city writes: {err}");
        }
    }
}

fn push_filter(sql: &mut String, values: &mut Vec<Value>, predicate: &CityPredicate) {
    match predicate {
        CityPredicate::All => {}
        CityPredicate::Favorites => sql.push_str(" WHERE is_favorite = 1"),
        CityPredicate::Matching(term) => {
            sql.push_str(" WHERE ");
            sql.push_str(MATCH_TERM);
            push_term(values, term);
        }
        CityPredicate::FavoritesMatching(term) => {
            sql.push_str(" WHERE is_favorite = 1 AND ");
            sql.push_str(MATCH_TERM);
            push_term(values, term);
        }
    }
}

// The term is bound once for the name key and once for the country key.
fn push_term(values: &mut Vec<Value>, term: &SearchTerm) {
    values.push(Value::Text(term.as_str().to_owned()));
    values.push(Value::Text(term.as_str().to_owned()));
}

const fn order_by(sort: CitySort) -> &'static str {
    match sort {
        CitySort::CountryThenName => " ORDER BY country, name, id",
        CitySort::Id => " ORDER BY id",
    }
}

fn saturating_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn read_city(row: &Row<'_>) -> rusqlite::Result<City> {
    Ok(City {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        is_favorite: row.get(5)?,
    })
}

fn classify(operation: &'static str, error: rusqlite::Error) -> StoreError {
    match &error {
        rusqlite::Error::SqliteFailure(_, Some(message))
            if message.starts_with("no such table") =>
        {
            StoreError::Uninitialised
        }
        _ => StoreError::backend(operation, error),
    }
}
