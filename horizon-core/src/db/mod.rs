//! SQLite-backed storage.
//!
//! A [`Database`] wraps a single connection behind a mutex and exposes one
//! method per operation. Multi-table writes go through [`Database::with_tx`]
//! so each logical operation commits atomically.

pub mod schema;

mod energy;
mod goals;
mod query;
mod task_groups;
mod tasks;
mod users;

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction};
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the database at the platform data directory.
    pub fn open_default() -> Result<Self, CoreError> {
        let dirs = directories::ProjectDirs::from("", "", "horizon").ok_or_else(|| {
            CoreError::Invalid("could not determine a data directory for this platform".into())
        })?;
        std::fs::create_dir_all(dirs.data_dir())?;
        Self::open(dirs.data_dir().join("horizon.db"))
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure(conn: &Connection) -> Result<(), CoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(())
    }

    /// Create all tables and indexes. Idempotent.
    pub fn migrate(&self) -> Result<(), CoreError> {
        tracing::debug!("applying schema");
        self.with_conn(|conn| {
            conn.execute_batch(schema::SCHEMA)?;
            Ok(())
        })
    }

    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn with_tx<T>(
        &self,
        f: impl FnOnce(&Transaction) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = guard.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

// Row conversion helpers. SQLite stores UUIDs and timestamps as TEXT; a
// malformed stored value surfaces as a conversion failure, not a panic.

pub(crate) fn conversion_err(what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        rusqlite::types::Type::Text,
        format!("unexpected {what}: {value}").into(),
    )
}

pub(crate) fn uuid_value(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|_| conversion_err("uuid", s))
}

pub(crate) fn opt_uuid(s: Option<String>) -> rusqlite::Result<Option<Uuid>> {
    s.as_deref().map(uuid_value).transpose()
}

pub(crate) fn ts_value(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| conversion_err("timestamp", s))
}

pub(crate) fn date_value(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| conversion_err("date", s))
}

pub(crate) fn opt_date(s: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    s.as_deref().map(date_value).transpose()
}

pub(crate) fn parse_enum<T>(
    what: &str,
    s: &str,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(s).ok_or_else(|| conversion_err(what, s))
}

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}
