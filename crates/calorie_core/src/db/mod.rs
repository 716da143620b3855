//! Calorie database bootstrap and schema versioning.
//!
//! # Responsibility
//! - Open the SQLite file that backs the record store, durably configured.
//! - Bring its schema to the version this build understands.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - No entry is read or written through a connection whose migrations
//!   did not all succeed.
//! - Every failure here is a storage fault: recoverable, reported, never a
//!   panic.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Storage faults raised while opening or migrating the calorie database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the tracker.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// One migration step failed; the whole upgrade was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The migration registry is not strictly increasing from 1.
    MigrationOrder { previous: u32, next: u32 },
}

impl DbError {
    /// Stable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "sqlite",
            Self::UnsupportedSchemaVersion { .. } => "schema_too_new",
            Self::Migration { .. } => "migration_failed",
            Self::MigrationOrder { .. } => "migration_order",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "storage fault: {err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "calorie database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "calorie schema migration {version} failed: {source}")
            }
            Self::MigrationOrder { previous, next } => write!(
                f,
                "calorie schema migrations out of order: {next} follows {previous}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } | Self::MigrationOrder { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
