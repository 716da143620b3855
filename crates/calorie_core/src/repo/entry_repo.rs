//! Entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide create/delete/read APIs over `calorie_entries` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Entry::validate()` before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Every successful write is committed before the call returns.

use crate::db::DbError;
use crate::model::entry::{DietLevel, Entry, EntryId, EntryValidationError};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ENTRY_SELECT_SQL: &str = "SELECT
    uuid,
    calories,
    timestamp_ms,
    diet_level
FROM calorie_entries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EntryValidationError),
    Db(DbError),
    NotFound(EntryId),
    InvalidData(String),
}

impl RepoError {
    /// Whether this error comes from the storage layer rather than input.
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, Self::Db(_) | Self::InvalidData(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<EntryValidationError> for RepoError {
    fn from(value: EntryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for calorie entries.
pub trait EntryRepository {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId>;
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    /// Lists all entries ordered by `timestamp_ms DESC, diet_level DESC, uuid ASC`.
    fn list_entries(&self) -> RepoResult<Vec<Entry>>;
    fn count_entries(&self) -> RepoResult<u64>;
    /// Hard-deletes one entry; `NotFound` when no row matched.
    fn delete_entry(&self, id: EntryId) -> RepoResult<()>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(&self, entry: &Entry) -> RepoResult<EntryId> {
        entry.validate()?;

        self.conn.execute(
            "INSERT INTO calorie_entries (
                uuid,
                calories,
                timestamp_ms,
                diet_level
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                entry.id.to_string(),
                entry.calories,
                entry.timestamp_ms,
                entry.diet_level.as_str(),
            ],
        )?;

        Ok(entry.id)
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_entry_row(row)?));
        }
        Ok(None)
    }

    fn list_entries(&self) -> RepoResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} ORDER BY timestamp_ms DESC, diet_level DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(row)?);
        }

        Ok(entries)
    }

    fn count_entries(&self) -> RepoResult<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM calorie_entries;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative entry count `{count}`")))
    }

    fn delete_entry(&self, id: EntryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM calorie_entries WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<Entry> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid uuid value `{uuid_text}` in calorie_entries.uuid"
        ))
    })?;

    let level_text: String = row.get("diet_level")?;
    let diet_level = DietLevel::new(&level_text).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid diet level `{level_text}` in calorie_entries.diet_level"
        ))
    })?;

    let entry = Entry::with_id(
        id,
        row.get("calories")?,
        row.get("timestamp_ms")?,
        diet_level,
    )?;
    Ok(entry)
}
