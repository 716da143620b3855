//! Record store use-case service.
//!
//! # Responsibility
//! - Own the lifetime of calorie entries: append, delete, list.
//! - Derive the diet level of new entries through a `DietPolicy`.
//!
//! # Invariants
//! - Invalid calorie amounts never reach the repository.
//! - A successful `append`/`delete` is durable when it returns.
//! - Deleting a missing entry is a no-op, not an error.

use crate::model::entry::{validate_calories, DietLevel, Entry, EntryId};
use crate::repo::entry_repo::{EntryRepository, RepoError, RepoResult};
use crate::service::diet_policy::DietPolicy;
use log::{debug, error, info};

/// Authoritative store of calorie entries.
pub struct RecordStore<R: EntryRepository> {
    repo: R,
    policy: Box<dyn DietPolicy>,
}

impl<R: EntryRepository> RecordStore<R> {
    /// Creates a store over `repo` using `policy` to label new entries.
    pub fn new(repo: R, policy: impl DietPolicy + 'static) -> Self {
        Self {
            repo,
            policy: Box::new(policy),
        }
    }

    /// Appends a new entry labelled by the configured policy.
    ///
    /// # Errors
    /// - `RepoError::Validation` when `calories` is non-finite or `<= 0`.
    /// - `RepoError::Db` when the write fails.
    pub fn append(&self, calories: f64, timestamp_ms: i64) -> RepoResult<Entry> {
        validate_calories(calories)?;
        let diet_level = self.policy.classify(calories);
        self.append_with_level(calories, timestamp_ms, diet_level)
    }

    /// Appends a new entry with an explicit diet level.
    pub fn append_with_level(
        &self,
        calories: f64,
        timestamp_ms: i64,
        diet_level: DietLevel,
    ) -> RepoResult<Entry> {
        let entry = Entry::new(calories, timestamp_ms, diet_level)?;
        match self.repo.create_entry(&entry) {
            Ok(_) => {
                info!(
                    "event=entry_append module=store status=ok entry_id={} diet_level={}",
                    entry.id, entry.diet_level
                );
                Ok(entry)
            }
            Err(err) => {
                error!(
                    "event=entry_append module=store status=error diet_level={} error={}",
                    entry.diet_level, err
                );
                Err(err)
            }
        }
    }

    /// Removes one entry and returns it; `Ok(None)` when it does not exist.
    pub fn delete(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        let Some(entry) = self.repo.get_entry(id)? else {
            debug!("event=entry_delete module=store status=noop entry_id={id}");
            return Ok(None);
        };

        match self.repo.delete_entry(id) {
            Ok(()) => {
                info!("event=entry_delete module=store status=ok entry_id={id}");
                Ok(Some(entry))
            }
            Err(RepoError::NotFound(_)) => {
                debug!("event=entry_delete module=store status=noop entry_id={id}");
                Ok(None)
            }
            Err(err) => {
                error!("event=entry_delete module=store status=error entry_id={id} error={err}");
                Err(err)
            }
        }
    }

    /// Gets one entry by id.
    pub fn get(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        self.repo.get_entry(id)
    }

    /// Lists every stored entry. Presentation order is the index's concern.
    pub fn list_all(&self) -> RepoResult<Vec<Entry>> {
        self.repo.list_entries()
    }

    pub fn count(&self) -> RepoResult<u64> {
        self.repo.count_entries()
    }
}
