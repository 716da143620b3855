//! Core domain logic for the calorie tracker.
//! This crate is the single source of truth for entry invariants.

pub mod config;
pub mod db;
pub mod events;
pub mod index;
pub mod input;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod screen;
pub mod series;
pub mod service;

pub use config::{load_config, ConfigError, TrackerConfig};
pub use events::{AppContext, AppEvent, EventBus, Subscription};
pub use index::{GroupedIndex, GroupingMode, IndexError, Mutation};
pub use input::{parse_calorie_input, InputError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::entry::{DietLevel, Entry, EntryId, EntryValidationError};
pub use notify::{
    ChangeBatch, ChangeEvent, ChangeKind, ChangeNotifier, ChangeSubscriber, IndexPath,
    NotifyError, SubscriberId, TableMirror,
};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use screen::{CalorieScreen, ScreenError};
pub use series::{extract, summarize, ChartSurface, SeriesSummary};
pub use service::diet_policy::{DietPolicy, FixedDietPolicy, ThresholdDietPolicy};
pub use service::record_store::RecordStore;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
