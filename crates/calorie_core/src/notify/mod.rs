//! Change notification for display surfaces.
//!
//! # Responsibility
//! - Describe structural changes of the grouped projection as ordered,
//!   tagged events (`ChangeBatch`).
//! - Deliver each batch to the single subscriber of a display surface,
//!   bracketed by `begin_batch`/`end_batch`.
//!
//! # Invariants
//! - Row and section deletions (and move sources) address the pre-mutation
//!   index space; insertions (and move targets) address the post-mutation
//!   index space.
//! - Updates address the pre-mutation index space.
//! - Batches never overlap: delivery is synchronous and needs `&mut`.

use crate::model::entry::EntryId;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod mirror;
pub mod notifier;

pub use mirror::TableMirror;
pub use notifier::{ChangeNotifier, ChangeSubscriber, SubscriberId};

/// Section/row coordinate inside the grouped projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

impl Display for IndexPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.section, self.row)
    }
}

/// One structural change. Row events carry the entry id so a subscriber
/// can keep its own mirror without querying the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    SectionInserted(usize),
    SectionDeleted(usize),
    RowInserted { path: IndexPath, id: EntryId },
    RowDeleted { path: IndexPath, id: EntryId },
    RowMoved {
        from: IndexPath,
        to: IndexPath,
        id: EntryId,
    },
    RowUpdated { path: IndexPath, id: EntryId },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::SectionInserted(_) | Self::RowInserted { .. } => ChangeKind::Insert,
            Self::SectionDeleted(_) | Self::RowDeleted { .. } => ChangeKind::Delete,
            Self::RowMoved { .. } => ChangeKind::Move,
            Self::RowUpdated { .. } => ChangeKind::Update,
        }
    }
}

/// Change type codes as reported by change-tracking stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Delete,
    Move,
    Update,
}

impl ChangeKind {
    /// Decodes a store-reported change code (`1..=4`).
    ///
    /// # Errors
    /// - `NotifyError::UnhandledChangeKind` for any other code.
    pub fn from_code(code: u8) -> Result<Self, NotifyError> {
        match code {
            1 => Ok(Self::Insert),
            2 => Ok(Self::Delete),
            3 => Ok(Self::Move),
            4 => Ok(Self::Update),
            other => Err(NotifyError::UnhandledChangeKind(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Insert => 1,
            Self::Delete => 2,
            Self::Move => 3,
            Self::Update => 4,
        }
    }
}

/// Ordered set of changes produced by one mutation or rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    events: Vec<ChangeEvent>,
}

impl ChangeBatch {
    pub fn new(events: Vec<ChangeEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChangeEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<ChangeEvent> {
        self.events
    }
}

impl<'a> IntoIterator for &'a ChangeBatch {
    type Item = &'a ChangeEvent;
    type IntoIter = std::slice::Iter<'a, ChangeEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

/// Errors raised while delivering or applying change batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// A batch does not fit the subscriber's current state.
    Inconsistent(String),
    /// A store reported a change code this build does not know.
    UnhandledChangeKind(u8),
    /// The display surface already has an active subscriber.
    AlreadySubscribed(SubscriberId),
    /// No active subscriber matches the given id.
    UnknownSubscriber(SubscriberId),
    /// The subscriber's shared cell was already borrowed by its host.
    SubscriberBusy,
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inconsistent(details) => write!(f, "inconsistent change batch: {details}"),
            Self::UnhandledChangeKind(code) => write!(f, "unhandled change kind code {code}"),
            Self::AlreadySubscribed(id) => {
                write!(f, "display surface already has subscriber {id}")
            }
            Self::UnknownSubscriber(id) => write!(f, "unknown subscriber {id}"),
            Self::SubscriberBusy => write!(f, "subscriber is borrowed elsewhere"),
        }
    }
}

impl Error for NotifyError {}

#[cfg(test)]
mod tests {
    use super::{ChangeKind, NotifyError};

    #[test]
    fn unknown_change_code_is_an_error() {
        assert_eq!(ChangeKind::from_code(3), Ok(ChangeKind::Move));
        assert_eq!(
            ChangeKind::from_code(9),
            Err(NotifyError::UnhandledChangeKind(9))
        );
    }
}
