//! Grouped view index over calorie entries.
//!
//! # Responsibility
//! - Keep a sectioned, sorted projection of the record store's entries.
//! - Turn each store mutation into a minimal `ChangeBatch`.
//!
//! # Invariants
//! - The index never creates or destroys entries; it only mirrors store
//!   mutations reported through `apply` and full loads through `rebuild`.
//! - Within a section, rows are ordered by `timestamp_ms` descending.
//! - Under `GroupingMode::Timeline` (default) entries are presented newest
//!   first and sections are runs of equal labels along that order, so one
//!   label may own several sections.
//! - Under `GroupingMode::ByLevel` every label owns exactly one section and
//!   sections are ordered by label descending.
use super::diff::diff_layouts;
use super::layout::{Layout, Placement};
use crate::model::entry::{cmp_by_level, cmp_by_timeline, DietLevel, Entry, EntryId};
use crate::notify::{ChangeBatch, ChangeEvent, IndexPath};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How entries are split into sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Newest first; sections follow label changes along that order.
    #[default]
    Timeline,
    /// One contiguous section per diet level.
    ByLevel,
}

impl GroupingMode {
    fn compare(self, a: &Entry, b: &Entry) -> Ordering {
        match self {
            Self::ByLevel => cmp_by_level(a, b),
            Self::Timeline => cmp_by_timeline(a, b),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByLevel => "by_level",
            Self::Timeline => "timeline",
        }
    }
}

/// A single store mutation to mirror into the index.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Inserted(Entry),
    Deleted(Entry),
}

/// Index/store divergence detected while applying a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    DuplicateEntry(EntryId),
    MissingEntry(EntryId),
}

impl Display for IndexError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateEntry(id) => write!(f, "entry already indexed: {id}"),
            Self::MissingEntry(id) => write!(f, "entry not indexed: {id}"),
        }
    }
}

impl Error for IndexError {}

/// Read-only view of one section.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub label: &'a DietLevel,
    pub rows: &'a [Entry],
}

/// Sectioned projection of the record store.
#[derive(Debug, Clone, Default)]
pub struct GroupedIndex {
    mode: GroupingMode,
    layout: Layout,
    ids: HashSet<EntryId>,
}

impl GroupedIndex {
    pub fn new(mode: GroupingMode) -> Self {
        Self {
            mode,
            layout: Layout::default(),
            ids: HashSet::new(),
        }
    }

    pub fn mode(&self) -> GroupingMode {
        self.mode
    }

    /// Replaces the whole projection and returns the changes from the
    /// previous state.
    ///
    /// Duplicate ids keep their first occurrence.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = Entry>) -> ChangeBatch {
        let mut seen = HashSet::new();
        let mut sorted: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.id))
            .collect();
        sorted.sort_by(|a, b| self.mode.compare(a, b));

        let next = Layout::from_sorted(sorted);
        let batch = diff_layouts(&self.layout, &next);
        self.layout = next;
        self.ids = seen;
        debug!(
            "event=index_rebuild module=index status=ok mode={} entries={} sections={} changes={}",
            self.mode.as_str(),
            self.layout.entries.len(),
            self.layout.sections.len(),
            batch.len()
        );
        batch
    }

    /// Mirrors one store mutation and returns the resulting changes.
    ///
    /// The entry is located by binary search on its sort key and the
    /// affected section and row are updated in place. Only a timeline split
    /// or merge falls back to diffing the whole layout.
    ///
    /// # Errors
    /// - `IndexError::DuplicateEntry` when inserting an id already indexed.
    /// - `IndexError::MissingEntry` when deleting an entry not indexed.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<ChangeBatch, IndexError> {
        match mutation {
            Mutation::Inserted(entry) => self.insert(entry),
            Mutation::Deleted(entry) => self.remove(entry),
        }
    }

    /// Batch that inserts the current layout into an empty one.
    pub fn snapshot(&self) -> ChangeBatch {
        diff_layouts(&Layout::default(), &self.layout)
    }

    fn insert(&mut self, entry: &Entry) -> Result<ChangeBatch, IndexError> {
        if self.ids.contains(&entry.id) {
            return Err(IndexError::DuplicateEntry(entry.id));
        }
        let mode = self.mode;
        let position = self
            .layout
            .entries
            .binary_search_by(|held| mode.compare(held, entry))
            .unwrap_or_else(|position| position);

        let batch = match self.layout.insert_at(position, entry.clone()) {
            Some(Placement::Row(path)) => {
                ChangeBatch::new(vec![ChangeEvent::RowInserted { path, id: entry.id }])
            }
            Some(Placement::NewSection(section)) => ChangeBatch::new(vec![
                ChangeEvent::SectionInserted(section),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(section, 0),
                    id: entry.id,
                },
            ]),
            None => {
                let mut entries = self.layout.entries.clone();
                entries.insert(position, entry.clone());
                self.relayout(entries)
            }
        };
        self.ids.insert(entry.id);
        Ok(batch)
    }

    fn remove(&mut self, entry: &Entry) -> Result<ChangeBatch, IndexError> {
        let mode = self.mode;
        let position = self
            .layout
            .entries
            .binary_search_by(|held| mode.compare(held, entry))
            .map_err(|_| IndexError::MissingEntry(entry.id))?;

        let batch = match self.layout.remove_at(position) {
            Some(removal) => {
                let mut events = vec![ChangeEvent::RowDeleted {
                    path: removal.path,
                    id: removal.entry.id,
                }];
                if removal.section_removed {
                    events.push(ChangeEvent::SectionDeleted(removal.path.section));
                }
                ChangeBatch::new(events)
            }
            None => {
                let mut entries = self.layout.entries.clone();
                entries.remove(position);
                self.relayout(entries)
            }
        };
        self.ids.remove(&entry.id);
        Ok(batch)
    }

    fn relayout(&mut self, entries: Vec<Entry>) -> ChangeBatch {
        let next = Layout::from_sorted(entries);
        let batch = diff_layouts(&self.layout, &next);
        self.layout = next;
        debug!(
            "event=index_relayout module=index status=ok mode={} sections={} changes={}",
            self.mode.as_str(),
            self.layout.sections.len(),
            batch.len()
        );
        batch
    }

    pub fn section_count(&self) -> usize {
        self.layout.sections.len()
    }

    /// Row count of `section`; `0` when the section does not exist.
    pub fn row_count(&self, section: usize) -> usize {
        self.layout.rows(section).len()
    }

    pub fn entry_at(&self, section: usize, row: usize) -> Option<&Entry> {
        self.layout.rows(section).get(row)
    }

    pub fn section_label(&self, section: usize) -> Option<&DietLevel> {
        self.layout.sections.get(section).map(|range| &range.label)
    }

    /// Header text shown for `section`.
    pub fn section_title(&self, section: usize) -> Option<String> {
        self.section_label(section).map(DietLevel::title)
    }

    pub fn sections(&self) -> impl Iterator<Item = Section<'_>> + '_ {
        (0..self.section_count()).map(move |section| Section {
            label: &self.layout.sections[section].label,
            rows: self.layout.rows(section),
        })
    }

    /// All entries in presentation order.
    pub fn entries(&self) -> &[Entry] {
        &self.layout.entries
    }

    pub fn len(&self) -> usize {
        self.layout.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.entries.is_empty()
    }

    pub fn position_of(&self, id: EntryId) -> Option<IndexPath> {
        self.layout
            .paths()
            .find(|(_, entry)| entry.id == id)
            .map(|(path, _)| path)
    }

    /// Entry ids per section, in presentation order.
    pub fn section_ids(&self) -> Vec<Vec<EntryId>> {
        self.sections()
            .map(|section| section.rows.iter().map(|entry| entry.id).collect())
            .collect()
    }

    /// Whether every label occupies a single section.
    pub fn is_contiguous(&self) -> bool {
        let mut labels = HashSet::new();
        self.layout
            .sections
            .iter()
            .all(|range| labels.insert(&range.label))
    }
}
