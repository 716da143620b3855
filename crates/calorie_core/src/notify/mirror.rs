//! Reference subscriber that mirrors the grouped layout as entry ids.
//!
//! # Invariants
//! - A batch is applied all-or-nothing: the mirror is only replaced once
//!   every event of the batch validated.
//! - Deletions are applied first, in descending order, against the old
//!   layout; insertions follow in ascending order against the new layout.

use super::{ChangeEvent, ChangeSubscriber, IndexPath, NotifyError};
use crate::model::entry::EntryId;

/// Section/row mirror kept by a display surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableMirror {
    sections: Vec<Vec<EntryId>>,
    pending: Option<Vec<ChangeEvent>>,
    applied_batches: u64,
}

impl TableMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[Vec<EntryId>] {
        &self.sections
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn row_count(&self, section: usize) -> usize {
        self.sections.get(section).map_or(0, Vec::len)
    }

    pub fn applied_batches(&self) -> u64 {
        self.applied_batches
    }

    /// Applies a full batch outside of notifier delivery.
    pub fn apply_batch<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a ChangeEvent>,
    ) -> Result<(), NotifyError> {
        self.begin_batch();
        for event in events {
            self.apply_event(event)?;
        }
        self.end_batch()
    }

    fn commit(&self, events: &[ChangeEvent]) -> Result<Vec<Vec<EntryId>>, NotifyError> {
        let mut sections = self.sections.clone();

        let mut removals: Vec<(IndexPath, EntryId)> = Vec::new();
        let mut insertions: Vec<(IndexPath, EntryId)> = Vec::new();
        let mut section_deletes: Vec<usize> = Vec::new();
        let mut section_inserts: Vec<usize> = Vec::new();

        for event in events {
            match *event {
                ChangeEvent::SectionInserted(index) => section_inserts.push(index),
                ChangeEvent::SectionDeleted(index) => section_deletes.push(index),
                ChangeEvent::RowInserted { path, id } => insertions.push((path, id)),
                ChangeEvent::RowDeleted { path, id } => removals.push((path, id)),
                ChangeEvent::RowMoved { from, to, id } => {
                    removals.push((from, id));
                    insertions.push((to, id));
                }
                ChangeEvent::RowUpdated { path, id } => {
                    expect_row(&sections, path, id)?;
                }
            }
        }

        removals.sort_by(|a, b| b.0.cmp(&a.0));
        for (path, id) in removals {
            expect_row(&sections, path, id)?;
            sections[path.section].remove(path.row);
        }

        section_deletes.sort_unstable_by(|a, b| b.cmp(a));
        section_deletes.dedup();
        for index in section_deletes {
            match sections.get(index) {
                Some(rows) if rows.is_empty() => {
                    sections.remove(index);
                }
                Some(rows) => {
                    return Err(NotifyError::Inconsistent(format!(
                        "section {index} deleted while {} rows remain",
                        rows.len()
                    )));
                }
                None => {
                    return Err(NotifyError::Inconsistent(format!(
                        "section delete {index} out of range ({} sections)",
                        sections.len()
                    )));
                }
            }
        }

        section_inserts.sort_unstable();
        for index in section_inserts {
            if index > sections.len() {
                return Err(NotifyError::Inconsistent(format!(
                    "section insert {index} out of range ({} sections)",
                    sections.len()
                )));
            }
            sections.insert(index, Vec::new());
        }

        insertions.sort_by(|a, b| a.0.cmp(&b.0));
        for (path, id) in insertions {
            let Some(rows) = sections.get_mut(path.section) else {
                return Err(NotifyError::Inconsistent(format!(
                    "row insert {path} targets missing section"
                )));
            };
            if path.row > rows.len() {
                return Err(NotifyError::Inconsistent(format!(
                    "row insert {path} out of range ({} rows)",
                    rows.len()
                )));
            }
            rows.insert(path.row, id);
        }

        Ok(sections)
    }
}

fn expect_row(sections: &[Vec<EntryId>], path: IndexPath, id: EntryId) -> Result<(), NotifyError> {
    match sections.get(path.section).and_then(|rows| rows.get(path.row)) {
        Some(found) if *found == id => Ok(()),
        Some(found) => Err(NotifyError::Inconsistent(format!(
            "row {path} holds {found}, expected {id}"
        ))),
        None => Err(NotifyError::Inconsistent(format!("row {path} out of range"))),
    }
}

impl ChangeSubscriber for TableMirror {
    fn reset(&mut self) {
        self.sections.clear();
        self.pending = None;
    }

    fn begin_batch(&mut self) {
        self.pending = Some(Vec::new());
    }

    fn apply_event(&mut self, event: &ChangeEvent) -> Result<(), NotifyError> {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.push(*event);
                Ok(())
            }
            None => Err(NotifyError::Inconsistent(
                "change event outside of a batch".to_string(),
            )),
        }
    }

    fn end_batch(&mut self) -> Result<(), NotifyError> {
        let Some(events) = self.pending.take() else {
            return Err(NotifyError::Inconsistent(
                "end of batch without begin".to_string(),
            ));
        };
        self.sections = self.commit(&events)?;
        self.applied_batches += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::TableMirror;
    use crate::notify::{ChangeEvent, ChangeSubscriber, IndexPath, NotifyError};
    use uuid::Uuid;

    #[test]
    fn insert_then_delete_round_trip() {
        let id = Uuid::new_v4();
        let mut mirror = TableMirror::new();

        mirror
            .apply_batch(&[
                ChangeEvent::SectionInserted(0),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(0, 0),
                    id,
                },
            ])
            .unwrap();
        assert_eq!(mirror.sections(), &[vec![id]]);

        mirror
            .apply_batch(&[
                ChangeEvent::RowDeleted {
                    path: IndexPath::new(0, 0),
                    id,
                },
                ChangeEvent::SectionDeleted(0),
            ])
            .unwrap();
        assert_eq!(mirror.section_count(), 0);
        assert_eq!(mirror.applied_batches(), 2);
    }

    #[test]
    fn failed_batch_leaves_mirror_untouched() {
        let id = Uuid::new_v4();
        let mut mirror = TableMirror::new();
        mirror
            .apply_batch(&[
                ChangeEvent::SectionInserted(0),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(0, 0),
                    id,
                },
            ])
            .unwrap();

        let err = mirror
            .apply_batch(&[ChangeEvent::SectionDeleted(0)])
            .unwrap_err();
        assert!(matches!(err, NotifyError::Inconsistent(_)));
        assert_eq!(mirror.sections(), &[vec![id]]);
    }

    #[test]
    fn delete_with_wrong_id_is_inconsistent() {
        let mut mirror = TableMirror::new();
        mirror
            .apply_batch(&[
                ChangeEvent::SectionInserted(0),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(0, 0),
                    id: Uuid::new_v4(),
                },
            ])
            .unwrap();

        let err = mirror
            .apply_batch(&[ChangeEvent::RowDeleted {
                path: IndexPath::new(0, 0),
                id: Uuid::new_v4(),
            }])
            .unwrap_err();
        assert!(matches!(err, NotifyError::Inconsistent(_)));
    }

    #[test]
    fn reset_allows_reload_after_rejected_batch() {
        let kept = Uuid::new_v4();
        let mut mirror = TableMirror::new();
        mirror
            .apply_batch(&[
                ChangeEvent::SectionInserted(0),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(0, 0),
                    id: kept,
                },
            ])
            .unwrap();
        assert!(mirror.apply_batch(&[ChangeEvent::SectionDeleted(3)]).is_err());

        mirror.reset();
        mirror
            .apply_batch(&[
                ChangeEvent::SectionInserted(0),
                ChangeEvent::RowInserted {
                    path: IndexPath::new(0, 0),
                    id: kept,
                },
            ])
            .unwrap();
        assert_eq!(mirror.sections(), &[vec![kept]]);
    }
}
