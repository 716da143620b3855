//! Layout diffing into ordered change batches.
//!
//! # Invariants
//! - Output order: row deletions (descending), section deletions
//!   (descending), section insertions (ascending), row insertions
//!   (ascending), moves (by target), updates.
//! - A row whose section identity or sort key changed is reported as a move;
//!   a row whose other fields changed is reported as an update.
//! - When surviving sections would change relative order, the batch falls
//!   back to a full reload (delete everything, insert everything).

use super::layout::{Layout, SectionKey};
use crate::model::entry::Entry;
use crate::notify::{ChangeBatch, ChangeEvent};
use std::collections::HashMap;

pub(crate) fn diff_layouts(old: &Layout, new: &Layout) -> ChangeBatch {
    let old_keys = old.section_keys();
    let new_keys = new.section_keys();
    let new_key_index: HashMap<SectionKey<'_>, usize> = new_keys
        .iter()
        .enumerate()
        .map(|(index, key)| (*key, index))
        .collect();

    let survivors: Vec<usize> = old_keys
        .iter()
        .filter_map(|key| new_key_index.get(key).copied())
        .collect();
    if survivors.windows(2).any(|pair| pair[0] > pair[1]) {
        return full_reload(old, new);
    }

    let old_key_set: HashMap<SectionKey<'_>, usize> = old_keys
        .iter()
        .enumerate()
        .map(|(index, key)| (*key, index))
        .collect();

    let mut row_deletes = Vec::new();
    let mut moves = Vec::new();
    let mut updates = Vec::new();
    let new_paths = new.path_map();
    for (path, entry) in old.paths() {
        match new_paths.get(&entry.id) {
            None => row_deletes.push(ChangeEvent::RowDeleted { path, id: entry.id }),
            Some((new_path, new_entry)) => {
                let same_section = old_keys[path.section] == new_keys[new_path.section];
                if !same_section || !same_sort_key(entry, new_entry) {
                    moves.push((*new_path, path, entry.id));
                } else if entry != *new_entry {
                    updates.push(ChangeEvent::RowUpdated { path, id: entry.id });
                }
            }
        }
    }
    row_deletes.reverse();

    let old_paths = old.path_map();
    let row_inserts: Vec<ChangeEvent> = new
        .paths()
        .filter(|(_, entry)| !old_paths.contains_key(&entry.id))
        .map(|(path, entry)| ChangeEvent::RowInserted { path, id: entry.id })
        .collect();

    let section_deletes = old_keys
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, key)| !new_key_index.contains_key(*key))
        .map(|(index, _)| ChangeEvent::SectionDeleted(index));
    let section_inserts = new_keys
        .iter()
        .enumerate()
        .filter(|(_, key)| !old_key_set.contains_key(*key))
        .map(|(index, _)| ChangeEvent::SectionInserted(index));

    moves.sort_by_key(|(to, _, _)| *to);

    let mut events = row_deletes;
    events.extend(section_deletes);
    events.extend(section_inserts);
    events.extend(row_inserts);
    events.extend(
        moves
            .into_iter()
            .map(|(to, from, id)| ChangeEvent::RowMoved { from, to, id }),
    );
    events.extend(updates);
    ChangeBatch::new(events)
}

fn full_reload(old: &Layout, new: &Layout) -> ChangeBatch {
    let mut row_deletes: Vec<ChangeEvent> = old
        .paths()
        .map(|(path, entry)| ChangeEvent::RowDeleted { path, id: entry.id })
        .collect();
    row_deletes.reverse();

    let mut events = row_deletes;
    events.extend((0..old.sections.len()).rev().map(ChangeEvent::SectionDeleted));
    events.extend((0..new.sections.len()).map(ChangeEvent::SectionInserted));
    events.extend(
        new.paths()
            .map(|(path, entry)| ChangeEvent::RowInserted { path, id: entry.id }),
    );
    ChangeBatch::new(events)
}

fn same_sort_key(a: &Entry, b: &Entry) -> bool {
    a.timestamp_ms == b.timestamp_ms && a.diet_level == b.diet_level
}
