//! Flat presentation order plus section boundaries.

use crate::model::entry::{DietLevel, Entry, EntryId};
use crate::notify::IndexPath;
use std::collections::HashMap;

/// Contiguous run of equally-labelled entries in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SectionRange {
    pub(crate) label: DietLevel,
    pub(crate) start: usize,
    pub(crate) len: usize,
}

/// Section identity used when diffing two layouts: the label plus how many
/// earlier sections carry the same label.
pub(crate) type SectionKey<'a> = (&'a DietLevel, usize);

/// Where an in-place insertion landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Placement {
    /// Joined an existing section.
    Row(IndexPath),
    /// Opened a new single-row section at this index.
    NewSection(usize),
}

impl Placement {
    fn section(self) -> usize {
        match self {
            Self::Row(path) => path.section,
            Self::NewSection(section) => section,
        }
    }
}

/// Result of an in-place removal.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Removal {
    pub(crate) path: IndexPath,
    pub(crate) entry: Entry,
    pub(crate) section_removed: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Layout {
    pub(crate) entries: Vec<Entry>,
    pub(crate) sections: Vec<SectionRange>,
}

impl Layout {
    /// Builds section boundaries over entries already in presentation order.
    pub(crate) fn from_sorted(entries: Vec<Entry>) -> Self {
        let mut sections: Vec<SectionRange> = Vec::new();
        for (position, entry) in entries.iter().enumerate() {
            match sections.last_mut() {
                Some(current) if current.label == entry.diet_level => current.len += 1,
                _ => sections.push(SectionRange {
                    label: entry.diet_level.clone(),
                    start: position,
                    len: 1,
                }),
            }
        }
        Self { entries, sections }
    }

    pub(crate) fn rows(&self, section: usize) -> &[Entry] {
        match self.sections.get(section) {
            Some(range) => &self.entries[range.start..range.start + range.len],
            None => &[],
        }
    }

    pub(crate) fn section_keys(&self) -> Vec<SectionKey<'_>> {
        let mut seen: HashMap<&DietLevel, usize> = HashMap::new();
        self.sections
            .iter()
            .map(|range| {
                let occurrence = seen.entry(&range.label).or_insert(0);
                let key = (&range.label, *occurrence);
                *occurrence += 1;
                key
            })
            .collect()
    }

    /// Every row with its path, in presentation order.
    pub(crate) fn paths(&self) -> impl Iterator<Item = (IndexPath, &Entry)> + '_ {
        self.sections
            .iter()
            .enumerate()
            .flat_map(move |(section, range)| {
                self.entries[range.start..range.start + range.len]
                    .iter()
                    .enumerate()
                    .map(move |(row, entry)| (IndexPath::new(section, row), entry))
            })
    }

    /// Section holding flat `position`; `sections.len()` past the end.
    pub(crate) fn section_at(&self, position: usize) -> usize {
        self.sections
            .partition_point(|range| range.start + range.len <= position)
    }

    /// Inserts `entry` at flat `position` in place.
    ///
    /// Returns `None`, leaving the layout untouched, when the entry would
    /// split an existing section in two.
    pub(crate) fn insert_at(&mut self, position: usize, entry: Entry) -> Option<Placement> {
        let prev = position.checked_sub(1).map(|before| self.section_at(before));
        let next = (position < self.entries.len()).then(|| self.section_at(position));
        let joins = |section: Option<usize>| {
            section.filter(|&section| self.sections[section].label == entry.diet_level)
        };

        let (join_prev, join_next) = (joins(prev), joins(next));

        let placement = if let Some(section) = join_prev {
            let row = position - self.sections[section].start;
            self.sections[section].len += 1;
            Placement::Row(IndexPath::new(section, row))
        } else if let Some(section) = join_next {
            self.sections[section].len += 1;
            Placement::Row(IndexPath::new(section, 0))
        } else if prev.is_some() && prev == next {
            return None;
        } else {
            let section = next.unwrap_or(self.sections.len());
            self.sections.insert(
                section,
                SectionRange {
                    label: entry.diet_level.clone(),
                    start: position,
                    len: 1,
                },
            );
            Placement::NewSection(section)
        };

        let section = placement.section();
        self.shift_starts(section + 1, 1);
        self.entries.insert(position, entry);
        Some(placement)
    }

    /// Removes the entry at flat `position` in place.
    ///
    /// Returns `None`, leaving the layout untouched, when removing it would
    /// merge the neighbouring sections.
    pub(crate) fn remove_at(&mut self, position: usize) -> Option<Removal> {
        let section = self.section_at(position);
        let range = self.sections.get(section)?;
        let path = IndexPath::new(section, position - range.start);

        let section_removed = range.len == 1;
        if section_removed {
            let merges = section > 0
                && self
                    .sections
                    .get(section + 1)
                    .is_some_and(|after| after.label == self.sections[section - 1].label);
            if merges {
                return None;
            }
            self.sections.remove(section);
            self.shift_starts(section, -1);
        } else {
            self.sections[section].len -= 1;
            self.shift_starts(section + 1, -1);
        }

        let entry = self.entries.remove(position);
        Some(Removal {
            path,
            entry,
            section_removed,
        })
    }

    fn shift_starts(&mut self, from: usize, delta: isize) {
        for range in self.sections.iter_mut().skip(from) {
            range.start = range.start.wrapping_add_signed(delta);
        }
    }

    pub(crate) fn path_map(&self) -> HashMap<EntryId, (IndexPath, &Entry)> {
        self.paths().map(|(path, entry)| (entry.id, (path, entry))).collect()
    }
}
