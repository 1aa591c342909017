//! Designer and note frequency tables.
//!
//! Both tables are ranked by descending count. Labels with equal counts keep
//! the order in which they were first encountered while scanning the store,
//! so option lists render deterministically without an alphabetical re-sort.

use crate::FragranceRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum number of note options shown after a note search.
pub const NOTE_OPTION_LIMIT: usize = 50;

/// One facet option: a label and the number of records exhibiting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
    pub label: String,
    pub count: usize,
}

/// A ranked `(label, count)` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FacetTable {
    entries: Vec<FacetEntry>,
}

impl FacetTable {
    /// Tally `labels` (one item per contributing record) and rank the result.
    fn tally<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut slots: HashMap<&'a str, usize> = HashMap::new();
        let mut entries: Vec<FacetEntry> = Vec::new();

        for label in labels {
            match slots.get(label) {
                Some(&slot) => entries[slot].count += 1,
                None => {
                    slots.insert(label, entries.len());
                    entries.push(FacetEntry {
                        label: label.to_string(),
                        count: 1,
                    });
                }
            }
        }

        // `sort_by` is stable: equal counts stay in first-encounter order.
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        Self { entries }
    }

    pub fn entries(&self) -> &[FacetEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FacetEntry> {
        self.entries.iter()
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for `label`, or 0 when the label never occurs.
    pub fn count_of(&self, label: &str) -> usize {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map_or(0, |e| e.count)
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Entries whose label contains `needle`, ignoring case, in table order.
    ///
    /// An empty needle keeps every entry. `limit` caps the number returned.
    pub fn search(&self, needle: &str, limit: Option<usize>) -> Vec<&FacetEntry> {
        let needle = needle.to_lowercase();
        self.entries
            .iter()
            .filter(|e| needle.is_empty() || e.label.to_lowercase().contains(&needle))
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}

impl<'a> IntoIterator for &'a FacetTable {
    type Item = &'a FacetEntry;
    type IntoIter = std::slice::Iter<'a, FacetEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Records per exact (case-sensitive) brand string.
pub(crate) fn designer_table(records: &[FragranceRecord]) -> FacetTable {
    FacetTable::tally(records.iter().map(|r| r.brand.as_str()))
}

/// Records per note. A note listed in several phases of one record counts
/// once for that record.
pub(crate) fn note_table(records: &[FragranceRecord]) -> FacetTable {
    FacetTable::tally(records.iter().flat_map(|r| {
        let mut seen = HashSet::new();
        r.notes.iter().filter(move |note| seen.insert(*note))
    }))
}
