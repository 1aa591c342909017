//! Note-overlap and same-designer relations for a focal record.
//!
//! Both relations scan the full store (O(N) per focal record) and exclude the
//! focal record by id, never by comparing other fields.

use crate::FragranceRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Distinct shared notes required for two records to count as similar.
pub const SIMILARITY_THRESHOLD: usize = 3;

/// Output order of the note-overlap relation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityOrder {
    /// Store order among qualifying records.
    #[default]
    Encounter,
    /// Most shared notes first; equal overlaps keep store order.
    OverlapDescending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityOptions {
    pub threshold: usize,
    pub order: SimilarityOrder,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            threshold: SIMILARITY_THRESHOLD,
            order: SimilarityOrder::Encounter,
        }
    }
}

/// Distinct notes of `record` across all phases, trimmed and lowercased.
///
/// Notes that are blank after trimming are dropped.
pub fn note_set(record: &FragranceRecord) -> HashSet<String> {
    record
        .notes
        .iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

/// Number of distinct normalized notes `a` and `b` have in common.
pub fn shared_note_count(a: &FragranceRecord, b: &FragranceRecord) -> usize {
    let a = note_set(a);
    note_set(b).iter().filter(|n| a.contains(*n)).count()
}

/// Does `candidate` share at least `threshold` notes with `focal`?
///
/// Stops counting as soon as the threshold is reached.
fn reaches_threshold(focal: &HashSet<String>, candidate: &FragranceRecord, threshold: usize) -> bool {
    if threshold == 0 {
        return true;
    }
    let mut shared = 0;
    for note in note_set(candidate) {
        if focal.contains(&note) {
            shared += 1;
            if shared >= threshold {
                return true;
            }
        }
    }
    false
}

/// Records sharing at least `options.threshold` distinct notes with `focal`.
///
/// A focal record without notes has no similar records.
pub(crate) fn similar_records<'a>(
    focal: &FragranceRecord,
    records: &'a [FragranceRecord],
    options: &SimilarityOptions,
) -> Vec<&'a FragranceRecord> {
    let focal_notes = note_set(focal);
    if focal_notes.is_empty() {
        return Vec::new();
    }
    let others = records.iter().filter(|r| r.id != focal.id);

    match options.order {
        SimilarityOrder::Encounter => others
            .filter(|r| reaches_threshold(&focal_notes, r, options.threshold))
            .collect(),
        SimilarityOrder::OverlapDescending => {
            let mut scored: Vec<(usize, &'a FragranceRecord)> = others
                .map(|r| {
                    let shared = note_set(r)
                        .iter()
                        .filter(|n| focal_notes.contains(*n))
                        .count();
                    (shared, r)
                })
                .filter(|(shared, _)| *shared >= options.threshold)
                .collect();
            scored.sort_by_key(|(shared, _)| Reverse(*shared));
            scored.into_iter().map(|(_, r)| r).collect()
        }
    }
}

/// Other records with exactly the same brand as `focal`, in store order.
pub(crate) fn same_designer<'a>(
    focal: &FragranceRecord,
    records: &'a [FragranceRecord],
) -> Vec<&'a FragranceRecord> {
    records
        .iter()
        .filter(|r| r.id != focal.id && r.brand == focal.brand)
        .collect()
}
