//! Multi-predicate record filter.
//!
//! Every criterion is optional; a record passes when it satisfies all of the
//! criteria that are set. With nothing set, every record passes.

use crate::FragranceRecord;
use serde::{Deserialize, Serialize};

/// User-chosen filter criteria for one query.
///
/// The text query is compared case-insensitively against `"{brand} {name}"`,
/// so a query may span both fields ("Creed Aventus"). Gender, designer and
/// note are exact, case-sensitive comparisons against the stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub query: Option<String>,
    pub gender: Option<String>,
    pub designer: Option<String>,
    pub note: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_designer(mut self, designer: impl Into<String>) -> Self {
        self.designer = Some(designer.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// The text query, if it is set and non-empty.
    pub fn text_query(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }

    /// True when no criterion constrains the result.
    pub fn is_empty(&self) -> bool {
        self.text_query().is_none()
            && self.gender.is_none()
            && self.designer.is_none()
            && self.note.is_none()
    }
}

/// Criteria prepared once per filtering pass (the query is lowercased up front).
struct Predicate<'c> {
    query: Option<String>,
    gender: Option<&'c str>,
    designer: Option<&'c str>,
    note: Option<&'c str>,
}

impl<'c> Predicate<'c> {
    fn new(criteria: &'c FilterCriteria) -> Self {
        Self {
            query: criteria.text_query().map(str::to_lowercase),
            gender: criteria.gender.as_deref(),
            designer: criteria.designer.as_deref(),
            note: criteria.note.as_deref(),
        }
    }

    fn test(&self, record: &FragranceRecord) -> bool {
        if let Some(query) = &self.query {
            let haystack = format!("{} {}", record.brand, record.name).to_lowercase();
            if !haystack.contains(query.as_str()) {
                return false;
            }
        }
        if self.gender.is_some_and(|g| record.gender != g) {
            return false;
        }
        if self.designer.is_some_and(|d| record.brand != d) {
            return false;
        }
        if self.note.is_some_and(|n| !record.notes.contains(n)) {
            return false;
        }
        true
    }
}

/// Does `record` satisfy every criterion that is set?
pub fn matches(record: &FragranceRecord, criteria: &FilterCriteria) -> bool {
    Predicate::new(criteria).test(record)
}

/// Records passing `criteria`, in store order.
pub(crate) fn filter_records<'a>(
    records: &'a [FragranceRecord],
    criteria: &FilterCriteria,
) -> Vec<&'a FragranceRecord> {
    let predicate = Predicate::new(criteria);
    records.iter().filter(|r| predicate.test(r)).collect()
}
