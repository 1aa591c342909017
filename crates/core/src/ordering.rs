//! Named sort strategies over a filtered result set.
//!
//! All strategies are stable: records with equal keys keep their relative
//! input order. Unparsable numeric fields sort as [`SCORE_SENTINEL`], i.e.
//! after every parsable value in the descending orders.

use crate::{CatalogError, FragranceRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::str::FromStr;

/// Value used for a missing or unparsable year/score.
pub const SCORE_SENTINEL: i64 = i64::MIN;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Ascending by id.
    #[default]
    Popularity,
    /// Descending by release year.
    Newest,
    /// Descending by longevity score.
    LongestLongevity,
    /// Descending by sillage score.
    HighestSillage,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::Popularity,
        SortKey::Newest,
        SortKey::LongestLongevity,
        SortKey::HighestSillage,
    ];

    /// Label shown in the listing's sort selector.
    pub fn label(self) -> &'static str {
        match self {
            SortKey::Popularity => "Most popular",
            SortKey::Newest => "Newest",
            SortKey::LongestLongevity => "Longest longevity",
            SortKey::HighestSillage => "Highest sillage",
        }
    }

    fn name(self) -> &'static str {
        match self {
            SortKey::Popularity => "popularity",
            SortKey::Newest => "newest",
            SortKey::LongestLongevity => "longest_longevity",
            SortKey::HighestSillage => "highest_sillage",
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts either the selector label ("Longest longevity") or the
/// snake_case name ("longest_longevity"), ignoring case.
impl FromStr for SortKey {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SortKey::ALL
            .into_iter()
            .find(|k| k.label().eq_ignore_ascii_case(s) || k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CatalogError::UnknownLabel(format!("sort key {s:?}")))
    }
}

/// Parse a year or score, degrading to [`SCORE_SENTINEL`] instead of failing.
pub fn parse_score(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(SCORE_SENTINEL)
}

/// Stable-sort `records` under `key`.
pub fn order(mut records: Vec<&FragranceRecord>, key: SortKey) -> Vec<&FragranceRecord> {
    match key {
        SortKey::Popularity => records.sort_by_key(|r| r.id),
        SortKey::Newest => records.sort_by_key(|r| Reverse(parse_score(r.release.as_deref()))),
        SortKey::LongestLongevity => {
            records.sort_by_key(|r| Reverse(parse_score(r.longevity.as_deref())))
        }
        SortKey::HighestSillage => {
            records.sort_by_key(|r| Reverse(parse_score(r.sillage.as_deref())))
        }
    }
    records
}
