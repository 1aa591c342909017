//! Sillage: an in-memory fragrance catalog with faceted retrieval.
//!
//! The core primitive is a [`FragranceRecord`]: a named fragrance from a
//! designer, with notes grouped by phase (top / middle / base), accords and
//! a handful of performance scores.
//!
//! A [`Catalog`] is loaded once and never mutated. Everything on top of it is
//! a pure function of the loaded records:
//!
//! - **Facets**: designer and note frequency tables ([`FacetTable`]).
//! - **Filtering**: a conjunction of optional criteria ([`FilterCriteria`]).
//! - **Ordering**: stable sorts under a named [`SortKey`].
//! - **Similarity**: records sharing at least [`SIMILARITY_THRESHOLD`]
//!   distinct notes with a focal record, plus same-designer records.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use sillage::{Catalog, FilterCriteria, FragranceId, SortKey};
//!
//! let catalog = Catalog::open("fragrances.json").unwrap();
//!
//! // Everything from one house, newest first
//! let criteria = FilterCriteria::new().with_designer("Maison Margiela");
//! let hits = catalog.search(&criteria, SortKey::Newest);
//!
//! // Detail-page recommendations
//! let similar = catalog.similar_to(FragranceId(42)).unwrap();
//! let siblings = catalog.same_designer(FragranceId(42)).unwrap();
//! ```

mod facets;
mod filter;
mod ordering;
mod similarity;

pub use facets::{FacetEntry, FacetTable, NOTE_OPTION_LIMIT};
pub use filter::{matches, FilterCriteria};
pub use ordering::{order, parse_score, SortKey, SCORE_SENTINEL};
pub use similarity::{note_set, shared_note_count, SimilarityOptions, SimilarityOrder, SIMILARITY_THRESHOLD};

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate fragrance id {0}")]
    DuplicateId(FragranceId),
    #[error("unknown label: {0}")]
    UnknownLabel(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Stable identifier of a [`FragranceRecord`].
///
/// Display order changes with every filter and sort, so everything derived
/// from the catalog refers to records by id rather than by position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FragranceId(pub u64);

impl std::fmt::Display for FragranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FragranceId {
    fn from(id: u64) -> Self {
        FragranceId(id)
    }
}

/// The three canonical gender labels a catalog uses.
///
/// Records keep their gender as the raw stored string; this enum is the
/// convenient way for callers to produce one of the canonical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unisex,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Unisex];

    pub fn as_str(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unisex => "unisex",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Gender::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CatalogError::UnknownLabel(format!("gender {s:?}")))
    }
}

impl From<Gender> for String {
    fn from(g: Gender) -> Self {
        g.as_str().to_string()
    }
}

/// Notes grouped by the phase in which they are perceived.
///
/// The same note may legitimately appear in more than one phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePhases {
    #[serde(rename = "Top", default)]
    pub top: Vec<String>,
    #[serde(rename = "Middle", default)]
    pub middle: Vec<String>,
    #[serde(rename = "Base", default)]
    pub base: Vec<String>,
}

impl NotePhases {
    /// Every note across all phases, top first, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.top
            .iter()
            .chain(&self.middle)
            .chain(&self.base)
            .map(String::as_str)
    }

    /// Does `note` appear verbatim in any phase?
    pub fn contains(&self, note: &str) -> bool {
        self.iter().any(|n| n == note)
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty() && self.middle.is_empty() && self.base.is_empty()
    }
}

/// One fragrance as shipped in the catalog file.
///
/// Field names follow the catalog's JSON keys. Year and score fields are kept
/// as the raw strings the source provides; use [`FragranceRecord::release_year`]
/// and friends for the parsed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragranceRecord {
    #[serde(rename = "ID")]
    pub id: FragranceId,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Brand")]
    pub brand: String,
    /// `male`, `female` or `unisex`, as stored.
    #[serde(rename = "Gender", default)]
    pub gender: String,
    #[serde(
        rename = "Release",
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub release: Option<String>,
    /// Longevity score, 0–100.
    #[serde(
        rename = "Longevity",
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub longevity: Option<String>,
    /// Sillage (projection) score, 0–100.
    #[serde(
        rename = "Sillage",
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub sillage: Option<String>,
    #[serde(rename = "Notes", default)]
    pub notes: NotePhases,
    /// Most dominant accord first.
    #[serde(rename = "Accords", default)]
    pub accords: Vec<String>,
    #[serde(rename = "Image URL", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(rename = "Purchase URL", default, skip_serializing_if = "Option::is_none")]
    pub purchase_url: Option<String>,
    #[serde(
        rename = "Price",
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<String>,
    #[serde(rename = "Perfumers", default, skip_serializing_if = "Option::is_none")]
    pub perfumers: Option<Vec<String>>,
    #[serde(rename = "Gallery", default, skip_serializing_if = "Option::is_none")]
    pub gallery: Option<Vec<String>>,
}

impl FragranceRecord {
    /// Create a record with no notes, accords, scores or links.
    pub fn new(
        id: impl Into<FragranceId>,
        name: impl Into<String>,
        brand: impl Into<String>,
        gender: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brand: brand.into(),
            gender: gender.into(),
            release: None,
            longevity: None,
            sillage: None,
            notes: NotePhases::default(),
            accords: Vec::new(),
            image_url: None,
            purchase_url: None,
            price: None,
            perfumers: None,
            gallery: None,
        }
    }

    pub fn with_notes<S: Into<String>>(
        mut self,
        top: impl IntoIterator<Item = S>,
        middle: impl IntoIterator<Item = S>,
        base: impl IntoIterator<Item = S>,
    ) -> Self {
        self.notes = NotePhases {
            top: top.into_iter().map(Into::into).collect(),
            middle: middle.into_iter().map(Into::into).collect(),
            base: base.into_iter().map(Into::into).collect(),
        };
        self
    }

    pub fn with_accords<S: Into<String>>(mut self, accords: impl IntoIterator<Item = S>) -> Self {
        self.accords = accords.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release = Some(release.into());
        self
    }

    pub fn with_longevity(mut self, longevity: impl Into<String>) -> Self {
        self.longevity = Some(longevity.into());
        self
    }

    pub fn with_sillage(mut self, sillage: impl Into<String>) -> Self {
        self.sillage = Some(sillage.into());
        self
    }

    /// Release year, if the stored value parses as an integer.
    pub fn release_year(&self) -> Option<i64> {
        parse_integer(self.release.as_deref())
    }

    pub fn longevity_score(&self) -> Option<i64> {
        parse_integer(self.longevity.as_deref())
    }

    pub fn sillage_score(&self) -> Option<i64> {
        parse_integer(self.sillage.as_deref())
    }
}

fn parse_integer(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
}

/// Catalog exports are inconsistent about quoting numbers, so year, score
/// and price fields accept either a JSON string or a JSON number.
fn scalar_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|raw| match raw {
        Scalar::Text(s) => s,
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// The immutable fragrance record store.
///
/// Built once, then shared read-only (it is `Send + Sync`, so an
/// `Arc<Catalog>` can back any number of concurrent query sessions). Both
/// facet tables are computed at construction and memoized for the lifetime
/// of the catalog.
///
/// # Example
///
/// ```rust
/// use sillage::{Catalog, FragranceId, FragranceRecord};
///
/// let catalog = Catalog::from_records(vec![
///     FragranceRecord::new(1u64, "Aventus", "Creed", "male"),
///     FragranceRecord::new(2u64, "Silver Mountain Water", "Creed", "unisex"),
/// ])
/// .unwrap();
/// assert_eq!(catalog.designer_facets().count_of("Creed"), 2);
/// assert_eq!(catalog.same_designer(FragranceId(1)).unwrap().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<FragranceRecord>,
    positions: HashMap<FragranceId, usize>,
    designers: FacetTable,
    notes: FacetTable,
}

impl Catalog {
    /// Build a catalog from already-decoded records, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::DuplicateId`] if two records share an id.
    pub fn from_records(records: Vec<FragranceRecord>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if positions.insert(record.id, pos).is_some() {
                return Err(CatalogError::DuplicateId(record.id));
            }
        }

        let designers = facets::designer_table(&records);
        let notes = facets::note_table(&records);
        tracing::info!(
            records = records.len(),
            designers = designers.len(),
            notes = notes.len(),
            "catalog loaded"
        );

        Ok(Self {
            records,
            positions,
            designers,
            notes,
        })
    }

    /// Decode a catalog from a JSON array of records.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<FragranceRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let records: Vec<FragranceRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Load the catalog file at `path`.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "opening catalog");
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// All records in store order.
    pub fn records(&self) -> &[FragranceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look a record up by id.
    ///
    /// An unknown id is an error, distinct from an empty result: it means
    /// the caller navigated to a record that does not exist.
    pub fn get(&self, id: FragranceId) -> Result<&FragranceRecord> {
        self.positions
            .get(&id)
            .map(|&pos| &self.records[pos])
            .ok_or_else(|| CatalogError::NotFound(format!("fragrance id {id}")))
    }

    pub fn contains(&self, id: FragranceId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Designer → record count, most common first.
    pub fn designer_facets(&self) -> &FacetTable {
        &self.designers
    }

    /// Note → record count, most common first.
    pub fn note_facets(&self) -> &FacetTable {
        &self.notes
    }

    /// Filter the whole store with `criteria`, then order under `sort_key`.
    pub fn search(&self, criteria: &FilterCriteria, sort_key: SortKey) -> Vec<&FragranceRecord> {
        let matched = filter::filter_records(&self.records, criteria);
        let ordered = ordering::order(matched, sort_key);
        tracing::debug!(
            matched = ordered.len(),
            total = self.records.len(),
            sort = %sort_key,
            "catalog search"
        );
        ordered
    }

    /// Records sharing at least [`SIMILARITY_THRESHOLD`] distinct notes with
    /// the record `id`, in store order.
    pub fn similar_to(&self, id: FragranceId) -> Result<Vec<&FragranceRecord>> {
        self.similar_to_with(id, &SimilarityOptions::default())
    }

    pub fn similar_to_with(
        &self,
        id: FragranceId,
        options: &SimilarityOptions,
    ) -> Result<Vec<&FragranceRecord>> {
        let focal = self.get(id)?;
        let similar = similarity::similar_records(focal, &self.records, options);
        tracing::debug!(focal = %id, similar = similar.len(), "note-overlap similarity");
        Ok(similar)
    }

    /// Other records from the same designer as the record `id`, in store order.
    pub fn same_designer(&self, id: FragranceId) -> Result<Vec<&FragranceRecord>> {
        let focal = self.get(id)?;
        Ok(similarity::same_designer(focal, &self.records))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE_JSON: &str = r#"[
        {
            "ID": 1,
            "Name": "Aventus",
            "Brand": "Creed",
            "Gender": "male",
            "Release": "2010",
            "Longevity": "80",
            "Sillage": 75,
            "Notes": {
                "Top": ["Pineapple", "Bergamot"],
                "Middle": ["Birch", "Patchouli"],
                "Base": ["Musk", "Oakmoss"]
            },
            "Accords": ["fruity", "woody"],
            "Image URL": "https://img.example/1.jpg",
            "Purchase URL": "https://shop.example/1",
            "Price": 435
        },
        {
            "ID": 2,
            "Name": "Baccarat Rouge 540",
            "Brand": "Maison Francis Kurkdjian",
            "Gender": "unisex",
            "Release": "2015",
            "Notes": { "Top": ["Saffron"], "Middle": ["Amberwood"], "Base": ["Fir Resin"] },
            "Accords": ["amber"],
            "Perfumers": ["Francis Kurkdjian"]
        }
    ]"#;

    #[test]
    fn load_from_json_keeps_store_order() {
        let catalog = Catalog::from_json_str(SAMPLE_JSON).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.records()[0].name, "Aventus");
        assert_eq!(catalog.records()[1].id, FragranceId(2));
    }

    #[test]
    fn numeric_fields_accept_numbers_and_strings() {
        let catalog = Catalog::from_json_str(SAMPLE_JSON).unwrap();
        let aventus = catalog.get(FragranceId(1)).unwrap();
        assert_eq!(aventus.longevity_score(), Some(80));
        assert_eq!(aventus.sillage_score(), Some(75));
        assert_eq!(aventus.price.as_deref(), Some("435"));

        let br540 = catalog.get(FragranceId(2)).unwrap();
        assert_eq!(br540.longevity, None);
        assert_eq!(br540.release_year(), Some(2015));
        assert_eq!(br540.perfumers.as_deref(), Some(&["Francis Kurkdjian".to_string()][..]));
    }

    #[test]
    fn missing_note_phases_default_to_empty() {
        let json = r#"[{ "ID": 7, "Name": "Plain", "Brand": "House", "Gender": "female", "Notes": { "Top": ["Rose"] } }]"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        let record = catalog.get(FragranceId(7)).unwrap();
        assert_eq!(record.notes.top, vec!["Rose"]);
        assert!(record.notes.middle.is_empty());
        assert!(record.accords.is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Catalog::from_records(vec![
            FragranceRecord::new(1u64, "A", "X", "male"),
            FragranceRecord::new(1u64, "B", "Y", "female"),
        ])
        .expect_err("duplicate id must fail");
        assert!(matches!(err, CatalogError::DuplicateId(FragranceId(1))));
    }

    #[test]
    fn unknown_id_is_not_found() {
        let catalog = Catalog::from_json_str(SAMPLE_JSON).unwrap();
        assert!(matches!(
            catalog.get(FragranceId(99)),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.similar_to(FragranceId(99)),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.same_designer(FragranceId(99)),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn open_reads_catalog_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_JSON.as_bytes()).unwrap();
        let catalog = Catalog::open(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains(FragranceId(2)));
    }

    #[test]
    fn open_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Catalog::open(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = Catalog::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Serialization(_)));
    }

    #[test]
    fn search_with_no_criteria_returns_everything_by_popularity() {
        let catalog = Catalog::from_records(vec![
            FragranceRecord::new(3u64, "C", "X", "male"),
            FragranceRecord::new(1u64, "A", "X", "female"),
            FragranceRecord::new(2u64, "B", "Y", "unisex"),
        ])
        .unwrap();
        let ids: Vec<u64> = catalog
            .search(&FilterCriteria::default(), SortKey::Popularity)
            .iter()
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn female_filter_keeps_first_and_third_records() {
        let catalog = Catalog::from_records(vec![
            FragranceRecord::new(1u64, "One", "X", "female"),
            FragranceRecord::new(2u64, "Two", "X", "male"),
            FragranceRecord::new(3u64, "Three", "Y", "female"),
        ])
        .unwrap();
        let criteria = FilterCriteria::new().with_gender(Gender::Female);
        let ids: Vec<u64> = catalog
            .search(&criteria, SortKey::Popularity)
            .iter()
            .map(|r| r.id.0)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("Female".parse::<Gender>().unwrap(), Gender::Female);
        assert_eq!(" UNISEX ".parse::<Gender>().unwrap(), Gender::Unisex);
        assert!(matches!(
            "other".parse::<Gender>(),
            Err(CatalogError::UnknownLabel(_))
        ));
        assert_eq!(String::from(Gender::Male), "male");
    }

    #[test]
    fn records_round_trip_through_catalog_json_keys() {
        let record = FragranceRecord::new(5u64, "Oud Wood", "Tom Ford", "unisex")
            .with_notes(["Oud"], ["Sandalwood"], ["Vanilla"])
            .with_release("2007");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["ID"], 5);
        assert_eq!(json["Brand"], "Tom Ford");
        assert_eq!(json["Notes"]["Middle"][0], "Sandalwood");
        assert!(json.get("Longevity").is_none());
    }
}
