//! Catalog browsing API built on Sillage.
//!
//! A [`Browser`] owns the shared, read-only catalog. Each user gets their own
//! [`QuerySession`] holding the filter criteria, sort key and visible window;
//! every change recomputes the ordered result set from the full catalog.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sillage::{FragranceId, Gender, SortKey};
//! use sillage_browse::Browser;
//!
//! let browser = Browser::open("./fragrances.json").unwrap();
//!
//! // Listing page
//! let mut session = browser.session();
//! session.set_gender(Gender::Female);
//! session.set_sort_key(SortKey::LongestLongevity);
//! session.reveal_more();
//! let view = session.view();
//! println!("showing {} of {}", view.visible_records().len(), view.total());
//!
//! // Detail page
//! let detail = browser.detail(FragranceId(42)).unwrap();
//! println!("{} similar, {} from the same house", detail.similar.len(), detail.same_designer.len());
//! ```

use serde::{Deserialize, Serialize};
use sillage::{
    Catalog, FacetEntry, FacetTable, FilterCriteria, FragranceId, FragranceRecord,
    SimilarityOptions, SortKey, NOTE_OPTION_LIMIT,
};
use std::sync::Arc;

pub use sillage::CatalogError as Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Window sizes and option-list limits for a [`QuerySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Records visible right after the result set changes.
    pub initial_window: usize,
    /// Records added by each "reveal more".
    pub window_increment: usize,
    /// Cap on note options after a note search.
    pub note_option_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_window: 20,
            window_increment: 20,
            note_option_limit: NOTE_OPTION_LIMIT,
        }
    }
}

/// Entry point for catalog browsing: listing sessions and detail views.
///
/// Cloning a `Browser` is cheap; clones share the same catalog.
#[derive(Debug, Clone)]
pub struct Browser {
    catalog: Arc<Catalog>,
}

impl Browser {
    /// Load the catalog file at `path`.
    ///
    /// ```rust,no_run
    /// use sillage_browse::Browser;
    /// let browser = Browser::open("./fragrances.json").unwrap();
    /// ```
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::from_catalog(Catalog::open(path)?))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self::from_catalog(Catalog::from_json_str(json)?))
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        Self::shared(Arc::new(catalog))
    }

    /// Wrap a catalog that is already shared elsewhere.
    pub fn shared(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn designers(&self) -> &FacetTable {
        self.catalog.designer_facets()
    }

    pub fn notes(&self) -> &FacetTable {
        self.catalog.note_facets()
    }

    /// Start a listing session with the default window sizes.
    pub fn session(&self) -> QuerySession {
        QuerySession::new(Arc::clone(&self.catalog))
    }

    pub fn session_with(&self, config: SessionConfig) -> QuerySession {
        QuerySession::with_config(Arc::clone(&self.catalog), config)
    }

    /// The record `id` together with its recommendations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no record has this id.
    pub fn detail(&self, id: FragranceId) -> Result<FragranceDetail<'_>> {
        self.detail_with(id, &SimilarityOptions::default())
    }

    pub fn detail_with(
        &self,
        id: FragranceId,
        options: &SimilarityOptions,
    ) -> Result<FragranceDetail<'_>> {
        Ok(FragranceDetail {
            record: self.catalog.get(id)?,
            similar: self.catalog.similar_to_with(id, options)?,
            same_designer: self.catalog.same_designer(id)?,
        })
    }
}

/// Everything the detail page renders for one record.
#[derive(Debug, Clone, Serialize)]
pub struct FragranceDetail<'a> {
    pub record: &'a FragranceRecord,
    /// Records sharing enough notes with `record`.
    pub similar: Vec<&'a FragranceRecord>,
    /// Other records from the same designer.
    pub same_designer: Vec<&'a FragranceRecord>,
}

/// One user's listing state.
///
/// Filter changes reset the visible window to
/// [`SessionConfig::initial_window`]; a sort-key change reorders the same
/// result set and keeps the window. Option searches only narrow the facet
/// option lists and never touch results or window.
#[derive(Debug, Clone)]
pub struct QuerySession {
    catalog: Arc<Catalog>,
    config: SessionConfig,
    criteria: FilterCriteria,
    sort_key: SortKey,
    window: usize,
    designer_search: String,
    note_search: String,
    results: Vec<FragranceId>,
}

impl QuerySession {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, SessionConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: SessionConfig) -> Self {
        let mut session = Self {
            catalog,
            config,
            criteria: FilterCriteria::default(),
            sort_key: SortKey::default(),
            window: config.initial_window,
            designer_search: String::new(),
            note_search: String::new(),
            results: Vec::new(),
        };
        session.recompute();
        session
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Replace criteria and sort key in one step and return the new view.
    pub fn apply_query(&mut self, criteria: FilterCriteria, sort_key: SortKey) -> ViewResult<'_> {
        let criteria = normalized(criteria);
        let criteria_changed = criteria != self.criteria;
        if criteria_changed || sort_key != self.sort_key {
            self.criteria = criteria;
            self.sort_key = sort_key;
            self.recompute();
            if criteria_changed {
                self.window = self.config.initial_window;
            }
        }
        self.view()
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.update_criteria(|c| *c = normalized(criteria));
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        let query = Some(query.into()).filter(|q| !q.is_empty());
        self.update_criteria(|c| c.query = query);
    }

    pub fn clear_query(&mut self) {
        self.update_criteria(|c| c.query = None);
    }

    pub fn set_gender(&mut self, gender: impl Into<String>) {
        let gender = gender.into();
        self.update_criteria(|c| c.gender = Some(gender));
    }

    pub fn clear_gender(&mut self) {
        self.update_criteria(|c| c.gender = None);
    }

    /// Select `gender`, or clear it if it is already selected.
    pub fn toggle_gender(&mut self, gender: impl Into<String>) {
        let gender = gender.into();
        self.update_criteria(|c| toggle(&mut c.gender, gender));
    }

    pub fn set_designer(&mut self, designer: impl Into<String>) {
        let designer = designer.into();
        self.update_criteria(|c| c.designer = Some(designer));
    }

    pub fn clear_designer(&mut self) {
        self.update_criteria(|c| c.designer = None);
    }

    pub fn toggle_designer(&mut self, designer: impl Into<String>) {
        let designer = designer.into();
        self.update_criteria(|c| toggle(&mut c.designer, designer));
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        let note = note.into();
        self.update_criteria(|c| c.note = Some(note));
    }

    pub fn clear_note(&mut self) {
        self.update_criteria(|c| c.note = None);
    }

    pub fn toggle_note(&mut self, note: impl Into<String>) {
        let note = note.into();
        self.update_criteria(|c| toggle(&mut c.note, note));
    }

    /// Reset the text query and all three facet selections at once.
    pub fn clear_filters(&mut self) {
        self.update_criteria(|c| *c = FilterCriteria::default());
    }

    /// Reorder the current results; the visible window is kept.
    pub fn set_sort_key(&mut self, sort_key: SortKey) {
        if sort_key != self.sort_key {
            self.sort_key = sort_key;
            self.recompute();
        }
    }

    /// Grow the visible window by one increment, never past the result count.
    ///
    /// Returns the number of visible records afterwards.
    pub fn reveal_more(&mut self) -> usize {
        let total = self.results.len();
        if self.window < total {
            self.window = (self.window + self.config.window_increment).min(total);
        }
        self.visible_count()
    }

    /// Number of records currently visible.
    pub fn visible_count(&self) -> usize {
        self.window.min(self.results.len())
    }

    pub fn set_designer_search(&mut self, search: impl Into<String>) {
        self.designer_search = search.into();
    }

    pub fn set_note_search(&mut self, search: impl Into<String>) {
        self.note_search = search.into();
    }

    /// Snapshot of everything the listing page renders.
    pub fn view(&self) -> ViewResult<'_> {
        let results: Vec<&FragranceRecord> = self
            .results
            .iter()
            .filter_map(|id| self.catalog.get(*id).ok())
            .collect();
        let designers = self.catalog.designer_facets();
        let notes = self.catalog.note_facets();

        ViewResult {
            visible: self.visible_count(),
            results,
            sort_key: self.sort_key,
            criteria: &self.criteria,
            designer_options: designers.search(&self.designer_search, None),
            note_options: notes.search(&self.note_search, Some(self.config.note_option_limit)),
            designers,
            notes,
        }
    }

    fn update_criteria(&mut self, change: impl FnOnce(&mut FilterCriteria)) {
        let before = self.criteria.clone();
        change(&mut self.criteria);
        if self.criteria != before {
            self.recompute();
            self.window = self.config.initial_window;
        }
    }

    fn recompute(&mut self) {
        self.results = self
            .catalog
            .search(&self.criteria, self.sort_key)
            .into_iter()
            .map(|r| r.id)
            .collect();
        tracing::debug!(
            results = self.results.len(),
            sort = %self.sort_key,
            "query session recomputed"
        );
    }
}

/// An empty text query means "no query".
fn normalized(mut criteria: FilterCriteria) -> FilterCriteria {
    criteria.query = criteria.query.filter(|q| !q.is_empty());
    criteria
}

fn toggle(slot: &mut Option<String>, value: String) {
    if slot.as_deref() == Some(value.as_str()) {
        *slot = None;
    } else {
        *slot = Some(value);
    }
}

/// The current listing: ordered results, visible prefix and facet options.
#[derive(Debug, Clone, Serialize)]
pub struct ViewResult<'s> {
    /// Every matching record, in display order.
    pub results: Vec<&'s FragranceRecord>,
    /// Length of the visible prefix of `results`.
    pub visible: usize,
    pub sort_key: SortKey,
    pub criteria: &'s FilterCriteria,
    pub designers: &'s FacetTable,
    pub notes: &'s FacetTable,
    /// Designer options after the designer search.
    pub designer_options: Vec<&'s FacetEntry>,
    /// Note options after the note search, capped.
    pub note_options: Vec<&'s FacetEntry>,
}

impl<'s> ViewResult<'s> {
    pub fn visible_records(&self) -> &[&'s FragranceRecord] {
        &self.results[..self.visible]
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Would "reveal more" show anything new?
    pub fn has_more(&self) -> bool {
        self.visible < self.results.len()
    }
}
