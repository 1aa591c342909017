//! Sillage for the browser: the fragrance catalog engine compiled to WASM.
//!
//! The presentation layer loads the catalog JSON once, then drives a
//! [`WasmSession`] from UI events and renders the JSON views it returns.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { WasmCatalog } from 'sillage-wasm';
//!
//! await init();
//! const catalog = new WasmCatalog(await (await fetch('/fragrances.json')).text());
//! const session = catalog.session();
//! session.toggle_gender("female");
//! session.set_sort("Longest longevity");
//! const view = JSON.parse(session.view());
//! const detail = JSON.parse(catalog.detail(view.fragrances[0].ID));
//! ```

use serde::Serialize;
use sillage::{CatalogError, FacetEntry, FilterCriteria, FragranceId, FragranceRecord, Gender, SortKey};
use sillage_browse::{Browser, QuerySession};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

fn to_js_err(e: CatalogError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_json(value: &impl Serialize) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

// ---------------------------------------------------------------------------
// WasmCatalog
// ---------------------------------------------------------------------------

/// A loaded, read-only fragrance catalog.
#[wasm_bindgen]
pub struct WasmCatalog {
    browser: Browser,
}

#[wasm_bindgen]
impl WasmCatalog {
    /// Load a catalog from its JSON text.
    #[wasm_bindgen(constructor)]
    pub fn from_json(json: &str) -> Result<WasmCatalog, JsValue> {
        let browser = Browser::from_json_str(json).map_err(to_js_err)?;
        Ok(WasmCatalog { browser })
    }

    /// Number of records in the catalog.
    #[wasm_bindgen]
    pub fn len(&self) -> usize {
        self.browser.catalog().len()
    }

    #[wasm_bindgen]
    pub fn is_empty(&self) -> bool {
        self.browser.catalog().is_empty()
    }

    /// Designer options matching `search` as JSON `[{label, count}]`.
    #[wasm_bindgen]
    pub fn designers(&self, search: &str, limit: Option<u32>) -> Result<String, JsValue> {
        to_json(&self.browser.designers().search(search, limit.map(|n| n as usize)))
    }

    /// Note options matching `search` as JSON `[{label, count}]`.
    #[wasm_bindgen]
    pub fn notes(&self, search: &str, limit: Option<u32>) -> Result<String, JsValue> {
        to_json(&self.browser.notes().search(search, limit.map(|n| n as usize)))
    }

    /// A record with its similar and same-designer records, as JSON.
    #[wasm_bindgen]
    pub fn detail(&self, id: u32) -> Result<String, JsValue> {
        let detail = self
            .browser
            .detail(FragranceId(u64::from(id)))
            .map_err(to_js_err)?;
        to_json(&detail)
    }

    /// Start a new listing session over this catalog.
    #[wasm_bindgen]
    pub fn session(&self) -> WasmSession {
        WasmSession {
            inner: self.browser.session(),
        }
    }
}

// ---------------------------------------------------------------------------
// WasmSession
// ---------------------------------------------------------------------------

/// Listing state for one page: criteria, sort key and visible window.
#[wasm_bindgen]
pub struct WasmSession {
    inner: QuerySession,
}

/// What the listing page renders.
#[derive(Serialize)]
struct ListingView<'a> {
    total: usize,
    visible: usize,
    has_more: bool,
    sort: SortKey,
    criteria: &'a FilterCriteria,
    fragrances: &'a [&'a FragranceRecord],
    designer_options: &'a [&'a FacetEntry],
    note_options: &'a [&'a FacetEntry],
}

#[wasm_bindgen]
impl WasmSession {
    #[wasm_bindgen]
    pub fn set_query(&mut self, query: &str) {
        self.inner.set_query(query);
    }

    #[wasm_bindgen]
    pub fn clear_query(&mut self) {
        self.inner.clear_query();
    }

    /// Select a gender (`male`, `female`, `unisex`), or clear it if selected.
    #[wasm_bindgen]
    pub fn toggle_gender(&mut self, gender: &str) -> Result<(), JsValue> {
        let gender: Gender = gender.parse().map_err(to_js_err)?;
        self.inner.toggle_gender(gender);
        Ok(())
    }

    #[wasm_bindgen]
    pub fn clear_gender(&mut self) {
        self.inner.clear_gender();
    }

    #[wasm_bindgen]
    pub fn toggle_designer(&mut self, designer: &str) {
        self.inner.toggle_designer(designer);
    }

    #[wasm_bindgen]
    pub fn clear_designer(&mut self) {
        self.inner.clear_designer();
    }

    #[wasm_bindgen]
    pub fn toggle_note(&mut self, note: &str) {
        self.inner.toggle_note(note);
    }

    #[wasm_bindgen]
    pub fn clear_note(&mut self) {
        self.inner.clear_note();
    }

    #[wasm_bindgen]
    pub fn clear_filters(&mut self) {
        self.inner.clear_filters();
    }

    /// Set the sort key from its selector label, e.g. `"Highest sillage"`.
    #[wasm_bindgen]
    pub fn set_sort(&mut self, label: &str) -> Result<(), JsValue> {
        let key: SortKey = label.parse().map_err(to_js_err)?;
        self.inner.set_sort_key(key);
        Ok(())
    }

    /// Show more results; returns the new visible count.
    #[wasm_bindgen]
    pub fn reveal_more(&mut self) -> usize {
        self.inner.reveal_more()
    }

    #[wasm_bindgen]
    pub fn set_designer_search(&mut self, search: &str) {
        self.inner.set_designer_search(search);
    }

    #[wasm_bindgen]
    pub fn set_note_search(&mut self, search: &str) {
        self.inner.set_note_search(search);
    }

    /// The visible listing plus facet options, as JSON.
    #[wasm_bindgen]
    pub fn view(&self) -> Result<String, JsValue> {
        let view = self.inner.view();
        to_json(&ListingView {
            total: view.total(),
            visible: view.visible,
            has_more: view.has_more(),
            sort: view.sort_key,
            criteria: view.criteria,
            fragrances: view.visible_records(),
            designer_options: &view.designer_options,
            note_options: &view.note_options,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const CATALOG: &str = r#"[
        {"ID": 1, "Name": "Shalimar", "Brand": "Guerlain", "Gender": "female", "Sillage": "90",
         "Notes": {"Top": ["Bergamot"], "Middle": ["Iris", "Jasmine"], "Base": ["Vanilla", "Tonka"]}},
        {"ID": 2, "Name": "Habit Rouge", "Brand": "Guerlain", "Gender": "male", "Sillage": "60",
         "Notes": {"Top": ["Bergamot"], "Middle": ["Rose"], "Base": ["Vanilla", "Leather"]}},
        {"ID": 3, "Name": "Angel", "Brand": "Mugler", "Gender": "female", "Sillage": "95",
         "Notes": {"Top": ["Bergamot"], "Middle": ["Jasmine"], "Base": ["Vanilla", "Patchouli"]}}
    ]"#;

    fn view_json(session: &WasmSession) -> Value {
        serde_json::from_str(&session.view().unwrap()).unwrap()
    }

    #[test]
    fn wasm_catalog_loads_and_lists_facets() {
        let catalog = WasmCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 3);

        let designers: Value = serde_json::from_str(&catalog.designers("", None).unwrap()).unwrap();
        assert_eq!(designers[0]["label"], "Guerlain");
        assert_eq!(designers[0]["count"], 2);

        let notes: Value = serde_json::from_str(&catalog.notes("van", Some(5)).unwrap()).unwrap();
        assert_eq!(notes[0]["label"], "Vanilla");
        assert_eq!(notes[0]["count"], 3);
    }

    #[test]
    fn wasm_session_filters_and_sorts() {
        let catalog = WasmCatalog::from_json(CATALOG).unwrap();
        let mut session = catalog.session();

        session.toggle_gender("female").unwrap();
        session.set_sort("Highest sillage").unwrap();
        let view = view_json(&session);
        assert_eq!(view["total"], 2);
        assert_eq!(view["fragrances"][0]["Name"], "Angel");
        assert_eq!(view["sort"], "highest_sillage");

        session.toggle_gender("female").unwrap();
        assert_eq!(view_json(&session)["total"], 3);
    }

    #[test]
    fn wasm_detail_includes_recommendations() {
        let catalog = WasmCatalog::from_json(CATALOG).unwrap();
        let detail: Value = serde_json::from_str(&catalog.detail(1).unwrap()).unwrap();
        assert_eq!(detail["record"]["Name"], "Shalimar");
        assert_eq!(detail["similar"][0]["ID"], 3);
        assert_eq!(detail["same_designer"][0]["ID"], 2);
    }

    #[test]
    fn wasm_session_clear_filters() {
        let catalog = WasmCatalog::from_json(CATALOG).unwrap();
        let mut session = catalog.session();
        session.set_query("angel");
        session.toggle_note("Vanilla");
        assert_eq!(view_json(&session)["total"], 1);

        session.clear_filters();
        let view = view_json(&session);
        assert_eq!(view["total"], 3);
        assert_eq!(view["has_more"], false);
        assert_eq!(session.reveal_more(), 3);
    }
}
