//! Filter state container with load-on-start / save-on-change persistence

use crate::constants::FILTER_PREFS_KEY;
use crate::types::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

/// Key-value persistence for UI preferences
pub trait PreferenceStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory store, used when no database is available and in tests
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Owns the current [`FilterState`].
///
/// Every mutation builds a complete new state and swaps it in, so there is
/// never a partially updated state to observe. `revision` goes up by one per
/// effective change and is what downstream caches key on.
pub struct FilterStore {
    state: FilterState,
    revision: u64,
    store: Option<Arc<dyn PreferenceStore>>,
    key: String,
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterStore {
    /// Defaults, no persistence
    pub fn new() -> Self {
        Self {
            state: FilterState::default(),
            revision: 0,
            store: None,
            key: FILTER_PREFS_KEY.to_string(),
        }
    }

    /// Restore from `store` under `key`, falling back to defaults on any failure.
    pub fn load(store: Arc<dyn PreferenceStore>, key: &str) -> Self {
        let state = match store.load(key) {
            Ok(Some(json)) => match serde_json::from_str::<FilterState>(&json) {
                Ok(state) => {
                    debug!(key, "Filter preferences loaded");
                    state
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse filter preferences, using defaults");
                    FilterState::default()
                }
            },
            Ok(None) => {
                debug!(key, "No saved filter preferences, using defaults");
                FilterState::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read filter preferences, using defaults");
                FilterState::default()
            }
        };

        Self {
            state,
            revision: 0,
            store: Some(store),
            key: key.to_string(),
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, state: FilterState) {
        if state == self.state {
            return;
        }
        self.state = state;
        self.revision += 1;
        self.persist();
    }

    pub fn set_categories<I, S>(&mut self, categories: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: BTreeSet<String> = categories.into_iter().map(Into::into).collect();
        self.replace(FilterState {
            categories,
            ..self.state.clone()
        });
    }

    pub fn toggle_category(&mut self, category: &str) {
        self.replace(self.state.toggled_category(category));
    }

    /// Stored verbatim; case folding happens when filtering
    pub fn set_search_term(&mut self, text: impl Into<String>) {
        self.replace(FilterState {
            search_term: text.into(),
            ..self.state.clone()
        });
    }

    pub fn set_price_range(&mut self, min: impl Into<String>, max: impl Into<String>) {
        self.replace(FilterState {
            price_range: PriceRange::new(min, max),
            ..self.state.clone()
        });
    }

    pub fn set_only_in_stock(&mut self, flag: bool) {
        self.replace(FilterState {
            only_in_stock: flag,
            ..self.state.clone()
        });
    }

    /// A field without an order (or the reverse) is stored as no sort
    pub fn set_sort(&mut self, field: Option<SortField>, order: Option<SortOrder>) {
        self.replace(FilterState {
            sort: Sort::from_parts(field, order),
            ..self.state.clone()
        });
    }

    pub fn reset(&mut self) {
        self.replace(FilterState::default());
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        match serde_json::to_string(&self.state) {
            Ok(json) => {
                if let Err(e) = store.save(&self.key, &json) {
                    warn!(error = %e, "Failed to save filter preferences");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize filter preferences"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn load(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn save(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn test_toggle_category_is_self_inverse() {
        let mut store = FilterStore::new();
        store.set_categories(["B"]);
        let before = store.state().clone();
        store.toggle_category("A");
        assert!(store.state().categories.contains("A"));
        assert!(store.state().categories.contains("B"));
        store.toggle_category("A");
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_search_term_stored_verbatim() {
        let mut store = FilterStore::new();
        store.set_search_term("  MiXeD ");
        assert_eq!(store.state().search_term, "  MiXeD ");
    }

    #[test]
    fn test_half_sort_normalized() {
        let mut store = FilterStore::new();
        store.set_sort(Some(SortField::Price), Some(SortOrder::Desc));
        assert_eq!(store.state().sort, Sort::Price(SortOrder::Desc));
        store.set_sort(Some(SortField::Price), None);
        assert_eq!(store.state().sort, Sort::None);
        store.set_sort(None, Some(SortOrder::Asc));
        assert_eq!(store.state().sort, Sort::None);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = FilterStore::new();
        store.set_categories(["A", "C"]);
        store.set_search_term("x");
        store.set_price_range("1", "2");
        store.set_only_in_stock(true);
        store.set_sort(Some(SortField::Price), Some(SortOrder::Asc));
        store.reset();
        assert!(store.state().is_default());
    }

    #[test]
    fn test_revision_only_bumps_on_change() {
        let mut store = FilterStore::new();
        assert_eq!(store.revision(), 0);
        store.set_only_in_stock(true);
        assert_eq!(store.revision(), 1);
        store.set_only_in_stock(true);
        assert_eq!(store.revision(), 1);
        store.reset();
        assert_eq!(store.revision(), 2);
        store.reset();
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_changes_persist_and_reload() {
        let backing: Arc<dyn PreferenceStore> = Arc::new(MemoryStore::new());
        let mut store = FilterStore::load(backing.clone(), FILTER_PREFS_KEY);
        store.toggle_category("A");
        store.set_price_range("10", "");
        store.set_sort(Some(SortField::Price), Some(SortOrder::Asc));

        let reloaded = FilterStore::load(backing, FILTER_PREFS_KEY);
        assert_eq!(reloaded.state(), store.state());
    }

    #[test]
    fn test_malformed_saved_state_falls_back() {
        let backing = Arc::new(MemoryStore::new());
        backing.save(FILTER_PREFS_KEY, "{not json").unwrap();
        let store = FilterStore::load(backing, FILTER_PREFS_KEY);
        assert!(store.state().is_default());
    }

    #[test]
    fn test_saved_half_sort_loads_as_none() {
        let backing = Arc::new(MemoryStore::new());
        backing
            .save(FILTER_PREFS_KEY, r#"{"sort":{"field":"price","order":null}}"#)
            .unwrap();
        let store = FilterStore::load(backing, FILTER_PREFS_KEY);
        assert_eq!(store.state().sort, Sort::None);
    }

    #[test]
    fn test_broken_store_never_blocks() {
        let mut store = FilterStore::load(Arc::new(BrokenStore), FILTER_PREFS_KEY);
        assert!(store.state().is_default());
        store.set_search_term("still works");
        assert_eq!(store.state().search_term, "still works");
    }
}
