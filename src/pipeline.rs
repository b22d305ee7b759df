//! Filtering and sorting logic
//!
//! Each stage takes a slice of products (or references to them) and returns a new vector,
//! so the input collection is never touched. Stages run in a fixed order:
//! category, search, price range, stock, then sort.

use crate::types::*;
use std::borrow::Borrow;
use std::time::Instant;
use tracing::debug;

fn as_product<T: Borrow<Product>>(item: &T) -> &Product {
    item.borrow()
}

pub fn filter_by_category<T: Borrow<Product> + Clone>(items: &[T], state: &FilterState) -> Vec<T> {
    if state.categories.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|p| state.categories.contains(&as_product(*p).category))
        .cloned()
        .collect()
}

pub fn filter_by_search<T: Borrow<Product> + Clone>(items: &[T], search_term: &str) -> Vec<T> {
    if search_term.is_empty() {
        return items.to_vec();
    }
    let term = search_term.to_lowercase();
    items
        .iter()
        .filter(|p| as_product(*p).name.to_lowercase().contains(&term))
        .cloned()
        .collect()
}

pub fn filter_by_price_range<T: Borrow<Product> + Clone>(items: &[T], range: &PriceRange) -> Vec<T> {
    let (min, max) = range.bounds();
    if min == PriceBound::Unbounded && max == PriceBound::Unbounded {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|p| range.contains(as_product(*p).price))
        .cloned()
        .collect()
}

pub fn filter_by_stock<T: Borrow<Product> + Clone>(items: &[T], only_in_stock: bool) -> Vec<T> {
    if !only_in_stock {
        return items.to_vec();
    }
    items.iter().filter(|p| as_product(*p).in_stock).cloned().collect()
}

/// Stable: equal prices keep their incoming relative order
pub fn sort_products<T: Borrow<Product> + Clone>(items: &[T], sort: Sort) -> Vec<T> {
    let mut sorted = items.to_vec();
    match sort {
        Sort::None => {}
        Sort::Price(SortOrder::Asc) => {
            sorted.sort_by(|a, b| as_product(a).price.total_cmp(&as_product(b).price))
        }
        Sort::Price(SortOrder::Desc) => {
            sorted.sort_by(|a, b| as_product(b).price.total_cmp(&as_product(a).price))
        }
    }
    sorted
}

/// Product reference tagged with its position in the source slice
#[derive(Clone, Copy)]
struct Indexed<'a>(usize, &'a Product);

impl Borrow<Product> for Indexed<'_> {
    fn borrow(&self) -> &Product {
        self.1
    }
}

fn run_stages<T: Borrow<Product> + Clone>(items: Vec<T>, state: &FilterState) -> Vec<T> {
    let result = filter_by_category(&items, state);
    let result = filter_by_search(&result, &state.search_term);
    let result = filter_by_price_range(&result, &state.price_range);
    let result = filter_by_stock(&result, state.only_in_stock);
    sort_products(&result, state.sort)
}

/// Narrow and order `products` according to `state`.
pub fn apply_filters(products: &[Product], state: &FilterState) -> Vec<Product> {
    let refs: Vec<&Product> = products.iter().collect();
    run_stages(refs, state).into_iter().cloned().collect()
}

/// Same as [`apply_filters`] but returns positions into `products`.
pub fn filter_indices(products: &[Product], state: &FilterState) -> Vec<usize> {
    let tagged: Vec<Indexed> = products.iter().enumerate().map(|(i, p)| Indexed(i, p)).collect();
    run_stages(tagged, state).into_iter().map(|t| t.0).collect()
}

/// Memoized filter result, recomputed only when the snapshot or the
/// filter state revision changes.
#[derive(Default)]
pub struct FilterCache {
    key: Option<(u64, u64)>,
    indices: Vec<usize>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `generation` identifies the product snapshot, `revision` the state.
    pub fn get_or_compute(
        &mut self,
        products: &[Product],
        generation: u64,
        state: &FilterState,
        revision: u64,
    ) -> &[usize] {
        let key = (generation, revision);
        if self.key != Some(key) {
            let started = Instant::now();
            self.indices = filter_indices(products, state);
            self.key = Some(key);
            debug!(
                input = products.len(),
                output = self.indices.len(),
                elapsed_us = started.elapsed().as_micros() as u64,
                "Filters applied"
            );
        }
        &self.indices
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn product(id: &str, name: &str, category: &str, price: f64, in_stock: bool) -> Product {
        Product {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            price,
            in_stock,
        }
    }

    fn sample() -> Vec<Product> {
        vec![
            product("1", "Widget", "A", 100.0, true),
            product("2", "Gadget", "B", 50.0, false),
            product("3", "Widget Pro", "A", 75.0, true),
            product("4", "Sprocket", "C", 50.0, true),
            product("5", "gizmo", "B", 20.0, true),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_default_state_is_identity() {
        let products = sample();
        let result = apply_filters(&products, &FilterState::default());
        assert_eq!(result, products);
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let state = FilterState {
            search_term: "x".into(),
            only_in_stock: true,
            sort: Sort::Price(SortOrder::Desc),
            ..Default::default()
        };
        assert!(apply_filters(&[], &state).is_empty());
    }

    #[test]
    fn test_category_stage_keeps_order() {
        let state = FilterState {
            categories: BTreeSet::from(["A".to_string()]),
            ..Default::default()
        };
        let result = apply_filters(&sample(), &state);
        assert_eq!(ids(&result), vec!["1", "3"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let state = FilterState {
            search_term: "WIDGET".into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &state)), vec!["1", "3"]);

        let state = FilterState {
            search_term: "Giz".into(),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &state)), vec!["5"]);
    }

    #[test]
    fn test_price_min_only() {
        let state = FilterState {
            price_range: PriceRange::new("50", ""),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &state)), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_unparseable_min_is_unbounded() {
        let products = sample();
        let garbage = FilterState {
            price_range: PriceRange::new("abc", ""),
            ..Default::default()
        };
        let empty = FilterState::default();
        assert_eq!(apply_filters(&products, &garbage), apply_filters(&products, &empty));
    }

    #[test]
    fn test_stock_flag_false_is_noop() {
        let state = FilterState {
            only_in_stock: false,
            ..Default::default()
        };
        assert_eq!(apply_filters(&sample(), &state).len(), 5);

        let state = FilterState {
            only_in_stock: true,
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &state)), vec!["1", "3", "4", "5"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let asc = FilterState {
            sort: Sort::Price(SortOrder::Asc),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &asc)), vec!["5", "2", "4", "3", "1"]);

        let desc = FilterState {
            sort: Sort::Price(SortOrder::Desc),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&sample(), &desc)), vec!["1", "3", "2", "4", "5"]);
    }

    #[test]
    fn test_idempotent() {
        let state = FilterState {
            categories: BTreeSet::from(["A".to_string(), "B".to_string()]),
            search_term: "g".into(),
            price_range: PriceRange::new("10", "90"),
            only_in_stock: false,
            sort: Sort::Price(SortOrder::Desc),
        };
        let once = apply_filters(&sample(), &state);
        let twice = apply_filters(&once, &state);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_input_not_mutated() {
        let products = sample();
        let before = products.clone();
        let state = FilterState {
            sort: Sort::Price(SortOrder::Asc),
            ..Default::default()
        };
        let _ = apply_filters(&products, &state);
        assert_eq!(products, before);
    }

    #[test]
    fn test_filter_indices_match_apply_filters() {
        let products = sample();
        let state = FilterState {
            only_in_stock: true,
            sort: Sort::Price(SortOrder::Asc),
            ..Default::default()
        };
        let from_indices: Vec<Product> = filter_indices(&products, &state)
            .into_iter()
            .map(|i| products[i].clone())
            .collect();
        assert_eq!(from_indices, apply_filters(&products, &state));
    }

    #[test]
    fn test_cache_recomputes_on_key_change() {
        let products = sample();
        let mut cache = FilterCache::new();
        let state = FilterState::default();
        assert_eq!(cache.get_or_compute(&products, 1, &state, 0).len(), 5);

        // Same key: stale state is not re-read
        let narrowed = FilterState {
            only_in_stock: true,
            ..Default::default()
        };
        assert_eq!(cache.get_or_compute(&products, 1, &narrowed, 0).len(), 5);

        // Revision bump picks it up
        assert_eq!(cache.get_or_compute(&products, 1, &narrowed, 1).len(), 4);

        // New snapshot generation also recomputes
        let fewer = &products[..2];
        assert_eq!(cache.get_or_compute(fewer, 2, &narrowed, 1).len(), 1);
    }
}
