use catalog_viewer::filter_state::FilterStore;
use catalog_viewer::pipeline::{apply_filters, FilterCache};
use catalog_viewer::source::generate_products;
use catalog_viewer::types::{FilterState, Product, Sort, SortField, SortOrder};
use catalog_viewer::window::{compute_window, SizeEstimator, Virtualizer};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn two_products() -> Vec<Product> {
    vec![
        Product {
            id: "1".into(),
            name: "Widget".into(),
            category: "A".into(),
            price: 100.0,
            in_stock: true,
        },
        Product {
            id: "2".into(),
            name: "Gadget".into(),
            category: "B".into(),
            price: 50.0,
            in_stock: false,
        },
    ]
}

fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}

#[test]
fn test_end_to_end_filter_then_sort() {
    let products = two_products();
    let mut store = FilterStore::new();

    store.set_categories(["A"]);
    store.set_only_in_stock(true);
    assert_eq!(ids(&apply_filters(&products, store.state())), vec!["1"]);

    store.reset();
    store.set_sort(Some(SortField::Price), Some(SortOrder::Desc));
    let result = apply_filters(&products, store.state());
    assert_eq!(ids(&result), vec!["1", "2"]);
    assert_eq!(result[0].price, 100.0);
    assert_eq!(result[1].price, 50.0);
}

#[test]
fn test_filters_are_idempotent_on_generated_data() {
    let products = generate_products(2_000, &mut StdRng::seed_from_u64(11));
    let state = FilterState {
        categories: ["B".to_string(), "C".to_string()].into_iter().collect(),
        search_term: "1".into(),
        only_in_stock: true,
        sort: Sort::Price(SortOrder::Asc),
        ..Default::default()
    };

    let once = apply_filters(&products, &state);
    let twice = apply_filters(&once, &state);
    assert_eq!(once, twice);
    assert!(once.windows(2).all(|w| w[0].price <= w[1].price));
    assert!(once.iter().all(|p| p.in_stock && (p.category == "B" || p.category == "C")));
}

#[test]
fn test_toggle_category_twice_restores_state() {
    let mut store = FilterStore::new();
    store.set_search_term("gad");
    let before = store.state().clone();

    store.toggle_category("B");
    assert!(store.state().categories.contains("B"));
    store.toggle_category("B");
    assert_eq!(store.state(), &before);
}

#[test]
fn test_cache_follows_store_revisions() {
    let products = two_products();
    let mut store = FilterStore::new();
    let mut cache = FilterCache::new();

    assert_eq!(cache.get_or_compute(&products, 1, store.state(), store.revision()), &[0, 1]);

    store.set_only_in_stock(true);
    assert_eq!(cache.get_or_compute(&products, 1, store.state(), store.revision()), &[0]);

    // Same value again is not a change
    let revision = store.revision();
    store.set_only_in_stock(true);
    assert_eq!(store.revision(), revision);
}

#[test]
fn test_windowing_ten_thousand_rows() {
    let products = generate_products(10_000, &mut StdRng::seed_from_u64(3));
    let visible = apply_filters(&products, &FilterState::default());
    assert_eq!(visible.len(), 10_000);

    let row = 52.0;
    for first_row in [0usize, 17, 5_000, 9_990] {
        let window = compute_window(
            visible.len(),
            SizeEstimator::Fixed(row),
            10,
            first_row as f32 * row,
            Some(row * 10.0),
        );
        assert!(!window.is_empty());
        assert!(window.items.len() <= 30, "{} items at row {}", window.items.len(), first_row);
        assert!(window.items.windows(2).all(|w| w[1].index == w[0].index + 1));
        assert!(window.items.iter().all(|item| item.index < visible.len()));
        assert!(window.range().contains(&first_row));
        assert_eq!(window.total_extent, row * 10_000.0);
    }
}

#[test]
fn test_window_tracks_narrowing_results() {
    let products = generate_products(10_000, &mut StdRng::seed_from_u64(5));
    let mut rows = Virtualizer::fixed(products.len(), 52.0);
    let deep = rows.compute(52.0 * 9_000.0, Some(520.0));
    assert!(deep.range().start > 8_000);

    let state = FilterState {
        categories: ["A".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let narrowed = apply_filters(&products, &state);
    rows.set_count(narrowed.len());

    // The old offset is past the end now; the window clamps to the tail
    let window = rows.compute(52.0 * 9_000.0, Some(520.0));
    assert!(!window.is_empty());
    assert_eq!(window.range().end, narrowed.len());
}
