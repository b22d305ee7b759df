//! Application constants and configuration

use std::time::Duration;

pub const APP_NAME: &str = "Catalog Viewer";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Preference key the filter state is persisted under
pub const FILTER_PREFS_KEY: &str = "product-filter-preferences";

/// Row count of the synthetic dataset
pub const GENERATED_PRODUCT_COUNT: usize = 10_000;
pub const GENERATED_CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_FETCH_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Window width below which the card grid replaces the table
pub const NARROW_LAYOUT_BREAKPOINT: f32 = 768.0;
