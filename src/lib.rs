//! Catalog Viewer core
//!
//! Loads a product dataset, narrows and orders it with a pure filter
//! pipeline, and computes which rows of the result need to be drawn.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Product, FilterState, Sort, price bounds |
//! | [`pipeline`] | Filter stages, `apply_filters`, memoizing cache |
//! | [`filter_state`] | Filter state manager and preference persistence |
//! | [`window`] | Virtualized list window computation |
//! | [`source`] | Product sources, snapshots, background loader |
//! | [`db`] | SQLite snapshot cache and settings table |
//! | [`settings`] | `settings.json` configuration |

pub mod constants;
pub mod db;
pub mod filter_state;
pub mod pipeline;
pub mod settings;
pub mod source;
pub mod types;
pub mod utils;
pub mod window;
