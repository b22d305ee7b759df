//! App module - contains the main application state and logic

mod filters;
mod views;

use crate::theme;
use catalog_viewer::constants::*;
use catalog_viewer::db::Database;
use catalog_viewer::filter_state::{FilterStore, MemoryStore, PreferenceStore};
use catalog_viewer::pipeline::FilterCache;
use catalog_viewer::settings::Settings;
use catalog_viewer::source::loader::{LoadStatus, Loader};
use catalog_viewer::source::SourceConfig;
use catalog_viewer::window::Virtualizer;
use eframe::egui;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub(crate) db: Option<Arc<Database>>,
    pub(crate) runtime: tokio::runtime::Runtime,
    pub(crate) loader: Loader,
    pub(crate) filters: FilterStore,
    pub(crate) cache: FilterCache,
    // Virtualized views
    pub(crate) table_rows: Virtualizer,
    pub(crate) card_rows: Virtualizer,
    pub(crate) card_columns: usize,
    pub(crate) scroll_to_top: bool,
    pub(crate) seen_revision: u64,
    pub(crate) seen_data_version: u64,
    // Sidebar text buffers, mirrored into the filter state on edit
    pub(crate) search_input: String,
    pub(crate) min_price_input: String,
    pub(crate) max_price_input: String,
    pub(crate) remote_url_input: String,
    // Settings
    pub(crate) settings: Settings,
    pub(crate) data_dir: PathBuf,
    pub(crate) window_pos: Option<egui::Pos2>,
    pub(crate) window_size: Option<egui::Vec2>,
    pub(crate) needs_center: bool,
}

// ============================================================================
// APP INITIALIZATION & HELPERS
// ============================================================================

impl App {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        db: Option<Database>,
        settings: Settings,
        data_dir: PathBuf,
    ) -> std::io::Result<Self> {
        // Force dark theme
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        // Phosphor icons on top of the default fonts
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        theme::apply_visuals(&cc.egui_ctx);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("catalog-fetch")
            .enable_all()
            .build()?;

        let db = db.map(Arc::new);
        let prefs: Arc<dyn PreferenceStore> = match &db {
            Some(db) => db.clone(),
            None => Arc::new(MemoryStore::new()),
        };
        let filters = FilterStore::load(prefs, FILTER_PREFS_KEY);

        let ctx = cc.egui_ctx.clone();
        let mut loader = Loader::new(
            settings.source.build(),
            settings.fetch_policy(),
            runtime.handle().clone(),
        )
        .with_waker(move || ctx.request_repaint());

        if let Some(db) = &db {
            match db.load_snapshot() {
                Ok(Some(snapshot)) => loader.install_cached(snapshot),
                Ok(None) => debug!("No cached snapshot"),
                Err(e) => warn!(error = %e, "Failed to read cached snapshot"),
            }
        }
        loader.request();

        let state = filters.state().clone();
        let remote_url_input = match &settings.source {
            SourceConfig::Remote { url, .. } => url.clone(),
            _ => String::new(),
        };

        Ok(Self {
            db,
            runtime,
            loader,
            filters,
            cache: FilterCache::new(),
            table_rows: Virtualizer::fixed(0, settings.row_height()).with_overscan(settings.overscan),
            card_rows: Virtualizer::fixed(0, settings.card_height).with_overscan(settings.overscan),
            card_columns: 2,
            scroll_to_top: false,
            seen_revision: 0,
            seen_data_version: 0,
            search_input: state.search_term,
            min_price_input: state.price_range.min,
            max_price_input: state.price_range.max,
            remote_url_input,
            settings,
            data_dir,
            window_pos: None,
            window_size: None,
            needs_center: false,
        })
    }

    pub fn save_settings(&mut self) {
        self.settings.window_x = self.window_pos.map(|p| p.x);
        self.settings.window_y = self.window_pos.map(|p| p.y);
        self.settings.window_w = self.window_size.map(|s| s.x);
        self.settings.window_h = self.window_size.map(|s| s.y);
        self.settings.save(&self.data_dir);
    }

    /// Switch the dataset and start fetching from it
    pub fn select_source(&mut self, source: SourceConfig) {
        if source == self.settings.source && !matches!(self.loader.status(), LoadStatus::Failed(_)) {
            return;
        }
        self.loader.set_source(source.build());
        self.settings.source = source;
        self.settings.save(&self.data_dir);
    }

    /// Copy text buffers back from the filter state after a programmatic change
    pub fn sync_inputs(&mut self) {
        let state = self.filters.state();
        self.search_input = state.search_term.clone();
        self.min_price_input = state.price_range.min.clone();
        self.max_price_input = state.price_range.max.clone();
    }

    /// Drain loader results and persist fresh snapshots
    fn poll_loader(&mut self) {
        if !self.loader.poll() {
            return;
        }
        if *self.loader.status() != LoadStatus::Loaded {
            return;
        }
        let (Some(db), Some(snapshot)) = (&self.db, self.loader.snapshot()) else {
            return;
        };
        let db = db.clone();
        let snapshot = snapshot.clone();
        // Writing 10k rows takes a moment; keep it off the UI thread
        self.runtime.spawn_blocking(move || match db.save_snapshot(&snapshot) {
            Ok(count) => debug!(count, "Snapshot cached"),
            Err(e) => warn!(error = %e, "Failed to cache snapshot"),
        });
    }

    /// Reset scroll when the result set changes underneath the user
    fn track_changes(&mut self) {
        let revision = self.filters.revision();
        let data_version = self.loader.data_version();
        if revision != self.seen_revision || data_version != self.seen_data_version {
            self.seen_revision = revision;
            self.seen_data_version = data_version;
            self.scroll_to_top = true;
        }
    }
}

// ============================================================================
// MAIN UPDATE LOOP
// ============================================================================

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Track window position/size for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().outer_rect {
                self.window_pos = Some(rect.min);
            }
            if let Some(rect) = i.viewport().inner_rect {
                self.window_size = Some(rect.size());
            }
        });

        // Center window on first launch
        if self.needs_center {
            self.needs_center = false;
            if let Some(cmd) = egui::ViewportCommand::center_on_screen(ctx) {
                ctx.send_viewport_cmd(cmd);
            }
        }

        self.poll_loader();

        // Left sidebar - filters (must be added BEFORE CentralPanel)
        egui::SidePanel::left("filter_panel")
            .exact_width(theme::SIDEBAR_WIDTH)
            .resizable(false)
            .show_separator_line(false)
            .frame(theme::sidebar_frame())
            .show(ctx, |ui| self.render_sidebar(ui));

        self.track_changes();

        egui::CentralPanel::default()
            .frame(
                egui::Frame::new()
                    .fill(theme::BG_BASE)
                    .inner_margin(egui::Margin::same(theme::SPACING_LG as i8)),
            )
            .show(ctx, |ui| self.render_main(ui));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        info!("Application shutting down");
        self.save_settings();
    }
}
