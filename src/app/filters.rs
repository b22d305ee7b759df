//! Sidebar: filter controls and dataset picker

use super::App;
use crate::theme;
use crate::ui::components::checkbox_row;
use catalog_viewer::constants::*;
use catalog_viewer::settings::ViewMode;
use catalog_viewer::source::loader::LoadStatus;
use catalog_viewer::source::SourceConfig;
use catalog_viewer::types::{Sort, SortOrder};
use eframe::egui;
use egui_phosphor::regular as icons;
use tracing::info;

fn sort_label(sort: Sort) -> &'static str {
    match sort {
        Sort::None => "Default order",
        Sort::Price(SortOrder::Asc) => "Price: low to high",
        Sort::Price(SortOrder::Desc) => "Price: high to low",
    }
}

fn view_mode_label(mode: ViewMode) -> &'static str {
    match mode {
        ViewMode::Auto => "Auto",
        ViewMode::Table => "Table",
        ViewMode::Cards => "Cards",
    }
}

fn section_label(ui: &mut egui::Ui, text: &str) {
    ui.add_space(theme::SPACING_MD);
    ui.label(
        egui::RichText::new(text)
            .size(theme::FONT_SECTION)
            .color(theme::TEXT_DIM),
    );
}

impl App {
    pub(crate) fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new(APP_NAME)
                .size(theme::FONT_TITLE)
                .color(theme::TEXT_PRIMARY),
        );
        ui.add_space(theme::SPACING_SM);

        egui::ScrollArea::vertical()
            .id_salt("sidebar_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                self.render_filter_controls(ui);
                ui.add_space(theme::SPACING_LG);
                ui.separator();
                self.render_dataset_picker(ui);
                ui.add_space(theme::SPACING_LG);
                ui.separator();
                self.render_view_controls(ui);
            });
    }

    fn render_filter_controls(&mut self, ui: &mut egui::Ui) {
        // Search
        section_label(ui, "SEARCH");
        let search = ui.add(
            egui::TextEdit::singleline(&mut self.search_input)
                .hint_text(format!("{} Search products", icons::MAGNIFYING_GLASS))
                .desired_width(f32::INFINITY),
        );
        if search.changed() {
            self.filters.set_search_term(self.search_input.clone());
        }

        // Categories come from the loaded data; selections that no longer
        // exist stay in the state and simply match nothing
        section_label(ui, "CATEGORY");
        let categories: Vec<String> = self
            .loader
            .snapshot()
            .map(|s| s.categories().to_vec())
            .unwrap_or_default();
        if categories.is_empty() {
            ui.label(egui::RichText::new("No categories").color(theme::TEXT_MUTED));
        }
        for category in &categories {
            let checked = self.filters.state().categories.contains(category);
            if checkbox_row(ui, checked, category) {
                self.filters.toggle_category(category);
            }
        }

        // Price
        section_label(ui, "PRICE");
        let mut price_changed = false;
        ui.horizontal(|ui| {
            let width = (ui.available_width() - theme::SPACING_MD) / 2.0;
            price_changed |= ui
                .add(
                    egui::TextEdit::singleline(&mut self.min_price_input)
                        .hint_text("Min")
                        .desired_width(width),
                )
                .changed();
            price_changed |= ui
                .add(
                    egui::TextEdit::singleline(&mut self.max_price_input)
                        .hint_text("Max")
                        .desired_width(width),
                )
                .changed();
        });
        if price_changed {
            self.filters
                .set_price_range(self.min_price_input.clone(), self.max_price_input.clone());
        }

        // Stock
        section_label(ui, "AVAILABILITY");
        let only_in_stock = self.filters.state().only_in_stock;
        if checkbox_row(ui, only_in_stock, "In stock only") {
            self.filters.set_only_in_stock(!only_in_stock);
        }

        // Sort
        section_label(ui, "SORT");
        let current = self.filters.state().sort;
        let mut selected = current;
        egui::ComboBox::from_id_salt("sort_select")
            .selected_text(sort_label(selected))
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for sort in [
                    Sort::None,
                    Sort::Price(SortOrder::Asc),
                    Sort::Price(SortOrder::Desc),
                ] {
                    ui.selectable_value(&mut selected, sort, sort_label(sort));
                }
            });
        if selected != current {
            self.filters.set_sort(selected.field(), selected.order());
        }

        ui.add_space(theme::SPACING_MD);
        let can_reset = !self.filters.state().is_default();
        if ui
            .add_enabled(can_reset, theme::button(format!("{} Reset filters", icons::X)))
            .clicked()
        {
            self.filters.reset();
            self.sync_inputs();
        }
    }

    fn render_dataset_picker(&mut self, ui: &mut egui::Ui) {
        section_label(ui, "DATASET");

        let current = self.settings.source.clone();
        let mut chosen: Option<SourceConfig> = None;

        if ui
            .selectable_label(
                current == SourceConfig::Bundled,
                format!("{} Bundled sample", icons::PACKAGE),
            )
            .clicked()
        {
            chosen = Some(SourceConfig::Bundled);
        }
        if ui
            .selectable_label(
                matches!(current, SourceConfig::Generated { .. }),
                format!("{} Generated ({})", icons::SHUFFLE, GENERATED_PRODUCT_COUNT),
            )
            .clicked()
        {
            chosen = Some(SourceConfig::Generated {
                count: GENERATED_PRODUCT_COUNT,
                seed: None,
            });
        }
        let file_label = match &current {
            SourceConfig::File { path } => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "JSON file".to_string()),
            _ => "Open JSON file…".to_string(),
        };
        if ui
            .selectable_label(
                matches!(current, SourceConfig::File { .. }),
                format!("{} {}", icons::FOLDER_OPEN, file_label),
            )
            .clicked()
        {
            if let Some(path) = rfd::FileDialog::new()
                .add_filter("JSON", &["json"])
                .set_title("Open product dataset")
                .pick_file()
            {
                info!(path = %path.display(), "Dataset file selected");
                chosen = Some(SourceConfig::File { path });
            }
        }

        ui.horizontal(|ui| {
            let width = ui.available_width() - 36.0;
            ui.add(
                egui::TextEdit::singleline(&mut self.remote_url_input)
                    .hint_text("https://…/products.json")
                    .desired_width(width),
            );
            let url = self.remote_url_input.trim();
            if ui
                .add_enabled(!url.is_empty(), theme::button(icons::GLOBE))
                .on_hover_text("Load from URL")
                .clicked()
            {
                chosen = Some(SourceConfig::Remote {
                    url: url.to_string(),
                    categories_url: None,
                });
            }
        });

        if let Some(source) = chosen {
            self.select_source(source);
        }

        ui.add_space(theme::SPACING_MD);
        let loading = self.loader.is_loading();
        if ui
            .add_enabled(!loading, theme::button(format!("{} Refresh", icons::ARROW_CLOCKWISE)))
            .clicked()
        {
            self.loader.request();
        }

        let status = match self.loader.status() {
            LoadStatus::Idle => "Idle".to_string(),
            LoadStatus::Loading => "Loading…".to_string(),
            LoadStatus::Loaded => "Loaded".to_string(),
            LoadStatus::Failed(_) => "Failed".to_string(),
        };
        ui.label(
            egui::RichText::new(format!("{} · {}", self.loader.source_label(), status))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
        );
        if let Some(snapshot) = self.loader.snapshot() {
            ui.label(
                egui::RichText::new(format!(
                    "Fetched {}",
                    snapshot
                        .fetched_at()
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                ))
                .size(theme::FONT_SMALL)
                .color(theme::TEXT_DIM),
            );
        }
    }

    fn render_view_controls(&mut self, ui: &mut egui::Ui) {
        section_label(ui, "VIEW");
        let mut mode = self.settings.view_mode;
        egui::ComboBox::from_id_salt("view_mode_select")
            .selected_text(view_mode_label(mode))
            .width(ui.available_width())
            .show_ui(ui, |ui| {
                for m in [ViewMode::Auto, ViewMode::Table, ViewMode::Cards] {
                    ui.selectable_value(&mut mode, m, view_mode_label(m));
                }
            });
        if mode != self.settings.view_mode {
            self.settings.view_mode = mode;
            self.scroll_to_top = true;
        }
    }
}
