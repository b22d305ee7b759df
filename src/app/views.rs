//! Main area: header, status banners and the virtualized table / card grid

use super::App;
use crate::theme;
use crate::ui::components::{paint_badge, skeleton, stock_label};
use catalog_viewer::constants::*;
use catalog_viewer::settings::ViewMode;
use catalog_viewer::source::loader::LoadStatus;
use catalog_viewer::types::{Product, Sort, SortOrder};
use catalog_viewer::utils::{count_label, format_price};
use catalog_viewer::window::Virtualizer;
use eframe::egui;
use egui_extras::{Size, StripBuilder};
use egui_phosphor::regular as icons;

/// Name, Category, Price, Stock
const COLUMN_FRACTIONS: [f32; 4] = [0.44, 0.2, 0.16, 0.2];
const CELL_PADDING: f32 = 12.0;
const CARD_GAP: f32 = 12.0;
const SKELETON_ROWS: usize = 8;

fn column_rects(row: egui::Rect) -> [egui::Rect; 4] {
    let mut x = row.min.x;
    COLUMN_FRACTIONS.map(|fraction| {
        let w = row.width() * fraction;
        let rect = egui::Rect::from_min_max(egui::pos2(x, row.min.y), egui::pos2(x + w, row.max.y));
        x += w;
        rect
    })
}

fn cell_text(painter: &egui::Painter, cell: egui::Rect, text: &str, size: f32, color: egui::Color32) {
    painter.with_clip_rect(cell.shrink2(egui::vec2(CELL_PADDING / 2.0, 0.0))).text(
        egui::pos2(cell.min.x + CELL_PADDING, cell.center().y),
        egui::Align2::LEFT_CENTER,
        text,
        egui::FontId::proportional(size),
        color,
    );
}

fn badge_rect(cell: egui::Rect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(cell.min.x + CELL_PADDING, cell.center().y - theme::BADGE_HEIGHT / 2.0),
        egui::vec2(
            theme::BADGE_WIDTH.min(cell.width() - CELL_PADDING),
            theme::BADGE_HEIGHT,
        ),
    )
}

// ============================================================================
// TABLE
// ============================================================================

/// Paints the column header. Returns the new sort if the Price header was clicked.
fn table_header(ui: &mut egui::Ui, sort: Sort) -> Option<Sort> {
    let (rect, _) = ui.allocate_exact_size(
        egui::vec2(ui.available_width(), theme::HEADER_HEIGHT),
        egui::Sense::hover(),
    );
    ui.painter().rect_filled(rect, theme::RADIUS_DEFAULT, theme::BG_ELEVATED);

    let [name, category, price, stock] = column_rects(rect);
    let painter = ui.painter().clone();
    cell_text(&painter, name, "NAME", theme::FONT_SECTION, theme::TEXT_MUTED);
    cell_text(&painter, category, "CATEGORY", theme::FONT_SECTION, theme::TEXT_MUTED);
    cell_text(&painter, stock, "STOCK", theme::FONT_SECTION, theme::TEXT_MUTED);

    let price_resp = ui
        .interact(price, ui.id().with("price_header"), egui::Sense::click())
        .on_hover_text("Sort by price");
    let (arrow, color) = match sort {
        Sort::None => (icons::ARROWS_DOWN_UP, theme::TEXT_MUTED),
        Sort::Price(SortOrder::Asc) => (icons::CARET_UP, theme::ACCENT),
        Sort::Price(SortOrder::Desc) => (icons::CARET_DOWN, theme::ACCENT),
    };
    let color = if price_resp.hovered() { theme::TEXT_PRIMARY } else { color };
    cell_text(&painter, price, &format!("PRICE {}", arrow), theme::FONT_SECTION, color);

    price_resp.clicked().then(|| sort.cycled())
}

fn paint_table_row(ui: &egui::Ui, rect: egui::Rect, product: &Product) {
    let painter = ui.painter();
    if ui.rect_contains_pointer(rect) {
        painter.rect_filled(rect, 0.0, theme::BG_HOVER);
    }
    painter.hline(
        rect.x_range(),
        rect.max.y - 0.5,
        egui::Stroke::new(theme::STROKE_DEFAULT, theme::BORDER_SUBTLE),
    );

    let [name, category, price, stock] = column_rects(rect);
    cell_text(painter, name, &product.name, theme::FONT_BODY, theme::TEXT_PRIMARY);
    paint_badge(
        painter,
        badge_rect(category),
        &product.category,
        theme::category_colors(&product.category),
    );
    cell_text(
        painter,
        price,
        &format!("${}", format_price(product.price)),
        theme::FONT_BODY,
        theme::TEXT_SECONDARY,
    );
    paint_badge(
        painter,
        badge_rect(stock),
        stock_label(product.in_stock),
        theme::stock_colors(product.in_stock),
    );
}

fn product_table(
    ui: &mut egui::Ui,
    rows: &mut Virtualizer,
    products: &[Product],
    indices: &[usize],
    scroll_to_top: bool,
) {
    rows.set_count(indices.len());

    let mut area = egui::ScrollArea::vertical()
        .id_salt("product_table")
        .auto_shrink([false, false]);
    if scroll_to_top {
        area = area.vertical_scroll_offset(0.0);
    }

    area.show_viewport(ui, |ui, viewport| {
        let width = ui.available_width();
        ui.set_height(rows.total_extent());
        let origin = ui.max_rect().min;

        let window = rows.compute(viewport.min.y, Some(viewport.height()));
        for item in &window.items {
            let rect = egui::Rect::from_min_size(
                origin + egui::vec2(0.0, item.start),
                egui::vec2(width, item.size),
            );
            paint_table_row(ui, rect, &products[indices[item.index]]);
        }
    });
}

// ============================================================================
// CARD GRID
// ============================================================================

fn paint_card(ui: &egui::Ui, rect: egui::Rect, product: &Product) {
    let painter = ui.painter();
    let hovered = ui.rect_contains_pointer(rect);
    painter.rect_filled(
        rect,
        theme::RADIUS_LARGE,
        if hovered { theme::BG_HOVER } else { theme::BG_ELEVATED },
    );
    painter.rect_stroke(
        rect,
        theme::RADIUS_LARGE,
        egui::Stroke::new(
            theme::STROKE_DEFAULT,
            if hovered { theme::BORDER_DEFAULT } else { theme::BORDER_SUBTLE },
        ),
        egui::StrokeKind::Inside,
    );

    let inner = rect.shrink(theme::SPACING_LG);
    let line = |i: f32, h: f32| {
        egui::Rect::from_min_size(
            egui::pos2(inner.min.x - CELL_PADDING, inner.min.y + i),
            egui::vec2(inner.width() + CELL_PADDING, h),
        )
    };
    cell_text(painter, line(0.0, 20.0), &product.name, theme::FONT_BODY, theme::TEXT_PRIMARY);
    cell_text(
        painter,
        line(24.0, 20.0),
        &format!("${}", format_price(product.price)),
        theme::FONT_TITLE,
        theme::ACCENT,
    );

    let badges_y = inner.max.y - theme::BADGE_HEIGHT;
    let category_rect = egui::Rect::from_min_size(
        egui::pos2(inner.min.x, badges_y),
        egui::vec2(theme::BADGE_WIDTH.min(inner.width() / 2.0 - 4.0), theme::BADGE_HEIGHT),
    );
    let stock_rect = egui::Rect::from_min_size(
        egui::pos2(category_rect.max.x + theme::SPACING_MD, badges_y),
        egui::vec2(theme::BADGE_WIDTH.min(inner.width() / 2.0 - 4.0), theme::BADGE_HEIGHT),
    );
    paint_badge(
        painter,
        category_rect,
        &product.category,
        theme::category_colors(&product.category),
    );
    paint_badge(
        painter,
        stock_rect,
        stock_label(product.in_stock),
        theme::stock_colors(product.in_stock),
    );
}

/// Columns that fit `width`, never fewer than two
pub(crate) fn grid_columns(width: f32, card_width: f32) -> usize {
    let card_width = card_width.max(1.0);
    (((width + CARD_GAP) / (card_width + CARD_GAP)).floor() as usize).max(2)
}

fn product_grid(
    ui: &mut egui::Ui,
    rows: &mut Virtualizer,
    columns: usize,
    products: &[Product],
    indices: &[usize],
    scroll_to_top: bool,
) {
    rows.set_count(indices.len().div_ceil(columns));

    let mut area = egui::ScrollArea::vertical()
        .id_salt("product_grid")
        .auto_shrink([false, false]);
    if scroll_to_top {
        area = area.vertical_scroll_offset(0.0);
    }

    area.show_viewport(ui, |ui, viewport| {
        let width = ui.available_width();
        let card_w = (width - CARD_GAP * (columns - 1) as f32) / columns as f32;
        ui.set_height(rows.total_extent());
        let origin = ui.max_rect().min;

        let window = rows.compute(viewport.min.y, Some(viewport.height()));
        for item in &window.items {
            let first = item.index * columns;
            let last = (first + columns).min(indices.len());
            for (col, &product_idx) in indices[first..last].iter().enumerate() {
                let rect = egui::Rect::from_min_size(
                    origin + egui::vec2(col as f32 * (card_w + CARD_GAP), item.start),
                    egui::vec2(card_w, (item.size - CARD_GAP).max(0.0)),
                );
                paint_card(ui, rect, &products[product_idx]);
            }
        }
    });
}

// ============================================================================
// MAIN AREA
// ============================================================================

impl App {
    fn use_table(&self, ctx: &egui::Context) -> bool {
        match self.settings.view_mode {
            ViewMode::Table => true,
            ViewMode::Cards => false,
            ViewMode::Auto => ctx.screen_rect().width() >= NARROW_LAYOUT_BREAKPOINT,
        }
    }

    pub(crate) fn render_main(&mut self, ui: &mut egui::Ui) {
        if let Some(snapshot) = self.loader.snapshot() {
            self.cache.get_or_compute(
                snapshot.products(),
                self.loader.data_version(),
                self.filters.state(),
                self.filters.revision(),
            );
        }

        StripBuilder::new(ui)
            .size(Size::exact(theme::HEADER_HEIGHT))
            .size(Size::remainder())
            .vertical(|mut strip| {
                strip.cell(|ui| self.render_header(ui));
                strip.cell(|ui| self.render_body(ui));
            });
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            let text = match self.loader.snapshot() {
                Some(snapshot) => format!(
                    "{} of {}",
                    self.cache.indices().len(),
                    count_label(snapshot.total(), "product")
                ),
                None => "No data".to_string(),
            };
            ui.label(
                egui::RichText::new(text)
                    .size(theme::FONT_LABEL)
                    .color(theme::TEXT_MUTED),
            );
            if self.loader.is_loading() && self.loader.snapshot().is_some() {
                ui.add(egui::Spinner::new().size(14.0).color(theme::TEXT_DIM));
            }

            if let LoadStatus::Failed(message) = self.loader.status() {
                let message = message.clone();
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .add(theme::button_accent(format!("{} Retry", icons::ARROW_CLOCKWISE)))
                        .clicked()
                    {
                        self.loader.request();
                    }
                    ui.label(
                        egui::RichText::new(format!("{} {}", icons::WARNING, message))
                            .size(theme::FONT_LABEL)
                            .color(theme::STATUS_ERROR),
                    );
                });
            }
        });
    }

    fn render_body(&mut self, ui: &mut egui::Ui) {
        let Some(snapshot) = self.loader.snapshot().cloned() else {
            self.render_without_data(ui);
            return;
        };

        if self.cache.indices().is_empty() {
            ui.add_space(theme::SPACING_LG);
            theme::card_frame().show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new("No matching products")
                            .size(theme::FONT_BODY)
                            .color(theme::TEXT_MUTED),
                    );
                });
            });
            return;
        }

        let scroll_to_top = std::mem::take(&mut self.scroll_to_top);
        if self.use_table(ui.ctx()) {
            let sort = self.filters.state().sort;
            if let Some(next) = table_header(ui, sort) {
                self.filters.set_sort(next.field(), next.order());
            }
            product_table(
                ui,
                &mut self.table_rows,
                snapshot.products(),
                self.cache.indices(),
                scroll_to_top,
            );
        } else {
            self.card_columns = grid_columns(ui.available_width(), self.settings.card_width);
            product_grid(
                ui,
                &mut self.card_rows,
                self.card_columns,
                snapshot.products(),
                self.cache.indices(),
                scroll_to_top,
            );
        }
    }

    /// Skeleton while the first fetch runs, error panel if it failed
    fn render_without_data(&mut self, ui: &mut egui::Ui) {
        match self.loader.status() {
            LoadStatus::Failed(message) => {
                let message = message.clone();
                ui.add_space(theme::SPACING_LG);
                theme::section_frame()
                    .stroke(egui::Stroke::new(theme::STROKE_DEFAULT, theme::STATUS_ERROR))
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.label(
                            egui::RichText::new("Could not load products")
                                .size(theme::FONT_BODY)
                                .color(theme::STATUS_ERROR),
                        );
                        ui.label(
                            egui::RichText::new(message)
                                .size(theme::FONT_LABEL)
                                .color(theme::TEXT_MUTED),
                        );
                        ui.add_space(theme::SPACING_MD);
                        if ui.add(theme::button_accent("Retry")).clicked() {
                            self.loader.request();
                        }
                    });
            }
            _ => {
                let width = ui.available_width();
                let height = self.settings.row_height() - theme::SPACING_SM;
                for _ in 0..SKELETON_ROWS {
                    skeleton(ui, egui::vec2(width, height));
                }
            }
        }
    }
}
