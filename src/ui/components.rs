//! Reusable UI components
//!
//! This module contains standalone UI components that can be used
//! throughout the application.

use crate::theme;
use eframe::egui;

/// Checkbox row with a label. Returns true if toggled.
pub fn checkbox_row(ui: &mut egui::Ui, checked: bool, label: &str) -> bool {
    let full_width = ui.available_width();
    let row_height = 20.0;
    let (row_rect, row_resp) =
        ui.allocate_exact_size(egui::vec2(full_width, row_height), egui::Sense::click());
    if row_resp.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    let painter = ui.painter();
    let cb_size = theme::CHECKBOX_SIZE;
    let cb_rect = egui::Rect::from_min_size(
        egui::pos2(row_rect.min.x, row_rect.center().y - cb_size / 2.0),
        egui::vec2(cb_size, cb_size),
    );
    if checked {
        painter.rect_stroke(
            cb_rect,
            3.0,
            egui::Stroke::new(theme::STROKE_MEDIUM, theme::ACCENT),
            egui::StrokeKind::Inside,
        );
        painter.rect_filled(cb_rect.shrink(3.0), 2.0, theme::ACCENT);
    } else {
        painter.rect_stroke(
            cb_rect,
            3.0,
            egui::Stroke::new(theme::STROKE_MEDIUM, theme::BORDER_DEFAULT),
            egui::StrokeKind::Inside,
        );
    }
    painter.text(
        egui::pos2(cb_rect.max.x + 8.0, row_rect.center().y),
        egui::Align2::LEFT_CENTER,
        label,
        egui::FontId::proportional(theme::FONT_BODY),
        theme::TEXT_PRIMARY,
    );
    row_resp.clicked()
}

/// Paint a pill badge centered in `rect`
pub fn paint_badge(painter: &egui::Painter, rect: egui::Rect, text: &str, colors: (egui::Color32, egui::Color32)) {
    let (bg, fg) = colors;
    painter.rect_filled(rect, 3.0, bg);
    painter.text(
        rect.center(),
        egui::Align2::CENTER_CENTER,
        text,
        egui::FontId::proportional(theme::FONT_SMALL),
        fg,
    );
}

pub fn stock_label(in_stock: bool) -> &'static str {
    if in_stock {
        "In stock"
    } else {
        "Out of stock"
    }
}

/// Grey placeholder block shown while the first fetch is in flight
pub fn skeleton(ui: &mut egui::Ui, size: egui::Vec2) {
    let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
    if ui.is_rect_visible(rect) {
        let t = ui.input(|i| i.time) as f32;
        let pulse = 0.5 + 0.5 * (t * 3.0).sin();
        let fill = theme::lighten(theme::BG_SKELETON, 0.04 * pulse);
        ui.painter().rect_filled(rect, theme::RADIUS_DEFAULT, fill);
        ui.ctx().request_repaint();
    }
}
