//! Live screen: lays the roster's cards out on the adaptive grid and paints
//! each one. Geometry and scales are recomputed every frame from the card
//! count and the measured container, which also coalesces resize handling
//! to one layout pass per frame.

use eframe::egui::{
    self,
    Rect,
};

use crate::{
    gui::{
        cards::{
            draw_live_card,
            EguiCardSurface,
        },
        theme::Theme,
    },
    layout::{
        scales_for,
        GridGeometry,
    },
    roster::RosterReconciler,
};

pub fn show(
    ui: &mut egui::Ui,
    theme: &Theme,
    roster: &RosterReconciler<EguiCardSurface>,
    gap: f32,
) {
    let container = ui.available_rect_before_wrap();
    let count = roster.len();
    let geometry =
        GridGeometry::for_count(count, container.width(), container.height(), gap);
    let scales =
        scales_for(container.width(), container.height(), gap, geometry.columns, geometry.rows, count);

    if count == 0 {
        ui.painter().text(
            container.center(),
            egui::Align2::CENTER_CENTER,
            "Waiting for devices...",
            egui::FontId::proportional(28.0),
            theme.text_dim,
        );
        return;
    }

    for (index, (_, card)) in roster.ordered().into_iter().enumerate() {
        let cell = cell_rect(container, &geometry, gap, index);
        draw_live_card(ui, cell, &card.widget, theme, &scales);
    }
}

/// Cell rect for a card index: row-major placement, equal fractional
/// column widths, the reconciled card height.
pub fn cell_rect(container: Rect, geometry: &GridGeometry, gap: f32, index: usize) -> Rect {
    let columns = geometry.columns.max(1) as usize;
    let column = (index % columns) as f32;
    let row = (index / columns) as f32;

    let card_w =
        (container.width() - (geometry.columns.saturating_sub(1)) as f32 * gap) / columns as f32;
    let min = egui::pos2(
        container.left() + column * (card_w + gap),
        container.top() + row * (geometry.card_height_px + gap),
    );
    Rect::from_min_size(min, egui::vec2(card_w, geometry.card_height_px))
}
