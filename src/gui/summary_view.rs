//! Summary screen: one aggregate card per device of the finished run, with
//! the bucketed zone timeline painted as a relief bar.

use eframe::egui::{
    self,
    Align2,
    FontId,
    Rect,
    StrokeKind,
};

use crate::{
    core::models::{
        DeviceAggregate,
        SummarySession,
    },
    gui::{
        cards::EguiMeasurer,
        live_view::cell_rect,
        theme::Theme,
    },
    layout::{
        fit_label,
        label_band_center,
        scales_for,
        GridGeometry,
        ScaleSet,
    },
};

pub fn show(ui: &mut egui::Ui, theme: &Theme, session: &SummarySession, gap: f32) {
    let container = ui.available_rect_before_wrap();
    let count = session.devices.len();
    let geometry =
        GridGeometry::for_count(count, container.width(), container.height(), gap);
    let scales =
        scales_for(container.width(), container.height(), gap, geometry.columns, geometry.rows, count);

    for (index, device) in session.devices.iter().enumerate().take(geometry.capacity()) {
        let cell = cell_rect(container, &geometry, gap, index);
        draw_summary_card(ui, cell, device, theme, &scales);
    }
}

fn draw_summary_card(
    ui: &egui::Ui,
    rect: Rect,
    device: &DeviceAggregate,
    theme: &Theme,
    scales: &ScaleSet,
) {
    let painter = ui.painter();
    painter.rect_filled(rect, 10.0, theme.card_fill);
    painter.rect_stroke(
        rect,
        10.0,
        egui::Stroke::new(1.0, theme.text_dim.gamma_multiply(0.4)),
        StrokeKind::Inside,
    );

    // average intensity is the headline figure
    let pct_font = 48.0 * scales.text;
    let pct_center_y = rect.top() + rect.height() * 0.44;
    let pct_top = pct_center_y - pct_font * 0.5 - rect.top();
    painter.text(
        egui::pos2(rect.center().x, pct_center_y),
        Align2::CENTER_CENTER,
        format!("{:.0}%", device.metrics.pct_avg),
        FontId::proportional(pct_font),
        theme.accent,
    );

    let name = device.display_name();
    let measurer = EguiMeasurer { ctx: ui.ctx() };
    let name_max = (26.0 * scales.text * scales.header).round().max(10.0) as u32;
    let name_px = fit_label(&measurer, &name, rect.width() - 16.0, name_max);
    let name_y = rect.top() + label_band_center(6.0 * scales.text, Some(pct_top), rect.height());
    painter.text(
        egui::pos2(rect.center().x, name_y),
        Align2::CENTER_CENTER,
        name,
        FontId::proportional(name_px as f32),
        theme.text_primary,
    );

    painter.text(
        egui::pos2(rect.center().x, pct_center_y + pct_font * 0.62),
        Align2::CENTER_CENTER,
        format!("{:.0} kcal   {:.0} pts", device.metrics.kcal, device.metrics.points),
        FontId::proportional(16.0 * scales.text * scales.metric),
        theme.text_dim,
    );

    draw_timeline(painter, rect, device, theme);
}

/// Zone relief: each bucket is a column, colored by its dominant zone and
/// sized by its average intensity.
fn draw_timeline(painter: &egui::Painter, rect: Rect, device: &DeviceAggregate, theme: &Theme) {
    if device.timeline.is_empty() {
        return;
    }

    let band = Rect::from_min_max(
        egui::pos2(rect.left() + 10.0, rect.bottom() - 10.0 - rect.height() * 0.20),
        egui::pos2(rect.right() - 10.0, rect.bottom() - 10.0),
    );
    let column_w = band.width() / device.timeline.len() as f32;

    for (i, bucket) in device.timeline.iter().enumerate() {
        let height = (bucket.frac.clamp(0.0, 1.0) as f32 * band.height()).max(1.5);
        let column = Rect::from_min_max(
            egui::pos2(band.left() + i as f32 * column_w, band.bottom() - height),
            egui::pos2(band.left() + (i + 1) as f32 * column_w, band.bottom()),
        );
        painter.rect_filled(column.shrink2(egui::vec2(0.5, 0.0)), 0.0, theme.zone(bucket.zone_mode));
    }
}
