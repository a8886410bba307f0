//! Live card visuals: the widget state owned by the roster, the
//! `CardSurface` implementation that creates/updates it in place, and the
//! egui-backed text measurer used by the font fitter.

use eframe::egui::{
    self,
    Align2,
    Color32,
    FontId,
    Rect,
    StrokeKind,
};

use crate::{
    core::models::DeviceSample,
    gui::theme::Theme,
    layout::{
        fit_label,
        label_band_center,
        ScaleSet,
        TextMeasurer,
    },
    roster::CardSurface,
};

/// Zone strip entries kept per card (one per reconciliation pass while the
/// session is active).
const STRIP_CAP: usize = 360;

/// Retained visual state for one device. Created once, updated in place,
/// dropped when the roster destroys the card.
#[derive(Debug, Clone)]
pub struct CardVisual {
    pub id: String,
    pub name: String,
    pub heart_rate: Option<u32>,
    pub zone: crate::core::Zone,
    pub kcal: Option<f64>,
    pub points: Option<f64>,
    pub hr_fraction: Option<f32>,
    pub opacity: f32,
    pub shrink: f32,
    pub strip: Vec<crate::core::Zone>,
}

pub struct EguiCardSurface;

impl CardSurface for EguiCardSurface {
    type Widget = CardVisual;

    fn create(&mut self, sample: &DeviceSample) -> CardVisual {
        CardVisual {
            id: sample.id.clone(),
            name: sample.display_name(),
            heart_rate: None,
            zone: crate::core::Zone::Z1,
            kcal: None,
            points: None,
            hr_fraction: None,
            opacity: 1.0,
            shrink: 1.0,
            strip: Vec::new(),
        }
    }

    fn update(&mut self, widget: &mut CardVisual, sample: &DeviceSample, session_active: bool) {
        widget.name = sample.display_name();
        widget.heart_rate = sample.heart_rate;
        widget.zone = sample.metrics.zone;
        widget.kcal = sample.metrics.kcal;
        widget.points = sample.metrics.points;
        widget.hr_fraction = sample.hr_fraction();

        if session_active {
            widget.strip.push(sample.metrics.zone);
            if widget.strip.len() > STRIP_CAP {
                let excess = widget.strip.len() - STRIP_CAP;
                widget.strip.drain(..excess);
            }
        }
    }

    fn set_fade(&mut self, widget: &mut CardVisual, opacity: f32, shrink: f32) {
        widget.opacity = opacity;
        widget.shrink = shrink;
    }

    fn clear_fade(&mut self, widget: &mut CardVisual) {
        widget.opacity = 1.0;
        widget.shrink = 1.0;
    }

    fn destroy(&mut self, _widget: CardVisual) {}
}

pub struct EguiMeasurer<'a> {
    pub ctx: &'a egui::Context,
}

impl TextMeasurer for EguiMeasurer<'_> {
    fn text_width(&self, text: &str, font_px: f32) -> f32 {
        self.ctx.fonts(|fonts| {
            fonts
                .layout_no_wrap(text.to_string(), FontId::proportional(font_px), Color32::WHITE)
                .size()
                .x
        })
    }
}

/// Paints one live card into its cell. Fade shrinks the rect slightly and
/// dims every color; both come straight from the reconciler.
pub fn draw_live_card(
    ui: &egui::Ui,
    rect: Rect,
    visual: &CardVisual,
    theme: &Theme,
    scales: &ScaleSet,
) {
    let rect = shrink_around_center(rect, visual.shrink);
    let alpha = visual.opacity.clamp(0.0, 1.0);
    let painter = ui.painter();
    let zone_color = theme.zone(visual.zone).gamma_multiply(alpha);

    painter.rect_filled(rect, 10.0, theme.card_fill.gamma_multiply(alpha));
    painter.rect_stroke(
        rect,
        10.0,
        egui::Stroke::new(2.0, zone_color),
        StrokeKind::Inside,
    );

    // big bpm readout; its top edge bounds the name band above it
    let bpm_font = 56.0 * scales.text;
    let bpm_center_y = rect.top() + rect.height() * 0.50;
    let bpm_top = bpm_center_y - bpm_font * 0.5 - rect.top();
    let bpm = match visual.heart_rate {
        Some(hr) => hr.to_string(),
        None => "--".to_string(),
    };
    painter.text(
        egui::pos2(rect.center().x, bpm_center_y),
        Align2::CENTER_CENTER,
        bpm,
        FontId::proportional(bpm_font),
        theme.text_primary.gamma_multiply(alpha),
    );

    // fitted nickname, centered in the band between header offset and bpm
    let measurer = EguiMeasurer { ctx: ui.ctx() };
    let name_max = (30.0 * scales.text * scales.header).round().max(10.0) as u32;
    let name_px = fit_label(&measurer, &visual.name, rect.width() - 16.0, name_max);
    let name_y = rect.top() + label_band_center(6.0 * scales.text, Some(bpm_top), rect.height());
    painter.text(
        egui::pos2(rect.center().x, name_y),
        Align2::CENTER_CENTER,
        &visual.name,
        FontId::proportional(name_px as f32),
        theme.text_primary.gamma_multiply(alpha),
    );

    // zone badge, top right
    let badge_font = 14.0 * scales.text.max(0.6);
    let badge = Rect::from_min_size(
        egui::pos2(rect.right() - 44.0, rect.top() + 8.0),
        egui::vec2(36.0, 22.0),
    );
    painter.rect_filled(badge, 6.0, zone_color);
    painter.text(
        badge.center(),
        Align2::CENTER_CENTER,
        visual.zone.key(),
        FontId::proportional(badge_font),
        theme.background,
    );

    // %HRmax under the bpm
    if let Some(fraction) = visual.hr_fraction {
        painter.text(
            egui::pos2(rect.center().x, bpm_center_y + bpm_font * 0.62),
            Align2::CENTER_CENTER,
            format!("{}%", (fraction * 100.0).round() as i32),
            FontId::proportional(18.0 * scales.text),
            zone_color,
        );
    }

    // metric row
    let metric_font = 17.0 * scales.text * scales.metric;
    let metrics = metric_line(visual.kcal, visual.points);
    if !metrics.is_empty() {
        painter.text(
            egui::pos2(rect.center().x, rect.bottom() - 14.0 - strip_height(visual)),
            Align2::CENTER_CENTER,
            metrics,
            FontId::proportional(metric_font),
            theme.text_dim.gamma_multiply(alpha),
        );
    }

    draw_zone_strip(painter, rect, visual, theme, alpha);
}

fn strip_height(visual: &CardVisual) -> f32 {
    if visual.strip.is_empty() {
        0.0
    } else {
        8.0
    }
}

fn draw_zone_strip(
    painter: &egui::Painter,
    rect: Rect,
    visual: &CardVisual,
    theme: &Theme,
    alpha: f32,
) {
    if visual.strip.is_empty() {
        return;
    }
    let band = Rect::from_min_max(
        egui::pos2(rect.left() + 10.0, rect.bottom() - 14.0),
        egui::pos2(rect.right() - 10.0, rect.bottom() - 6.0),
    );
    let segment_w = band.width() / visual.strip.len() as f32;
    for (i, zone) in visual.strip.iter().enumerate() {
        let segment = Rect::from_min_size(
            egui::pos2(band.left() + i as f32 * segment_w, band.top()),
            egui::vec2(segment_w.max(1.0), band.height()),
        );
        painter.rect_filled(segment, 0.0, theme.zone(*zone).gamma_multiply(alpha));
    }
}

fn metric_line(kcal: Option<f64>, points: Option<f64>) -> String {
    match (kcal, points) {
        (Some(kcal), Some(points)) => format!("{:.0} kcal   {:.0} pts", kcal, points),
        (Some(kcal), None) => format!("{:.0} kcal", kcal),
        (None, Some(points)) => format!("{:.0} pts", points),
        (None, None) => String::new(),
    }
}

fn shrink_around_center(rect: Rect, factor: f32) -> Rect {
    let factor = factor.clamp(0.5, 1.0);
    Rect::from_center_size(rect.center(), rect.size() * factor)
}
