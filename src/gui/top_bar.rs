use chrono::Local;
use eframe::egui::{
    self,
    Align2,
    Color32,
    FontId,
    RichText,
};

use crate::{
    core::SessionStatus,
    gui::theme::{
        parse_hex_color,
        Theme,
    },
};

pub const TOP_BAR_HEIGHT: f32 = 44.0;

pub struct TopBar;

impl TopBar {
    pub fn show(ctx: &egui::Context, theme: &Theme, status: Option<&SessionStatus>) {
        egui::TopBottomPanel::top("top_bar").exact_height(TOP_BAR_HEIGHT).show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                let clock = Local::now().format("%H:%M:%S").to_string();
                ui.label(
                    RichText::new(clock).font(FontId::monospace(26.0)).color(theme.text_primary),
                );

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    match status {
                        Some(s) if s.active => Self::phase_chip(ui, theme, s),
                        Some(s) if s.show_countdown => Self::countdown_chip(ui, theme, s),
                        _ => {
                            ui.label(RichText::new("WAITING").color(theme.text_dim).size(18.0));
                        }
                    }
                });
            });
        });
    }

    fn phase_chip(ui: &mut egui::Ui, theme: &Theme, status: &SessionStatus) {
        let color = status
            .phase_color
            .as_deref()
            .and_then(|c| parse_hex_color(c).ok())
            .unwrap_or(theme.accent);
        let key = status.phase_key.as_deref().unwrap_or("SESSION");
        let remaining = status.phase_remaining_s.unwrap_or(0);
        let label = format!("{}  {}", key, format_mmss(remaining));

        chip(ui, &label, color, theme.text_primary);

        if status.paused {
            ui.add_space(8.0);
            ui.label(RichText::new("PAUSED").color(theme.text_dim).size(16.0));
        }
    }

    fn countdown_chip(ui: &mut egui::Ui, theme: &Theme, status: &SessionStatus) {
        let remaining = status.countdown_s.unwrap_or(0);
        let label = format!("STARTS IN {}", format_mmss(remaining));
        chip(ui, &label, theme.accent, theme.background);
    }
}

fn chip(ui: &mut egui::Ui, label: &str, fill: Color32, text: Color32) {
    let font = FontId::proportional(20.0);
    let width = ui.fonts(|fonts| {
        fonts.layout_no_wrap(label.to_string(), font.clone(), text).size().x
    });
    let (rect, _) =
        ui.allocate_exact_size(egui::vec2(width + 24.0, 32.0), egui::Sense::hover());
    ui.painter().rect_filled(rect, 8.0, fill);
    ui.painter().text(rect.center(), Align2::CENTER_CENTER, label, font, text);
}

pub fn format_mmss(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::format_mmss;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(65), "01:05");
        assert_eq!(format_mmss(600), "10:00");
        assert_eq!(format_mmss(-3), "00:00");
    }
}
