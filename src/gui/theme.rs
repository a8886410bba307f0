use eframe::egui::{
    self,
    Color32,
};

use crate::core::{
    BoardError,
    Zone,
};

/// Board palette. Zone colors follow the usual gym convention: cool colors
/// for easy zones, hot for hard.
#[derive(Clone)]
pub struct Theme {
    pub background: Color32,
    pub card_fill: Color32,
    pub card_faded: Color32,
    pub text_primary: Color32,
    pub text_dim: Color32,
    pub accent: Color32,
    zones: [Color32; 5],
}

impl Theme {
    pub fn night() -> Self {
        Theme {
            background: Color32::from_rgb(12, 14, 22),
            card_fill: Color32::from_rgb(24, 27, 38),
            card_faded: Color32::from_rgb(18, 20, 29),
            text_primary: Color32::from_rgb(235, 238, 245),
            text_dim: Color32::from_rgb(140, 148, 166),
            accent: Color32::from_rgb(122, 162, 247),
            zones: [
                Color32::from_rgb(122, 140, 163), // Z1
                Color32::from_rgb(59, 130, 246),  // Z2
                Color32::from_rgb(22, 163, 74),   // Z3
                Color32::from_rgb(234, 179, 8),   // Z4
                Color32::from_rgb(220, 38, 38),   // Z5
            ],
        }
    }

    pub fn zone(&self, zone: Zone) -> Color32 {
        match zone {
            Zone::Z1 => self.zones[0],
            Zone::Z2 => self.zones[1],
            Zone::Z3 => self.zones[2],
            Zone::Z4 => self.zones[3],
            Zone::Z5 => self.zones[4],
        }
    }

    pub fn apply(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.background;
        visuals.window_fill = self.background;
        visuals.override_text_color = Some(self.text_primary);
        ctx.set_visuals(visuals);
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::night()
    }
}

/// Parses "#rrggbb" (as the session endpoint sends for phase colors).
pub fn parse_hex_color(literal: &str) -> Result<Color32, BoardError> {
    let hex = literal.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return Err(BoardError::InvalidColor(literal.to_string()));
    }
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| BoardError::InvalidColor(literal.to_string()))?;
    Ok(Color32::from_rgb((value >> 16) as u8, (value >> 8) as u8, value as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_phase_colors() {
        assert_eq!(parse_hex_color("#16a34a").unwrap(), Color32::from_rgb(0x16, 0xa3, 0x4a));
        assert_eq!(parse_hex_color("eab308").unwrap(), Color32::from_rgb(0xea, 0xb3, 0x08));
        assert!(parse_hex_color("#xyz").is_err());
        assert!(parse_hex_color("").is_err());
    }
}
