//! Pure layout math for the card grid: geometry, derived text scales and
//! label placement. No egui types here; the gui module adapts measured
//! surface dimensions in and applies the results out.

mod text_fit;

pub use text_fit::{
    fit_label,
    TextMeasurer,
    MIN_FONT_PX,
};

/// Grid shape and the per-card height that fills the container.
/// Derived on every layout pass, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    pub columns: u32,
    pub rows: u32,
    pub card_height_px: f32,
}

impl GridGeometry {
    pub fn for_count(count: usize, container_w: f32, container_h: f32, gap: f32) -> Self {
        let (columns, rows) = grid_for(count);
        let _ = container_w; // columns are sized fractionally by the grid itself
        GridGeometry { columns, rows, card_height_px: card_height_px(container_h, rows, gap) }
    }

    pub fn capacity(&self) -> usize {
        (self.columns * self.rows) as usize
    }
}

/// Fixed count -> shape table. Counts past 16 stay clipped at 4x4; the
/// roster caps how many cards exist in the first place.
pub fn grid_for(count: usize) -> (u32, u32) {
    match count {
        0 | 1 => (1, 1),
        2 => (2, 1),
        3 | 4 => (2, 2),
        5 | 6 => (3, 2),
        7 | 8 => (4, 2),
        9 => (3, 3),
        10..=12 => (4, 3),
        _ => (4, 4),
    }
}

pub fn card_height_px(container_h: f32, rows: u32, gap: f32) -> f32 {
    let rows = rows.max(1);
    ((container_h - (rows - 1) as f32 * gap) / rows as f32).max(0.0)
}

/// Style scale triple written to the presentation layer each layout pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleSet {
    pub text: f32,
    pub metric: f32,
    pub header: f32,
}

impl Default for ScaleSet {
    fn default() -> Self {
        ScaleSet { text: 1.0, metric: 1.0, header: 1.0 }
    }
}

fn min_card_dim(container_w: f32, container_h: f32, gap: f32, columns: u32, rows: u32) -> f32 {
    let columns = columns.max(1);
    let rows = rows.max(1);
    let card_w = (container_w - (columns - 1) as f32 * gap) / columns as f32;
    let card_h = (container_h - (rows - 1) as f32 * gap) / rows as f32;
    card_w.min(card_h)
}

/// The generic scale compares a card's smaller dimension against the whole
/// container treated as a single card. The metric/header exceptions are
/// hand-tuned per-count corrections; they are lookup sets, not formulas.
pub fn scales_for(
    container_w: f32,
    container_h: f32,
    gap: f32,
    columns: u32,
    rows: u32,
    count: usize,
) -> ScaleSet {
    let base = min_card_dim(container_w, container_h, gap, 1, 1);
    let text = if base <= 0.0 {
        1.0
    } else {
        (min_card_dim(container_w, container_h, gap, columns, rows) / base).clamp(0.35, 1.0)
    };

    let metric = if matches!(count, 2 | 7 | 8) { 0.75 } else { 1.0 };
    let header = if (13..=24).contains(&count) { 0.75 } else { 1.0 };

    ScaleSet { text, metric, header }
}

/// When the readout below the name is absent, the band bottom falls back to
/// a fixed fraction of the card.
pub const LABEL_BAND_FALLBACK: f32 = 0.55;

/// Vertical center, relative to the card top, of the band between the
/// header offset and the top edge of the sibling readout below it.
pub fn label_band_center(top_offset: f32, sibling_top: Option<f32>, card_height: f32) -> f32 {
    let band_bottom = sibling_top.unwrap_or(card_height * LABEL_BAND_FALLBACK).max(top_offset);
    top_offset + (band_bottom - top_offset) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_table_matches_expected_shapes() {
        assert_eq!(grid_for(0), (1, 1));
        assert_eq!(grid_for(1), (1, 1));
        assert_eq!(grid_for(2), (2, 1));
        assert_eq!(grid_for(3), (2, 2));
        assert_eq!(grid_for(4), (2, 2));
        assert_eq!(grid_for(5), (3, 2));
        assert_eq!(grid_for(6), (3, 2));
        assert_eq!(grid_for(7), (4, 2));
        assert_eq!(grid_for(8), (4, 2));
        assert_eq!(grid_for(9), (3, 3));
        assert_eq!(grid_for(10), (4, 3));
        assert_eq!(grid_for(12), (4, 3));
        assert_eq!(grid_for(13), (4, 4));
        assert_eq!(grid_for(16), (4, 4));
        assert_eq!(grid_for(40), (4, 4));
    }

    #[test]
    fn grid_capacity_covers_count_up_to_sixteen() {
        for n in 1..=16 {
            let (columns, rows) = grid_for(n);
            assert!(
                (columns * rows) as usize >= n,
                "grid {}x{} cannot hold {} cards",
                columns,
                rows,
                n
            );
            // stable across repeated calls
            assert_eq!(grid_for(n), (columns, rows));
        }
    }

    #[test]
    fn card_height_fills_container_minus_gaps() {
        assert_eq!(card_height_px(1000.0, 1, 10.0), 1000.0);
        assert_eq!(card_height_px(1000.0, 2, 10.0), 495.0);
        assert_eq!(card_height_px(1000.0, 4, 10.0), 242.5);
        // degenerate container never goes negative
        assert_eq!(card_height_px(5.0, 4, 10.0), 0.0);
    }

    #[test]
    fn text_scale_stays_clamped() {
        for n in 1..=24 {
            let (columns, rows) = grid_for(n);
            let scales = scales_for(1920.0, 1080.0, 10.0, columns, rows, n);
            assert!(scales.text >= 0.35 && scales.text <= 1.0, "count {}: {:?}", n, scales);
        }
    }

    #[test]
    fn degenerate_container_gives_unit_text_scale() {
        let scales = scales_for(0.0, 0.0, 10.0, 4, 4, 16);
        assert_eq!(scales.text, 1.0);
    }

    #[test]
    fn metric_and_header_exceptions_are_exact() {
        let at = |count: usize| {
            let (columns, rows) = grid_for(count);
            scales_for(1920.0, 1080.0, 10.0, columns, rows, count)
        };

        assert_eq!(at(2).metric, 0.75);
        assert_eq!(at(7).metric, 0.75);
        assert_eq!(at(8).metric, 0.75);
        assert_eq!(at(7).header, 1.0);
        assert_eq!(at(9).metric, 1.0);
        assert_eq!(at(9).header, 1.0);
        assert_eq!(at(14).metric, 1.0);
        assert_eq!(at(14).header, 0.75);
        assert_eq!(at(13).header, 0.75);
        assert_eq!(at(24).header, 0.75);
        assert_eq!(at(25).header, 1.0);
    }

    #[test]
    fn label_band_centers_between_offset_and_sibling() {
        assert_eq!(label_band_center(12.0, Some(60.0), 200.0), 36.0);
        // fallback band when the sibling is absent
        assert_eq!(label_band_center(12.0, None, 200.0), 12.0 + (110.0 - 12.0) / 2.0);
        // sibling above the offset collapses the band instead of inverting it
        assert_eq!(label_band_center(40.0, Some(10.0), 200.0), 40.0);
    }
}
