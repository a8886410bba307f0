/// Smallest font the fitter will ever return.
pub const MIN_FONT_PX: u32 = 10;

/// Labels may use at most this fraction of their container's width.
const FIT_MARGIN: f32 = 0.92;

/// Enough iterations to resolve any realistic size range to a single pixel.
const SEARCH_ITERATIONS: u32 = 16;

/// Width measurement seam. The gui adapter backs this with egui's font
/// galleys; tests use fabricated monotone widths.
pub trait TextMeasurer {
    fn text_width(&self, text: &str, font_px: f32) -> f32;
}

/// Largest integer font size `<= max_px` at which `label` fits the
/// container with the safety margin. A label that already fits at `max_px`
/// comes back untouched, and an unusable container width is a no-op.
///
/// Rendered width is non-decreasing in font size, so a bounded binary
/// search converges; the lower bound after the last iteration is the answer.
pub fn fit_label(
    measurer: &impl TextMeasurer,
    label: &str,
    container_w: f32,
    max_px: u32,
) -> u32 {
    if container_w <= 0.0 {
        return max_px;
    }

    let limit = container_w * FIT_MARGIN;
    if measurer.text_width(label, max_px as f32) <= limit {
        return max_px;
    }

    let mut lo = MIN_FONT_PX;
    let mut hi = max_px.max(MIN_FONT_PX);
    for _ in 0..SEARCH_ITERATIONS {
        let mid = (lo + hi + 1) / 2;
        if measurer.text_width(label, mid as f32) <= limit {
            lo = mid;
        } else {
            hi = mid.saturating_sub(1);
        }
        if hi <= lo {
            break;
        }
    }
    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Width = chars * font_px * factor, the usual proportional-font shape.
    struct FlatMeasurer {
        per_char: f32,
    }

    impl TextMeasurer for FlatMeasurer {
        fn text_width(&self, text: &str, font_px: f32) -> f32 {
            text.chars().count() as f32 * font_px * self.per_char
        }
    }

    const M: FlatMeasurer = FlatMeasurer { per_char: 0.6 };

    #[test]
    fn label_that_fits_keeps_max_size() {
        // 5 chars * 40px * 0.6 = 120 <= 500 * 0.92
        assert_eq!(fit_label(&M, "MARTA", 500.0, 40), 40);
    }

    #[test]
    fn shrinks_to_largest_fitting_size() {
        let label = "FRANCISCO JAVIER";
        let fitted = fit_label(&M, label, 300.0, 48);
        assert!(fitted < 48);
        assert!(M.text_width(label, fitted as f32) <= 300.0 * 0.92);
        // one more pixel would overflow
        assert!(M.text_width(label, (fitted + 1) as f32) > 300.0 * 0.92);
    }

    #[test]
    fn floors_at_min_font() {
        let label = "A VERY LONG NICKNAME THAT CANNOT POSSIBLY FIT ANYWHERE";
        assert_eq!(fit_label(&M, label, 40.0, 48), MIN_FONT_PX);
    }

    #[test]
    fn shorter_label_never_gets_smaller_font() {
        let long = fit_label(&M, "ALEJANDRO", 200.0, 48);
        let short = fit_label(&M, "ANA", 200.0, 48);
        assert!(short >= long);
    }

    #[test]
    fn degenerate_container_is_a_no_op() {
        assert_eq!(fit_label(&M, "MARTA", 0.0, 40), 40);
        assert_eq!(fit_label(&M, "MARTA", -15.0, 40), 40);
    }
}
