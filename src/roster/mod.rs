//! Live roster reconciliation: converges the set of on-screen cards to the
//! incoming device list without ever rebuilding the surface, and walks
//! absent devices through a timed fade before removal.

use std::collections::{
    HashMap,
    HashSet,
};

use crate::{
    core::models::DeviceSample,
    layout::GridGeometry,
};

pub const DEFAULT_FADE_MS: u64 = 60_000;

/// Secondary fade cue: cards shrink by at most this fraction.
const FADE_MAX_SHRINK: f32 = 0.02;

/// Card-widget factory/updater seam. Creation and update are idempotent;
/// update-in-place is cheaper than recreate. `destroy` is called exactly
/// once per widget, when its card leaves the roster.
pub trait CardSurface {
    type Widget;

    fn create(&mut self, sample: &DeviceSample) -> Self::Widget;
    /// Refresh displayed fields; when `session_active`, also refresh the
    /// per-card supplementary visualization.
    fn update(&mut self, widget: &mut Self::Widget, sample: &DeviceSample, session_active: bool);
    fn set_fade(&mut self, widget: &mut Self::Widget, opacity: f32, shrink: f32);
    fn clear_fade(&mut self, widget: &mut Self::Widget);
    fn destroy(&mut self, widget: Self::Widget);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    Active,
    FadingSince(u64),
}

pub struct Card<W> {
    pub widget: W,
    pub fade: FadeState,
}

pub struct RosterReconciler<S: CardSurface> {
    cards: HashMap<String, Card<S::Widget>>,
    fade_ms: u64,
    max_cards: usize,
    overflow_noted: bool,
}

impl<S: CardSurface> RosterReconciler<S> {
    pub fn new(fade_ms: u64, max_cards: usize) -> Self {
        Self {
            cards: HashMap::new(),
            fade_ms: fade_ms.max(1),
            max_cards: max_cards.max(1),
            overflow_noted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.contains_key(id)
    }

    pub fn card(&self, id: &str) -> Option<&Card<S::Widget>> {
        self.cards.get(id)
    }

    /// Cards in a stable display order.
    pub fn ordered(&self) -> Vec<(&str, &Card<S::Widget>)> {
        let mut out: Vec<_> = self.cards.iter().map(|(id, c)| (id.as_str(), c)).collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// One reconciliation pass against a batch. Returns the grid geometry
    /// for the surviving card count; the caller applies it to the surface.
    /// Never re-entrant: batches are processed one at a time, in order.
    pub fn reconcile(
        &mut self,
        surface: &mut S,
        batch: &[DeviceSample],
        session_active: bool,
        now_ms: u64,
        container_w: f32,
        container_h: f32,
        gap: f32,
    ) -> GridGeometry {
        for sample in batch {
            match self.cards.get_mut(&sample.id) {
                Some(card) => {
                    surface.update(&mut card.widget, sample, session_active);
                    if card.fade != FadeState::Active {
                        card.fade = FadeState::Active;
                        surface.clear_fade(&mut card.widget);
                    }
                }
                None => {
                    if self.cards.len() >= self.max_cards {
                        if !self.overflow_noted {
                            eprintln!(
                                "Roster full ({} cards), ignoring additional devices",
                                self.max_cards
                            );
                            self.overflow_noted = true;
                        }
                        continue;
                    }
                    let mut widget = surface.create(sample);
                    surface.update(&mut widget, sample, session_active);
                    self.cards
                        .insert(sample.id.clone(), Card { widget, fade: FadeState::Active });
                }
            }
        }
        if self.cards.len() < self.max_cards {
            self.overflow_noted = false;
        }

        let incoming: HashSet<&str> = batch.iter().map(|s| s.id.as_str()).collect();
        let mut expired: Vec<String> = Vec::new();
        for (id, card) in self.cards.iter_mut() {
            if incoming.contains(id.as_str()) {
                continue;
            }
            match card.fade {
                FadeState::Active => card.fade = FadeState::FadingSince(now_ms),
                FadeState::FadingSince(since) => {
                    let elapsed = now_ms.saturating_sub(since);
                    if elapsed >= self.fade_ms {
                        expired.push(id.clone());
                    } else {
                        // purely presentational, recomputed from elapsed time
                        let progress = elapsed as f32 / self.fade_ms as f32;
                        surface.set_fade(
                            &mut card.widget,
                            1.0 - progress,
                            1.0 - FADE_MAX_SHRINK * progress,
                        );
                    }
                }
            }
        }

        for id in expired {
            if let Some(card) = self.cards.remove(&id) {
                surface.destroy(card.widget);
            }
        }

        GridGeometry::for_count(self.cards.len(), container_w, container_h, gap)
    }

    /// Tears down every card, e.g. when leaving the live screen for good.
    pub fn clear(&mut self, surface: &mut S) {
        for (_, card) in self.cards.drain() {
            surface.destroy(card.widget);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        SampleMetrics,
        Zone,
    };

    #[derive(Debug, Default)]
    struct TestWidget {
        id: String,
        updates: u32,
        active_updates: u32,
        opacity: f32,
        shrink: f32,
        fade_clears: u32,
    }

    #[derive(Default)]
    struct RecordingSurface {
        created: Vec<String>,
        destroyed: Vec<String>,
    }

    impl CardSurface for RecordingSurface {
        type Widget = TestWidget;

        fn create(&mut self, sample: &DeviceSample) -> TestWidget {
            self.created.push(sample.id.clone());
            TestWidget { id: sample.id.clone(), opacity: 1.0, shrink: 1.0, ..Default::default() }
        }

        fn update(&mut self, widget: &mut TestWidget, _sample: &DeviceSample, active: bool) {
            widget.updates += 1;
            if active {
                widget.active_updates += 1;
            }
        }

        fn set_fade(&mut self, widget: &mut TestWidget, opacity: f32, shrink: f32) {
            widget.opacity = opacity;
            widget.shrink = shrink;
        }

        fn clear_fade(&mut self, widget: &mut TestWidget) {
            widget.opacity = 1.0;
            widget.shrink = 1.0;
            widget.fade_clears += 1;
        }

        fn destroy(&mut self, widget: TestWidget) {
            self.destroyed.push(widget.id);
        }
    }

    fn sample(id: &str) -> DeviceSample {
        DeviceSample {
            id: id.to_string(),
            heart_rate: Some(150),
            display_name: None,
            metrics: SampleMetrics {
                zone: Zone::Z3,
                kcal: Some(10.0),
                points: Some(1.0),
                hr_max: Some(190),
            },
        }
    }

    fn reconcile(
        roster: &mut RosterReconciler<RecordingSurface>,
        surface: &mut RecordingSurface,
        ids: &[&str],
        now_ms: u64,
    ) -> GridGeometry {
        let batch: Vec<_> = ids.iter().map(|id| sample(id)).collect();
        roster.reconcile(surface, &batch, true, now_ms, 1920.0, 1080.0, 10.0)
    }

    #[test]
    fn creates_then_updates_in_place() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        reconcile(&mut roster, &mut surface, &["d1", "d2"], 0);
        reconcile(&mut roster, &mut surface, &["d1", "d2"], 1_000);

        assert_eq!(surface.created, vec!["d1", "d2"]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.card("d1").unwrap().widget.updates, 2);
        assert!(surface.destroyed.is_empty());
    }

    #[test]
    fn stable_batch_is_idempotent() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        for pass in 0..5 {
            reconcile(&mut roster, &mut surface, &["d1"], pass * 700);
            assert_eq!(roster.card("d1").unwrap().fade, FadeState::Active);
        }
        assert_eq!(surface.created.len(), 1);
        assert_eq!(roster.card("d1").unwrap().widget.fade_clears, 0);
    }

    #[test]
    fn absence_starts_fade_and_reappearance_restores() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        reconcile(&mut roster, &mut surface, &["d1"], 0);
        reconcile(&mut roster, &mut surface, &[], 1_000);
        assert_eq!(roster.card("d1").unwrap().fade, FadeState::FadingSince(1_000));

        // partially faded
        reconcile(&mut roster, &mut surface, &[], 31_000);
        let widget = &roster.card("d1").unwrap().widget;
        assert!((widget.opacity - 0.5).abs() < 1e-3);
        assert!(widget.shrink < 1.0 && widget.shrink >= 0.98);

        // back just before expiry: restored, never destroyed
        reconcile(&mut roster, &mut surface, &["d1"], 59_999);
        let card = roster.card("d1").unwrap();
        assert_eq!(card.fade, FadeState::Active);
        assert_eq!(card.widget.opacity, 1.0);
        assert_eq!(card.widget.fade_clears, 1);
        assert!(surface.destroyed.is_empty());
    }

    #[test]
    fn sustained_absence_destroys_exactly_once() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        reconcile(&mut roster, &mut surface, &["d1"], 0);
        // many intervening passes; removal depends on wall-clock, not count
        for t in [500, 5_000, 20_000, 43_000, 59_999] {
            reconcile(&mut roster, &mut surface, &[], t);
            assert_eq!(roster.len(), 1);
        }
        reconcile(&mut roster, &mut surface, &[], 60_500);
        assert_eq!(roster.len(), 0);
        assert_eq!(surface.destroyed, vec!["d1"]);

        reconcile(&mut roster, &mut surface, &[], 61_500);
        assert_eq!(surface.destroyed.len(), 1);
    }

    #[test]
    fn end_to_end_single_device_lifecycle() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        reconcile(&mut roster, &mut surface, &["d1"], 0);
        reconcile(&mut roster, &mut surface, &["d1"], 1_000);
        reconcile(&mut roster, &mut surface, &["d1"], 2_000);
        reconcile(&mut roster, &mut surface, &[], 3_000);
        let geometry = reconcile(&mut roster, &mut surface, &[], 3_000 + 60_000);

        assert_eq!(roster.len(), 0);
        assert_eq!(surface.destroyed, vec!["d1"]);
        assert_eq!((geometry.columns, geometry.rows), (1, 1));
    }

    #[test]
    fn geometry_tracks_survivor_count() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 16);

        let geometry = reconcile(&mut roster, &mut surface, &["a", "b", "c", "d", "e"], 0);
        assert_eq!((geometry.columns, geometry.rows), (3, 2));
        assert!((geometry.card_height_px - (1080.0 - 10.0) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn roster_caps_at_max_cards() {
        let mut surface = RecordingSurface::default();
        let mut roster = RosterReconciler::new(60_000, 2);

        reconcile(&mut roster, &mut surface, &["a", "b", "c"], 0);
        assert_eq!(roster.len(), 2);
        assert!(!roster.contains("c"));
    }
}
