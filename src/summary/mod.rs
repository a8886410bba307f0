//! Acquisition of one fresh aggregate snapshot after a session ends:
//! conditional polling with ETag/run-id validation, an anti-flicker minimum
//! display time for the loading placeholder, and silent background retries.
//!
//! The machine is sans-IO: `tick` and `on_outcome` take a millisecond clock
//! and emit actions; the network worker executes them and feeds results
//! back. A generation counter makes late responses from superseded cycles
//! no-ops, so at most one logical cycle is ever in flight.

use crate::core::models::SummarySession;

/// Delay between the warmup request and the first conditional fetch.
pub const SETTLE_MS: u64 = 3_000;
/// The loading placeholder stays up at least this long before a render.
pub const MIN_SHOW_MS: u64 = 5_000;
/// A polling cycle is abandoned after this much time without acceptance.
pub const MAX_WAIT_MS: u64 = 15_000;
/// Delay before a silent retry, after success, failure or timeout alike.
pub const SILENT_RETRY_MS: u64 = 5_000;
/// Re-poll delay after an unchanged or not-yet-populated snapshot.
pub const RECHECK_MS: u64 = 2_000;
/// Server retry hint fallback, seconds.
pub const DEFAULT_RETRY_S: u64 = 2;

/// Closed set of conditional-fetch results. Transport failure is data, not
/// an exception; nothing here aborts the display.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Snapshot(SummarySession),
    Pending { retry_after_s: Option<u64> },
    NotModified,
    TransportError(String),
}

/// What the driver must do next.
#[derive(Debug, Clone)]
pub enum AcqAction {
    /// Fire-and-forget request prompting the server to materialize a
    /// fresh snapshot.
    Prime,
    Fetch { validator: Option<String>, generation: u64 },
    Render(SummarySession),
}

#[derive(Debug)]
enum Phase {
    Idle,
    Priming { poll_at: u64 },
    Polling(PollCycle),
    /// Abandoned (transport error, timeout or stale run); a silent retry
    /// is pending. The placeholder, if any, stays as-is.
    Exhausted { retry_at: u64 },
    /// A snapshot is on screen; an opportunistic silent retry is pending.
    Rendered { retry_at: u64 },
}

#[derive(Debug)]
struct PollCycle {
    started: u64,
    fetch_at: u64,
    in_flight: bool,
    accepted: Option<PendingRender>,
}

#[derive(Debug)]
struct PendingRender {
    snapshot: SummarySession,
    render_at: u64,
}

enum Step {
    Wait,
    StartPoll,
    Fetch,
    Timeout,
    Commit,
}

pub struct SummaryAcquisition {
    phase: Phase,
    generation: u64,
    last_etag: Option<String>,
    last_run_id: Option<String>,
    /// Raised by `begin`, lowered on commit. Silent cycles never touch it.
    placeholder: bool,
    rendered_once: bool,
}

impl SummaryAcquisition {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            last_etag: None,
            last_run_id: None,
            placeholder: false,
            rendered_once: false,
        }
    }

    /// Starts a non-silent acquisition cycle, superseding whatever was in
    /// flight. The returned action is the warmup request; polling begins
    /// after the settle delay.
    pub fn begin(&mut self, now_ms: u64) -> AcqAction {
        self.generation += 1;
        self.placeholder = true;
        self.phase = Phase::Priming { poll_at: now_ms + SETTLE_MS };
        AcqAction::Prime
    }

    /// True while the loading placeholder should be visible. It stays up
    /// through abandoned cycles and their silent retries until a snapshot
    /// finally renders.
    pub fn placeholder_visible(&self) -> bool {
        self.placeholder
    }

    pub fn last_run_id(&self) -> Option<&str> {
        self.last_run_id.as_deref()
    }

    pub fn has_rendered(&self) -> bool {
        self.rendered_once
    }

    /// Advances timers. At most one action per call; the driver executes it
    /// and keeps ticking every frame.
    pub fn tick(&mut self, now_ms: u64) -> Option<AcqAction> {
        let step = match &mut self.phase {
            Phase::Idle => Step::Wait,
            Phase::Priming { poll_at } => {
                if now_ms >= *poll_at {
                    Step::StartPoll
                } else {
                    Step::Wait
                }
            }
            // silent retries re-enter polling without touching the placeholder
            Phase::Exhausted { retry_at } | Phase::Rendered { retry_at } => {
                if now_ms >= *retry_at {
                    Step::StartPoll
                } else {
                    Step::Wait
                }
            }
            Phase::Polling(cycle) => {
                if let Some(pending) = &cycle.accepted {
                    if now_ms >= pending.render_at {
                        Step::Commit
                    } else {
                        Step::Wait
                    }
                } else if now_ms.saturating_sub(cycle.started) >= MAX_WAIT_MS {
                    Step::Timeout
                } else if !cycle.in_flight && now_ms >= cycle.fetch_at {
                    cycle.in_flight = true;
                    Step::Fetch
                } else {
                    Step::Wait
                }
            }
        };

        match step {
            Step::Wait => None,
            Step::StartPoll => Some(self.enter_poll(now_ms)),
            Step::Fetch => Some(AcqAction::Fetch {
                validator: self.last_etag.clone(),
                generation: self.generation,
            }),
            Step::Timeout => {
                self.abandon(now_ms);
                None
            }
            Step::Commit => self.commit(now_ms),
        }
    }

    /// Feeds back the result of a previously issued fetch. Results from a
    /// superseded generation are ignored.
    pub fn on_outcome(&mut self, now_ms: u64, generation: u64, outcome: FetchOutcome) {
        if generation != self.generation {
            return;
        }
        let Phase::Polling(cycle) = &mut self.phase else {
            return;
        };
        if !cycle.in_flight || cycle.accepted.is_some() {
            return;
        }
        cycle.in_flight = false;

        match outcome {
            FetchOutcome::Snapshot(snapshot) => {
                if snapshot.devices.is_empty() {
                    // server answered but the aggregate is not populated yet
                    cycle.fetch_at = now_ms + RECHECK_MS;
                } else if snapshot.run_id.is_some() && snapshot.run_id == self.last_run_id {
                    // same run we already rendered; try again later
                    self.abandon(now_ms);
                } else {
                    let render_at = now_ms.max(cycle.started + MIN_SHOW_MS);
                    cycle.accepted = Some(PendingRender { snapshot, render_at });
                }
            }
            FetchOutcome::Pending { retry_after_s } => {
                cycle.fetch_at = now_ms + retry_after_s.unwrap_or(DEFAULT_RETRY_S) * 1_000;
            }
            FetchOutcome::NotModified => {
                cycle.fetch_at = now_ms + RECHECK_MS;
            }
            FetchOutcome::TransportError(_) => {
                self.abandon(now_ms);
            }
        }
    }

    fn enter_poll(&mut self, now_ms: u64) -> AcqAction {
        self.generation += 1;
        self.phase = Phase::Polling(PollCycle {
            started: now_ms,
            fetch_at: now_ms,
            in_flight: true,
            accepted: None,
        });
        AcqAction::Fetch { validator: self.last_etag.clone(), generation: self.generation }
    }

    fn abandon(&mut self, now_ms: u64) {
        // invalidate any response still in flight for this cycle
        self.generation += 1;
        self.phase = Phase::Exhausted { retry_at: now_ms + SILENT_RETRY_MS };
    }

    fn commit(&mut self, now_ms: u64) -> Option<AcqAction> {
        let previous = std::mem::replace(&mut self.phase, Phase::Idle);
        if let Phase::Polling(cycle) = previous {
            if let Some(pending) = cycle.accepted {
                let snapshot = pending.snapshot;
                self.last_etag = snapshot.etag.clone();
                if snapshot.run_id.is_some() {
                    self.last_run_id = snapshot.run_id.clone();
                }
                self.placeholder = false;
                self.rendered_once = true;
                self.generation += 1;
                self.phase = Phase::Rendered { retry_at: now_ms + SILENT_RETRY_MS };
                return Some(AcqAction::Render(snapshot));
            }
        }
        None
    }
}

impl Default for SummaryAcquisition {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{
        AggregateMetrics,
        AggregateUser,
        DeviceAggregate,
    };

    fn snapshot(run_id: &str, devices: usize, etag: &str) -> SummarySession {
        SummarySession {
            run_id: Some(run_id.to_string()),
            etag: Some(etag.to_string()),
            bucket_ms: 5_000,
            devices: (0..devices)
                .map(|i| DeviceAggregate {
                    id: format!("{}", 100 + i),
                    user: AggregateUser::default(),
                    metrics: AggregateMetrics::default(),
                    timeline: Vec::new(),
                })
                .collect(),
        }
    }

    fn expect_fetch(action: Option<AcqAction>) -> (Option<String>, u64) {
        match action {
            Some(AcqAction::Fetch { validator, generation }) => (validator, generation),
            other => panic!("expected Fetch, got {:?}", other),
        }
    }

    #[test]
    fn renders_once_after_pending_and_empty_responses_with_min_show() {
        let mut acq = SummaryAcquisition::new();
        assert!(matches!(acq.begin(0), AcqAction::Prime));
        assert!(acq.placeholder_visible());

        // settle delay before the first fetch
        assert!(acq.tick(2_999).is_none());
        let (validator, generation) = expect_fetch(acq.tick(3_000));
        assert!(validator.is_none());

        // 204 with a 2s hint
        acq.on_outcome(3_000, generation, FetchOutcome::Pending { retry_after_s: Some(2) });
        assert!(acq.tick(4_999).is_none());
        let (_, generation) = expect_fetch(acq.tick(5_000));

        // 200 but not populated yet
        acq.on_outcome(5_000, generation, FetchOutcome::Snapshot(snapshot("A", 0, "e0")));
        let (_, generation) = expect_fetch(acq.tick(7_000));

        // fresh snapshot accepted, but held for the anti-flicker gate:
        // polling started at 3000, so nothing renders before 8000
        acq.on_outcome(7_000, generation, FetchOutcome::Snapshot(snapshot("A", 3, "e1")));
        assert!(acq.tick(7_999).is_none());
        let action = acq.tick(8_000);
        match action {
            Some(AcqAction::Render(s)) => {
                assert_eq!(s.run_id.as_deref(), Some("A"));
                assert_eq!(s.devices.len(), 3);
            }
            other => panic!("expected Render, got {:?}", other),
        }
        assert!(!acq.placeholder_visible());
        assert_eq!(acq.last_run_id(), Some("A"));

        // exactly once
        assert!(acq.tick(8_001).is_none());
    }

    #[test]
    fn silent_cycle_with_same_run_does_not_rerender() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, generation) = expect_fetch(acq.tick(3_000));
        acq.on_outcome(3_000, generation, FetchOutcome::Snapshot(snapshot("A", 2, "e1")));
        assert!(matches!(acq.tick(8_000), Some(AcqAction::Render(_))));

        // silent retry fires 5s after the render and carries the validator
        let (validator, generation) = expect_fetch(acq.tick(13_000));
        assert_eq!(validator.as_deref(), Some("e1"));
        assert!(!acq.placeholder_visible());

        // the same run comes back: stale, no render, retry rescheduled
        acq.on_outcome(13_100, generation, FetchOutcome::Snapshot(snapshot("A", 2, "e1")));
        assert!(acq.tick(18_099).is_none());
        let (_, generation) = expect_fetch(acq.tick(18_100));

        // a genuinely new run replaces the rendered one
        acq.on_outcome(18_200, generation, FetchOutcome::Snapshot(snapshot("B", 2, "e2")));
        assert!(matches!(acq.tick(23_200), Some(AcqAction::Render(_))));
        assert_eq!(acq.last_run_id(), Some("B"));
    }

    #[test]
    fn not_modified_rechecks_on_fixed_delay() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, generation) = expect_fetch(acq.tick(3_000));
        acq.on_outcome(3_200, generation, FetchOutcome::NotModified);
        assert!(acq.tick(5_199).is_none());
        expect_fetch(acq.tick(5_200));
    }

    #[test]
    fn transport_error_schedules_silent_retry() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, generation) = expect_fetch(acq.tick(3_000));
        acq.on_outcome(3_100, generation, FetchOutcome::TransportError("boom".into()));

        // placeholder stays while nothing was ever rendered
        assert!(acq.placeholder_visible());
        assert!(acq.tick(8_099).is_none());
        expect_fetch(acq.tick(8_100));
    }

    #[test]
    fn overall_timeout_abandons_and_retries_silently() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, generation) = expect_fetch(acq.tick(3_000));
        acq.on_outcome(3_000, generation, FetchOutcome::Pending { retry_after_s: Some(60) });

        // 15s after polling started, the cycle is abandoned
        assert!(acq.tick(18_000).is_none());
        // and a silent retry fires 5s later
        assert!(acq.tick(22_999).is_none());
        expect_fetch(acq.tick(23_000));
    }

    #[test]
    fn stale_generation_outcomes_are_ignored() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, old_generation) = expect_fetch(acq.tick(3_000));

        // a new cycle supersedes the old one
        acq.begin(4_000);
        acq.on_outcome(4_100, old_generation, FetchOutcome::Snapshot(snapshot("A", 3, "e1")));

        // the stale snapshot must not have been accepted
        let (_, generation) = expect_fetch(acq.tick(7_000));
        acq.on_outcome(7_100, generation, FetchOutcome::Snapshot(snapshot("B", 1, "e2")));
        match acq.tick(12_100) {
            Some(AcqAction::Render(s)) => assert_eq!(s.run_id.as_deref(), Some("B")),
            other => panic!("expected Render, got {:?}", other),
        }
    }

    #[test]
    fn instant_response_still_waits_out_min_show() {
        let mut acq = SummaryAcquisition::new();
        acq.begin(0);
        let (_, generation) = expect_fetch(acq.tick(3_000));
        acq.on_outcome(3_000, generation, FetchOutcome::Snapshot(snapshot("A", 1, "e1")));

        assert!(acq.tick(3_001).is_none());
        assert!(acq.tick(7_999).is_none());
        assert!(matches!(acq.tick(8_000), Some(AcqAction::Render(_))));
    }
}
