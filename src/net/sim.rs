//! Built-in telemetry simulator: plausible per-device heart-rate traces
//! following a warmup/block/cooldown class, periodic dropouts, session
//! phases, and a materialized summary after each run. Lets the board run
//! with no server behind it.

use rand::{
    rngs::StdRng,
    Rng,
    SeedableRng,
};
use serde_json::{
    json,
    Value,
};

use crate::{
    core::models::{
        AggregateMetrics,
        AggregateUser,
        DeviceAggregate,
        SessionStatus,
        SummarySession,
        TimelineBucket,
        Zone,
        DEFAULT_BUCKET_MS,
    },
    summary::FetchOutcome,
};

const NAMES: [&str; 12] = [
    "Álvaro", "Bea", "Carlos", "Diana", "Edu", "Irene", "Javi", "Lucía", "Manu", "Nerea",
    "Pablo", "Sara",
];

struct SimPhase {
    key: &'static str,
    dur_s: u64,
    color: &'static str,
    /// Target fraction of heart-rate reserve for this phase.
    target: f64,
}

static PHASES: [SimPhase; 4] = [
    SimPhase { key: "WARMUP", dur_s: 240, color: "#16a34a", target: 0.50 },
    SimPhase { key: "BLOCK 1", dur_s: 480, color: "#eab308", target: 0.78 },
    SimPhase { key: "BLOCK 2", dur_s: 480, color: "#eab308", target: 0.88 },
    SimPhase { key: "COOLDOWN", dur_s: 180, color: "#1d4ed8", target: 0.45 },
];

const REST_S: u64 = 180;
const COUNTDOWN_LEAD_S: u64 = 120;
/// How long the "server" takes to materialize a summary after a run ends.
const MATERIALIZE_MS: u64 = 4_000;

struct SimDevice {
    id: u32,
    name: &'static str,
    hr_rest: f64,
    hr_max: f64,
    bpm: f64,
    kcal: f64,
    points: f64,
    frac_sum: f64,
    frac_n: u64,
    timeline: Vec<TimelineBucket>,
    dropped_until: Option<u64>,
}

impl SimDevice {
    fn reset_run(&mut self) {
        self.kcal = 0.0;
        self.points = 0.0;
        self.frac_sum = 0.0;
        self.frac_n = 0;
        self.timeline.clear();
    }

    fn zone(&self) -> Zone {
        Zone::from_bpm(self.bpm.round() as u32, self.hr_max.round() as u32)
    }

    fn frac(&self) -> f64 {
        (self.bpm / self.hr_max).clamp(0.0, 1.2)
    }
}

pub struct SimFeed {
    rng: StdRng,
    devices: Vec<SimDevice>,
    active_ms: u64,
    cycle_ms: u64,
    last_step_ms: Option<u64>,
    last_bucket_t: Option<u64>,
    finished: Option<FinishedRun>,
}

struct FinishedRun {
    snapshot: SummarySession,
    ready_at: u64,
}

impl SimFeed {
    pub fn new(device_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let devices = (0..device_count.clamp(1, NAMES.len()))
            .map(|i| {
                let age = rng.random_range(22..=55) as f64;
                // Tanaka estimate, same as the real provider uses
                let hr_max = 208.0 - 0.7 * age;
                let hr_rest = rng.random_range(48.0..64.0);
                SimDevice {
                    id: 101 + i as u32,
                    name: NAMES[i],
                    hr_rest,
                    hr_max,
                    bpm: hr_rest + rng.random_range(0.0..8.0),
                    kcal: 0.0,
                    points: 0.0,
                    frac_sum: 0.0,
                    frac_n: 0,
                    timeline: Vec::new(),
                    dropped_until: None,
                }
            })
            .collect();

        let active_ms = PHASES.iter().map(|p| p.dur_s).sum::<u64>() * 1_000;
        Self {
            rng,
            devices,
            active_ms,
            cycle_ms: active_ms + REST_S * 1_000,
            last_step_ms: None,
            last_bucket_t: None,
            finished: None,
        }
    }

    fn run_index(&self, now_ms: u64) -> u64 {
        now_ms / self.cycle_ms
    }

    fn is_active(&self, now_ms: u64) -> bool {
        now_ms % self.cycle_ms < self.active_ms
    }

    fn phase_at(&self, now_ms: u64) -> (&'static SimPhase, u64, u64) {
        let mut t = (now_ms % self.cycle_ms) / 1_000;
        let elapsed = t;
        for phase in &PHASES {
            if t < phase.dur_s {
                return (phase, elapsed, phase.dur_s - t);
            }
            t -= phase.dur_s;
        }
        let last = &PHASES[PHASES.len() - 1];
        (last, elapsed, 0)
    }

    /// Advances the world and returns the session status plus, while a
    /// session is active, a `/live`-shaped batch.
    pub fn step(&mut self, now_ms: u64) -> (SessionStatus, Option<Value>) {
        let was_active = self.last_step_ms.map(|t| self.is_active(t)).unwrap_or(false);
        let active = self.is_active(now_ms);
        let dt_s = self
            .last_step_ms
            .map(|t| (now_ms.saturating_sub(t) as f64 / 1_000.0).min(5.0))
            .unwrap_or(1.0);
        self.last_step_ms = Some(now_ms);

        if was_active && !active {
            self.finish_run(now_ms);
        }
        if !was_active && active {
            for device in &mut self.devices {
                device.reset_run();
            }
            self.last_bucket_t = None;
        }

        if !active {
            // drift back toward rest between sessions
            for device in &mut self.devices {
                device.bpm += 0.05 * (device.hr_rest - device.bpm) * dt_s;
            }
            return (self.rest_status(now_ms), None);
        }

        let (phase, elapsed, remaining) = self.phase_at(now_ms);
        let bucket_t = (now_ms / DEFAULT_BUCKET_MS) * DEFAULT_BUCKET_MS;
        let record_bucket = self.last_bucket_t != Some(bucket_t);
        if record_bucket {
            self.last_bucket_t = Some(bucket_t);
        }

        let mut batch = Vec::new();
        for device in &mut self.devices {
            // Karvonen target for the current phase, with per-device noise
            let target = device.hr_rest
                + phase.target * (device.hr_max - device.hr_rest)
                + self.rng.random_range(-4.0..4.0);
            device.bpm += 0.12 * (target - device.bpm) * dt_s + self.rng.random_range(-1.5..1.5);
            device.bpm = device.bpm.clamp(40.0, 205.0);

            let frac = device.frac();
            device.frac_sum += frac;
            device.frac_n += 1;
            device.kcal += dt_s * (1.2 + 6.0 * frac) / 60.0 * 10.0;
            if frac >= 0.70 {
                device.points += dt_s / 60.0;
            }
            if record_bucket {
                device.timeline.push(TimelineBucket {
                    t: bucket_t,
                    zone_mode: device.zone(),
                    frac,
                });
            }

            // occasional dropout so the fade lifecycle gets exercised
            if let Some(until) = device.dropped_until {
                if now_ms < until {
                    continue;
                }
                device.dropped_until = None;
            } else if self.rng.random_range(0.0..1.0) < 0.002 {
                device.dropped_until = Some(now_ms + self.rng.random_range(15_000..45_000));
                continue;
            }

            batch.push(json!({
                "dev": device.id,
                "hr": device.bpm.round() as u32,
                "ts": now_ms,
                "user": {"apodo": device.name},
                "metrics": {
                    "hr_max": device.hr_max.round() as u32,
                    "zone": device.zone().key(),
                    "kcal": (device.kcal * 10.0).round() / 10.0,
                    "points": (device.points * 10.0).round() / 10.0,
                },
            }));
        }

        let status = SessionStatus {
            active: true,
            phase_key: Some(phase.key.to_string()),
            phase_color: Some(phase.color.to_string()),
            phase_remaining_s: Some(remaining as i64),
            elapsed_s: Some(elapsed as i64),
            total_s: Some((self.active_ms / 1_000) as i64),
            ..Default::default()
        };
        (status, Some(Value::Array(batch)))
    }

    fn rest_status(&self, now_ms: u64) -> SessionStatus {
        let to_next_s = (self.cycle_ms - now_ms % self.cycle_ms) / 1_000;
        SessionStatus {
            active: false,
            show_countdown: to_next_s <= COUNTDOWN_LEAD_S,
            countdown_s: Some(to_next_s as i64),
            ..Default::default()
        }
    }

    fn finish_run(&mut self, now_ms: u64) {
        let run_id = format!("sim-{}", self.run_index(now_ms.saturating_sub(1)));
        let devices = self
            .devices
            .iter()
            .map(|device| DeviceAggregate {
                id: device.id.to_string(),
                user: AggregateUser { id: None, apodo: Some(device.name.to_string()) },
                metrics: AggregateMetrics {
                    pct_avg: if device.frac_n > 0 {
                        (device.frac_sum / device.frac_n as f64 * 100.0).round()
                    } else {
                        0.0
                    },
                    kcal: (device.kcal * 10.0).round() / 10.0,
                    points: (device.points * 10.0).round() / 10.0,
                },
                timeline: device.timeline.clone(),
            })
            .collect();

        let snapshot = SummarySession {
            run_id: Some(run_id.clone()),
            etag: Some(format!("\"{}\"", run_id)),
            bucket_ms: DEFAULT_BUCKET_MS,
            devices,
        };
        self.finished =
            Some(FinishedRun { snapshot, ready_at: now_ms + MATERIALIZE_MS });
    }

    /// Same response classes the real endpoint produces.
    pub fn summary_outcome(&self, now_ms: u64, validator: Option<&str>) -> FetchOutcome {
        match &self.finished {
            None => FetchOutcome::Pending { retry_after_s: Some(2) },
            Some(run) if now_ms < run.ready_at => FetchOutcome::Pending { retry_after_s: Some(2) },
            Some(run) => {
                if validator.is_some() && validator == run.snapshot.etag.as_deref() {
                    FetchOutcome::NotModified
                } else {
                    FetchOutcome::Snapshot(run.snapshot.clone())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::parse_batch;

    #[test]
    fn active_step_produces_parseable_batch() {
        let mut sim = SimFeed::new(6, 7);
        let (status, payload) = sim.step(10_000);
        assert!(status.active);
        let batch = parse_batch(&payload.unwrap());
        assert!(!batch.is_empty());
        assert!(batch.iter().all(|s| s.heart_rate.is_some() && s.metrics.hr_max.is_some()));
    }

    #[test]
    fn run_end_materializes_summary_after_delay() {
        let mut sim = SimFeed::new(4, 7);
        let active_ms = sim.active_ms;

        // drive through the session into the rest window
        let mut t = 0;
        while t < active_ms + 2_000 {
            sim.step(t);
            t += 1_000;
        }
        let now = active_ms + 2_000;
        assert!(matches!(
            sim.summary_outcome(now, None),
            FetchOutcome::Pending { .. }
        ));

        let later = active_ms + 10_000;
        sim.step(later);
        match sim.summary_outcome(later, None) {
            FetchOutcome::Snapshot(snapshot) => {
                assert_eq!(snapshot.devices.len(), 4);
                assert!(snapshot.run_id.is_some());
                let etag = snapshot.etag.clone();
                // a validator match is answered with 304 semantics
                assert!(matches!(
                    sim.summary_outcome(later, etag.as_deref()),
                    FetchOutcome::NotModified
                ));
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn rest_window_reports_countdown_near_next_start() {
        let sim = SimFeed::new(2, 7);
        let just_after_end = sim.active_ms + 1_000;
        let status = sim.rest_status(just_after_end);
        assert!(!status.active);
        // 180s rest, countdown only inside the last 120s
        assert!(!status.show_countdown);

        let near_start = sim.cycle_ms - 60_000;
        let status = sim.rest_status(near_start);
        assert!(status.show_countdown);
        assert!(status.countdown_s.unwrap() <= 120);
    }
}
