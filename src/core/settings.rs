use std::env;

use serde::{
    Deserialize,
    Serialize,
};

use crate::persistence::{
    data_file_exists,
    load_json_or_default,
    save_json,
};

pub const SETTINGS_FILE: &str = "settings.json";

/// Board configuration: persisted as JSON in the app data dir, with
/// `PULSEBOARD_*` environment overrides applied on top at load time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Base URL of the telemetry server.
    pub base_url: String,
    /// Read `/live/stream` (SSE push) instead of polling `/live`.
    pub use_stream: bool,
    /// Cadence of `/live` polling.
    pub live_poll_ms: u64,
    /// Cadence of `/session/status` polling.
    pub status_poll_ms: u64,
    /// How long an absent device keeps its card before removal.
    pub fade_duration_ms: u64,
    /// Gap between cards, px.
    pub card_gap_px: f32,
    /// Hard cap on simultaneously displayed cards.
    pub max_cards: usize,
    /// Run against the built-in simulated feed instead of a server.
    pub simulate: bool,
    pub sim_devices: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            use_stream: false,
            live_poll_ms: 1_000,
            status_poll_ms: 1_000,
            fade_duration_ms: 60_000,
            card_gap_px: 10.0,
            max_cards: 16,
            simulate: false,
            sim_devices: 8,
        }
    }
}

impl DisplaySettings {
    pub fn load() -> Self {
        if !data_file_exists(SETTINGS_FILE) {
            if let Err(e) = save_json(&DisplaySettings::default(), SETTINGS_FILE) {
                eprintln!("Failed to write default settings: {}", e);
            }
        }

        let mut settings = load_json_or_default::<DisplaySettings>(SETTINGS_FILE);
        settings.apply_env();
        settings
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("PULSEBOARD_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(sim) = env::var("PULSEBOARD_SIM") {
            self.simulate = matches!(sim.as_str(), "1" | "true" | "yes");
        }
        if let Some(ms) = env_u64("PULSEBOARD_FADE_MS") {
            self.fade_duration_ms = ms;
        }
        if let Some(ms) = env_u64("PULSEBOARD_POLL_MS") {
            self.live_poll_ms = ms.max(200);
        }
        if let Some(n) = env_u64("PULSEBOARD_MAX_CARDS") {
            self.max_cards = n as usize;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse::<u64>().ok())
}
