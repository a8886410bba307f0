use serde::{
    de,
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use serde_json::Value;

/// Heart-rate intensity bucket. The wire carries these as "Z1".."Z5";
/// anything unrecognized degrades to Z1 rather than failing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Zone {
    #[default]
    Z1,
    Z2,
    Z3,
    Z4,
    Z5,
}

impl Zone {
    pub fn from_key(key: &str) -> Self {
        match key {
            "Z2" => Zone::Z2,
            "Z3" => Zone::Z3,
            "Z4" => Zone::Z4,
            "Z5" => Zone::Z5,
            _ => Zone::Z1,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Zone::Z1 => "Z1",
            Zone::Z2 => "Z2",
            Zone::Z3 => "Z3",
            Zone::Z4 => "Z4",
            Zone::Z5 => "Z5",
        }
    }

    /// Zone from a reading against an effective HRmax. Thresholds at 60/70/80/90%.
    pub fn from_bpm(hr: u32, hr_max: u32) -> Self {
        if hr_max == 0 {
            return Zone::Z1;
        }
        let p = hr as f64 / hr_max as f64;
        if p < 0.60 {
            Zone::Z1
        } else if p < 0.70 {
            Zone::Z2
        } else if p < 0.80 {
            Zone::Z3
        } else if p < 0.90 {
            Zone::Z4
        } else {
            Zone::Z5
        }
    }
}

impl Serialize for Zone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for Zone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        Ok(Zone::from_key(&key))
    }
}

/// One telemetry reading for one device. Superseded by the next reading
/// for the same id; never mutated after receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    pub id: String,
    pub heart_rate: Option<u32>,
    pub display_name: Option<String>,
    pub metrics: SampleMetrics,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleMetrics {
    pub zone: Zone,
    pub kcal: Option<f64>,
    pub points: Option<f64>,
    pub hr_max: Option<u32>,
}

impl DeviceSample {
    /// Parses one `/live` entry. Entries without a usable `dev` are dropped;
    /// every other field is optional.
    pub fn from_wire(entry: &Value) -> Option<Self> {
        let id = match entry.get("dev") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        };

        let heart_rate = entry.get("hr").and_then(Value::as_u64).map(|hr| hr as u32);
        let display_name =
            entry.pointer("/user/apodo").and_then(Value::as_str).map(str::to_string);

        let metrics = entry.get("metrics").map(|m| SampleMetrics {
            zone: m.get("zone").and_then(Value::as_str).map(Zone::from_key).unwrap_or_default(),
            kcal: m.get("kcal").and_then(Value::as_f64),
            points: m.get("points").and_then(Value::as_f64),
            hr_max: m.get("hr_max").and_then(Value::as_u64).map(|h| h as u32),
        });

        Some(DeviceSample {
            id,
            heart_rate,
            display_name,
            metrics: metrics.unwrap_or_default(),
        })
    }

    pub fn display_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("ID {}", self.id),
        }
    }

    /// Fraction of effective HRmax for the current reading.
    pub fn hr_fraction(&self) -> Option<f32> {
        let hr = self.heart_rate? as f32;
        let hr_max = self.metrics.hr_max.filter(|m| *m > 0)? as f32;
        Some((hr / hr_max).clamp(0.0, 1.2))
    }
}

/// Lenient batch parse: a non-array payload is an empty batch, malformed
/// entries are skipped individually.
pub fn parse_batch(payload: &Value) -> Vec<DeviceSample> {
    let Some(entries) = payload.as_array() else {
        return Vec::new();
    };
    entries.iter().filter_map(DeviceSample::from_wire).collect()
}

/// `/session/status` payload. Every field defaults so a sparse response
/// (inactive, no countdown) still parses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub show_countdown: bool,
    #[serde(default)]
    pub countdown_s: Option<i64>,
    #[serde(default)]
    pub phase_key: Option<String>,
    #[serde(default)]
    pub phase_color: Option<String>,
    #[serde(default)]
    pub phase_remaining_s: Option<i64>,
    #[serde(default)]
    pub elapsed_s: Option<i64>,
    #[serde(default)]
    pub total_s: Option<i64>,
}

pub const DEFAULT_BUCKET_MS: u64 = 5_000;

fn default_bucket_ms() -> u64 {
    DEFAULT_BUCKET_MS
}

/// Aggregated snapshot of one finished run. Immutable once constructed;
/// a newer snapshot fully replaces the previous one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummarySession {
    #[serde(default, alias = "id", deserialize_with = "opt_string_or_number")]
    pub run_id: Option<String>,
    /// Validator from the response headers, not the body.
    #[serde(skip)]
    pub etag: Option<String>,
    #[serde(default = "default_bucket_ms")]
    pub bucket_ms: u64,
    #[serde(default, deserialize_with = "lenient_devices")]
    pub devices: Vec<DeviceAggregate>,
}

impl SummarySession {
    /// Lenient parse used by the acquisition path: a structurally broken
    /// body degrades to a zero-device snapshot (treated as not-yet-ready).
    pub fn from_wire(payload: &Value) -> Self {
        match serde_json::from_value(payload.clone()) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Discarding malformed summary payload: {}", e);
                SummarySession::default()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAggregate {
    #[serde(rename = "dev", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub user: AggregateUser,
    #[serde(default)]
    pub metrics: AggregateMetrics,
    #[serde(default)]
    pub timeline: Vec<TimelineBucket>,
}

impl DeviceAggregate {
    pub fn display_name(&self) -> String {
        match &self.user.apodo {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("ID {}", self.id),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateUser {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub apodo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AggregateMetrics {
    #[serde(default)]
    pub pct_avg: f64,
    #[serde(default)]
    pub kcal: f64,
    #[serde(default)]
    pub points: f64,
}

/// One time bucket of the per-device zone timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct TimelineBucket {
    pub t: u64,
    #[serde(default)]
    pub zone_mode: Zone,
    #[serde(default)]
    pub frac: f64,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

/// Devices are parsed one by one so a single malformed entry does not
/// discard the rest of the snapshot.
fn lenient_devices<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<DeviceAggregate>, D::Error> {
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw.iter().filter_map(|v| serde_json::from_value(v.clone()).ok()).collect())
}
