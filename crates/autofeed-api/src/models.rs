// Device service wire types
//
// Request and response bodies for the device service's JSON API. Response
// fields use `#[serde(default)]` liberally because the service fills in
// placeholders for devices it has never heard from and omits fields freely.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ── Device status ────────────────────────────────────────────────────

/// Body of `GET /device/{device_id}/status`.
///
/// Weights arrive as raw (possibly fractional) scale readings; the core
/// rounds them before they reach the domain model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Food currently in the bowl, grams.
    #[serde(default)]
    pub weight: Option<f64>,
    /// Food remaining in the storage container, grams.
    #[serde(default)]
    pub container_weight: Option<f64>,
    #[serde(default)]
    pub online: Option<bool>,
    /// Free-form status label reported by the device (e.g. "Feeding completed").
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

// ── Commands ─────────────────────────────────────────────────────────

/// Unit attached to a dispense request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Grams,
    #[serde(rename = "ml")]
    Milliliters,
}

/// Body of `POST /feed` and `POST /water`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispenseRequest {
    pub device_id: String,
    pub amount: u32,
    pub unit: Unit,
}

/// Acknowledgement returned by the command endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommandAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Body of `POST /device/{device_id}/refill`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefillResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub container_weight: Option<f64>,
}

// ── Schedules ────────────────────────────────────────────────────────

/// A daily feeding schedule stored by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    #[serde(default)]
    pub device_id: Option<String>,
    /// `HH:MM`, 24-hour clock, service-local time.
    pub time: String,
    pub amount: u32,
    #[serde(default = "default_schedule_unit")]
    pub unit: String,
}

fn default_schedule_unit() -> String {
    "g".into()
}

/// Body of `POST /schedules`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateScheduleRequest {
    pub device_id: String,
    pub time: String,
    pub amount: u32,
    pub unit: Unit,
}

/// The service answers a create either with the bare schedule or wrapped
/// as `{"message": ..., "schedule": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedSchedule {
    Wrapped { schedule: Schedule },
    Bare(Schedule),
}

impl From<CreatedSchedule> for Schedule {
    fn from(created: CreatedSchedule) -> Self {
        match created {
            CreatedSchedule::Wrapped { schedule } | CreatedSchedule::Bare(schedule) => schedule,
        }
    }
}

// ── History & analytics ──────────────────────────────────────────────

/// One dispensed portion from `GET /history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    /// Service-local timestamp, `YYYY-MM-DD HH:MM:SS[.ffffff]`.
    pub timestamp: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub amount: u32,
    #[serde(default = "default_schedule_unit")]
    pub unit: String,
    /// `"manual"` or `"schedule"`.
    #[serde(default)]
    pub source: Option<String>,
}

impl FeedEvent {
    /// Parse the service timestamp. Accepts both the space-separated form
    /// the service writes and ISO-8601 `T` separators.
    pub fn recorded_at(&self) -> Option<NaiveDateTime> {
        let raw = self.timestamp.trim();
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryEnvelope {
    #[serde(default)]
    pub history: Vec<FeedEvent>,
}

/// Weekly totals from `GET /analytics/weekly`: day label → grams dispensed.
///
/// Key order is the service's (oldest day first) and is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAnalytics {
    #[serde(default)]
    pub data: IndexMap<String, u64>,
}

impl WeeklyAnalytics {
    pub fn total(&self) -> u64 {
        self.data.values().sum()
    }
}

// ── Health ───────────────────────────────────────────────────────────

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    /// Whether the service currently holds its broker connection to the devices.
    #[serde(default)]
    pub mqtt_connected: bool,
}
