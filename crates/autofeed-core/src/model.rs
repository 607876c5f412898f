// ── Domain model ──
//
// Canonical device, command, and display types published by the state
// actor. Everything here is plain data: cheap to clone into a `watch`
// channel and serializable for the CLI's JSON/YAML output.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

// ── Device state ────────────────────────────────────────────────────

/// Last-known view of the physical device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    /// Empty means no device is configured.
    pub device_id: String,
    pub online: bool,
    pub bowl_weight_grams: u32,
    /// Always within `0..=capacity`.
    pub container_weight_grams: u32,
    /// Last status label the device reported.
    pub remote_status_text: String,
}

impl DeviceState {
    /// Fresh state for `device_id`: offline, empty bowl, full container.
    pub fn new(device_id: impl Into<String>, container_capacity: u32) -> Self {
        Self {
            device_id: device_id.into(),
            online: false,
            bowl_weight_grams: 0,
            container_weight_grams: container_capacity,
            remote_status_text: String::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.device_id.is_empty()
    }
}

// ── Commands ────────────────────────────────────────────────────────

/// Correlation id for one dispatched device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Feed,
    #[strum(serialize = "Water")]
    DispenseWater,
    Refill,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum CommandPhase {
    Idle,
    Requesting,
    InFlight,
    Completed,
    Failed,
}

/// The most recent device command and where it is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandState {
    pub id: CommandId,
    pub kind: CommandKind,
    pub phase: CommandPhase,
    /// Grams for feed, millilitres for water, absent for refill.
    pub requested_amount: Option<u32>,
}

impl CommandState {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, CommandPhase::Requesting | CommandPhase::InFlight)
    }
}

// ── Display status ──────────────────────────────────────────────────

/// Who currently owns the display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// A command is in flight; remote status is held back.
    Optimistic,
    /// The display follows the device's reported status.
    Remote,
}

pub const STATUS_IDLE: &str = "Idle";
pub const STATUS_ERROR: &str = "Error";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayStatus {
    pub text: String,
    pub source: StatusSource,
}

impl DisplayStatus {
    pub fn remote(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: StatusSource::Remote,
        }
    }

    pub fn optimistic(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: StatusSource::Optimistic,
        }
    }

    /// Text shown while the request is outstanding. Refill carries no
    /// amount and goes straight to its in-flight text.
    pub(crate) fn requesting(kind: CommandKind, amount: Option<u32>) -> Self {
        match (kind, amount) {
            (CommandKind::Feed, Some(n)) => Self::optimistic(format!("Requesting {n}g...")),
            (CommandKind::DispenseWater, Some(n)) => {
                Self::optimistic(format!("Requesting {n}ml..."))
            }
            _ => Self::in_flight(kind),
        }
    }

    pub(crate) fn in_flight(kind: CommandKind) -> Self {
        Self::optimistic(match kind {
            CommandKind::Feed => "Feeding...",
            CommandKind::DispenseWater => "Dispensing...",
            CommandKind::Refill => "Refilling...",
        })
    }
}

impl Default for DisplayStatus {
    fn default() -> Self {
        Self::remote(STATUS_IDLE)
    }
}

// ── Snapshots & events ──────────────────────────────────────────────

/// Everything a presentation layer needs to render the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    pub state: DeviceState,
    pub command: Option<CommandState>,
    pub display: DisplayStatus,
    pub low_food_alert_fired: bool,
}

impl DeviceSnapshot {
    pub fn command_in_flight(&self) -> bool {
        self.command.as_ref().is_some_and(CommandState::is_active)
    }
}

/// Edge-triggered notifications broadcast by the state actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Container dropped below the low-food threshold.
    LowFood { container_weight_grams: u32 },
    ConnectivityChanged { online: bool },
}

impl DeviceEvent {
    pub fn title(&self) -> &'static str {
        match self {
            Self::LowFood { .. } => "Low Food Warning",
            Self::ConnectivityChanged { online: true } => "Device online",
            Self::ConnectivityChanged { online: false } => "Device offline",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::LowFood {
                container_weight_grams,
            } => format!("Storage is running low ({container_weight_grams}g left)!"),
            Self::ConnectivityChanged { online: true } => "Device is reachable again".into(),
            Self::ConnectivityChanged { online: false } => "Device stopped responding".into(),
        }
    }
}

/// Round a raw scale reading to whole grams. Negative and non-finite
/// readings count as zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::as_conversions
)]
pub(crate) fn round_grams(raw: f64) -> u32 {
    if raw.is_finite() && raw > 0.0 {
        raw.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_texts() {
        assert_eq!(
            DisplayStatus::requesting(CommandKind::Feed, Some(50)).text,
            "Requesting 50g..."
        );
        assert_eq!(
            DisplayStatus::requesting(CommandKind::DispenseWater, Some(250)).text,
            "Requesting 250ml..."
        );
        assert_eq!(
            DisplayStatus::requesting(CommandKind::Refill, None),
            DisplayStatus::optimistic("Refilling...")
        );
        assert_eq!(DisplayStatus::in_flight(CommandKind::Feed).text, "Feeding...");
        assert_eq!(
            DisplayStatus::in_flight(CommandKind::DispenseWater).text,
            "Dispensing..."
        );
    }

    #[test]
    fn grams_are_rounded_and_clamped_at_zero() {
        assert_eq!(round_grams(120.4), 120);
        assert_eq!(round_grams(79.5), 80);
        assert_eq!(round_grams(-3.0), 0);
        assert_eq!(round_grams(f64::NAN), 0);
    }

    #[test]
    fn low_food_message() {
        let event = DeviceEvent::LowFood {
            container_weight_grams: 80,
        };
        assert_eq!(event.title(), "Low Food Warning");
        assert_eq!(event.message(), "Storage is running low (80g left)!");
    }
}
