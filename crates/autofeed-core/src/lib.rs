//! Device synchronization and command core between `autofeed-api` and
//! presentation layers (the CLI, or any embedder).
//!
//! - **[`Controller`]**: central facade. [`start()`](Controller::start)
//!   loads the persisted settings, spawns the state actor and command
//!   processor, and binds a status poller to the configured device.
//!   [`configure()`](Controller::configure) re-binds it;
//!   [`Controller::oneshot()`] runs a single action without a poller.
//!
//! - **State actor**: sole owner of [`DeviceState`], the current
//!   [`CommandState`], the [`DisplayStatus`], and the low-food latch. The
//!   poller and dispatcher send it messages; consumers read
//!   [`DeviceSnapshot`]s through a `watch` channel and [`DeviceEvent`]s
//!   through a `broadcast` channel.
//!
//! - **[`Command`]**: typed mutations (feed, water, refill, schedule
//!   create/delete) routed through an `mpsc` channel. Reads such as
//!   history and analytics bypass the channel.
//!
//! - **Settings** ([`SettingsStore`], [`SettingsProvider`]): persisted
//!   `device_id` / `camera_ip`.

pub mod alert;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod model;
pub mod schedule;
pub mod settings;
mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alert::ThresholdAlerter;
pub use command::{Command, CommandResult};
pub use config::ControllerConfig;
pub use controller::{Controller, Lifecycle, WeeklyTotals};
pub use error::{CoreError, ErrorKind};
pub use model::{
    CommandId, CommandKind, CommandPhase, CommandState, DeviceEvent, DeviceSnapshot, DeviceState,
    DisplayStatus, StatusSource,
};
pub use schedule::validate_time;
pub use settings::{DeviceSettings, MemorySettingsStore, SettingsProvider, SettingsStore};

// Wire types that appear in the public API.
pub use autofeed_api::{FeedEvent, Schedule, ServiceHealth};
