// ── Runtime controller configuration ──
//
// Describes *how* the core talks to the device service and paces its
// background work. Never touches disk: the CLI (or any embedder) builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use url::Url;

/// Container capacity of the stock feeder, grams.
pub const DEFAULT_CONTAINER_CAPACITY: u32 = 500;
/// Container weight below which the low-food alert fires, grams.
pub const DEFAULT_LOW_FOOD_THRESHOLD: u32 = 100;

/// Configuration for a single device service.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Device service root (e.g., `http://192.168.1.20:8000`).
    pub service_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Accept self-signed certificates on the service.
    pub accept_invalid_certs: bool,
    /// Status poll period. Zero disables the background poller.
    pub poll_interval: Duration,
    /// How long an accepted feed/water command keeps its optimistic status.
    pub optimistic_window: Duration,
    pub low_food_threshold: u32,
    pub container_capacity: u32,
}

impl ControllerConfig {
    /// Defaults for everything except the service URL.
    pub fn new(service_url: Url) -> Self {
        Self {
            service_url,
            timeout: Duration::from_secs(10),
            accept_invalid_certs: false,
            poll_interval: Duration::from_secs(2),
            optimistic_window: Duration::from_secs(5),
            low_food_threshold: DEFAULT_LOW_FOOD_THRESHOLD,
            container_capacity: DEFAULT_CONTAINER_CAPACITY,
        }
    }

    pub(crate) fn transport(&self) -> autofeed_api::TransportConfig {
        autofeed_api::TransportConfig {
            timeout: self.timeout,
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}
