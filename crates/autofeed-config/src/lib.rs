//! Shared configuration for the autofeed CLI and other front ends.
//!
//! TOML config (file + `AUTOFEED_` environment), platform paths, the
//! file-backed local settings store, and translation to
//! `autofeed_core::ControllerConfig`.

mod store;

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use autofeed_core::ControllerConfig;

pub use store::FileSettingsStore;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown config key '{0}'")]
    UnknownKey(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub defaults: Defaults,
}

/// Where the device service lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_url")]
    pub url: String,

    /// Request timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Accept self-signed TLS certificates.
    #[serde(default)]
    pub insecure: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: default_timeout(),
            insecure: false,
        }
    }
}

/// Pacing and thresholds for the synchronization core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeviceConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_optimistic_window_ms")]
    pub optimistic_window_ms: u64,

    #[serde(default = "default_low_food_threshold")]
    pub low_food_threshold: u32,

    #[serde(default = "default_container_capacity")]
    pub container_capacity: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            optimistic_window_ms: default_optimistic_window_ms(),
            low_food_threshold: default_low_food_threshold(),
            container_capacity: default_container_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_url() -> String {
    "http://127.0.0.1:8001".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_optimistic_window_ms() -> u64 {
    5000
}
fn default_low_food_threshold() -> u32 {
    autofeed_core::config::DEFAULT_LOW_FOOD_THRESHOLD
}
fn default_container_capacity() -> u32 {
    autofeed_core::config::DEFAULT_CONTAINER_CAPACITY
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

impl Config {
    /// Settable keys, in `section.field` form.
    pub const KEYS: &'static [&'static str] = &[
        "service.url",
        "service.timeout",
        "service.insecure",
        "device.poll_interval_ms",
        "device.optimistic_window_ms",
        "device.low_food_threshold",
        "device.container_capacity",
        "defaults.output",
        "defaults.color",
    ];

    /// Set one value by dotted key, parsing it to the field's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "service.url" => self.service.url = value.to_owned(),
            "service.timeout" => self.service.timeout = parse_field(key, value)?,
            "service.insecure" => self.service.insecure = parse_field(key, value)?,
            "device.poll_interval_ms" => self.device.poll_interval_ms = parse_field(key, value)?,
            "device.optimistic_window_ms" => {
                self.device.optimistic_window_ms = parse_field(key, value)?;
            }
            "device.low_food_threshold" => {
                self.device.low_food_threshold = parse_field(key, value)?;
            }
            "device.container_capacity" => {
                self.device.container_capacity = parse_field(key, value)?;
            }
            "defaults.output" => self.defaults.output = value.to_owned(),
            "defaults.color" => self.defaults.color = value.to_owned(),
            other => return Err(ConfigError::UnknownKey(other.to_owned())),
        }
        Ok(())
    }
}

fn parse_field<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Validation {
        field: field.into(),
        reason: e.to_string(),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "autofeed", "autofeed")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Resolve the local settings file (device id, camera address).
pub fn settings_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("settings.toml"),
        |dirs| dirs.data_dir().join("settings.toml"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("autofeed");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from `path` + environment. A missing file yields defaults.
///
/// Environment variables use a double underscore between section and key,
/// e.g. `AUTOFEED_SERVICE__URL`, `AUTOFEED_DEVICE__POLL_INTERVAL_MS`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AUTOFEED_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`, creating parent dirs.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the core's `ControllerConfig`.
pub fn to_controller_config(cfg: &Config) -> Result<ControllerConfig, ConfigError> {
    let service_url: url::Url = cfg.service.url.parse().map_err(|_| ConfigError::Validation {
        field: "service.url".into(),
        reason: format!("invalid URL: {}", cfg.service.url),
    })?;
    if cfg.device.container_capacity == 0 {
        return Err(ConfigError::Validation {
            field: "device.container_capacity".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let mut controller = ControllerConfig::new(service_url);
    controller.timeout = Duration::from_secs(cfg.service.timeout);
    controller.accept_invalid_certs = cfg.service.insecure;
    controller.poll_interval = Duration::from_millis(cfg.device.poll_interval_ms);
    controller.optimistic_window = Duration::from_millis(cfg.device.optimistic_window_ms);
    controller.low_food_threshold = cfg.device.low_food_threshold;
    controller.container_capacity = cfg.device.container_capacity;
    Ok(controller)
}
