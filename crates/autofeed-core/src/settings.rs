// ── Settings provider ──
//
// Resolves the configured device id and camera address from a persisted
// key-value store. The store itself is pluggable: the CLI supplies a
// file-backed one, tests and embedders can use `MemorySettingsStore`.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;

pub const DEVICE_ID_KEY: &str = "device_id";
pub const CAMERA_IP_KEY: &str = "camera_ip";

/// Port the feeder's camera serves its MJPEG stream on.
const CAMERA_STREAM_PORT: u16 = 81;

/// Persisted string key-value storage. Last writer wins.
///
/// Implementations may block (file I/O); the provider calls them from a
/// blocking task.
pub trait SettingsStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    /// Write several keys at once. Stores that can do this atomically
    /// should override the default, which writes them one by one.
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), CoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: DashMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ── Device settings ─────────────────────────────────────────────────

/// The two persisted settings the core cares about.
///
/// Both are empty strings when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceSettings {
    pub device_id: String,
    pub camera_ip: String,
}

impl DeviceSettings {
    /// `http://{camera_ip}:81/stream`, or `None` when no camera is set.
    pub fn camera_stream_url(&self) -> Option<String> {
        let ip = self.camera_ip.trim();
        (!ip.is_empty()).then(|| format!("http://{ip}:{CAMERA_STREAM_PORT}/stream"))
    }
}

/// Typed access to `device_id` / `camera_ip` on top of a `SettingsStore`.
#[derive(Clone)]
pub struct SettingsProvider {
    store: Arc<dyn SettingsStore>,
}

impl SettingsProvider {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self) -> Result<DeviceSettings, CoreError> {
        let store = Arc::clone(&self.store);
        run_blocking(move || {
            Ok(DeviceSettings {
                device_id: store.get(DEVICE_ID_KEY)?.unwrap_or_default(),
                camera_ip: store.get(CAMERA_IP_KEY)?.unwrap_or_default(),
            })
        })
        .await
    }

    /// Validate and persist both settings. `device_id` is trimmed and must
    /// not be empty; an empty `camera_ip` just means no camera.
    pub async fn set(&self, device_id: &str, camera_ip: &str) -> Result<DeviceSettings, CoreError> {
        let settings = DeviceSettings {
            device_id: device_id.trim().to_owned(),
            camera_ip: camera_ip.trim().to_owned(),
        };
        if settings.device_id.is_empty() {
            return Err(CoreError::validation("Device ID cannot be empty"));
        }

        let store = Arc::clone(&self.store);
        let saved = settings.clone();
        run_blocking(move || {
            store.set_many(&[
                (DEVICE_ID_KEY, saved.device_id.as_str()),
                (CAMERA_IP_KEY, saved.camera_ip.as_str()),
            ])
        })
        .await?;
        debug!(device_id = %settings.device_id, "settings saved");
        Ok(settings)
    }
}

impl std::fmt::Debug for SettingsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsProvider").finish_non_exhaustive()
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, CoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("settings task failed: {e}")))?
}
