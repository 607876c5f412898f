// File-backed local settings store.
//
// A flat TOML table of string keys. Every write re-reads the file, applies
// the change, and replaces the file through a temp-file rename.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use autofeed_core::{CoreError, SettingsStore};
use tracing::debug;

#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_table(&self) -> Result<BTreeMap<String, String>, CoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(settings_error(&self.path, &e)),
        };
        toml::from_str(&text).map_err(|e| settings_error(&self.path, &e))
    }

    fn write_table(&self, table: &BTreeMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| settings_error(parent, &e))?;
        }
        let text = toml::to_string(table).map_err(|e| settings_error(&self.path, &e))?;
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, text).map_err(|e| settings_error(&tmp, &e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| settings_error(&self.path, &e))?;
        debug!(path = %self.path.display(), "settings written");
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.read_table()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.set_many(&[(key, value)])
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), CoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CoreError::Internal("settings lock poisoned".into()))?;
        let mut table = self.read_table()?;
        for (key, value) in entries {
            table.insert((*key).to_owned(), (*value).to_owned());
        }
        self.write_table(&table)
    }
}

fn settings_error(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Settings {
        message: format!("{}: {err}", path.display()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use autofeed_core::SettingsProvider;

    #[test]
    fn missing_file_reads_as_unset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.get("device_id").unwrap(), None);
    }

    #[test]
    fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("settings.toml");

        FileSettingsStore::new(&path)
            .set_many(&[("device_id", "Feeder_01"), ("camera_ip", "")])
            .unwrap();

        let reopened = FileSettingsStore::new(&path);
        assert_eq!(reopened.get("device_id").unwrap().as_deref(), Some("Feeder_01"));
        assert_eq!(reopened.get("camera_ip").unwrap().as_deref(), Some(""));
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.toml"));
        store.set("device_id", "A").unwrap();
        store.set("device_id", "B").unwrap();
        assert_eq!(store.get("device_id").unwrap().as_deref(), Some("B"));
    }

    #[test]
    fn corrupt_file_is_a_settings_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "device_id = [unterminated").unwrap();

        let err = FileSettingsStore::new(&path).get("device_id").unwrap_err();
        assert!(matches!(err, CoreError::Settings { .. }));
    }

    #[tokio::test]
    async fn provider_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileSettingsStore::new(dir.path().join("settings.toml")));
        let provider = SettingsProvider::new(store);

        provider.set("Feeder_01", "10.0.0.9").await.unwrap();
        let settings = provider.get().await.unwrap();
        assert_eq!(settings.device_id, "Feeder_01");
        assert_eq!(settings.camera_ip, "10.0.0.9");
    }
}
