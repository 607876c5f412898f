// ── Schedule manager ──
//
// Cached view of the service's daily feeding schedules. The service is the
// source of truth: every mutation is followed by a full re-list.

use std::sync::Arc;

use autofeed_api::{DeviceServiceClient, Schedule};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::settings::SettingsProvider;

/// Validate a 24-hour `HH:MM` time: exactly two digits each side.
pub fn validate_time(time: &str) -> Result<(), CoreError> {
    let invalid = || CoreError::validation(format!("Invalid time '{time}'. Use HH:MM (00:00-23:59)"));

    let (hours, minutes) = time.split_once(':').ok_or_else(invalid)?;
    let two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hours) || !two_digits(minutes) {
        return Err(invalid());
    }
    let hours: u8 = hours.parse().map_err(|_| invalid())?;
    let minutes: u8 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }
    Ok(())
}

pub(crate) struct ScheduleManager {
    api: DeviceServiceClient,
    settings: SettingsProvider,
    cache: watch::Sender<Arc<Vec<Schedule>>>,
}

impl ScheduleManager {
    pub fn new(api: DeviceServiceClient, settings: SettingsProvider) -> Self {
        let (cache, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            api,
            settings,
            cache,
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Schedule>> {
        self.cache.borrow().clone()
    }

    /// Re-fetch the full list. The cache is left untouched on failure.
    pub async fn list(&self) -> Result<Arc<Vec<Schedule>>, CoreError> {
        let schedules = Arc::new(self.api.list_schedules().await?);
        debug!(count = schedules.len(), "schedules refreshed");
        self.cache.send_replace(Arc::clone(&schedules));
        Ok(schedules)
    }

    pub async fn create(&self, time: &str, amount_grams: u32) -> Result<Option<Schedule>, CoreError> {
        validate_time(time)?;
        if amount_grams == 0 {
            return Err(CoreError::validation("Amount must be greater than zero"));
        }
        let settings = self.settings.get().await?;
        if settings.device_id.is_empty() {
            return Err(CoreError::DeviceNotConfigured);
        }

        let created = self
            .api
            .create_schedule(&settings.device_id, time, amount_grams)
            .await?;
        self.refresh_after_mutation().await;
        Ok(created)
    }

    /// Delete by id. The list is refreshed whatever the delete's outcome.
    pub async fn remove(&self, id: &str) -> Result<(), CoreError> {
        let deleted = self.api.delete_schedule(id).await;
        self.refresh_after_mutation().await;
        deleted.map_err(CoreError::from)
    }

    async fn refresh_after_mutation(&self) {
        if let Err(e) = self.list().await {
            warn!(error = %e, "schedule refresh failed, keeping cached list");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_times() {
        for time in ["00:00", "07:05", "12:30", "23:59"] {
            assert!(validate_time(time).is_ok(), "{time} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_times() {
        for time in ["25:00", "24:00", "12:60", "7:05", "07:5", "0705", "ab:cd", "", "07:05:00", " 07:05"] {
            let err = validate_time(time).unwrap_err();
            assert!(matches!(err, CoreError::ValidationFailed { .. }), "{time}");
        }
    }
}
