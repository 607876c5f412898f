// Schedule endpoints
//
// CRUD over the service-side daily feeding schedules. The service owns ids
// and ordering; callers are expected to re-list after every mutation.

use tracing::debug;

use crate::client::DeviceServiceClient;
use crate::error::Error;
use crate::models::{CreateScheduleRequest, CreatedSchedule, Schedule, Unit};

impl DeviceServiceClient {
    /// List every stored schedule, in service order.
    ///
    /// `GET /schedules`
    pub async fn list_schedules(&self) -> Result<Vec<Schedule>, Error> {
        let url = self.endpoint(&["schedules"])?;
        let schedules: Option<Vec<Schedule>> = self.get(url).await?;
        Ok(schedules.unwrap_or_default())
    }

    /// Store a new daily schedule. Time validation is the caller's job;
    /// the service rejects malformed times with HTTP 400.
    ///
    /// `POST /schedules` with `{"device_id", "time", "amount", "unit": "g"}`
    ///
    /// Returns the created schedule when the service echoes it back.
    pub async fn create_schedule(
        &self,
        device_id: &str,
        time: &str,
        grams: u32,
    ) -> Result<Option<Schedule>, Error> {
        let url = self.endpoint(&["schedules"])?;
        debug!(device_id, time, grams, "creating schedule");
        let body = CreateScheduleRequest {
            device_id: device_id.to_owned(),
            time: time.to_owned(),
            amount: grams,
            unit: Unit::Grams,
        };
        let created: Option<serde_json::Value> = self.post(url, &body).await?;
        Ok(created.and_then(|v| serde_json::from_value::<CreatedSchedule>(v).ok().map(Schedule::from)))
    }

    /// Delete a schedule by id.
    ///
    /// `DELETE /schedules/{id}`
    pub async fn delete_schedule(&self, id: &str) -> Result<(), Error> {
        let url = self.endpoint(&["schedules", id])?;
        debug!(id, "deleting schedule");
        self.delete(url).await
    }
}
