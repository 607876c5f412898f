// Read-only report endpoints
//
// Feed history, weekly totals, and service health. None of these touch
// device state; they are fetched on demand for display.

use crate::client::DeviceServiceClient;
use crate::error::Error;
use crate::models::{FeedEvent, HistoryEnvelope, ServiceHealth, WeeklyAnalytics};

impl DeviceServiceClient {
    /// Every dispensed portion the service has recorded, newest first.
    ///
    /// `GET /history`
    pub async fn history(&self) -> Result<Vec<FeedEvent>, Error> {
        let url = self.endpoint(&["history"])?;
        let envelope: HistoryEnvelope = self.get(url).await?;
        Ok(envelope.history)
    }

    /// Grams dispensed per day over the last seven days.
    ///
    /// `GET /analytics/weekly`
    pub async fn weekly_analytics(&self) -> Result<WeeklyAnalytics, Error> {
        let url = self.endpoint(&["analytics", "weekly"])?;
        self.get(url).await
    }

    /// `GET /health`
    pub async fn health(&self) -> Result<ServiceHealth, Error> {
        let url = self.endpoint(&["health"])?;
        self.get(url).await
    }
}
