// Device endpoints
//
// Status polling and the three device commands: feed, dispense water,
// and the container refill reset.

use tracing::debug;

use crate::client::DeviceServiceClient;
use crate::error::Error;
use crate::models::{CommandAck, DeviceStatus, DispenseRequest, RefillResponse, Unit};

impl DeviceServiceClient {
    /// Latest reported state of one device.
    ///
    /// `GET /device/{device_id}/status`
    pub async fn device_status(&self, device_id: &str) -> Result<DeviceStatus, Error> {
        let url = self.endpoint(&["device", device_id, "status"])?;
        self.get(url).await
    }

    /// Ask the device to dispense food.
    ///
    /// `POST /feed` with `{"device_id": ..., "amount": ..., "unit": "g"}`
    pub async fn feed(&self, device_id: &str, grams: u32) -> Result<CommandAck, Error> {
        let url = self.endpoint(&["feed"])?;
        debug!(device_id, grams, "sending feed command");
        self.dispense(url, device_id, grams, Unit::Grams).await
    }

    /// Ask the device to dispense water.
    ///
    /// `POST /water` with `{"device_id": ..., "amount": ..., "unit": "ml"}`
    pub async fn dispense_water(&self, device_id: &str, ml: u32) -> Result<CommandAck, Error> {
        let url = self.endpoint(&["water"])?;
        debug!(device_id, ml, "sending water command");
        self.dispense(url, device_id, ml, Unit::Milliliters).await
    }

    /// Reset the device's virtual container to full.
    ///
    /// `POST /device/{device_id}/refill` (no body)
    pub async fn refill(&self, device_id: &str) -> Result<RefillResponse, Error> {
        let url = self.endpoint(&["device", device_id, "refill"])?;
        debug!(device_id, "sending refill command");
        let resp: Option<RefillResponse> = self.post_empty(url).await?;
        Ok(resp.unwrap_or_default())
    }

    async fn dispense(
        &self,
        url: url::Url,
        device_id: &str,
        amount: u32,
        unit: Unit,
    ) -> Result<CommandAck, Error> {
        let body = DispenseRequest {
            device_id: device_id.to_owned(),
            amount,
            unit,
        };
        let ack: Option<CommandAck> = self.post(url, &body).await?;
        Ok(ack.unwrap_or_default())
    }
}
