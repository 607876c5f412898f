// Device service HTTP client
//
// Wraps `reqwest::Client` with base-URL joining, JSON request helpers, and
// status/detail extraction. Endpoint groups (device, schedules, reports)
// are implemented as inherent methods in separate files to keep this
// module focused on transport mechanics.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Longest slice of a response body carried into error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// FastAPI error body: `{"detail": "..."}` or `{"detail": [{"msg": ...}, ...]}`.
#[derive(serde::Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// Raw HTTP client for the device service.
///
/// Every method maps a non-2xx answer to [`Error::Service`] carrying the
/// service's detail text, and a failed exchange to [`Error::Transport`].
#[derive(Debug, Clone)]
pub struct DeviceServiceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DeviceServiceClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root, e.g. `http://192.168.1.20:8000`.
    /// A path prefix (`https://host/autofeed/`) is kept and endpoints are
    /// appended below it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build an endpoint URL from path segments. Each segment is
    /// percent-encoded, so device and schedule ids may contain any text.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);
        let resp = self.http.get(url).send().await?;
        Self::decode(resp).await
    }

    /// Send a POST request with a JSON body and decode the JSON answer.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &(impl Serialize + Sync),
    ) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).json(body).send().await?;
        Self::decode(resp).await
    }

    /// Send a POST request without a body and decode the JSON answer.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("POST {}", url);
        let resp = self.http.post(url).send().await?;
        Self::decode(resp).await
    }

    /// Send a DELETE request; any 2xx counts as success and the body is ignored.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {}", url);
        let resp = self.http.delete(url).send().await?;
        Self::ensure_success(resp).await.map(drop)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let resp = Self::ensure_success(resp).await?;
        let body = resp.text().await?;
        trace!(bytes = body.len(), "response body received");

        // Command endpoints may answer 2xx with an empty body.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }

    /// Turn a non-2xx response into [`Error::Service`].
    async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Service {
            status: status.as_u16(),
            detail: service_detail(&body, status),
        })
    }
}

/// Extract the most useful human-readable text from an error body.
fn service_detail(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        match parsed.detail {
            serde_json::Value::String(text) => return text,
            serde_json::Value::Array(items) => {
                let messages: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .map(String::from)
                    .collect();
                if !messages.is_empty() {
                    return messages.join("; ");
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_owned()
    } else {
        preview(trimmed)
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn client(base: &str) -> DeviceServiceClient {
        DeviceServiceClient::with_client(reqwest::Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_appends_segments_to_root() {
        let url = client("http://10.0.0.5:8000")
            .endpoint(&["device", "Feeder_01", "status"])
            .unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8000/device/Feeder_01/status");
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let url = client("https://example.net/autofeed/")
            .endpoint(&["schedules"])
            .unwrap();
        assert_eq!(url.as_str(), "https://example.net/autofeed/schedules");
    }

    #[test]
    fn endpoint_encodes_ids() {
        let url = client("http://host")
            .endpoint(&["device", "kitchen feeder/2", "refill"])
            .unwrap();
        assert_eq!(url.path(), "/device/kitchen%20feeder%2F2/refill");
    }

    #[test]
    fn detail_unwraps_fastapi_string() {
        let detail = service_detail(
            r#"{"detail":"Invalid time format. Use HH:MM"}"#,
            StatusCode::BAD_REQUEST,
        );
        assert_eq!(detail, "Invalid time format. Use HH:MM");
    }

    #[test]
    fn detail_joins_validation_messages() {
        let detail = service_detail(
            r#"{"detail":[{"loc":["body","amount"],"msg":"field required"},{"msg":"bad unit"}]}"#,
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(detail, "field required; bad unit");
    }

    #[test]
    fn detail_falls_back_to_raw_body_or_reason() {
        assert_eq!(
            service_detail("upstream exploded", StatusCode::BAD_GATEWAY),
            "upstream exploded"
        );
        assert_eq!(
            service_detail("", StatusCode::SERVICE_UNAVAILABLE),
            "Service Unavailable"
        );
    }
}
