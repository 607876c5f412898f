// ── Core error types ──
//
// User-facing errors from autofeed-core. Consumers never see reqwest
// errors or JSON parse failures directly; the `From<autofeed_api::Error>`
// impl translates transport-layer errors into the domain taxonomy.

use thiserror::Error;

/// Coarse classification of a [`CoreError`].
///
/// Configuration and validation errors are raised before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Network,
    Service,
    Internal,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Device not configured: set a device id first")]
    DeviceNotConfigured,

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Validation errors ────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device service request timed out")]
    Timeout,

    // ── Service errors ───────────────────────────────────────────────
    #[error("Device service rejected the request (HTTP {status}): {detail}")]
    Service { status: u16, detail: String },

    // ── Local settings ───────────────────────────────────────────────
    #[error("Settings store error: {message}")]
    Settings { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller stopped")]
    ControllerStopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotConfigured | Self::Config { .. } | Self::Settings { .. } => {
                ErrorKind::Configuration
            }
            Self::ValidationFailed { .. } => ErrorKind::Validation,
            Self::ConnectionFailed { .. } | Self::Timeout => ErrorKind::Network,
            Self::Service { .. } => ErrorKind::Service,
            Self::ControllerStopped | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// `true` for errors raised before any request left the process.
    pub fn blocks_network(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<autofeed_api::Error> for CoreError {
    fn from(err: autofeed_api::Error) -> Self {
        match err {
            autofeed_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if let Some(status) = e.status() {
                    CoreError::Service {
                        status: status.as_u16(),
                        detail: e.to_string(),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(ToString::to_string)
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                }
            }
            autofeed_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid service URL: {e}"),
            },
            autofeed_api::Error::InvalidBaseUrl(url) => CoreError::Config {
                message: format!("Service URL cannot be used for API requests: {url}"),
            },
            autofeed_api::Error::ClientBuild(message) => CoreError::Config { message },
            autofeed_api::Error::Service { status, detail } => CoreError::Service { status, detail },
            autofeed_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response from device service: {message}"))
            }
        }
    }
}
