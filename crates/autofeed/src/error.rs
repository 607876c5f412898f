//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use autofeed_config::ConfigError;
use autofeed_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const SERVICE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the device service at {url}")]
    #[diagnostic(
        code(autofeed::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Set its address with: autofeed config set service.url http://HOST:PORT"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Request to the device service timed out")]
    #[diagnostic(
        code(autofeed::timeout),
        help("Increase the timeout with --timeout or check the service's responsiveness.")
    )]
    Timeout,

    // ── Service ──────────────────────────────────────────────────────
    #[error("Device service returned HTTP {status}: {detail}")]
    #[diagnostic(code(autofeed::service_error))]
    Service { status: u16, detail: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No device configured")]
    #[diagnostic(
        code(autofeed::device_not_configured),
        help("Set one with: autofeed config set device_id <DEVICE_ID>")
    )]
    DeviceNotConfigured,

    #[error("Configuration error: {message}")]
    #[diagnostic(code(autofeed::config))]
    Config { message: String },

    #[error("Local settings error: {message}")]
    #[diagnostic(
        code(autofeed::settings),
        help("Check the settings file, or point elsewhere with --settings-file.")
    )]
    Settings { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(autofeed::validation))]
    Validation { field: String, reason: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(autofeed::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(autofeed::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Service { .. } => exit_code::SERVICE,
            Self::DeviceNotConfigured | Self::Config { .. } | Self::Settings { .. } => {
                exit_code::CONFIG
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::DeviceNotConfigured => CliError::DeviceNotConfigured,
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Settings { message } => CliError::Settings { message },
            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Timeout => CliError::Timeout,
            CoreError::Service { status, detail } => CliError::Service { status, detail },
            CoreError::ControllerStopped => CliError::Internal {
                message: "controller stopped before the command completed".into(),
            },
            CoreError::Internal(message) => CliError::Internal { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownKey(key) => CliError::Validation {
                field: "key".into(),
                reason: format!("unknown key '{key}' (try `autofeed config show`)"),
            },
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::DeviceNotConfigured, exit_code::CONFIG),
            (
                CoreError::ValidationFailed {
                    message: "bad time".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::ConnectionFailed {
                    url: "http://x".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout, exit_code::TIMEOUT),
            (
                CoreError::Service {
                    status: 400,
                    detail: "nope".into(),
                },
                exit_code::SERVICE,
            ),
            (CoreError::Internal("x".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
        assert_eq!(exit_code::SUCCESS, 0);
    }
}
