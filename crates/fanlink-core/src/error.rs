// ── Core error types ──
//
// User-facing errors from fanlink-core. Device failures during polling and
// commands feed `ConnectionHealth`; the most recent one is kept in
// classified form and exposed through `Controller::last_error`.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Controller has not been started")]
    NotStarted,

    #[error("Controller stopped")]
    ControllerStopped,

    // ── Device ───────────────────────────────────────────────────────
    #[error("Cannot reach fan controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Fan controller request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Fan controller answered HTTP {status}")]
    Rejected { status: u16 },

    #[error("Unexpected response from fan controller: {message}")]
    InvalidResponse { message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<&fanlink_api::Error> for CoreError {
    fn from(err: &fanlink_api::Error) -> Self {
        match err {
            fanlink_api::Error::Timeout { timeout_ms } => CoreError::Timeout {
                timeout_ms: *timeout_ms,
            },
            fanlink_api::Error::ConnectionRefused { url, reason } => CoreError::ConnectionFailed {
                url: url.clone(),
                reason: reason.clone(),
            },
            fanlink_api::Error::Dns { host, reason } => CoreError::ConnectionFailed {
                url: host.clone(),
                reason: format!("DNS lookup failed: {reason}"),
            },
            fanlink_api::Error::Transport(e) => CoreError::ConnectionFailed {
                url: e.url().map(ToString::to_string).unwrap_or_default(),
                reason: e.to_string(),
            },
            fanlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid device URL: {e}"),
            },
            fanlink_api::Error::HttpStatus { status, .. } => CoreError::Rejected { status: *status },
            fanlink_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse {
                    message: message.clone(),
                }
            }
        }
    }
}

impl From<fanlink_api::Error> for CoreError {
    fn from(err: fanlink_api::Error) -> Self {
        Self::from(&err)
    }
}
