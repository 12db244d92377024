use std::error::Error as StdError;

use thiserror::Error;

/// Top-level error type for the `fanlink-api` crate.
///
/// Splits device failures into transport-level problems (the request never
/// produced a response) and HTTP-level problems (the device answered, but
/// not with a usable 200). `fanlink-core` feeds all of them into its
/// connection health tracker.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Request did not complete within its timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// TCP connection could not be established.
    #[error("Connection refused by {url}: {reason}")]
    ConnectionRefused { url: String, reason: String },

    /// Device host name could not be resolved.
    #[error("DNS lookup failed for {host}: {reason}")]
    Dns { host: String, reason: String },

    /// Any other HTTP transport error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Base URL could not be parsed or joined.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── HTTP ────────────────────────────────────────────────────────
    /// Device answered with something other than 200 OK.
    #[error("Device returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Status body was not the expected JSON shape, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Classify a `reqwest` failure into the transport taxonomy.
    ///
    /// `timeout_ms` is the per-request timeout that was in force, so a
    /// timeout reports the budget it blew rather than reqwest's generic text.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            return Self::Timeout { timeout_ms };
        }

        if err.is_connect() {
            let url = err.url().map(ToString::to_string).unwrap_or_default();
            let reason = root_cause(&err);

            if is_dns_failure(&err) {
                let host = err
                    .url()
                    .and_then(|u| u.host_str())
                    .unwrap_or("<unknown>")
                    .to_owned();
                return Self::Dns { host, reason };
            }

            return Self::ConnectionRefused { url, reason };
        }

        Self::Transport(err)
    }

    /// HTTP status code, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if the request never reached the device.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ConnectionRefused { .. }
                | Self::Dns { .. }
                | Self::Transport(_)
        )
    }
}

fn is_dns_failure(err: &reqwest::Error) -> bool {
    let mut source: Option<&dyn StdError> = Some(err);
    while let Some(e) = source {
        let text = e.to_string().to_ascii_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        source = e.source();
    }
    false
}

/// Innermost error message in the source chain.
fn root_cause(err: &reqwest::Error) -> String {
    let mut last: &dyn StdError = err;
    while let Some(next) = last.source() {
        last = next;
    }
    last.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_reports_code() {
        let err = Error::HttpStatus {
            status: 503,
            url: "http://fan.local/".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_transport());
        assert_eq!(err.to_string(), "Device returned HTTP 503 for http://fan.local/");
    }

    #[test]
    fn timeout_is_transport() {
        let err = Error::Timeout { timeout_ms: 1000 };
        assert!(err.is_transport());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "Request timed out after 1000ms");
    }

    #[test]
    fn dns_display_names_host() {
        let err = Error::Dns {
            host: "fan.invalid".into(),
            reason: "no such host".into(),
        };
        let s = err.to_string();
        assert!(s.contains("fan.invalid"), "{s}");
        assert!(s.contains("no such host"), "{s}");
    }
}
