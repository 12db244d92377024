// Transport configuration for building the device's reqwest::Client.
//
// The firmware speaks plain HTTP with no auth, so this only carries the
// per-request timeouts and the user agent.

use std::time::Duration;

/// Default timeout for `GET /`.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Default timeout for the `POST` command endpoints.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(3000);

/// Shared transport configuration for the device client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Applied to every status poll.
    pub poll_timeout: Duration,
    /// Applied to mode, angle, and relay commands.
    pub command_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Timeouts are applied per request, not on the client, since polls and
    /// commands use different budgets.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        reqwest::Client::builder()
            .user_agent(concat!("fanlink/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(self.command_timeout)
            .build()
            .map_err(crate::error::Error::Transport)
    }
}
