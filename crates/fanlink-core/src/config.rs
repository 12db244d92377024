// ── Runtime controller configuration ──
//
// Describes *how* to reach and poll one fan controller. Never touches disk;
// front ends build a `ControllerConfig` (usually via `fanlink-config`) and
// hand it in.

use std::time::Duration;

use fanlink_api::TransportConfig;
use fanlink_api::transport::{DEFAULT_COMMAND_TIMEOUT, DEFAULT_POLL_TIMEOUT};
use url::Url;

use crate::health::DEFAULT_MAX_RETRIES;

/// Address of the bench device the firmware ships configured for.
pub const DEFAULT_DEVICE_URL: &str = "http://192.168.100.161";

/// Default polling cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Default capacity of the notification broadcast channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 256;

/// Configuration for one fan controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Device base URL (e.g., `http://192.168.100.161`).
    pub url: Url,
    /// How often to poll. Zero disables the background poller.
    pub poll_interval: Duration,
    /// Timeout for each status poll.
    pub poll_timeout: Duration,
    /// Timeout for each command.
    pub command_timeout: Duration,
    /// Consecutive failures tolerated before the link is declared down.
    pub max_retries: u32,
    /// Buffered notifications per subscriber before it starts lagging.
    pub notification_capacity: usize,
}

impl ControllerConfig {
    /// A config for `url` with default timing.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            poll_timeout: self.poll_timeout,
            command_timeout: self.command_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_timing() {
        let cfg = ControllerConfig::new(Url::parse(DEFAULT_DEVICE_URL).unwrap());
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.poll_timeout, Duration::from_secs(1));
        assert_eq!(cfg.command_timeout, Duration::from_secs(3));
        assert_eq!(cfg.max_retries, 3);
    }

    #[test]
    fn transport_carries_timeouts() {
        let mut cfg = ControllerConfig::new(Url::parse("http://fan.local").unwrap());
        cfg.poll_timeout = Duration::from_millis(250);
        let transport = cfg.transport();
        assert_eq!(transport.poll_timeout, Duration::from_millis(250));
        assert_eq!(transport.command_timeout, Duration::from_secs(3));
    }
}
