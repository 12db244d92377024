// ── Connection health ──
//
// Bounded-retry tracker. Single failures only count toward a grace window;
// reaching `max_retries` flips the link down and restarts the count.

use std::fmt::Display;

use tracing::{error, info, warn};

/// Default number of consecutive failures tolerated before the link is
/// declared down.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Follow-up status line emitted after the retry budget is exhausted.
pub const WAITING_MESSAGE: &str = "Waiting to retry connection...";

/// Link state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// What a single failure did to the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Still inside the grace window; link state unchanged.
    Grace { attempt: u32, max: u32 },
    /// Retry budget used up. The link is down and the counter was reset.
    Exhausted {
        /// `"{context}: {cause}"`.
        message: String,
        /// Whether this failure is what took the link down.
        was_connected: bool,
    },
}

impl RetryOutcome {
    /// Human-readable status lines for this outcome, in emission order.
    pub fn status_lines(&self) -> Vec<String> {
        match self {
            Self::Grace { attempt, max } => vec![format!("Retry attempt {attempt}/{max}...")],
            Self::Exhausted { message, .. } => vec![message.clone(), WAITING_MESSAGE.to_owned()],
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Converts a stream of poll/command results into a connected/disconnected
/// status.
#[derive(Debug, Clone)]
pub struct ConnectionHealth {
    state: LinkState,
    retry_count: u32,
    max_retries: u32,
}

impl Default for ConnectionHealth {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl ConnectionHealth {
    /// A tracker starting in [`LinkState::Disconnected`]. A `max_retries` of
    /// zero is treated as one.
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: LinkState::Disconnected,
            retry_count: 0,
            max_retries: max_retries.max(1),
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Record a successful exchange with the device.
    ///
    /// Returns `true` only on the Disconnected → Connected transition.
    pub fn on_success(&mut self) -> bool {
        self.retry_count = 0;
        if self.state == LinkState::Connected {
            return false;
        }
        self.state = LinkState::Connected;
        info!("device link up");
        true
    }

    /// Record a failed exchange. `context` names the operation that failed.
    pub fn on_failure(&mut self, context: &str, cause: &dyn Display) -> RetryOutcome {
        self.retry_count = self.retry_count.saturating_add(1);

        if self.retry_count < self.max_retries {
            warn!(
                context,
                error = %cause,
                attempt = self.retry_count,
                max = self.max_retries,
                "device request failed, inside grace window"
            );
            return RetryOutcome::Grace {
                attempt: self.retry_count,
                max: self.max_retries,
            };
        }

        let was_connected = self.state == LinkState::Connected;
        self.state = LinkState::Disconnected;
        self.retry_count = 0;

        let message = format!("{context}: {cause}");
        error!(context, error = %cause, was_connected, "device link down");

        RetryOutcome::Exhausted {
            message,
            was_connected,
        }
    }
}
