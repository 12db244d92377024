//! CLI error types with miette diagnostics.
//!
//! Maps core, config, and command outcomes into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use fanlink_config::ConfigError;
use fanlink_core::{CommandOutcome, CoreError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to fan controller at {url}")]
    #[diagnostic(
        code(fanlink::connection_failed),
        help(
            "Check that the ESP32 is powered and on the same network.\n\
             URL: {url}"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Fan controller at {url} is not responding")]
    #[diagnostic(
        code(fanlink::not_connected),
        help(
            "Last status: {status}\n\
             Re-run with -v to see the underlying error, or raise --poll-timeout-ms."
        )
    )]
    NotConnected { url: String, status: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(fanlink::timeout),
        help("Increase --poll-timeout-ms / --command-timeout-ms or check Wi-Fi signal.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Device responses ─────────────────────────────────────────────
    #[error("Fan controller rejected the request (HTTP {status})")]
    #[diagnostic(code(fanlink::rejected))]
    Rejected { status: u16 },

    #[error("Unexpected response from fan controller: {message}")]
    #[diagnostic(
        code(fanlink::invalid_response),
        help("The firmware may be a different version than this client expects.")
    )]
    InvalidResponse { message: String },

    #[error("{message}")]
    #[diagnostic(code(fanlink::command_failed))]
    CommandFailed { message: String },

    #[error("'{command}' is ignored while the fan is in automatic mode")]
    #[diagnostic(
        code(fanlink::automatic_mode),
        help("Switch to manual first: fanlink mode manual")
    )]
    AutomaticMode { command: String },

    #[error("Controller stopped before the command completed")]
    #[diagnostic(code(fanlink::stopped))]
    Stopped,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fanlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(fanlink::config),
        help("Check the config file (fanlink config path) and FANLINK_* variables.")
    )]
    Config(Box<ConfigError>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AutomaticMode { .. } => exit_code::CONFLICT,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// The device did not answer a poll. `cause` is the controller's
    /// classified last failure.
    pub fn not_responding(cause: Option<CoreError>, url: &str, status: &str) -> Self {
        Self::classified(cause).unwrap_or_else(|| Self::NotConnected {
            url: url.to_owned(),
            status: status.to_owned(),
        })
    }

    /// Turn a non-`Applied` command outcome into an error.
    pub fn from_outcome(
        outcome: CommandOutcome,
        cause: Option<CoreError>,
        command: &str,
        url: &str,
        status: &str,
    ) -> Option<Self> {
        match outcome {
            CommandOutcome::Applied => None,
            CommandOutcome::NotConnected => Some(Self::NotConnected {
                url: url.to_owned(),
                status: status.to_owned(),
            }),
            CommandOutcome::Ignored => Some(Self::AutomaticMode {
                command: command.to_owned(),
            }),
            CommandOutcome::Failed(retry) => {
                Some(Self::classified(cause).unwrap_or_else(|| Self::CommandFailed {
                    message: retry.status_lines().join(" "),
                }))
            }
        }
    }

    /// Device failures with a dedicated diagnostic. Connection-level causes
    /// fall through to the caller's generic error.
    fn classified(cause: Option<CoreError>) -> Option<Self> {
        match cause? {
            err @ (CoreError::Timeout { .. }
            | CoreError::Rejected { .. }
            | CoreError::InvalidResponse { .. }) => Some(err.into()),
            _ => None,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },
            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },
            CoreError::Rejected { status } => CliError::Rejected { status },
            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },
            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::NotStarted | CoreError::ControllerStopped => CliError::Stopped,
        }
    }
}
