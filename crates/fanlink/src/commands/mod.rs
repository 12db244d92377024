//! Command dispatch: bridges CLI args -> core Controller -> output formatting.

pub mod config_cmd;
pub mod control;
pub mod status;
pub mod watch;

use fanlink_core::ControllerConfig;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(config, global).await,
        Command::Watch(args) => watch::handle(config, args, global).await,
        Command::Mode(args) => control::mode(config, args, global).await,
        Command::Angle(args) => control::angle(config, args, global).await,
        Command::Relay(args) => control::relay(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "not a device command".into(),
        }),
    }
}
