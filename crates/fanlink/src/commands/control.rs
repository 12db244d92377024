//! `fanlink mode | angle | relay`: poll once, send one command, report.

use std::future::Future;

use fanlink_core::{CommandOutcome, Controller, ControllerConfig, CoreError};

use crate::cli::{AngleArgs, FanMode, GlobalOpts, ModeArgs, RelayArgs, RelayState};
use crate::error::CliError;
use crate::output;

pub async fn mode(config: ControllerConfig, args: ModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let automatic = args.mode == FanMode::Auto;
    send(config, global, "mode", move |ctrl| async move { ctrl.set_mode(automatic).await }).await
}

pub async fn angle(config: ControllerConfig, args: AngleArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let angle = i32::from(args.angle);
    send(config, global, "angle", move |ctrl| async move { ctrl.set_angle(angle).await }).await
}

pub async fn relay(config: ControllerConfig, args: RelayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let state = args.state == RelayState::On;
    send(config, global, "relay", move |ctrl| async move { ctrl.set_relay(state).await }).await
}

/// Run one command through a one-shot controller and print the status
/// line it produced (or the snapshot, for structured output).
async fn send<F, Fut>(
    config: ControllerConfig,
    global: &GlobalOpts,
    command: &str,
    f: F,
) -> Result<(), CliError>
where
    F: FnOnce(Controller) -> Fut,
    Fut: Future<Output = Result<CommandOutcome, CoreError>>,
{
    let url = config.url.to_string();

    let (outcome, snap, cause) = Controller::oneshot(config, |ctrl| async move {
        let outcome = f(ctrl.clone()).await?;
        Ok((outcome, ctrl.snapshot(), ctrl.last_error().await))
    })
    .await?;

    tracing::debug!(?outcome, command, "command finished");
    if let Some(err) = CliError::from_outcome(outcome, cause, command, &url, &snap.status_message) {
        return Err(err);
    }

    let rendered = output::render_single(
        output::format(global),
        &snap,
        |s| s.status_message.clone(),
        |s| s.status_message.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
