//! `fanlink watch`: run the controller and stream notifications until Ctrl-C.

use std::future::Future;
use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use fanlink_core::{Controller, ControllerConfig, FieldChange, Notification};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(
    mut config: ControllerConfig,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ms) = args.interval_ms {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "--interval-ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.poll_interval = Duration::from_millis(ms);
    }

    let controller = Controller::new(config)?;
    let notes = controller.notifications();
    controller.start().await?;

    let format = output::format(global);
    let color = output::should_color(global);

    pump(notes, tokio::signal::ctrl_c(), |note| {
        output::print_output(&render(&note, format, color), global.quiet);
    })
    .await;

    controller.shutdown().await;
    Ok(())
}

/// Hand every notification to `emit` until `interrupt` resolves or the
/// controller goes away. `interrupt` is polled across iterations, so a
/// signal is never dropped between two receives.
async fn pump<I, F>(mut notes: broadcast::Receiver<Notification>, interrupt: I, mut emit: F)
where
    I: Future,
    F: FnMut(Notification),
{
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            _ = &mut interrupt => {
                info!("interrupted");
                break;
            }
            note = notes.recv() => match note {
                Ok(note) => emit(note),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notification stream lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// One line per notification. Structured formats emit one JSON/YAML
/// document per event.
fn render(note: &Notification, format: &OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(note, true),
        OutputFormat::Yaml => format!("---\n{}", output::render_yaml(note).trim_end()),
        OutputFormat::Table | OutputFormat::Plain => {
            let stamp = output::dim(&Local::now().format("%H:%M:%S").to_string(), color);
            format!("{stamp} {}", describe(note, color))
        }
    }
}

fn describe(note: &Notification, color: bool) -> String {
    match note {
        Notification::Changed { fields } => fields
            .iter()
            .map(describe_field)
            .collect::<Vec<_>>()
            .join(" "),
        Notification::Connection { connected } => output::connection_label(*connected, color),
        Notification::Status { message } => message.clone(),
    }
}

fn describe_field(change: &FieldChange) -> String {
    let value = match change {
        FieldChange::Temperature(v) | FieldChange::Humidity(v) => format!("{v:.1}"),
        FieldChange::Mode(auto) => if *auto { "automatic" } else { "manual" }.to_owned(),
        FieldChange::Angle(a) => a.to_string(),
        FieldChange::Rpm(r) => r.to_string(),
        FieldChange::Relay(on) => if *on { "on" } else { "off" }.to_owned(),
    };
    format!("{}={value}", change.field())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pump_returns_on_interrupt_while_idle() {
        let (tx, rx) = broadcast::channel::<Notification>(8);
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        stop_tx.send(()).unwrap();

        let mut seen = Vec::new();
        pump(rx, stop_rx, |note| seen.push(note)).await;

        assert!(seen.is_empty());
        // Sender still alive: only the interrupt can have ended the loop.
        drop(tx);
    }

    #[tokio::test]
    async fn pump_stops_when_controller_is_gone() {
        let (tx, rx) = broadcast::channel(8);
        tx.send(Notification::Status { message: "last".into() }).unwrap();
        drop(tx);

        let mut seen = Vec::new();
        pump(rx, std::future::pending::<()>(), |note| seen.push(note)).await;

        assert_eq!(
            seen,
            vec![Notification::Status { message: "last".into() }]
        );
    }

    #[test]
    fn change_batches_render_as_pairs() {
        let note = Notification::Changed {
            fields: vec![FieldChange::Angle(180), FieldChange::Rpm(1052)],
        };
        assert_eq!(describe(&note, false), "angle=180 rpm=1052");
    }

    #[test]
    fn json_lines_are_tagged() {
        let note = Notification::Connection { connected: false };
        assert_eq!(
            render(&note, &OutputFormat::Json, false),
            r#"{"kind":"connection","connected":false}"#
        );
    }

    #[test]
    fn status_lines_pass_through() {
        let note = Notification::Status {
            message: "Retry attempt 1/3...".into(),
        };
        assert!(render(&note, &OutputFormat::Plain, false).ends_with(" Retry attempt 1/3..."));
    }
}
