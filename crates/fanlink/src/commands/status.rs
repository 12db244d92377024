//! `fanlink status`: one poll, rendered.

use chrono::Local;
use tabled::Tabled;

use fanlink_core::{Controller, ControllerConfig, DeviceSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}

fn rows(snap: &DeviceSnapshot, color: bool) -> Vec<FieldRow> {
    let last_update = snap.last_update.map_or_else(
        || "never".to_owned(),
        |t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    vec![
        FieldRow { field: "Connection", value: output::connection_label(snap.is_connected, color) },
        FieldRow { field: "Temperature", value: format!("{:.1} °C", snap.temperature) },
        FieldRow { field: "Humidity", value: format!("{:.1} %", snap.humidity) },
        FieldRow { field: "Mode", value: snap.mode_label().to_owned() },
        FieldRow { field: "Angle", value: format!("{}°", snap.current_angle) },
        FieldRow { field: "RPM", value: snap.current_rpm.to_string() },
        FieldRow { field: "Relay", value: on_off(snap.relay_state).to_owned() },
        FieldRow { field: "Status", value: snap.status_message.clone() },
        FieldRow { field: "Last update", value: output::dim(&last_update, color) },
    ]
}

fn plain(snap: &DeviceSnapshot) -> String {
    [
        format!("connected={}", snap.is_connected),
        format!("temperature={}", snap.temperature),
        format!("humidity={}", snap.humidity),
        format!("mode={}", snap.mode_label()),
        format!("angle={}", snap.current_angle),
        format!("rpm={}", snap.current_rpm),
        format!("relay={}", on_off(snap.relay_state)),
    ]
    .join("\n")
}

/// Render a snapshot in the selected output format.
pub fn render(snap: &DeviceSnapshot, global: &GlobalOpts) -> String {
    let color = output::should_color(global);
    output::render_single(
        output::format(global),
        snap,
        |s| output::render_table(&rows(s, color)),
        plain,
    )
}

pub async fn handle(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let url = config.url.to_string();
    let (snap, cause) = Controller::oneshot(config, |ctrl| async move {
        Ok((ctrl.snapshot(), ctrl.last_error().await))
    })
    .await?;

    if !snap.is_connected {
        return Err(CliError::not_responding(cause, &url, &snap.status_message));
    }

    output::print_output(&render(&snap, global), global.quiet);
    Ok(())
}
