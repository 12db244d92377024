// ── Device snapshot and change notifications ──
//
// The snapshot is the locally cached copy of device state. It is only ever
// published whole, so angle and rpm are always observed together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{Display, EnumIter};

use crate::rpm::MIN_RPM;

/// Status line shown before the first poll completes.
pub const STARTING_MESSAGE: &str = "Starting...";

/// Status line emitted when the link comes up.
pub const CONNECTED_MESSAGE: &str = "Connected to ESP32";

/// Status line emitted when a command is attempted while the link is down.
pub const NOT_CONNECTED_MESSAGE: &str = "Not connected to ESP32";

/// Locally cached view of the fan controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    /// Degrees Celsius, `0..=100`.
    pub temperature: f64,
    /// Relative humidity percent, `0..=100`.
    pub humidity: f64,
    pub automatic_mode: bool,
    /// Servo angle, `0..=180`.
    pub current_angle: u8,
    /// Derived from `current_angle`; see [`crate::rpm::rpm_from_angle`].
    pub current_rpm: u16,
    pub relay_state: bool,
    pub is_connected: bool,
    /// Last human-readable event. Informational only.
    pub status_message: String,
    /// Time of the last successful poll.
    pub last_update: Option<DateTime<Utc>>,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            automatic_mode: true,
            current_angle: 90,
            current_rpm: MIN_RPM,
            relay_state: false,
            is_connected: false,
            status_message: STARTING_MESSAGE.to_owned(),
            last_update: None,
        }
    }
}

impl DeviceSnapshot {
    /// Every device-sourced field, in announcement order.
    pub fn all_fields(&self) -> Vec<FieldChange> {
        vec![
            FieldChange::Temperature(self.temperature),
            FieldChange::Humidity(self.humidity),
            FieldChange::Mode(self.automatic_mode),
            FieldChange::Angle(self.current_angle),
            FieldChange::Rpm(self.current_rpm),
            FieldChange::Relay(self.relay_state),
        ]
    }

    /// `"automatic"` or `"manual"`.
    pub fn mode_label(&self) -> &'static str {
        mode_label(self.automatic_mode)
    }
}

pub(crate) fn mode_label(automatic: bool) -> &'static str {
    if automatic { "automatic" } else { "manual" }
}

/// Device-sourced snapshot fields that carry change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Temperature,
    Humidity,
    Mode,
    Angle,
    Rpm,
    Relay,
}

/// A field together with its newly announced value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Temperature(f64),
    Humidity(f64),
    Mode(bool),
    Angle(u8),
    Rpm(u16),
    Relay(bool),
}

impl FieldChange {
    pub fn field(&self) -> Field {
        match self {
            Self::Temperature(_) => Field::Temperature,
            Self::Humidity(_) => Field::Humidity,
            Self::Mode(_) => Field::Mode,
            Self::Angle(_) => Field::Angle,
            Self::Rpm(_) => Field::Rpm,
            Self::Relay(_) => Field::Relay,
        }
    }
}

/// Events broadcast to front ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    /// One batch of field announcements. A poll that changed anything
    /// re-announces every field; a command announces only what it touched.
    Changed { fields: Vec<FieldChange> },
    /// The link went up or down.
    Connection { connected: bool },
    /// New status line.
    Status { message: String },
}
