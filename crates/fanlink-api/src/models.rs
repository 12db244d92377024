// Wire types for the fan controller's JSON surface.
//
// Field names mirror the firmware exactly; no renaming happens here.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Mode string the firmware reports while it drives the fan itself.
pub const AUTO_MODE: &str = "auto";

/// Body of `GET /`.
///
/// Values are carried as the device sent them. Range checks belong to the
/// reconciliation layer, which drops out-of-range readings silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub temperature: f64,
    pub humidity: f64,
    pub mode: String,
    /// Some firmware builds report the angle as a float; the fraction is
    /// truncated.
    #[serde(deserialize_with = "integer_or_float")]
    pub angle: i64,
    pub relay: bool,
}

impl DeviceStatus {
    /// `true` when the device reports automatic mode. Any other mode string
    /// counts as manual.
    pub fn is_automatic(&self) -> bool {
        self.mode == AUTO_MODE
    }
}

fn integer_or_float<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Integer(i64),
        Float(f64),
    }

    match Number::deserialize(deserializer)? {
        Number::Integer(v) => Ok(v),
        #[allow(clippy::cast_possible_truncation)]
        Number::Float(v) if v.is_finite() => Ok(v.trunc() as i64),
        Number::Float(v) => Err(D::Error::custom(format!("angle is not a finite number: {v}"))),
    }
}

/// Body of `POST /mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRequest {
    pub auto: bool,
}

/// Body of `POST /angle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AngleRequest {
    pub angle: u8,
}

/// Body of `POST /relay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    pub state: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_firmware_payload() {
        let body = r#"{"temperature":24.5,"humidity":61,"mode":"auto","angle":120,"relay":true}"#;
        let status: DeviceStatus = serde_json::from_str(body).unwrap();
        assert!((status.temperature - 24.5).abs() < f64::EPSILON);
        assert!((status.humidity - 61.0).abs() < f64::EPSILON);
        assert!(status.is_automatic());
        assert_eq!(status.angle, 120);
        assert!(status.relay);
    }

    #[test]
    fn non_auto_mode_is_manual() {
        let body = r#"{"temperature":0,"humidity":0,"mode":"manual","angle":0,"relay":false}"#;
        let status: DeviceStatus = serde_json::from_str(body).unwrap();
        assert!(!status.is_automatic());
    }

    #[test]
    fn status_keeps_out_of_range_values() {
        let body = r#"{"temperature":150,"humidity":-3,"mode":"auto","angle":-20,"relay":false}"#;
        let status: DeviceStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.angle, -20);
        assert!(status.temperature > 100.0);
    }

    #[test]
    fn float_angle_is_truncated() {
        let body = r#"{"temperature":21,"humidity":40,"mode":"manual","angle":90.0,"relay":false}"#;
        let status: DeviceStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.angle, 90);

        let body = r#"{"temperature":21,"humidity":40,"mode":"manual","angle":45.7,"relay":false}"#;
        let status: DeviceStatus = serde_json::from_str(body).unwrap();
        assert_eq!(status.angle, 45);
    }

    #[test]
    fn non_numeric_angle_is_rejected() {
        let body = r#"{"temperature":21,"humidity":40,"mode":"manual","angle":"90","relay":false}"#;
        assert!(serde_json::from_str::<DeviceStatus>(body).is_err());
    }

    #[test]
    fn command_bodies_use_firmware_keys() {
        assert_eq!(
            serde_json::to_value(ModeRequest { auto: false }).unwrap(),
            serde_json::json!({ "auto": false })
        );
        assert_eq!(
            serde_json::to_value(AngleRequest { angle: 45 }).unwrap(),
            serde_json::json!({ "angle": 45 })
        );
        assert_eq!(
            serde_json::to_value(RelayRequest { state: true }).unwrap(),
            serde_json::json!({ "state": true })
        );
    }
}
