// ── Servo angle → fan speed model ──
//
// The firmware throttles the fan with a servo; speed grows linearly from
// MIN_RPM at 0° to MAX_RPM at MAX_ANGLE.

/// Largest servo angle the device accepts.
pub const MAX_ANGLE: u8 = 180;

/// Estimated speed at 0°.
pub const MIN_RPM: u16 = 526;

/// Estimated speed at [`MAX_ANGLE`].
pub const MAX_RPM: u16 = 1052;

/// Estimated rotational speed for a servo angle.
///
/// Linear interpolation between [`MIN_RPM`] and [`MAX_RPM`], truncated.
/// `angle` is expected to be pre-validated to `0..=180`; larger values are
/// clamped so the result never leaves the model's range.
pub fn rpm_from_angle(angle: u8) -> u16 {
    let angle = u32::from(angle.min(MAX_ANGLE));
    let span = u32::from(MAX_RPM - MIN_RPM);
    let offset = angle * span / u32::from(MAX_ANGLE);
    // offset <= span, so this always fits.
    MIN_RPM + u16::try_from(offset).unwrap_or(MAX_RPM - MIN_RPM)
}
