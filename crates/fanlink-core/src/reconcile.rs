// ── Reconciliation core ──
//
// Owns the snapshot. Polls merge device state field by field under range
// and change checks; commands apply their local update only after the
// device acknowledges. Every failure goes through `ConnectionHealth`.

use chrono::Utc;
use fanlink_api::DeviceStatus;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use crate::device::DeviceApi;
use crate::error::CoreError;
use crate::health::{ConnectionHealth, RetryOutcome};
use crate::rpm::{MAX_ANGLE, rpm_from_angle};
use crate::snapshot::{
    CONNECTED_MESSAGE, DeviceSnapshot, FieldChange, NOT_CONNECTED_MESSAGE, Notification,
    mode_label,
};

/// Valid range for temperature and humidity readings.
const SENSOR_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

const POLL_CONTEXT: &str = "Connection error";
const MODE_CONTEXT: &str = "Error setting mode";
const ANGLE_CONTEXT: &str = "Error setting angle";
const RELAY_CONTEXT: &str = "Error setting relay";

/// Result of one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The device answered.
    Merged {
        /// At least one field was accepted (a change batch was emitted).
        changed: bool,
        /// This poll brought the link up.
        reconnected: bool,
    },
    /// The device could not be read; the snapshot is untouched.
    Failed(RetryOutcome),
}

/// Result of one user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Device acknowledged; local state updated.
    Applied,
    /// Link is down; a status line was emitted and nothing was sent.
    NotConnected,
    /// A silent guard rejected the command (automatic mode or out-of-range
    /// value). Nothing was sent.
    Ignored,
    /// The device call failed.
    Failed(RetryOutcome),
}

/// Single writer of the [`DeviceSnapshot`].
///
/// Not internally synchronized: callers must serialize access (the
/// [`Controller`](crate::Controller) keeps it behind one mutex).
pub struct ReconciliationCore<D> {
    device: D,
    snapshot: DeviceSnapshot,
    health: ConnectionHealth,
    /// Classified cause of the latest failed exchange, cleared by the next
    /// successful one.
    last_error: Option<CoreError>,
    snapshot_tx: watch::Sender<DeviceSnapshot>,
    notify_tx: broadcast::Sender<Notification>,
}

impl<D: DeviceApi> ReconciliationCore<D> {
    pub fn new(device: D, max_retries: u32, notification_capacity: usize) -> Self {
        let snapshot = DeviceSnapshot::default();
        let (snapshot_tx, _) = watch::channel(snapshot.clone());
        let (notify_tx, _) = broadcast::channel(notification_capacity.max(1));

        Self {
            device,
            snapshot,
            health: ConnectionHealth::new(max_retries),
            last_error: None,
            snapshot_tx,
            notify_tx,
        }
    }

    pub fn snapshot(&self) -> &DeviceSnapshot {
        &self.snapshot
    }

    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    /// Watch the published snapshot.
    pub fn subscribe_snapshot(&self) -> watch::Receiver<DeviceSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Subscribe to change, connection, and status notifications.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notify_tx.subscribe()
    }

    pub(crate) fn notification_sender(&self) -> broadcast::Sender<Notification> {
        self.notify_tx.clone()
    }

    // ── Poll ─────────────────────────────────────────────────────────

    /// Read the device and reconcile its state into the snapshot.
    pub async fn poll(&mut self) -> PollOutcome {
        let status = match self.device.fetch_status().await {
            Ok(status) => status,
            Err(e) => {
                let outcome = self.record_failure(POLL_CONTEXT, &e);
                self.publish();
                return PollOutcome::Failed(outcome);
            }
        };

        self.last_error = None;
        let reconnected = self.health.on_success();
        if reconnected {
            self.snapshot.is_connected = true;
        }

        let changed = self.merge(&status);
        self.snapshot.last_update = Some(Utc::now());

        if changed {
            self.notify(Notification::Changed {
                fields: self.snapshot.all_fields(),
            });
        }

        if reconnected {
            self.notify(Notification::Connection { connected: true });
            self.set_status(CONNECTED_MESSAGE);
        }

        self.publish();
        debug!(changed, reconnected, "poll reconciled");

        PollOutcome::Merged {
            changed,
            reconnected,
        }
    }

    /// Apply each field independently. Out-of-range readings are dropped
    /// without comment.
    #[allow(clippy::float_cmp)]
    fn merge(&mut self, status: &DeviceStatus) -> bool {
        let mut changed = false;

        if SENSOR_RANGE.contains(&status.temperature)
            && self.snapshot.temperature != status.temperature
        {
            self.snapshot.temperature = status.temperature;
            changed = true;
        }

        if SENSOR_RANGE.contains(&status.humidity) && self.snapshot.humidity != status.humidity {
            self.snapshot.humidity = status.humidity;
            changed = true;
        }

        let automatic = status.is_automatic();
        if automatic != self.snapshot.automatic_mode {
            self.snapshot.automatic_mode = automatic;
            changed = true;
        }

        if let Some(angle) = valid_angle(status.angle) {
            if angle != self.snapshot.current_angle {
                self.apply_angle(angle);
                changed = true;
            }
        }

        if status.relay != self.snapshot.relay_state {
            self.snapshot.relay_state = status.relay;
            changed = true;
        }

        changed
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Switch between automatic and manual control.
    pub async fn set_mode(&mut self, automatic: bool) -> CommandOutcome {
        if !self.require_connection() {
            return CommandOutcome::NotConnected;
        }

        let outcome = match self.device.set_mode(automatic).await {
            Ok(()) => {
                self.last_error = None;
                self.snapshot.automatic_mode = automatic;
                self.notify(Notification::Changed {
                    fields: vec![FieldChange::Mode(automatic)],
                });
                self.set_status(&format!("Mode changed to: {}", mode_label(automatic)));
                CommandOutcome::Applied
            }
            Err(e) => CommandOutcome::Failed(self.record_failure(MODE_CONTEXT, &e)),
        };

        self.publish();
        outcome
    }

    /// Move the servo. Ignored in automatic mode or outside `0..=180`.
    pub async fn set_angle(&mut self, angle: i32) -> CommandOutcome {
        if !self.require_connection() {
            return CommandOutcome::NotConnected;
        }

        let Some(angle) = valid_angle(i64::from(angle)) else {
            debug!(angle, "angle out of range, ignoring");
            return CommandOutcome::Ignored;
        };
        if self.snapshot.automatic_mode {
            debug!("automatic mode, ignoring angle command");
            return CommandOutcome::Ignored;
        }

        let outcome = match self.device.set_angle(angle).await {
            Ok(()) => {
                self.last_error = None;
                self.apply_angle(angle);
                let rpm = self.snapshot.current_rpm;
                self.notify(Notification::Changed {
                    fields: vec![FieldChange::Angle(angle), FieldChange::Rpm(rpm)],
                });
                self.set_status(&format!("Angle set to: {angle}° (RPM: {rpm})"));
                CommandOutcome::Applied
            }
            Err(e) => CommandOutcome::Failed(self.record_failure(ANGLE_CONTEXT, &e)),
        };

        self.publish();
        outcome
    }

    /// Switch the fan relay. Ignored in automatic mode.
    pub async fn set_relay(&mut self, state: bool) -> CommandOutcome {
        if !self.require_connection() {
            return CommandOutcome::NotConnected;
        }

        if self.snapshot.automatic_mode {
            debug!("automatic mode, ignoring relay command");
            return CommandOutcome::Ignored;
        }

        let outcome = match self.device.set_relay(state).await {
            Ok(()) => {
                self.last_error = None;
                self.snapshot.relay_state = state;
                self.notify(Notification::Changed {
                    fields: vec![FieldChange::Relay(state)],
                });
                self.set_status(if state { "Fan turned on" } else { "Fan turned off" });
                CommandOutcome::Applied
            }
            Err(e) => CommandOutcome::Failed(self.record_failure(RELAY_CONTEXT, &e)),
        };

        self.publish();
        outcome
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Angle and rpm always move together.
    fn apply_angle(&mut self, angle: u8) {
        self.snapshot.current_angle = angle;
        self.snapshot.current_rpm = rpm_from_angle(angle);
    }

    fn require_connection(&mut self) -> bool {
        if self.snapshot.is_connected {
            return true;
        }
        self.set_status(NOT_CONNECTED_MESSAGE);
        self.publish();
        false
    }

    fn record_failure(&mut self, context: &str, cause: &fanlink_api::Error) -> RetryOutcome {
        let outcome = self.health.on_failure(context, cause);
        self.last_error = Some(cause.into());

        if let RetryOutcome::Exhausted { was_connected, .. } = &outcome {
            self.snapshot.is_connected = false;
            if *was_connected {
                self.notify(Notification::Connection { connected: false });
            }
        }

        for line in outcome.status_lines() {
            self.set_status(&line);
        }

        outcome
    }

    fn set_status(&mut self, message: &str) {
        info!(status = message);
        message.clone_into(&mut self.snapshot.status_message);
        self.notify(Notification::Status {
            message: message.to_owned(),
        });
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine.
        let _ = self.notify_tx.send(notification);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot.clone());
    }
}

fn valid_angle(raw: i64) -> Option<u8> {
    u8::try_from(raw).ok().filter(|a| *a <= MAX_ANGLE)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::device::mock::{Call, MockDevice, Reply, status};

    fn core() -> (MockDevice, ReconciliationCore<MockDevice>) {
        let device = MockDevice::default();
        let core = ReconciliationCore::new(device.clone(), 3, 64);
        (device, core)
    }

    /// Core that has completed one manual-mode poll.
    async fn connected_manual() -> (MockDevice, ReconciliationCore<MockDevice>) {
        let (device, mut core) = core();
        device.push_status(Reply::Ok(status(22.0, 40.0, false, 90, false)));
        core.poll().await;
        assert!(core.snapshot().is_connected);
        (device, core)
    }

    fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(n) => out.push(n),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return out,
                Err(TryRecvError::Lagged(_)) => {}
            }
        }
    }

    fn statuses(notes: &[Notification]) -> Vec<String> {
        notes
            .iter()
            .filter_map(|n| match n {
                Notification::Status { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn batches(notes: &[Notification]) -> usize {
        notes
            .iter()
            .filter(|n| matches!(n, Notification::Changed { .. }))
            .count()
    }

    // ── Poll ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_poll_merges_and_connects() {
        let (device, mut core) = core();
        let mut rx = core.subscribe_notifications();
        device.push_status(Reply::Ok(status(24.5, 55.0, false, 120, true)));

        let outcome = core.poll().await;

        assert_eq!(
            outcome,
            PollOutcome::Merged {
                changed: true,
                reconnected: true
            }
        );
        let s = core.snapshot();
        assert!((s.temperature - 24.5).abs() < f64::EPSILON);
        assert!((s.humidity - 55.0).abs() < f64::EPSILON);
        assert!(!s.automatic_mode);
        assert_eq!(s.current_angle, 120);
        assert_eq!(s.current_rpm, rpm_from_angle(120));
        assert!(s.relay_state);
        assert!(s.is_connected);
        assert!(s.last_update.is_some());
        assert_eq!(s.status_message, "Connected to ESP32");

        let notes = drain(&mut rx);
        assert_eq!(batches(&notes), 1);
        assert!(notes.contains(&Notification::Connection { connected: true }));
        assert_eq!(statuses(&notes), vec!["Connected to ESP32".to_owned()]);
    }

    #[tokio::test]
    async fn identical_payload_batches_once() {
        let (device, mut core) = core();
        let mut rx = core.subscribe_notifications();
        let payload = status(30.0, 60.0, true, 45, false);
        device.push_status(Reply::Ok(payload.clone()));
        device.push_status(Reply::Ok(payload));

        core.poll().await;
        assert_eq!(batches(&drain(&mut rx)), 1);

        let second = core.poll().await;
        assert_eq!(
            second,
            PollOutcome::Merged {
                changed: false,
                reconnected: false
            }
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn batch_reannounces_every_field() {
        let (device, mut core) = connected_manual().await;
        let mut rx = core.subscribe_notifications();
        device.push_status(Reply::Ok(status(22.0, 40.0, false, 90, true)));

        core.poll().await;

        let notes = drain(&mut rx);
        assert_eq!(
            notes,
            vec![Notification::Changed {
                fields: vec![
                    FieldChange::Temperature(22.0),
                    FieldChange::Humidity(40.0),
                    FieldChange::Mode(false),
                    FieldChange::Angle(90),
                    FieldChange::Rpm(789),
                    FieldChange::Relay(true),
                ]
            }]
        );
    }

    #[tokio::test]
    async fn out_of_range_temperature_is_dropped_but_connects() {
        let (device, mut core) = core();
        device.push_status(Reply::Ok(status(150.0, 50.0, true, 90, false)));

        core.poll().await;

        let s = core.snapshot();
        assert!((s.temperature - 0.0).abs() < f64::EPSILON);
        assert!((s.humidity - 50.0).abs() < f64::EPSILON);
        assert!(s.is_connected);
    }

    #[tokio::test]
    async fn out_of_range_values_do_not_count_as_change() {
        let (device, mut core) = connected_manual().await;
        let mut rx = core.subscribe_notifications();
        device.push_status(Reply::Ok(status(-5.0, 101.0, false, 200, false)));

        let outcome = core.poll().await;

        assert_eq!(
            outcome,
            PollOutcome::Merged {
                changed: false,
                reconnected: false
            }
        );
        assert_eq!(core.snapshot().current_angle, 90);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn negative_angle_is_dropped() {
        let (device, mut core) = connected_manual().await;
        device.push_status(Reply::Ok(status(22.0, 40.0, false, -1, false)));

        core.poll().await;

        assert_eq!(core.snapshot().current_angle, 90);
    }

    #[tokio::test]
    async fn polled_angle_recomputes_rpm() {
        let (device, mut core) = connected_manual().await;
        let mut snapshots = core.subscribe_snapshot();
        device.push_status(Reply::Ok(status(22.0, 40.0, false, 0, false)));

        core.poll().await;

        let published = snapshots.borrow_and_update().clone();
        assert_eq!(published.current_angle, 0);
        assert_eq!(published.current_rpm, 526);
        assert_eq!(published, *core.snapshot());
    }

    #[tokio::test]
    async fn failed_poll_leaves_snapshot_untouched() {
        let (device, mut core) = connected_manual().await;
        let before = core.snapshot().clone();
        device.push_status(Reply::Status(500));

        let outcome = core.poll().await;

        assert_eq!(outcome, PollOutcome::Failed(RetryOutcome::Grace { attempt: 1, max: 3 }));
        let after = core.snapshot();
        assert_eq!(after.current_angle, before.current_angle);
        assert_eq!(after.last_update, before.last_update);
        assert!(after.is_connected);
        assert_eq!(after.status_message, "Retry attempt 1/3...");
    }

    #[tokio::test]
    async fn three_timeouts_drop_link_then_recover() {
        let (device, mut core) = connected_manual().await;
        let mut rx = core.subscribe_notifications();
        for _ in 0..3 {
            device.push_status(Reply::Timeout);
        }

        core.poll().await;
        core.poll().await;
        assert!(core.snapshot().is_connected);
        let third = core.poll().await;

        assert!(matches!(third, PollOutcome::Failed(RetryOutcome::Exhausted { .. })));
        assert!(!core.snapshot().is_connected);
        assert_eq!(core.health().retry_count(), 0);

        let notes = drain(&mut rx);
        assert_eq!(
            statuses(&notes),
            vec![
                "Retry attempt 1/3...".to_owned(),
                "Retry attempt 2/3...".to_owned(),
                "Connection error: Request timed out after 1000ms".to_owned(),
                "Waiting to retry connection...".to_owned(),
            ]
        );
        assert!(notes.contains(&Notification::Connection { connected: false }));

        device.push_status(Reply::Ok(status(22.0, 40.0, false, 90, false)));
        device.push_status(Reply::Ok(status(22.0, 40.0, false, 90, false)));
        core.poll().await;
        core.poll().await;

        assert!(core.snapshot().is_connected);
        let connected: Vec<String> = statuses(&drain(&mut rx));
        assert_eq!(connected, vec!["Connected to ESP32".to_owned()]);
    }

    #[tokio::test]
    async fn last_error_classifies_failure_until_next_success() {
        let (device, mut core) = connected_manual().await;
        assert_eq!(core.last_error(), None);

        device.push_status(Reply::Timeout);
        core.poll().await;
        assert_eq!(core.last_error(), Some(&CoreError::Timeout { timeout_ms: 1000 }));

        device.push_command(Reply::Status(503));
        core.set_relay(true).await;
        assert_eq!(core.last_error(), Some(&CoreError::Rejected { status: 503 }));

        device.push_status(Reply::Ok(status(22.0, 40.0, false, 90, false)));
        core.poll().await;
        assert_eq!(core.last_error(), None);
    }

    // ── Commands ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn relay_while_disconnected_sends_nothing() {
        let (device, mut core) = core();
        let mut rx = core.subscribe_notifications();

        let outcome = core.set_relay(true).await;

        assert_eq!(outcome, CommandOutcome::NotConnected);
        assert!(device.calls().is_empty());
        assert!(!core.snapshot().relay_state);
        assert_eq!(core.snapshot().status_message, "Not connected to ESP32");
        assert_eq!(statuses(&drain(&mut rx)), vec!["Not connected to ESP32".to_owned()]);
    }

    #[tokio::test]
    async fn angle_in_automatic_mode_is_silent() {
        let (device, mut core) = core();
        device.push_status(Reply::Ok(status(22.0, 40.0, true, 30, false)));
        core.poll().await;
        let before = core.snapshot().clone();
        let mut rx = core.subscribe_notifications();

        let outcome = core.set_angle(90).await;

        assert_eq!(outcome, CommandOutcome::Ignored);
        assert_eq!(device.calls(), vec![Call::FetchStatus]);
        assert_eq!(*core.snapshot(), before);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn angle_out_of_range_is_silent() {
        let (device, mut core) = connected_manual().await;

        assert_eq!(core.set_angle(181).await, CommandOutcome::Ignored);
        assert_eq!(core.set_angle(-1).await, CommandOutcome::Ignored);
        assert_eq!(device.calls(), vec![Call::FetchStatus]);
    }

    #[tokio::test]
    async fn angle_acknowledged_updates_snapshot() {
        let (device, mut core) = connected_manual().await;
        let mut rx = core.subscribe_notifications();

        let outcome = core.set_angle(180).await;

        assert_eq!(outcome, CommandOutcome::Applied);
        assert_eq!(device.calls(), vec![Call::FetchStatus, Call::SetAngle(180)]);
        let s = core.snapshot();
        assert_eq!(s.current_angle, 180);
        assert_eq!(s.current_rpm, 1052);
        assert_eq!(s.status_message, "Angle set to: 180° (RPM: 1052)");

        let notes = drain(&mut rx);
        assert_eq!(
            notes.first(),
            Some(&Notification::Changed {
                fields: vec![FieldChange::Angle(180), FieldChange::Rpm(1052)]
            })
        );
    }

    #[tokio::test]
    async fn angle_failure_keeps_old_value() {
        let (device, mut core) = connected_manual().await;
        device.push_command(Reply::Status(500));

        let outcome = core.set_angle(10).await;

        assert_eq!(outcome, CommandOutcome::Failed(RetryOutcome::Grace { attempt: 1, max: 3 }));
        assert_eq!(core.snapshot().current_angle, 90);
        assert_eq!(core.snapshot().status_message, "Retry attempt 1/3...");
    }

    #[tokio::test]
    async fn mode_change_acknowledged() {
        let (device, mut core) = connected_manual().await;

        let outcome = core.set_mode(true).await;

        assert_eq!(outcome, CommandOutcome::Applied);
        assert!(core.snapshot().automatic_mode);
        assert_eq!(core.snapshot().status_message, "Mode changed to: automatic");
        assert_eq!(device.calls().last(), Some(&Call::SetMode(true)));

        core.set_mode(false).await;
        assert_eq!(core.snapshot().status_message, "Mode changed to: manual");
    }

    #[tokio::test]
    async fn mode_failure_uses_mode_context() {
        let (device, mut core) = connected_manual().await;
        for _ in 0..3 {
            device.push_command(Reply::Timeout);
        }

        core.set_mode(true).await;
        core.set_mode(true).await;
        let outcome = core.set_mode(true).await;

        assert_eq!(
            outcome,
            CommandOutcome::Failed(RetryOutcome::Exhausted {
                message: "Error setting mode: Request timed out after 1000ms".into(),
                was_connected: true,
            })
        );
        assert!(!core.snapshot().automatic_mode);
        assert!(!core.snapshot().is_connected);
    }

    #[tokio::test]
    async fn relay_toggles_in_manual_mode() {
        let (device, mut core) = connected_manual().await;

        assert_eq!(core.set_relay(true).await, CommandOutcome::Applied);
        assert!(core.snapshot().relay_state);
        assert_eq!(core.snapshot().status_message, "Fan turned on");

        assert_eq!(core.set_relay(false).await, CommandOutcome::Applied);
        assert!(!core.snapshot().relay_state);
        assert_eq!(core.snapshot().status_message, "Fan turned off");
        assert_eq!(
            device.calls(),
            vec![Call::FetchStatus, Call::SetRelay(true), Call::SetRelay(false)]
        );
    }

    #[tokio::test]
    async fn relay_in_automatic_mode_is_silent() {
        let (device, mut core) = core();
        device.push_status(Reply::Ok(status(22.0, 40.0, true, 90, false)));
        core.poll().await;

        assert_eq!(core.set_relay(true).await, CommandOutcome::Ignored);
        assert_eq!(device.calls(), vec![Call::FetchStatus]);
        assert!(!core.snapshot().relay_state);
    }

    #[tokio::test]
    async fn command_failures_share_retry_budget_with_polls() {
        let (device, mut core) = connected_manual().await;
        device.push_status(Reply::Timeout);
        device.push_command(Reply::Timeout);

        core.poll().await;
        let outcome = core.set_relay(true).await;

        assert_eq!(outcome, CommandOutcome::Failed(RetryOutcome::Grace { attempt: 2, max: 3 }));
    }
}
