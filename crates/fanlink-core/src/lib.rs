// fanlink-core: State reconciliation between fanlink-api and front ends (CLI).

pub mod command;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod health;
pub mod reconcile;
pub mod rpm;
pub mod scheduler;
pub mod snapshot;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::Command;
pub use config::{ControllerConfig, DEFAULT_DEVICE_URL};
pub use controller::Controller;
pub use device::DeviceApi;
pub use error::CoreError;
pub use health::{ConnectionHealth, LinkState, RetryOutcome};
pub use reconcile::{CommandOutcome, PollOutcome, ReconciliationCore};
pub use rpm::rpm_from_angle;
pub use snapshot::{DeviceSnapshot, Field, FieldChange, Notification};
pub use stream::SnapshotStream;
