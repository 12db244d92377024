// ── Command API ──
//
// User actions travel through a single mpsc queue to the controller's
// command processor, so they run one at a time and in order.

use crate::reconcile::CommandOutcome;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<CommandOutcome>,
}

/// User-initiated writes to the fan controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode { automatic: bool },
    /// Unvalidated; out-of-range values are ignored by the core.
    SetAngle { angle: i32 },
    SetRelay { state: bool },
}
