// ── Controller abstraction ──
//
// Lifecycle for one fan controller: periodic polling, serialized command
// dispatch, and reactive snapshot/notification streaming on top of the
// `ReconciliationCore`.

use std::future::Future;
use std::sync::Arc;

use fanlink_api::DeviceClient;
use tokio::sync::{Mutex, broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::command::{Command, CommandEnvelope};
use crate::config::ControllerConfig;
use crate::device::DeviceApi;
use crate::error::CoreError;
use crate::reconcile::{CommandOutcome, PollOutcome, ReconciliationCore};
use crate::scheduler::spawn_periodic;
use crate::snapshot::{DeviceSnapshot, Notification};
use crate::stream::SnapshotStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Polls and commands both
/// run under one lock on the reconciliation core, so they never interleave,
/// and commands are drained by a single processor task in submission order.
pub struct Controller<D: DeviceApi = DeviceClient> {
    inner: Arc<ControllerInner<D>>,
}

impl<D: DeviceApi> Clone for Controller<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<D> {
    config: ControllerConfig,
    core: Mutex<ReconciliationCore<D>>,
    snapshot_rx: watch::Receiver<DeviceSnapshot>,
    notify_tx: broadcast::Sender<Notification>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Controller<DeviceClient> {
    /// Create a controller talking HTTP to `config.url`. Does NOT poll --
    /// call [`start()`](Self::start) to connect and spawn background tasks.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let device = DeviceClient::new(config.url.clone(), &config.transport())?;
        Ok(Self::with_device(config, device))
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, run closure, shut down.
    ///
    /// Disables the periodic poller since a single invocation only needs
    /// the initial poll plus whatever the closure does.
    pub async fn oneshot<F, Fut, T>(config: ControllerConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = std::time::Duration::ZERO;

        let controller = Controller::new(cfg)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }
}

impl<D: DeviceApi> Controller<D> {
    /// Create a controller over any [`DeviceApi`] implementation.
    pub fn with_device(config: ControllerConfig, device: D) -> Self {
        let core = ReconciliationCore::new(device, config.max_retries, config.notification_capacity);
        let snapshot_rx = core.subscribe_snapshot();
        let notify_tx = core.notification_sender();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                core: Mutex::new(core),
                snapshot_rx,
                notify_tx,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the controller configuration.
    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Poll once, then spawn the command processor and (if the configured
    /// interval is non-zero) the periodic poller.
    ///
    /// Calling `start` on a running controller does nothing. An unreachable
    /// device is not an error here; it shows up in the snapshot.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }

        let mut handles = self.inner.task_handles.lock().await;
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            debug!("controller already started");
            return Ok(());
        };

        let outcome = self.poll_now().await;
        debug!(?outcome, "initial poll");

        handles.push(tokio::spawn(command_processor_task(self.clone(), rx)));

        let period = self.inner.config.poll_interval;
        if !period.is_zero() {
            let ctrl = self.clone();
            handles.push(spawn_periodic(period, self.inner.cancel.clone(), move || {
                let ctrl = ctrl.clone();
                async move {
                    ctrl.poll_now().await;
                }
            }));
        }

        info!(url = %self.inner.config.url, ?period, "controller started");
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish.
    ///
    /// Commands still queued are dropped; their callers get
    /// [`CoreError::ControllerStopped`].
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("controller stopped");
    }

    /// Run one poll now, serialized with commands and the periodic poller.
    pub async fn poll_now(&self) -> PollOutcome {
        self.inner.core.lock().await.poll().await
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command.
    ///
    /// Sends the command through the internal channel to the command
    /// processor task and awaits the outcome.
    pub async fn execute(&self, cmd: Command) -> Result<CommandOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }
        if self.inner.command_rx.lock().await.is_some() {
            return Err(CoreError::NotStarted);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();

        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)
    }

    pub async fn set_mode(&self, automatic: bool) -> Result<CommandOutcome, CoreError> {
        self.execute(Command::SetMode { automatic }).await
    }

    pub async fn set_angle(&self, angle: i32) -> Result<CommandOutcome, CoreError> {
        self.execute(Command::SetAngle { angle }).await
    }

    pub async fn set_relay(&self, state: bool) -> Result<CommandOutcome, CoreError> {
        self.execute(Command::SetRelay { state }).await
    }

    // ── State observation ────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> DeviceSnapshot {
        self.inner.snapshot_rx.borrow().clone()
    }

    /// Subscribe to snapshot publications.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot_rx.clone())
    }

    /// Subscribe to change batches, connection transitions and status lines.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    /// Why the most recent device exchange failed, if it did.
    ///
    /// Waits for any in-flight poll or command to finish.
    pub async fn last_error(&self) -> Option<CoreError> {
        self.inner.core.lock().await.last_error().cloned()
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Drain the command queue, applying each command under the core lock.
async fn command_processor_task<D: DeviceApi>(
    controller: Controller<D>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let outcome = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(outcome);
            }
        }
    }
}

async fn route_command<D: DeviceApi>(controller: &Controller<D>, cmd: Command) -> CommandOutcome {
    debug!(?cmd, "executing command");
    let mut core = controller.inner.core.lock().await;
    match cmd {
        Command::SetMode { automatic } => core.set_mode(automatic).await,
        Command::SetAngle { angle } => core.set_angle(angle).await,
        Command::SetRelay { state } => core.set_relay(state).await,
    }
}
