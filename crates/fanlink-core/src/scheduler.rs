// ── Periodic scheduler ──
//
// Fixed-interval task runner, independent of any UI toolkit.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run `task` every `period` until `cancel` fires.
///
/// The first run happens one full period after spawning. A run that
/// overruns its slot delays the next one instead of bursting to catch up.
/// Each run is awaited to completion before the next tick is considered,
/// so runs never overlap.
pub fn spawn_periodic<F, Fut>(period: Duration, cancel: CancellationToken, mut task: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.tick().await; // consume the immediate first tick

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => task().await,
            }
        }

        debug!(?period, "periodic task stopped");
    })
}
