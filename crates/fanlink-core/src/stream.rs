// ── Snapshot subscriptions ──
//
// Latest-value view over the controller's published snapshot.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::snapshot::DeviceSnapshot;

/// A subscription to the device snapshot.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`.
pub struct SnapshotStream {
    current: DeviceSnapshot,
    receiver: watch::Receiver<DeviceSnapshot>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<DeviceSnapshot>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &DeviceSnapshot {
        &self.current
    }

    /// The latest published snapshot.
    pub fn latest(&self) -> DeviceSnapshot {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publication.
    /// Returns `None` once the controller has been dropped.
    pub async fn changed(&mut self) -> Option<DeviceSnapshot> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = snap.clone();
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields the current snapshot first, then one item per publication.
pub struct SnapshotWatchStream {
    inner: WatchStream<DeviceSnapshot>,
}

impl Stream for SnapshotWatchStream {
    type Item = DeviceSnapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tracks_publications_current_does_not() {
        let (tx, rx) = watch::channel(DeviceSnapshot::default());
        let stream = SnapshotStream::new(rx);

        tx.send_replace(DeviceSnapshot {
            current_angle: 45,
            ..DeviceSnapshot::default()
        });

        assert_eq!(stream.current().current_angle, 90);
        assert_eq!(stream.latest().current_angle, 45);
    }

    #[tokio::test]
    async fn changed_refreshes_current() {
        let (tx, rx) = watch::channel(DeviceSnapshot::default());
        let mut stream = SnapshotStream::new(rx);

        tx.send_replace(DeviceSnapshot {
            relay_state: true,
            ..DeviceSnapshot::default()
        });

        let snap = stream.changed().await.unwrap();
        assert!(snap.relay_state);
        assert!(stream.current().relay_state);

        drop(tx);
        assert!(stream.changed().await.is_none());
    }
}
