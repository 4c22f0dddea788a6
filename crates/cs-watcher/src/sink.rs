//! Delivery of notifications to the host.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use crate::events::Notification;

/// Receives every notification a watch produces.
///
/// `emit` is called from the collection actors and, for lane results, never
/// from inside a lock. Implementations must not block for long.
pub trait Sink: Send + Sync + 'static {
    /// Delivers one notification.
    fn emit(&self, notification: Notification);
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn emit(&self, notification: Notification) {
        (**self).emit(notification);
    }
}

/// Forwards notifications into a tokio channel.
///
/// [`ChannelSink::new`] is unbounded: nothing is lost, but a consumer that
/// stops reading lets the queue grow without limit. [`ChannelSink::bounded`]
/// caps the queue; `emit` runs inside the collection actor and cannot wait,
/// so notifications that do not fit are dropped and counted in
/// [`ChannelSink::dropped`]. Size it for bursts such as an initial scan,
/// since a dropped `loading-state-changed` is not resent.
///
/// Notifications are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: ChannelTx,
    dropped: Arc<AtomicU64>,
}

#[derive(Debug, Clone)]
enum ChannelTx {
    Unbounded(mpsc::UnboundedSender<Notification>),
    Bounded(mpsc::Sender<Notification>),
}

impl ChannelSink {
    /// Creates an unbounded sink and the receiver that drains it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::with_tx(ChannelTx::Unbounded(tx)), rx)
    }

    /// Creates a sink holding at most `capacity` undelivered notifications.
    ///
    /// A `capacity` of zero is treated as one.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::with_tx(ChannelTx::Bounded(tx)), rx)
    }

    fn with_tx(tx: ChannelTx) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Notifications a bounded sink dropped because its queue was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Sink for ChannelSink {
    fn emit(&self, notification: Notification) {
        match &self.tx {
            ChannelTx::Unbounded(tx) => {
                if tx.send(notification).is_err() {
                    tracing::trace!("Notification receiver dropped");
                }
            }
            ChannelTx::Bounded(tx) => match tx.try_send(notification) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(notification)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(kind = notification.type_name(), "Notification queue full, dropping");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::trace!("Notification receiver dropped");
                }
            },
        }
    }
}

/// Logs every notification through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, notification: Notification) {
        match &notification {
            Notification::ParsingError {
                path,
                collection_id,
                error,
            } => tracing::warn!(collection = %collection_id, path = %path, error = %error, "Parsing error"),
            Notification::LoadingStateChanged {
                collection_id,
                is_loading,
            } => tracing::info!(collection = %collection_id, is_loading, "Loading state changed"),
            other => tracing::debug!(
                collection = %other.collection_id(),
                kind = other.type_name(),
                "Notification"
            ),
        }
    }
}

/// Collects notifications in memory.
///
/// Useful for tests and for hosts that poll instead of subscribing.
///
/// # Examples
///
/// ```
/// use cs_watcher::{CollectionId, MemorySink, Notification, Sink};
///
/// let sink = MemorySink::new();
/// sink.emit(Notification::LoadingStateChanged {
///     collection_id: CollectionId::from("c1"),
///     is_loading: true,
/// });
/// assert_eq!(sink.len(), 1);
/// assert_eq!(sink.count(|n| n.loading_change() == Some(true)), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemorySink {
    items: Mutex<Vec<Notification>>,
    changed: Notify,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out everything received so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.items.lock().clone()
    }

    /// Removes and returns everything received so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Number of notifications received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Returns `true` if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Counts notifications matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Notification) -> bool) -> usize {
        self.items.lock().iter().filter(|n| predicate(n)).count()
    }

    /// Waits until at least `n` notifications match `predicate`.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for(
        &self,
        n: usize,
        timeout: Duration,
        predicate: impl Fn(&Notification) -> bool,
    ) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.count(&predicate) >= n {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.count(&predicate) >= n;
            }
        }
    }
}

impl Sink for MemorySink {
    fn emit(&self, notification: Notification) {
        self.items.lock().push(notification);
        self.changed.notify_waiters();
    }
}
