//! Fan-out of reload signals to open push connections.
//!
//! Each browser tab listening on the push endpoint owns a [`Subscription`].
//! The [`BroadcastChannel`] keeps the sending half of every subscription and
//! queues one reload message on each of them per broadcast.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

/// Data of the only event ever sent on a push connection.
pub const RELOAD_DATA: &str = "reload";

/// Messages a connection may have queued before new ones are dropped.
const CONNECTION_BUFFER: usize = 8;

/// Identity of one push connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type ConnectionMap = HashMap<ConnectionId, mpsc::Sender<&'static str>>;

/// Set of open push connections.
///
/// Cloning yields another handle to the same set.
#[derive(Clone, Default)]
pub struct BroadcastChannel {
    connections: Arc<Mutex<ConnectionMap>>,
}

impl BroadcastChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new push connection.
    ///
    /// The connection stays in the set until the returned [`Subscription`]
    /// is dropped or a broadcast finds it closed.
    pub fn subscribe(&self) -> Subscription {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);

        let mut connections = self.lock();
        connections.insert(id, tx);
        tracing::debug!(connection = %id, open = connections.len(), "Push connection opened");

        Subscription {
            guard: SubscriptionGuard {
                id,
                channel: self.clone(),
            },
            messages: ReceiverStream::new(rx),
        }
    }

    /// Remove a connection. Removing an absent connection is a no-op.
    pub fn unsubscribe(&self, id: ConnectionId) {
        let mut connections = self.lock();
        if connections.remove(&id).is_some() {
            tracing::debug!(connection = %id, open = connections.len(), "Push connection closed");
        }
    }

    /// Queue one reload message on every open connection.
    ///
    /// Connections whose receiving side is gone are dropped from the set. A
    /// connection whose buffer is full already has a reload queued, so the
    /// message is skipped for it. Returns how many connections got it.
    pub fn broadcast(&self) -> usize {
        let mut delivered = 0;

        self.lock()
            .retain(|id, tx| match tx.try_send(RELOAD_DATA) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(connection = %id, "Push connection backed up, reload skipped");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(connection = %id, "Push connection gone, unsubscribing");
                    false
                }
            });

        delivered
    }

    /// Drop every connection, ending all push streams.
    pub fn close_all(&self) {
        let mut connections = self.lock();
        if !connections.is_empty() {
            tracing::debug!(open = connections.len(), "Closing push connections");
        }
        connections.clear();
    }

    /// Number of connections currently in the set.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connection is open.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionMap> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Receiving half of one push connection.
///
/// Dropping it, or the stream made by [`into_stream`](Self::into_stream),
/// unsubscribes the connection exactly once.
pub struct Subscription {
    guard: SubscriptionGuard,
    messages: ReceiverStream<&'static str>,
}

impl Subscription {
    /// Identity of this connection in the channel.
    pub fn id(&self) -> ConnectionId {
        self.guard.id
    }

    /// Wait for the next message. `None` once the channel closed this connection.
    pub async fn recv(&mut self) -> Option<&'static str> {
        self.messages.next().await
    }

    /// Turn into a stream of messages that keeps the connection registered
    /// for as long as the stream lives.
    pub fn into_stream(self) -> impl Stream<Item = &'static str> + Send + 'static {
        let Self { guard, messages } = self;
        messages.map(move |data| {
            guard.sent(data);
            data
        })
    }
}

/// Removes the connection from its channel on drop.
struct SubscriptionGuard {
    id: ConnectionId,
    channel: BroadcastChannel,
}

impl SubscriptionGuard {
    fn sent(&self, data: &str) {
        tracing::trace!(connection = %self.id, data, "Push event sent");
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.id);
    }
}
