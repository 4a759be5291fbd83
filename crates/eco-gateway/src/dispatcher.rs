use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use eco_types::events::ServerEvent;

use crate::presence::PresenceRegistry;

/// Send side of one websocket connection. Equality is by connection id,
/// so two handles compare equal only if they belong to the same socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    /// Create a handle and the receiver the connection drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue an event for this connection. Returns false if it has closed.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// Owns the presence registry and fans events out to connected clients.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Every connection, registered or not, receives these
    broadcast_tx: broadcast::Sender<ServerEvent>,

    /// user_id -> handle of the most recent connection for that user
    presence: RwLock<PresenceRegistry<ConnectionHandle>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Dispatcher {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (broadcast_tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                presence: RwLock::new(PresenceRegistry::new()),
            }),
        }
    }

    /// Subscribe to broadcast events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Broadcast an event to all connected clients.
    pub fn broadcast(&self, event: ServerEvent) {
        // Err only means nobody is subscribed
        let _ = self.inner.broadcast_tx.send(event);
    }

    /// Make `handle` the live connection for `user_id` and broadcast the
    /// new online set.
    pub fn register(&self, user_id: &str, handle: ConnectionHandle) {
        let mut presence = self.write_presence();
        if let Some(old) = presence.register(user_id, handle) {
            debug!("{} reconnected, connection {} is now orphaned", user_id, old.id());
        }
        // Sent under the lock so snapshots go out in mutation order
        self.broadcast(ServerEvent::GetOnlineUsers(presence.snapshot()));
    }

    /// Remove `user_id` if `handle` still owns it, then broadcast the
    /// online set. Returns true if the entry was removed.
    pub fn deregister(&self, user_id: &str, handle: &ConnectionHandle) -> bool {
        let mut presence = self.write_presence();
        let removed = presence.deregister(user_id, handle);
        if !removed {
            debug!("{} stale disconnect from connection {} ignored", user_id, handle.id());
        }
        self.broadcast(ServerEvent::GetOnlineUsers(presence.snapshot()));
        removed
    }

    /// Record a heartbeat answer. No broadcast.
    pub fn touch(&self, user_id: &str, handle: &ConnectionHandle) -> bool {
        self.write_presence().touch(user_id, handle)
    }

    pub fn lookup(&self, user_id: &str) -> Option<ConnectionHandle> {
        self.read_presence().lookup(user_id).cloned()
    }

    pub fn online_users(&self) -> Vec<String> {
        self.read_presence().snapshot()
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.read_presence().contains(user_id)
    }

    /// Best-effort push of `event` to the live connection of `recipient`.
    ///
    /// Absent recipients are silently skipped. Returns whether a live
    /// connection accepted the event; callers must not depend on it.
    pub fn deliver(&self, recipient: &str, event: ServerEvent) -> bool {
        let Some(handle) = self.lookup(recipient) else {
            return false;
        };
        let name = event.name();
        let sent = handle.send(event);
        if !sent {
            debug!("{} dropped for {}: connection {} closed", name, recipient, handle.id());
        }
        sent
    }

    fn read_presence(&self) -> std::sync::RwLockReadGuard<'_, PresenceRegistry<ConnectionHandle>> {
        self.inner.presence.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_presence(&self) -> std::sync::RwLockWriteGuard<'_, PresenceRegistry<ConnectionHandle>> {
        self.inner.presence.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::broadcast::error::TryRecvError;

    use eco_types::models::{ActorProfile, Notification, NotificationKind};

    use super::*;

    fn like_for(recipient: &str) -> ServerEvent {
        ServerEvent::notification(Notification {
            id: Uuid::new_v4(),
            recipient_id: recipient.to_string(),
            actor: ActorProfile {
                id: "alice".into(),
                name: "Alice".into(),
                profile_image: None,
            },
            kind: NotificationKind::Like,
            subject: None,
            message: None,
            read: false,
            created_at: Utc::now(),
        })
    }

    #[test]
    fn register_broadcasts_snapshot() {
        let dispatcher = Dispatcher::default();
        let mut rx = dispatcher.subscribe();
        let (handle, _conn_rx) = ConnectionHandle::new();

        dispatcher.register("alice", handle.clone());
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::GetOnlineUsers(vec!["alice".into()]));
        assert!(dispatcher.is_online("alice"));

        assert!(dispatcher.deregister("alice", &handle));
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::GetOnlineUsers(vec![]));
        assert!(!dispatcher.is_online("alice"));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn stale_deregister_keeps_new_connection() {
        let dispatcher = Dispatcher::default();
        let (first, _first_rx) = ConnectionHandle::new();
        let (second, _second_rx) = ConnectionHandle::new();

        dispatcher.register("alice", first.clone());
        dispatcher.register("alice", second.clone());

        assert!(!dispatcher.deregister("alice", &first));
        assert_eq!(dispatcher.lookup("alice"), Some(second));
    }

    #[test]
    fn deliver_to_absent_user_is_noop() {
        let dispatcher = Dispatcher::default();
        let mut rx = dispatcher.subscribe();
        let (handle, mut conn_rx) = ConnectionHandle::new();
        dispatcher.register("bob", handle);
        let _ = rx.try_recv();

        assert!(!dispatcher.deliver("nobody", like_for("nobody")));
        assert!(conn_rx.try_recv().is_err());
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn deliver_reaches_only_the_recipient() {
        let dispatcher = Dispatcher::default();
        let (alice, mut alice_rx) = ConnectionHandle::new();
        let (bob, mut bob_rx) = ConnectionHandle::new();
        dispatcher.register("alice", alice);
        dispatcher.register("bob", bob);

        let event = like_for("bob");
        assert!(dispatcher.deliver("bob", event.clone()));

        assert_eq!(bob_rx.try_recv().unwrap(), event);
        assert!(bob_rx.try_recv().is_err());
        assert!(alice_rx.try_recv().is_err());
    }

    #[test]
    fn deliver_to_closed_connection_is_silent() {
        let dispatcher = Dispatcher::default();
        let (handle, conn_rx) = ConnectionHandle::new();
        dispatcher.register("bob", handle);
        drop(conn_rx);

        assert!(!dispatcher.deliver("bob", like_for("bob")));
    }

    #[test]
    fn touch_does_not_broadcast() {
        let dispatcher = Dispatcher::default();
        let (handle, _conn_rx) = ConnectionHandle::new();
        dispatcher.register("alice", handle.clone());

        let mut rx = dispatcher.subscribe();
        assert!(dispatcher.touch("alice", &handle));
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }
}
