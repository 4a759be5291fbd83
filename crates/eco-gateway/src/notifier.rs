use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use eco_db::Database;
use eco_db::models::NotificationRow;
use eco_types::events::ServerEvent;
use eco_types::models::{NewNotification, Notification};

use crate::dispatcher::Dispatcher;

/// Creates notifications on behalf of request handlers.
///
/// Implementations must treat realtime delivery as optional: once the
/// durable record exists, the call has succeeded.
pub trait Notifier: Send + Sync {
    /// Returns `None` when nothing was created (self-notification).
    fn notify(&self, notification: NewNotification) -> Result<Option<Notification>>;
}

/// Persists to the database, then pushes through the dispatcher.
pub struct DurableNotifier {
    db: Arc<Database>,
    dispatcher: Dispatcher,
}

impl DurableNotifier {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self { db, dispatcher }
    }
}

impl Notifier for DurableNotifier {
    fn notify(&self, notification: NewNotification) -> Result<Option<Notification>> {
        if notification.recipient_id == notification.actor.id {
            return Ok(None);
        }

        let row = NotificationRow::from_new(Uuid::new_v4(), &notification, Utc::now());
        self.db
            .insert_notification(&row)
            .with_context(|| format!("storing {} notification for {}", notification.kind, notification.recipient_id))?;
        let stored = row.into_notification()?;

        let delivered = self
            .dispatcher
            .deliver(&stored.recipient_id, ServerEvent::notification(stored.clone()));
        debug!(
            "{} notification {} for {} (live: {})",
            stored.kind, stored.id, stored.recipient_id, delivered
        );

        Ok(Some(stored))
    }
}

#[cfg(test)]
mod tests {
    use eco_types::models::{ActorProfile, NotificationKind, Subject};

    use super::*;
    use crate::dispatcher::ConnectionHandle;

    fn follow(from: &str, to: &str) -> NewNotification {
        NewNotification {
            recipient_id: to.to_string(),
            actor: ActorProfile {
                id: from.to_string(),
                name: from.to_uppercase(),
                profile_image: Some(format!("https://img.example/{}.png", from)),
            },
            kind: NotificationKind::Follow,
            subject: None,
            message: None,
        }
    }

    fn setup() -> (Arc<Database>, Dispatcher, DurableNotifier) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let dispatcher = Dispatcher::default();
        let notifier = DurableNotifier::new(db.clone(), dispatcher.clone());
        (db, dispatcher, notifier)
    }

    #[test]
    fn persists_and_pushes_to_online_recipient() {
        let (db, dispatcher, notifier) = setup();
        let (handle, mut rx) = ConnectionHandle::new();
        dispatcher.register("bob", handle);

        let stored = notifier.notify(follow("alice", "bob")).unwrap().unwrap();
        assert_eq!(stored.actor.name, "ALICE");
        assert_eq!(db.unread_count("bob").unwrap(), 1);

        match rx.try_recv().unwrap() {
            ServerEvent::NewFollow(pushed) => assert_eq!(pushed, stored),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn offline_recipient_still_gets_record() {
        let (db, _dispatcher, notifier) = setup();

        let stored = notifier.notify(follow("alice", "bob")).unwrap();
        assert!(stored.is_some());
        assert_eq!(db.unread_count("bob").unwrap(), 1);
    }

    #[test]
    fn self_notification_is_skipped() {
        let (db, dispatcher, notifier) = setup();
        let (handle, mut rx) = ConnectionHandle::new();
        dispatcher.register("alice", handle);

        assert!(notifier.notify(follow("alice", "alice")).unwrap().is_none());
        assert_eq!(db.unread_count("alice").unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn event_matches_kind() {
        let (_db, dispatcher, notifier) = setup();
        let (handle, mut rx) = ConnectionHandle::new();
        dispatcher.register("bob", handle);

        let mut offer = follow("alice", "bob");
        offer.kind = NotificationKind::MarketplaceOffer;
        offer.subject = Some(Subject::Item("bike-42".into()));
        notifier.notify(offer).unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.name(), "newMarketplaceOffer");
    }
}
