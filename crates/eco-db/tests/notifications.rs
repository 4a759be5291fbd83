//! Integration tests for the notification store, run against a private
//! in-memory SQLite database.

use chrono::{Duration, Utc};
use uuid::Uuid;

use eco_db::Database;
use eco_db::models::{NotificationRow, PageCursor};
use eco_types::models::{ActorProfile, NewNotification, NotificationKind, Subject};

fn new_notification(recipient: &str, kind: NotificationKind) -> NewNotification {
    NewNotification {
        recipient_id: recipient.to_string(),
        actor: ActorProfile {
            id: "alice".into(),
            name: "Alice".into(),
            profile_image: None,
        },
        kind,
        subject: Some(Subject::Post("post-1".into())),
        message: Some("liked your post".into()),
    }
}

/// Insert `count` notifications for `recipient`, one minute apart, oldest first.
fn seed(db: &Database, recipient: &str, count: usize) -> Vec<Uuid> {
    let start = Utc::now() - Duration::hours(1);
    (0..count)
        .map(|i| {
            let id = Uuid::new_v4();
            let row = NotificationRow::from_new(
                id,
                &new_notification(recipient, NotificationKind::Like),
                start + Duration::minutes(i as i64),
            );
            db.insert_notification(&row).unwrap();
            id
        })
        .collect()
}

#[test]
fn insert_and_read_back() {
    let db = Database::open_in_memory().unwrap();
    let id = Uuid::new_v4();
    let now = Utc::now();
    let new = new_notification("bob", NotificationKind::EventInvite);
    db.insert_notification(&NotificationRow::from_new(id, &new, now)).unwrap();

    let rows = db.list_notifications("bob", 20, None).unwrap();
    assert_eq!(rows.len(), 1);

    let notification = rows.into_iter().next().unwrap().into_notification().unwrap();
    assert_eq!(notification.id, id);
    assert_eq!(notification.kind, NotificationKind::EventInvite);
    assert_eq!(notification.actor.name, "Alice");
    assert_eq!(notification.subject, Some(Subject::Post("post-1".into())));
    assert!(!notification.read);
    assert_eq!(notification.created_at.timestamp_micros(), now.timestamp_micros());
}

#[test]
fn lists_newest_first_with_cursor() {
    let db = Database::open_in_memory().unwrap();
    let ids = seed(&db, "bob", 5);

    let first_page = db.list_notifications("bob", 2, None).unwrap();
    let first_ids: Vec<String> = first_page.iter().map(|r| r.id.clone()).collect();
    assert_eq!(first_ids, vec![ids[4].to_string(), ids[3].to_string()]);

    let last = first_page.into_iter().last().unwrap().into_notification().unwrap();
    let cursor = PageCursor {
        created_at: last.created_at,
        id: Some(last.id),
    };

    let second_page = db.list_notifications("bob", 10, Some(cursor)).unwrap();
    let second_ids: Vec<String> = second_page.iter().map(|r| r.id.clone()).collect();
    assert_eq!(
        second_ids,
        vec![ids[2].to_string(), ids[1].to_string(), ids[0].to_string()]
    );
}

#[test]
fn listing_is_scoped_to_recipient() {
    let db = Database::open_in_memory().unwrap();
    seed(&db, "bob", 3);
    seed(&db, "carol", 1);

    assert_eq!(db.list_notifications("bob", 20, None).unwrap().len(), 3);
    assert_eq!(db.list_notifications("carol", 20, None).unwrap().len(), 1);
    assert!(db.list_notifications("dave", 20, None).unwrap().is_empty());
}

#[test]
fn mark_read_selected_then_all() {
    let db = Database::open_in_memory().unwrap();
    let ids = seed(&db, "bob", 4);
    assert_eq!(db.unread_count("bob").unwrap(), 4);

    assert_eq!(db.mark_read("bob", Some(&ids[..2])).unwrap(), 2);
    assert_eq!(db.unread_count("bob").unwrap(), 2);

    // Already-read rows are not counted again
    assert_eq!(db.mark_read("bob", Some(&ids[..1])).unwrap(), 0);
    assert_eq!(db.mark_read("bob", Some(&[])).unwrap(), 0);

    assert_eq!(db.mark_read("bob", None).unwrap(), 2);
    assert_eq!(db.unread_count("bob").unwrap(), 0);
}

#[test]
fn mark_read_ignores_other_users_notifications() {
    let db = Database::open_in_memory().unwrap();
    let bobs = seed(&db, "bob", 2);
    seed(&db, "carol", 2);

    assert_eq!(db.mark_read("carol", Some(&bobs)).unwrap(), 0);
    assert_eq!(db.mark_read("carol", None).unwrap(), 2);
    assert_eq!(db.unread_count("bob").unwrap(), 2);
}

#[test]
fn delete_only_own_notification() {
    let db = Database::open_in_memory().unwrap();
    let ids = seed(&db, "bob", 1);

    assert!(!db.delete_notification("carol", ids[0]).unwrap());
    assert!(db.delete_notification("bob", ids[0]).unwrap());
    assert!(!db.delete_notification("bob", ids[0]).unwrap());
    assert!(db.list_notifications("bob", 20, None).unwrap().is_empty());
}

#[test]
fn paging_through_equal_timestamps_reaches_every_row() {
    let db = Database::open_in_memory().unwrap();
    let created_at = Utc::now();
    let mut inserted: Vec<Uuid> = (0..5)
        .map(|_| {
            let id = Uuid::new_v4();
            let row = NotificationRow::from_new(id, &new_notification("bob", NotificationKind::Like), created_at);
            db.insert_notification(&row).unwrap();
            id
        })
        .collect();

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = db.list_notifications("bob", 2, cursor).unwrap();
        if page.is_empty() {
            break;
        }
        let page: Vec<_> = page.into_iter().map(|r| r.into_notification().unwrap()).collect();
        let last = page.last().unwrap();
        cursor = Some(PageCursor {
            created_at: last.created_at,
            id: Some(last.id),
        });
        seen.extend(page.iter().map(|n| n.id));
    }

    assert_eq!(seen.len(), 5);
    // Ties are broken by id, descending
    inserted.sort_by_key(|id| std::cmp::Reverse(id.to_string()));
    assert_eq!(seen, inserted);
}

#[test]
fn timestamp_only_cursor_still_pages() {
    let db = Database::open_in_memory().unwrap();
    let ids = seed(&db, "bob", 3);

    let newest = db.list_notifications("bob", 1, None).unwrap();
    let newest = newest.into_iter().next().unwrap().into_notification().unwrap();
    assert_eq!(newest.id, ids[2]);

    let cursor = PageCursor {
        created_at: newest.created_at,
        id: None,
    };
    let rest = db.list_notifications("bob", 10, Some(cursor)).unwrap();
    assert_eq!(rest.len(), 2);
}
