use crate::Database;
use crate::models::{NotificationRow, PageCursor, format_timestamp};
use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, actor_id, actor_name, actor_image, kind, \
     subject_kind, subject_id, message, read, created_at";

impl Database {
    // -- Notifications --

    pub fn insert_notification(&self, row: &NotificationRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, actor_id, actor_name, actor_image, kind,
                     subject_kind, subject_id, message, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                rusqlite::params![
                    row.id,
                    row.recipient_id,
                    row.actor_id,
                    row.actor_name,
                    row.actor_image,
                    row.kind,
                    row.subject_kind,
                    row.subject_id,
                    row.message,
                    row.read,
                    row.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Newest first. `before` points at the oldest notification of the
    /// previous page.
    pub fn list_notifications(
        &self,
        recipient_id: &str,
        limit: u32,
        before: Option<PageCursor>,
    ) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| query_notifications(conn, recipient_id, limit, before))
    }

    pub fn unread_count(&self, recipient_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND read = 0",
                [recipient_id],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Mark the given notifications (or all of them when `ids` is `None`)
    /// as read. Only rows owned by `recipient_id` are touched.
    /// Returns the number of rows that changed.
    pub fn mark_read(&self, recipient_id: &str, ids: Option<&[Uuid]>) -> Result<usize> {
        self.with_conn(|conn| {
            let updated = match ids {
                None => conn.execute(
                    "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
                    [recipient_id],
                )?,
                Some([]) => 0,
                Some(ids) => {
                    let placeholders: Vec<String> =
                        (2..=ids.len() + 1).map(|i| format!("?{}", i)).collect();
                    let sql = format!(
                        "UPDATE notifications SET read = 1
                         WHERE recipient_id = ?1 AND read = 0 AND id IN ({})",
                        placeholders.join(", ")
                    );

                    let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();
                    let mut params: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(ids.len() + 1);
                    params.push(&recipient_id);
                    params.extend(id_strings.iter().map(|id| id as &dyn rusqlite::types::ToSql));

                    conn.execute(&sql, params.as_slice())?
                }
            };
            Ok(updated)
        })
    }

    /// Returns true if a row was deleted.
    pub fn delete_notification(&self, recipient_id: &str, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
                rusqlite::params![id.to_string(), recipient_id],
            )?;
            Ok(deleted > 0)
        })
    }
}

fn query_notifications(
    conn: &Connection,
    recipient_id: &str,
    limit: u32,
    before: Option<PageCursor>,
) -> Result<Vec<NotificationRow>> {
    let filter = match before {
        Some(PageCursor { id: Some(_), .. }) => {
            "AND (created_at < ?3 OR (created_at = ?3 AND id < ?4))"
        }
        Some(PageCursor { id: None, .. }) => "AND created_at < ?3",
        None => "",
    };
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE recipient_id = ?1 {filter}
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    );

    let mut stmt = conn.prepare(&sql)?;
    let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<NotificationRow> {
        Ok(NotificationRow {
            id: row.get(0)?,
            recipient_id: row.get(1)?,
            actor_id: row.get(2)?,
            actor_name: row.get(3)?,
            actor_image: row.get(4)?,
            kind: row.get(5)?,
            subject_kind: row.get(6)?,
            subject_id: row.get(7)?,
            message: row.get(8)?,
            read: row.get(9)?,
            created_at: row.get(10)?,
        })
    };

    let rows = match before {
        Some(PageCursor { created_at, id: Some(id) }) => stmt
            .query_map(
                rusqlite::params![recipient_id, limit, format_timestamp(created_at), id.to_string()],
                map_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(PageCursor { created_at, id: None }) => stmt
            .query_map(
                rusqlite::params![recipient_id, limit, format_timestamp(created_at)],
                map_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?,
        None => stmt
            .query_map(rusqlite::params![recipient_id, limit], map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(rows)
}
