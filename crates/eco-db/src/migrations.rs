use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS notifications (
            id              TEXT PRIMARY KEY,
            recipient_id    TEXT NOT NULL,
            actor_id        TEXT NOT NULL,
            actor_name      TEXT NOT NULL,
            actor_image     TEXT,
            kind            TEXT NOT NULL,
            subject_kind    TEXT,
            subject_id      TEXT,
            message         TEXT,
            read            INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_recipient
            ON notifications(recipient_id, created_at);

        CREATE INDEX IF NOT EXISTS idx_notifications_unread
            ON notifications(recipient_id, read);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
