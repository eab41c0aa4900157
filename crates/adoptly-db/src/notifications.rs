use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use adoptly_types::models::{Notification, NotificationPayload};

use crate::models::NotificationRow;
use crate::{Database, OptionalExt};

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, type, title, message, related_data, read, created_at";

impl Database {
    /// Insert one notification. The stored type tag is taken from the payload.
    /// Fails with a foreign-key violation if the recipient does not exist.
    pub fn insert_notification(
        &self,
        id: Uuid,
        recipient_id: Uuid,
        title: &str,
        message: &str,
        payload: &NotificationPayload,
    ) -> Result<Notification> {
        let related_data = serde_json::to_string(payload)?;

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, recipient_id, type, title, message, related_data, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                (
                    id.to_string(),
                    recipient_id.to_string(),
                    payload.kind().as_str(),
                    title,
                    message,
                    related_data,
                    crate::now(),
                ),
            )?;

            query_notification(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Notification vanished after insert: {}", id))
        })
    }

    pub fn get_notification(&self, id: Uuid) -> Result<Option<Notification>> {
        self.with_conn(|conn| query_notification(conn, id))
    }

    /// Newest first.
    pub fn get_notifications(&self, recipient_id: Uuid, limit: u32) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE recipient_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2"
            ))?;

            let rows = stmt
                .query_map(rusqlite::params![recipient_id.to_string(), limit], notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Notification::try_from).collect()
        })
    }

    /// Newest first.
    pub fn get_unread_notifications(&self, recipient_id: Uuid) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications
                 WHERE recipient_id = ?1 AND read = 0
                 ORDER BY created_at DESC, rowid DESC"
            ))?;

            let rows = stmt
                .query_map([recipient_id.to_string()], notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Notification::try_from).collect()
        })
    }

    pub fn mark_notification_read(&self, id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND read = 0",
                [id.to_string()],
            )?)
        })
    }

    pub fn mark_all_notifications_read(&self, recipient_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET read = 1 WHERE recipient_id = ?1 AND read = 0",
                [recipient_id.to_string()],
            )?)
        })
    }

    pub fn delete_notification(&self, id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM notifications WHERE id = ?1", [id.to_string()])?)
        })
    }

    pub fn delete_all_notifications(&self, recipient_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM notifications WHERE recipient_id = ?1",
                [recipient_id.to_string()],
            )?)
        })
    }

    pub fn count_unread_notifications(&self, recipient_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND read = 0",
                [recipient_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn query_notification(conn: &Connection, id: Uuid) -> Result<Option<Notification>> {
    conn.query_row(
        &format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"),
        [id.to_string()],
        notification_row,
    )
    .optional()?
    .map(Notification::try_from)
    .transpose()
}

fn notification_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        related_data: row.get(5)?,
        read: row.get(6)?,
        created_at: row.get(7)?,
    })
}
