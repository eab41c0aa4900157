use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use adoptly_types::models::Message;

use crate::models::MessageRow;
use crate::{Database, OptionalExt};

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, seq, sender_id, receiver_id, body, read, read_at, created_at";

impl Database {
    /// Append a message. The sequence number is allocated inside the same
    /// transaction as the insert, so messages within a conversation have a
    /// strict total order even when timestamps collide.
    pub fn insert_message(
        &self,
        id: Uuid,
        conversation_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: &str,
    ) -> Result<Message> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let cid = conversation_id.to_string();
            let now = crate::now();

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?1",
                [&cid],
                |row| row.get(0),
            )?;

            tx.execute(
                "INSERT INTO messages (id, conversation_id, seq, sender_id, receiver_id, body, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                (
                    id.to_string(),
                    &cid,
                    seq,
                    sender_id.to_string(),
                    receiver_id.to_string(),
                    body,
                    &now,
                ),
            )?;

            tx.execute(
                "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
                (&cid, &now),
            )?;

            let message = query_message(&tx, id)?
                .ok_or_else(|| anyhow::anyhow!("Message vanished after insert: {}", id))?;
            tx.commit()?;
            Ok(message)
        })
    }

    /// Full history of a conversation, oldest first.
    pub fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY seq ASC"
            ))?;

            let rows = stmt
                .query_map([conversation_id.to_string()], message_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(Message::try_from).collect()
        })
    }

    pub fn get_message(&self, id: Uuid) -> Result<Option<Message>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Returns the number of rows that flipped from unread to read (0 or 1).
    pub fn mark_message_read(&self, id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1, read_at = ?2 WHERE id = ?1 AND read = 0",
                (id.to_string(), crate::now()),
            )?;
            Ok(changed)
        })
    }

    /// Mark everything `receiver_id` has received in a conversation as read.
    pub fn mark_conversation_read(&self, conversation_id: Uuid, receiver_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET read = 1, read_at = ?3
                 WHERE conversation_id = ?1 AND receiver_id = ?2 AND read = 0",
                (conversation_id.to_string(), receiver_id.to_string(), crate::now()),
            )?;
            Ok(changed)
        })
    }

    pub fn count_unread_messages(&self, receiver_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND read = 0",
                [receiver_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}

fn query_message(conn: &Connection, id: Uuid) -> Result<Option<Message>> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        [id.to_string()],
        message_row,
    )
    .optional()?
    .map(Message::try_from)
    .transpose()
}

fn message_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        seq: row.get(2)?,
        sender_id: row.get(3)?,
        receiver_id: row.get(4)?,
        body: row.get(5)?,
        read: row.get(6)?,
        read_at: row.get(7)?,
        created_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoptly_types::models::Role;

    fn setup() -> (Database, Uuid, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        db.create_user(a, "ada", "Ada", "x", Role::Adopter).unwrap();
        db.create_user(b, "sam", "Sam", "x", Role::Staff).unwrap();
        let (conv, _) = db.create_or_get_conversation(Uuid::new_v4(), a, b).unwrap();
        (db, conv.id, a, b)
    }

    #[test]
    fn sequence_numbers_are_dense_and_ordered() {
        let (db, conv, a, b) = setup();
        for i in 0..5 {
            db.insert_message(Uuid::new_v4(), conv, a, b, &format!("msg {i}")).unwrap();
        }

        let messages = db.get_messages(conv).unwrap();
        let seqs: Vec<i64> = messages.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
        assert_eq!(messages[0].body, "msg 0");
        assert_eq!(messages[4].body, "msg 4");
    }

    #[test]
    fn mark_read_only_flips_once() {
        let (db, conv, a, b) = setup();
        let msg = db.insert_message(Uuid::new_v4(), conv, a, b, "hi").unwrap();

        assert_eq!(db.mark_message_read(msg.id).unwrap(), 1);
        assert_eq!(db.mark_message_read(msg.id).unwrap(), 0);

        let stored = db.get_message(msg.id).unwrap().unwrap();
        assert!(stored.read);
        assert!(stored.read_at.is_some());
    }

    #[test]
    fn conversation_read_only_touches_receiver() {
        let (db, conv, a, b) = setup();
        db.insert_message(Uuid::new_v4(), conv, a, b, "to b").unwrap();
        db.insert_message(Uuid::new_v4(), conv, b, a, "to a").unwrap();

        assert_eq!(db.count_unread_messages(b).unwrap(), 1);
        assert_eq!(db.mark_conversation_read(conv, b).unwrap(), 1);
        assert_eq!(db.count_unread_messages(b).unwrap(), 0);
        assert_eq!(db.count_unread_messages(a).unwrap(), 1);
    }
}
