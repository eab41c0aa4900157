use anyhow::Result;
use rusqlite::{Connection, Row};
use uuid::Uuid;

use adoptly_types::models::{Conversation, ConversationSummary, PublicUser};

use crate::models::ConversationRow;
use crate::users::query_user;
use crate::{Database, OptionalExt};

const CONVERSATION_COLUMNS: &str = "id, user_low, user_high, created_at, updated_at";

/// Sort a pair of participants into storage order.
pub fn normalize_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Database {
    /// Insert-or-fetch keyed on the normalized pair. The UNIQUE constraint
    /// makes concurrent first contacts from both sides converge on one row.
    /// Returns `(conversation, created)`.
    pub fn create_or_get_conversation(
        &self,
        new_id: Uuid,
        a: Uuid,
        b: Uuid,
    ) -> Result<(Conversation, bool)> {
        let (low, high) = normalize_pair(a, b);

        self.with_conn(|conn| {
            let now = crate::now();
            let inserted = conn.execute(
                "INSERT INTO conversations (id, user_low, user_high, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (user_low, user_high) DO NOTHING",
                (new_id.to_string(), low.to_string(), high.to_string(), now),
            )?;

            let row = conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE user_low = ?1 AND user_high = ?2"
                ),
                [low.to_string(), high.to_string()],
                conversation_row,
            )?;

            Ok((Conversation::try_from(row)?, inserted == 1))
        })
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    /// Conversations `user_id` takes part in, most recently active first,
    /// with the counterpart, last message and unread count for `user_id`.
    pub fn get_conversation_summaries(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_low, c.user_high, c.created_at, c.updated_at,
                        (SELECT m.body FROM messages m
                          WHERE m.conversation_id = c.id
                          ORDER BY m.seq DESC LIMIT 1),
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.conversation_id = c.id
                            AND m.receiver_id = ?1 AND m.read = 0)
                 FROM conversations c
                 WHERE c.user_low = ?1 OR c.user_high = ?1
                 ORDER BY c.updated_at DESC, c.id",
            )?;

            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok((
                        conversation_row(row)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut summaries = Vec::with_capacity(rows.len());
            for (row, last_message, unread) in rows {
                let conversation = Conversation::try_from(row)?;
                let counterpart_id = conversation
                    .counterpart_of(user_id)
                    .ok_or_else(|| anyhow::anyhow!("Conversation {} lost its participant", conversation.id))?;
                let counterpart = query_user(conn, counterpart_id)?
                    .ok_or_else(|| anyhow::anyhow!("User not found: {}", counterpart_id))?;

                summaries.push(ConversationSummary {
                    conversation,
                    counterpart: PublicUser::from(&counterpart),
                    last_message,
                    unread_count: unread as u64,
                });
            }

            Ok(summaries)
        })
    }
}

pub(crate) fn query_conversation(conn: &Connection, id: Uuid) -> Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
        [id.to_string()],
        conversation_row,
    )
    .optional()?
    .map(Conversation::try_from)
    .transpose()
}

fn conversation_row(row: &Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        user_low: row.get(1)?,
        user_high: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adoptly_types::models::Role;

    fn db_with_users(n: usize) -> (Database, Vec<Uuid>) {
        let db = Database::open_in_memory().unwrap();
        let ids: Vec<Uuid> = (0..n)
            .map(|i| {
                let id = Uuid::new_v4();
                db.create_user(id, &format!("user{i}"), &format!("User {i}"), "x", Role::Adopter)
                    .unwrap();
                id
            })
            .collect();
        (db, ids)
    }

    #[test]
    fn pair_is_order_independent() {
        let (db, ids) = db_with_users(2);
        let (first, created) = db.create_or_get_conversation(Uuid::new_v4(), ids[0], ids[1]).unwrap();
        let (second, created_again) =
            db.create_or_get_conversation(Uuid::new_v4(), ids[1], ids[0]).unwrap();

        assert!(created);
        assert!(!created_again);
        assert_eq!(first.id, second.id);

        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM conversations", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn rejects_self_conversation() {
        let (db, ids) = db_with_users(1);
        assert!(db.create_or_get_conversation(Uuid::new_v4(), ids[0], ids[0]).is_err());
    }

    #[test]
    fn summaries_only_include_participant() {
        let (db, ids) = db_with_users(3);
        db.create_or_get_conversation(Uuid::new_v4(), ids[0], ids[1]).unwrap();
        db.create_or_get_conversation(Uuid::new_v4(), ids[1], ids[2]).unwrap();

        let for_first = db.get_conversation_summaries(ids[0]).unwrap();
        assert_eq!(for_first.len(), 1);
        assert_eq!(for_first[0].counterpart.id, ids[1]);
        assert_eq!(for_first[0].last_message, None);
        assert_eq!(db.get_conversation_summaries(ids[1]).unwrap().len(), 2);
    }
}
