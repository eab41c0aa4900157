use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users, pets, applications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id            TEXT PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                display_name  TEXT NOT NULL,
                password      TEXT NOT NULL,
                role          TEXT NOT NULL CHECK (role IN ('adopter', 'staff', 'admin')),
                created_at    TEXT NOT NULL
            );

            CREATE INDEX idx_users_role ON users(role);

            CREATE TABLE pets (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                species     TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'available',
                created_at  TEXT NOT NULL
            );

            CREATE TABLE adoption_applications (
                id                TEXT PRIMARY KEY,
                pet_id            TEXT NOT NULL REFERENCES pets(id),
                applicant_id      TEXT NOT NULL REFERENCES users(id),
                living_situation  TEXT NOT NULL,
                status            TEXT NOT NULL DEFAULT 'pending',
                decline_reason    TEXT,
                reviewed_by       TEXT REFERENCES users(id),
                reviewed_at       TEXT,
                created_at        TEXT NOT NULL
            );

            CREATE INDEX idx_applications_status
                ON adoption_applications(status, created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (conversations, messages, notifications)");
        conn.execute_batch(
            "
            -- One row per unordered pair: participants are stored sorted.
            CREATE TABLE conversations (
                id          TEXT PRIMARY KEY,
                user_low    TEXT NOT NULL REFERENCES users(id),
                user_high   TEXT NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                CHECK (user_low < user_high),
                UNIQUE (user_low, user_high)
            );

            CREATE INDEX idx_conversations_high ON conversations(user_high);

            CREATE TABLE messages (
                id               TEXT PRIMARY KEY,
                conversation_id  TEXT NOT NULL REFERENCES conversations(id),
                seq              INTEGER NOT NULL,
                sender_id        TEXT NOT NULL REFERENCES users(id),
                receiver_id      TEXT NOT NULL REFERENCES users(id),
                body             TEXT NOT NULL,
                read             INTEGER NOT NULL DEFAULT 0,
                read_at          TEXT,
                created_at       TEXT NOT NULL,
                UNIQUE (conversation_id, seq)
            );

            CREATE INDEX idx_messages_unread ON messages(receiver_id, read);

            CREATE TABLE notifications (
                id            TEXT PRIMARY KEY,
                recipient_id  TEXT NOT NULL REFERENCES users(id),
                type          TEXT NOT NULL,
                title         TEXT NOT NULL,
                message       TEXT NOT NULL,
                related_data  TEXT NOT NULL,
                read          INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            );

            CREATE INDEX idx_notifications_recipient
                ON notifications(recipient_id, read, created_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);
    }
}
