//! Database row types. These map directly to SQLite rows and are converted
//! into `adoptly-types` models before leaving the crate.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use adoptly_types::models::{
    AdoptionApplication, Conversation, Message, Notification, NotificationPayload, Pet, User,
};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct PetRow {
    pub id: String,
    pub name: String,
    pub species: String,
    pub status: String,
    pub created_at: String,
}

pub struct ApplicationRow {
    pub id: String,
    pub pet_id: String,
    pub applicant_id: String,
    pub living_situation: String,
    pub status: String,
    pub decline_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

pub struct ConversationRow {
    pub id: String,
    pub user_low: String,
    pub user_high: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub seq: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub read: bool,
    pub read_at: Option<String>,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub related_data: String,
    pub read: bool,
    pub created_at: String,
}

pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid> {
    raw.parse()
        .with_context(|| format!("corrupt {} '{}'", field, raw))
}

pub(crate) fn parse_time(field: &str, raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .with_context(|| format!("corrupt {} '{}'", field, raw))
}

impl UserRow {
    /// The public model. The password hash stays behind.
    pub fn to_user(&self) -> Result<User> {
        Ok(User {
            id: parse_id("user id", &self.id)?,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role.parse()?,
            created_at: parse_time("user created_at", &self.created_at)?,
        })
    }
}

impl TryFrom<PetRow> for Pet {
    type Error = anyhow::Error;

    fn try_from(row: PetRow) -> Result<Self> {
        Ok(Pet {
            id: parse_id("pet id", &row.id)?,
            name: row.name,
            species: row.species,
            status: row.status.parse()?,
            created_at: parse_time("pet created_at", &row.created_at)?,
        })
    }
}

impl TryFrom<ApplicationRow> for AdoptionApplication {
    type Error = anyhow::Error;

    fn try_from(row: ApplicationRow) -> Result<Self> {
        Ok(AdoptionApplication {
            id: parse_id("application id", &row.id)?,
            pet_id: parse_id("application pet_id", &row.pet_id)?,
            applicant_id: parse_id("application applicant_id", &row.applicant_id)?,
            living_situation: row.living_situation,
            status: row.status.parse()?,
            decline_reason: row.decline_reason,
            reviewed_by: row
                .reviewed_by
                .as_deref()
                .map(|raw| parse_id("application reviewed_by", raw))
                .transpose()?,
            reviewed_at: row
                .reviewed_at
                .as_deref()
                .map(|raw| parse_time("application reviewed_at", raw))
                .transpose()?,
            created_at: parse_time("application created_at", &row.created_at)?,
        })
    }
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = anyhow::Error;

    fn try_from(row: ConversationRow) -> Result<Self> {
        Ok(Conversation {
            id: parse_id("conversation id", &row.id)?,
            user_one_id: parse_id("conversation user_low", &row.user_low)?,
            user_two_id: parse_id("conversation user_high", &row.user_high)?,
            created_at: parse_time("conversation created_at", &row.created_at)?,
            updated_at: parse_time("conversation updated_at", &row.updated_at)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Message {
            id: parse_id("message id", &row.id)?,
            conversation_id: parse_id("message conversation_id", &row.conversation_id)?,
            seq: row.seq,
            sender_id: parse_id("message sender_id", &row.sender_id)?,
            receiver_id: parse_id("message receiver_id", &row.receiver_id)?,
            body: row.body,
            read: row.read,
            read_at: row
                .read_at
                .as_deref()
                .map(|raw| parse_time("message read_at", raw))
                .transpose()?,
            created_at: parse_time("message created_at", &row.created_at)?,
        })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        let related_data: NotificationPayload = serde_json::from_str(&row.related_data)
            .with_context(|| format!("corrupt related_data on notification '{}'", row.id))?;

        Ok(Notification {
            id: parse_id("notification id", &row.id)?,
            recipient_id: parse_id("notification recipient_id", &row.recipient_id)?,
            kind: row.kind.parse()?,
            title: row.title,
            message: row.message,
            related_data,
            read: row.read,
            created_at: parse_time("notification created_at", &row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_timestamps() {
        let t = parse_time("t", &crate::timestamp(Utc::now())).unwrap();
        assert_eq!(t.timezone(), Utc);
        assert!(parse_time("t", "2025-03-01 10:20:30").is_err());
        assert!(parse_time("t", "yesterday").is_err());
    }
}
