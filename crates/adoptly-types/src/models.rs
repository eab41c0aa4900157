use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted tag does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Adopter,
    Staff,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adopter => "adopter",
            Self::Staff => "staff",
            Self::Admin => "admin",
        }
    }

    /// Staff and admins review applications and receive application broadcasts.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Staff | Self::Admin)
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adopter" => Ok(Self::Adopter),
            "staff" => Ok(Self::Staff),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownVariant { kind: "role", value: other.to_string() }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// What a conversation counterpart is allowed to see about a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            display_name: user.display_name.clone(),
            role: user.role,
        }
    }
}

// -- Messaging --

/// A conversation between exactly two users. Participants are stored in
/// normalized order (`user_one_id < user_two_id`) so each unordered pair maps
/// to a single row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub user_one_id: Uuid,
    pub user_two_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn includes(&self, user_id: Uuid) -> bool {
        self.user_one_id == user_id || self.user_two_id == user_id
    }

    /// The participant that is not `user_id`, or `None` if `user_id` is not a participant.
    pub fn counterpart_of(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user_one_id == user_id {
            Some(self.user_two_id)
        } else if self.user_two_id == user_id {
            Some(self.user_one_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    /// Position within the conversation, starting at 1.
    pub seq: i64,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub body: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub counterpart: PublicUser,
    pub last_message: Option<String>,
    pub unread_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCounts {
    pub messages: u64,
    pub notifications: u64,
}

// -- Notifications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationSubmitted,
    ApplicationReceived,
    ApplicationApproved,
    ApplicationDeclined,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApplicationSubmitted => "application_submitted",
            Self::ApplicationReceived => "application_received",
            Self::ApplicationApproved => "application_approved",
            Self::ApplicationDeclined => "application_declined",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application_submitted" => Ok(Self::ApplicationSubmitted),
            "application_received" => Ok(Self::ApplicationReceived),
            "application_approved" => Ok(Self::ApplicationApproved),
            "application_declined" => Ok(Self::ApplicationDeclined),
            other => Err(UnknownVariant { kind: "notification type", value: other.to_string() }),
        }
    }
}

/// Structured data attached to a notification. The variant decides the
/// notification's type, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Sent to every staff/admin account when an adopter applies.
    ApplicationSubmitted {
        application_id: Uuid,
        pet_id: Uuid,
        pet_name: String,
        adopter_id: Uuid,
        adopter_name: String,
    },

    /// Receipt sent to the adopter who applied.
    ApplicationReceived {
        application_id: Uuid,
        pet_id: Uuid,
        pet_name: String,
    },

    ApplicationApproved {
        application_id: Uuid,
        pet_id: Uuid,
        pet_name: String,
    },

    ApplicationDeclined {
        application_id: Uuid,
        pet_id: Uuid,
        pet_name: String,
        reason: String,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Self::ApplicationSubmitted { .. } => NotificationKind::ApplicationSubmitted,
            Self::ApplicationReceived { .. } => NotificationKind::ApplicationReceived,
            Self::ApplicationApproved { .. } => NotificationKind::ApplicationApproved,
            Self::ApplicationDeclined { .. } => NotificationKind::ApplicationDeclined,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_data: NotificationPayload,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// -- Pets & applications --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    Available,
    Adopted,
}

impl PetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Adopted => "adopted",
        }
    }
}

impl FromStr for PetStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "adopted" => Ok(Self::Adopted),
            other => Err(UnknownVariant { kind: "pet status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: String,
    pub status: PetStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Declined,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "declined" => Ok(Self::Declined),
            other => Err(UnknownVariant { kind: "application status", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdoptionApplication {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub applicant_id: Uuid,
    pub living_situation: String,
    pub status: ApplicationStatus,
    pub decline_reason: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_tag_matches_kind() {
        let payload = NotificationPayload::ApplicationDeclined {
            application_id: Uuid::nil(),
            pet_id: Uuid::nil(),
            pet_name: "Biscuit".into(),
            reason: "No yard".into(),
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], payload.kind().as_str());
        assert_eq!(json["data"]["reason"], "No yard");
    }

    #[test]
    fn payload_rejects_missing_fields() {
        let json = serde_json::json!({
            "type": "application_approved",
            "data": { "application_id": Uuid::nil() }
        });
        assert!(serde_json::from_value::<NotificationPayload>(json).is_err());
    }

    #[test]
    fn counterpart_lookup() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conv = Conversation {
            id: Uuid::new_v4(),
            user_one_id: a,
            user_two_id: b,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(conv.counterpart_of(a), Some(b));
        assert_eq!(conv.counterpart_of(b), Some(a));
        assert_eq!(conv.counterpart_of(Uuid::new_v4()), None);
    }

    #[test]
    fn role_parses_and_classifies() {
        assert_eq!("staff".parse::<Role>().unwrap(), Role::Staff);
        assert!(Role::Admin.is_staff());
        assert!(!Role::Adopter.is_staff());
        assert!("owner".parse::<Role>().is_err());
    }
}
