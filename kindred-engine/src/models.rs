use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{
    conversation_members, conversations, event_join_requests, event_participants, events,
    friendships, messages, notifications, swipes, users,
};

// --- Status enums ---
//
// Stored as lowercase varchar; the enums carry the transition logic and the
// string constants used in queries.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Nope,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Nope => "nope",
        }
    }
}

impl std::str::FromStr for SwipeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "nope" => Ok(Self::Nope),
            _ => Err(format!("unknown swipe action: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Open,
    Full,
    Ongoing,
    Completed,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Open => "open",
            Self::Full => "full",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the event currently admits join requests. Capacity is not
    /// checked here; a full event still accepts non-binding requests.
    pub fn admits_requests(&self) -> bool {
        matches!(self, Self::Open | Self::Full)
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "open" => Ok(Self::Open),
            "full" => Ok(Self::Full),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown event status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown request status: {s}")),
        }
    }
}

// --- User ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        let birth = self.birth_date?;
        let mut age = today.years_since(birth)? as i32;
        if age < 0 {
            age = 0;
        }
        Some(age)
    }
}

// --- Swipe ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = swipes)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub target_id: Uuid,
    pub action: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipes)]
pub struct NewSwipe {
    pub swiper_id: Uuid,
    pub target_id: Uuid,
    pub action: String,
    pub expires_at: Option<DateTime<Utc>>,
}

// --- Friendship ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = friendships)]
pub struct Friendship {
    pub id: Uuid,
    pub user_low_id: Uuid,
    pub user_high_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = friendships)]
pub struct NewFriendship {
    pub user_low_id: Uuid,
    pub user_high_id: Uuid,
}

// --- Event ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = events)]
pub struct Event {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub min_participants: i32,
    pub max_participants: i32,
    pub status: String,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub gender_restriction: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn status_enum(&self) -> Option<EventStatus> {
        self.status.parse().ok()
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now
    }
}

// --- EventJoinRequest ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = event_join_requests)]
pub struct JoinRequest {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = event_join_requests)]
pub struct NewJoinRequest {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub message: Option<String>,
}

// --- EventParticipant ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = event_participants)]
pub struct Participant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = event_participants)]
pub struct NewParticipant {
    pub event_id: Uuid,
    pub user_id: Uuid,
}

// --- Conversation ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversations)]
pub struct Conversation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversations)]
pub struct NewConversation {
    pub event_id: Uuid,
}

// --- ConversationMember ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = conversation_members)]
pub struct ConversationMember {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = conversation_members)]
pub struct NewConversationMember {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
}

// --- Message ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub conversation_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub content: String,
    pub is_system: bool,
}

// --- Notification ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = notifications)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swipe_action_roundtrip() {
        assert_eq!("like".parse::<SwipeAction>().unwrap(), SwipeAction::Like);
        assert_eq!(SwipeAction::Nope.as_str(), "nope");
        assert!("superlike".parse::<SwipeAction>().is_err());
    }

    #[test]
    fn event_status_admits_requests() {
        assert!(EventStatus::Open.admits_requests());
        assert!(EventStatus::Full.admits_requests());
        assert!(!EventStatus::Draft.admits_requests());
        assert!(!EventStatus::Cancelled.admits_requests());
        assert!(!EventStatus::Completed.admits_requests());
    }

    #[test]
    fn swipe_expiry() {
        let now = Utc::now();
        let swipe = Swipe {
            id: Uuid::new_v4(),
            swiper_id: Uuid::new_v4(),
            target_id: Uuid::new_v4(),
            action: "nope".into(),
            expires_at: Some(now - chrono::Duration::seconds(1)),
            created_at: now - chrono::Duration::days(8),
        };
        assert!(swipe.is_expired(now));

        let like = Swipe {
            expires_at: None,
            action: "like".into(),
            ..swipe
        };
        assert!(!like.is_expired(now));
    }
}
