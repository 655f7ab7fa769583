use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope wrapping every domain event put on the bus.
///
/// The routing key (`kindred.{domain}.{entity}.{action}`) is mirrored in
/// `kind` so consumers can dispatch without re-parsing broker metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event<T: Serialize> {
    pub id: Uuid,
    pub source: String,
    pub kind: String,
    pub emitted_at: DateTime<Utc>,
    pub actor_id: Option<Uuid>,
    pub data: T,
}

impl<T: Serialize> Event<T> {
    pub fn new(source: impl Into<String>, kind: impl Into<String>, data: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            source: source.into(),
            kind: kind.into(),
            emitted_at: Utc::now(),
            actor_id: None,
            data,
        }
    }

    /// Tag the event with the user whose action produced it.
    pub fn actor(mut self, user_id: Uuid) -> Self {
        self.actor_id = Some(user_id);
        self
    }
}

/// Bus routing keys
pub mod routing_keys {
    // Swipe & friendship events
    pub const SOCIAL_SWIPE_RECORDED: &str = "kindred.social.swipe.recorded";
    pub const SOCIAL_FRIENDSHIP_CREATED: &str = "kindred.social.friendship.created";

    // Event participation events
    pub const EVENTS_REQUEST_CREATED: &str = "kindred.events.request.created";
    pub const EVENTS_REQUEST_ACCEPTED: &str = "kindred.events.request.accepted";
    pub const EVENTS_REQUEST_REJECTED: &str = "kindred.events.request.rejected";
    pub const EVENTS_PARTICIPANT_LEFT: &str = "kindred.events.participant.left";
}

/// Common event data payloads
pub mod payloads {
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct SwipeRecorded {
        pub swipe_id: Uuid,
        pub swiper_id: Uuid,
        pub target_id: Uuid,
        pub action: String,
        pub is_match: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct FriendshipCreated {
        pub friendship_id: Uuid,
        pub user_a_id: Uuid,
        pub user_b_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct JoinRequestCreated {
        pub request_id: Uuid,
        pub event_id: Uuid,
        pub user_id: Uuid,
        pub host_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct JoinRequestAccepted {
        pub request_id: Uuid,
        pub event_id: Uuid,
        pub user_id: Uuid,
        pub participant_count: i64,
        pub event_full: bool,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct JoinRequestRejected {
        pub request_id: Uuid,
        pub event_id: Uuid,
        pub user_id: Uuid,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ParticipantLeft {
        pub event_id: Uuid,
        pub user_id: Uuid,
        pub participant_count: i64,
        pub event_reopened: bool,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_roundtrip() {
        let user = Uuid::new_v4();
        let event = Event::new(
            "kindred-engine",
            routing_keys::SOCIAL_FRIENDSHIP_CREATED,
            payloads::FriendshipCreated {
                friendship_id: Uuid::new_v4(),
                user_a_id: user,
                user_b_id: Uuid::new_v4(),
            },
        )
        .actor(user);

        let json = serde_json::to_string(&event).unwrap();
        let back: Event<payloads::FriendshipCreated> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, "kindred.social.friendship.created");
        assert_eq!(back.actor_id, Some(user));
        assert_eq!(back.data.user_a_id, event.data.user_a_id);
    }
}
