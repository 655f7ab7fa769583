use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::PaginationParams;

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

/// Typed payload stored in the notification `data` column.
///
/// Serialized with a `type` tag so consumers can dispatch without guessing
/// at free-form JSON shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    FriendMatched {
        friendship_id: Uuid,
        friend_id: Uuid,
        friend_name: String,
    },
    JoinRequested {
        event_id: Uuid,
        request_id: Uuid,
        requester_id: Uuid,
        requester_name: String,
    },
    RequestAccepted {
        event_id: Uuid,
        event_title: String,
    },
    RequestRejected {
        event_id: Uuid,
        event_title: String,
    },
}

impl NotificationPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FriendMatched { .. } => "friend_matched",
            Self::JoinRequested { .. } => "join_requested",
            Self::RequestAccepted { .. } => "request_accepted",
            Self::RequestRejected { .. } => "request_rejected",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::FriendMatched { .. } => "It's a match!",
            Self::JoinRequested { .. } => "New join request",
            Self::RequestAccepted { .. } => "Request accepted",
            Self::RequestRejected { .. } => "Request declined",
        }
    }

    fn body(&self) -> String {
        match self {
            Self::FriendMatched { friend_name, .. } => {
                format!("You and {friend_name} liked each other")
            }
            Self::JoinRequested { requester_name, .. } => {
                format!("{requester_name} wants to join your event")
            }
            Self::RequestAccepted { event_title, .. } => {
                format!("You're in! Your request to join \"{event_title}\" was accepted")
            }
            Self::RequestRejected { event_title, .. } => {
                format!("Your request to join \"{event_title}\" was declined")
            }
        }
    }
}

/// Insert a notification row on the caller's connection.
///
/// Runs on whatever connection the caller holds, so a transition can create
/// its notifications inside the same transaction that applies the state
/// change. Real-time delivery is a separate post-commit concern.
pub fn create(
    conn: &mut PgConnection,
    user_id: Uuid,
    payload: &NotificationPayload,
) -> Result<Notification, diesel::result::Error> {
    let new_notification = NewNotification {
        user_id,
        kind: payload.kind().to_string(),
        title: payload.title().to_string(),
        body: payload.body(),
        data: Some(serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)),
    };

    let notification = diesel::insert_into(notifications::table)
        .values(&new_notification)
        .get_result::<Notification>(conn)?;

    tracing::debug!(
        notification_id = %notification.id,
        user_id = %user_id,
        kind = %notification.kind,
        "notification created"
    );

    Ok(notification)
}

/// List notifications for a user, newest first, with total count.
pub fn list(
    conn: &mut PgConnection,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<(Vec<Notification>, i64)> {
    let total: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .select(count_star())
        .first(conn)?;

    let items = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .order(notifications::created_at.desc())
        .limit(params.limit() as i64)
        .offset(params.offset() as i64)
        .load::<Notification>(conn)?;

    Ok((items, total))
}

pub fn count_unread(conn: &mut PgConnection, user_id: Uuid) -> AppResult<i64> {
    let count: i64 = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false))
        .select(count_star())
        .first(conn)?;

    Ok(count)
}

/// Mark a single notification as read (only if it belongs to the user).
pub fn mark_read(conn: &mut PgConnection, notification_id: Uuid, user_id: Uuid) -> AppResult<Notification> {
    diesel::update(
        notifications::table
            .filter(notifications::id.eq(notification_id))
            .filter(notifications::user_id.eq(user_id)),
    )
    .set(notifications::is_read.eq(true))
    .get_result::<Notification>(conn)
    .map_err(|e| match e {
        diesel::result::Error::NotFound => {
            AppError::new(ErrorCode::NotificationNotFound, "notification not found")
        }
        other => AppError::Database(other),
    })
}

pub fn mark_all_read(conn: &mut PgConnection, user_id: Uuid) -> AppResult<usize> {
    let unread = notifications::table
        .filter(notifications::user_id.eq(user_id))
        .filter(notifications::is_read.eq(false));

    let updated = diesel::update(unread)
        .set(notifications::is_read.eq(true))
        .execute(conn)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_tagged_by_type() {
        let payload = NotificationPayload::RequestAccepted {
            event_id: Uuid::new_v4(),
            event_title: "Climbing night".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "request_accepted");
        assert_eq!(json["event_title"], "Climbing night");
    }

    #[test]
    fn payload_roundtrip() {
        let payload = NotificationPayload::FriendMatched {
            friendship_id: Uuid::new_v4(),
            friend_id: Uuid::new_v4(),
            friend_name: "Ana".into(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: NotificationPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), "friend_matched");
    }

    #[test]
    fn kind_matches_tag() {
        let payload = NotificationPayload::JoinRequested {
            event_id: Uuid::new_v4(),
            request_id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            requester_name: "Ben".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], payload.kind());
    }
}
