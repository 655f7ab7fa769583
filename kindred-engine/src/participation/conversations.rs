use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use kindred_shared::errors::{unique_violation, AppError, AppResult};

use crate::models::{
    Conversation, ConversationMember, Message, NewConversation, NewConversationMember, NewMessage,
};
use crate::schema::{conversation_members, conversations, messages};

/// Get-or-create the event's group conversation.
///
/// At most one conversation exists per event (unique on event_id); a
/// concurrent creator losing the insert race re-reads the winner's row.
/// Conversations are never deleted.
pub fn ensure_conversation(conn: &mut PgConnection, event_id: Uuid) -> AppResult<Conversation> {
    if let Some(existing) = conversation_for_event(conn, event_id)? {
        return Ok(existing);
    }

    // Savepoint so a lost creation race leaves the caller's transaction
    // usable for the re-read.
    let inserted = conn.transaction::<Conversation, diesel::result::Error, _>(|conn| {
        diesel::insert_into(conversations::table)
            .values(&NewConversation { event_id })
            .get_result(conn)
    });

    match inserted {
        Ok(conversation) => Ok(conversation),
        Err(e) if unique_violation(&e) => {
            let winner = conversation_for_event(conn, event_id)?
                .ok_or_else(|| AppError::internal("conversation vanished after unique violation"))?;
            Ok(winner)
        }
        Err(e) => Err(e.into()),
    }
}

/// Idempotently add a user to the conversation.
///
/// A member who previously left is reactivated (left_at cleared) so history
/// stays attached to one membership row; an active member is a no-op.
pub fn ensure_member(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> AppResult<ConversationMember> {
    let existing: Option<ConversationMember> = conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .filter(conversation_members::user_id.eq(user_id))
        .first::<ConversationMember>(conn)
        .optional()?;

    if let Some(member) = existing {
        if member.left_at.is_none() {
            return Ok(member);
        }
        let reactivated = diesel::update(conversation_members::table.find(member.id))
            .set(conversation_members::left_at.eq(None::<chrono::DateTime<Utc>>))
            .get_result::<ConversationMember>(conn)?;
        return Ok(reactivated);
    }

    let inserted = conn.transaction::<ConversationMember, diesel::result::Error, _>(|conn| {
        diesel::insert_into(conversation_members::table)
            .values(&NewConversationMember {
                conversation_id,
                user_id,
            })
            .get_result(conn)
    });

    match inserted {
        Ok(member) => Ok(member),
        Err(e) if unique_violation(&e) => {
            let member = conversation_members::table
                .filter(conversation_members::conversation_id.eq(conversation_id))
                .filter(conversation_members::user_id.eq(user_id))
                .first::<ConversationMember>(conn)?;
            Ok(member)
        }
        Err(e) => Err(e.into()),
    }
}

/// Soft-remove a member: mark left, keep the row so message history remains
/// attributable.
pub fn soft_leave(conn: &mut PgConnection, conversation_id: Uuid, user_id: Uuid) -> AppResult<()> {
    diesel::update(
        conversation_members::table
            .filter(conversation_members::conversation_id.eq(conversation_id))
            .filter(conversation_members::user_id.eq(user_id))
            .filter(conversation_members::left_at.is_null()),
    )
    .set(conversation_members::left_at.eq(Some(Utc::now())))
    .execute(conn)?;

    Ok(())
}

/// Append a system-authored message to the conversation timeline.
pub fn post_system_message(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    content: &str,
) -> AppResult<Message> {
    let message = diesel::insert_into(messages::table)
        .values(&NewMessage {
            conversation_id,
            sender_id: None,
            content: content.to_string(),
            is_system: true,
        })
        .get_result::<Message>(conn)?;

    Ok(message)
}

pub fn conversation_for_event(
    conn: &mut PgConnection,
    event_id: Uuid,
) -> Result<Option<Conversation>, diesel::result::Error> {
    conversations::table
        .filter(conversations::event_id.eq(event_id))
        .first::<Conversation>(conn)
        .optional()
}

pub fn is_active_member(
    conn: &mut PgConnection,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<bool, diesel::result::Error> {
    diesel::select(diesel::dsl::exists(
        conversation_members::table
            .filter(conversation_members::conversation_id.eq(conversation_id))
            .filter(conversation_members::user_id.eq(user_id))
            .filter(conversation_members::left_at.is_null()),
    ))
    .get_result(conn)
}
