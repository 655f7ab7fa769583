use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::models::{Conversation, ConversationMember, Message};
use crate::schema::{conversation_members, conversations, messages};
use crate::AppState;

/// A conversation with its full member history. Departed members stay in
/// the list with `left_at` set, so the timeline remains attributable.
#[derive(Debug, Serialize)]
pub struct ConversationView {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub members: Vec<ConversationMember>,
}

/// GET /conversations/:id
pub async fn get_conversation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ConversationView>>> {
    let mut conn = state.db_conn()?;

    let conversation = conversations::table
        .find(conversation_id)
        .first::<Conversation>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ConversationNotFound, "conversation not found"))?;

    let members = load_members(&mut conn, conversation_id)?;

    // Any membership row, active or left, grants read access.
    if !members.iter().any(|m| m.user_id == user.id) {
        return Err(not_a_member());
    }

    Ok(Json(ApiResponse::ok(ConversationView {
        conversation,
        members,
    })))
}

/// GET /conversations/:id/messages - newest first, paginated
pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Message>>>> {
    let mut conn = state.db_conn()?;

    let is_member: bool = diesel::select(diesel::dsl::exists(
        conversation_members::table
            .filter(conversation_members::conversation_id.eq(conversation_id))
            .filter(conversation_members::user_id.eq(user.id)),
    ))
    .get_result(&mut conn)?;
    if !is_member {
        return Err(not_a_member());
    }

    let scoped = || messages::table.filter(messages::conversation_id.eq(conversation_id));

    let total: i64 = scoped().select(count_star()).first(&mut conn)?;
    let items = scoped()
        .order(messages::created_at.desc())
        .limit(params.limit() as i64)
        .offset(params.offset() as i64)
        .load::<Message>(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

fn load_members(
    conn: &mut PgConnection,
    conversation_id: Uuid,
) -> Result<Vec<ConversationMember>, diesel::result::Error> {
    conversation_members::table
        .filter(conversation_members::conversation_id.eq(conversation_id))
        .order(conversation_members::joined_at.asc())
        .load(conn)
}

fn not_a_member() -> AppError {
    AppError::new(
        ErrorCode::NotConversationMember,
        "you are not a member of this conversation",
    )
}
