use axum::extract::{Path, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{JoinRequest, Participant};
use crate::participation::requests;
use crate::schema::{event_join_requests, event_participants, events};
use crate::socket::fanout::{self, Scope};
use crate::AppState;

#[derive(Debug, Default, Deserialize, Validate)]
pub struct JoinEventRequest {
    #[validate(length(max = 500, message = "message must be at most 500 characters"))]
    pub message: Option<String>,
}

/// POST /events/:id/join - create a pending join request
pub async fn request_join(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
    Json(req): Json<JoinEventRequest>,
) -> AppResult<Json<ApiResponse<JoinRequest>>> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db_conn()?;

    let (request, event) = requests::request_join(
        &mut conn,
        event_id,
        user.id,
        req.message,
        state.config.rejected_blocks_rerequest,
    )?;

    fanout::emit(
        &state.io,
        Scope::User(event.host_id),
        "join-requested",
        &serde_json::json!({
            "event_id": event_id,
            "request_id": request.id,
            "user_id": user.id,
        }),
    );

    publisher::request_created(&state.bus, request.id, event_id, user.id, event.host_id);

    Ok(Json(ApiResponse::ok(request)))
}

#[derive(Debug, Serialize)]
pub struct LeaveEventResponse {
    pub left: bool,
    pub event_reopened: bool,
    pub participant_count: i64,
}

/// DELETE /events/:id/join - leave an event, fully resetting the pair
pub async fn leave_event(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<LeaveEventResponse>>> {
    let mut conn = state.db_conn()?;

    let outcome = requests::leave_event(&mut conn, event_id, user.id)?;

    if let Some(conversation_id) = outcome.conversation_id {
        fanout::emit(
            &state.io,
            Scope::Conversation(conversation_id),
            "member-left",
            &serde_json::json!({
                "conversation_id": conversation_id,
                "user_id": user.id,
            }),
        );
    }
    fanout::emit(
        &state.io,
        Scope::Event(event_id),
        "participant-left",
        &serde_json::json!({
            "event_id": event_id,
            "user_id": user.id,
            "participant_count": outcome.joined_count,
            "event_reopened": outcome.reopened,
        }),
    );

    publisher::participant_left(
        &state.bus,
        event_id,
        user.id,
        outcome.joined_count,
        outcome.reopened,
    );

    Ok(Json(ApiResponse::ok(LeaveEventResponse {
        left: true,
        event_reopened: outcome.reopened,
        participant_count: outcome.joined_count,
    })))
}

#[derive(Debug, Serialize)]
pub struct AcceptRequestResponse {
    pub request: JoinRequest,
    pub participant: Participant,
    pub conversation_id: Uuid,
    pub participant_count: i64,
    pub event_full: bool,
}

/// POST /events/:id/requests/:request_id/accept - host accepts a request
pub async fn accept_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((event_id, request_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<AcceptRequestResponse>>> {
    let mut conn = state.db_conn()?;

    let outcome = requests::accept_request(&mut conn, event_id, request_id, user.id)?;

    // Committed; fan out to the accepted user, the event audience and the
    // conversation members.
    fanout::emit(
        &state.io,
        Scope::User(outcome.request.user_id),
        "request-accepted",
        &serde_json::json!({
            "event_id": event_id,
            "request_id": request_id,
            "conversation_id": outcome.conversation.id,
        }),
    );
    fanout::emit(
        &state.io,
        Scope::Event(event_id),
        "participant-joined",
        &serde_json::json!({
            "event_id": event_id,
            "user_id": outcome.request.user_id,
            "participant_count": outcome.joined_count,
            "event_full": outcome.became_full,
        }),
    );
    fanout::emit(
        &state.io,
        Scope::Conversation(outcome.conversation.id),
        "member-joined",
        &serde_json::json!({
            "conversation_id": outcome.conversation.id,
            "user_id": outcome.request.user_id,
        }),
    );

    publisher::request_accepted(
        &state.bus,
        request_id,
        event_id,
        outcome.request.user_id,
        outcome.joined_count,
        outcome.became_full,
    );

    Ok(Json(ApiResponse::ok(AcceptRequestResponse {
        request: outcome.request,
        participant: outcome.participant,
        conversation_id: outcome.conversation.id,
        participant_count: outcome.joined_count,
        event_full: outcome.became_full,
    })))
}

/// POST /events/:id/requests/:request_id/reject - host declines a request
pub async fn reject_request(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path((event_id, request_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<JoinRequest>>> {
    let mut conn = state.db_conn()?;

    let (request, _event) = requests::reject_request(&mut conn, event_id, request_id, user.id)?;

    fanout::emit(
        &state.io,
        Scope::User(request.user_id),
        "request-rejected",
        &serde_json::json!({
            "event_id": event_id,
            "request_id": request_id,
        }),
    );

    publisher::request_rejected(&state.bus, request_id, event_id, request.user_id);

    Ok(Json(ApiResponse::ok(request)))
}

/// GET /events/:id/requests - host lists the event's join requests
pub async fn list_requests(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<JoinRequest>>>> {
    let mut conn = state.db_conn()?;

    let host_id: Uuid = events::table
        .find(event_id)
        .select(events::host_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::EventNotFound, "event not found"))?;

    if host_id != user.id {
        return Err(AppError::new(
            ErrorCode::NotEventHost,
            "only the host can list join requests",
        ));
    }

    let items = event_join_requests::table
        .filter(event_join_requests::event_id.eq(event_id))
        .order(event_join_requests::created_at.asc())
        .load::<JoinRequest>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}

/// GET /events/:id/participants
pub async fn list_participants(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Participant>>>> {
    let mut conn = state.db_conn()?;

    let event_exists: bool = diesel::select(diesel::dsl::exists(
        events::table.filter(events::id.eq(event_id)),
    ))
    .get_result(&mut conn)?;
    if !event_exists {
        return Err(AppError::new(ErrorCode::EventNotFound, "event not found"));
    }

    let items = event_participants::table
        .filter(event_participants::event_id.eq(event_id))
        .order(event_participants::joined_at.asc())
        .load::<Participant>(&mut conn)?;

    Ok(Json(ApiResponse::ok(items)))
}
