use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::models::Notification;
use crate::services::notifications;
use crate::AppState;

/// GET /notifications - newest first, paginated
pub async fn list_notifications(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Notification>>>> {
    let mut conn = state.db_conn()?;

    let (items, total) = notifications::list(&mut conn, user.id, &params)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

/// GET /notifications/unread-count
pub async fn unread_count(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UnreadCountResponse>>> {
    let mut conn = state.db_conn()?;

    let unread = notifications::count_unread(&mut conn, user.id)?;

    Ok(Json(ApiResponse::ok(UnreadCountResponse { unread })))
}

/// POST /notifications/:id/read
pub async fn mark_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let mut conn = state.db_conn()?;

    let notification = notifications::mark_read(&mut conn, notification_id, user.id)?;

    Ok(Json(ApiResponse::ok(notification)))
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// POST /notifications/read-all
pub async fn mark_all_read(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MarkAllReadResponse>>> {
    let mut conn = state.db_conn()?;

    let updated = notifications::mark_all_read(&mut conn, user.id)?;

    Ok(Json(ApiResponse::ok(MarkAllReadResponse { updated })))
}
