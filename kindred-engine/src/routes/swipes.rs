use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use kindred_shared::errors::AppResult;
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::ApiResponse;

use crate::events::publisher;
use crate::matching::ledger::{self, SwipeOutcome, SwipePairStatus};
use crate::models::SwipeAction;
use crate::socket::fanout::{self, Scope};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordSwipeRequest {
    pub target_id: Uuid,
    pub action: SwipeAction,
}

/// POST /swipe - record a like/pass and detect a mutual match
pub async fn record_swipe(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordSwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let mut conn = state.db_conn()?;

    let outcome = ledger::record_swipe(
        &mut conn,
        user.id,
        req.target_id,
        req.action,
        state.config.nope_cooldown_days,
    )?;

    // The transition is committed; everything below is best-effort awareness.
    if let Some(friendship) = outcome.friendship.as_ref().filter(|_| outcome.newly_matched) {
        for (me, other) in [
            (friendship.user_low_id, friendship.user_high_id),
            (friendship.user_high_id, friendship.user_low_id),
        ] {
            fanout::emit(
                &state.io,
                Scope::User(me),
                "friend-matched",
                &serde_json::json!({
                    "friendship_id": friendship.id,
                    "friend_id": other,
                }),
            );
        }

        publisher::friendship_created(
            &state.bus,
            friendship.id,
            friendship.user_low_id,
            friendship.user_high_id,
        );
    }

    publisher::swipe_recorded(
        &state.bus,
        outcome.swipe.id,
        user.id,
        req.target_id,
        &outcome.swipe.action,
        outcome.is_match,
    );

    Ok(Json(ApiResponse::ok(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct SwipeStatusQuery {
    pub target_id: Uuid,
}

/// GET /swipe/status?target_id= - current state of the directed pair
pub async fn swipe_status(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<SwipeStatusQuery>,
) -> AppResult<Json<ApiResponse<SwipePairStatus>>> {
    let mut conn = state.db_conn()?;

    let status = ledger::swipe_status(&mut conn, user.id, query.target_id)?;

    Ok(Json(ApiResponse::ok(status)))
}
