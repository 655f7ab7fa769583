use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::{ApiResponse, Paginated, PaginationParams};

use crate::matching::scorer::{self, ScoreProfile};
use crate::models::{Swipe, User};
use crate::schema::{friendships, swipes, user_hobbies, user_locations, user_ratings, users};
use crate::AppState;

/// Upper bound on candidates pulled per request before scoring.
const CANDIDATE_POOL: i64 = 500;

#[derive(Debug, Serialize)]
pub struct MatchCandidate {
    pub user_id: Uuid,
    pub display_name: String,
    pub age: Option<i32>,
    pub score: f64,
    pub is_online: bool,
}

/// GET /users/matches - scored swipe recommendations
///
/// Excludes the caller, existing friends and anyone covered by a live
/// outgoing swipe (a standing LIKE or an unexpired NOPE). Scoring uses the
/// configured swipe weight split.
pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<MatchCandidate>>>> {
    let mut conn = state.db_conn()?;
    let now = Utc::now();
    let today = now.date_naive();

    let me: User = users::table
        .find(user.id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found("user profile not found"))?;
    let my_profile = load_profile(&mut conn, &me, today)?;

    // Live outgoing swipes: the pair is settled (LIKE) or cooling down (NOPE).
    let swiped: Vec<Uuid> = swipes::table
        .filter(swipes::swiper_id.eq(user.id))
        .load::<Swipe>(&mut conn)?
        .into_iter()
        .filter(|s| !s.is_expired(now))
        .map(|s| s.target_id)
        .collect();

    let friends: Vec<Uuid> = friendships::table
        .filter(
            friendships::user_low_id.eq(user.id)
                .or(friendships::user_high_id.eq(user.id)),
        )
        .load::<crate::models::Friendship>(&mut conn)?
        .into_iter()
        .map(|f| if f.user_low_id == user.id { f.user_high_id } else { f.user_low_id })
        .collect();

    let mut excluded = swiped;
    excluded.extend(friends);
    excluded.push(user.id);

    let candidates: Vec<User> = users::table
        .filter(users::id.ne_all(&excluded))
        .limit(CANDIDATE_POOL)
        .load::<User>(&mut conn)?;

    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let profile = load_profile(&mut conn, &candidate, today)?;
        let score = scorer::compatibility_score(&my_profile, &profile, &state.config.swipe_weights);
        scored.push(MatchCandidate {
            user_id: candidate.id,
            display_name: candidate.display_name,
            age: profile.age,
            score,
            is_online: false,
        });
    }

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let total = scored.len() as u64;
    let offset = params.offset() as usize;
    let limit = params.limit() as usize;
    let mut page: Vec<MatchCandidate> = scored.into_iter().skip(offset).take(limit).collect();

    // Presence follows the socket lifecycle; a failed lookup leaves
    // everyone offline rather than failing the listing.
    let ids: Vec<Uuid> = page.iter().map(|c| c.user_id).collect();
    if let Ok(flags) = state.presence.online_flags(&ids).await {
        for (candidate, online) in page.iter_mut().zip(flags) {
            candidate.is_online = online;
        }
    }

    Ok(Json(ApiResponse::ok(Paginated::new(page, total, &params))))
}

#[derive(Debug, Serialize)]
pub struct CompatibilityResponse {
    pub target_id: Uuid,
    pub score: f64,
}

/// GET /users/:id/compatibility - general compatibility with one user
///
/// Uses the wider weight split: hobby and location overlap plus age
/// proximity and the target's mean peer rating.
pub async fn get_compatibility(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CompatibilityResponse>>> {
    if target_id == user.id {
        return Err(AppError::bad_request("cannot score compatibility with yourself"));
    }

    let mut conn = state.db_conn()?;
    let today = Utc::now().date_naive();

    let me: User = users::table
        .find(user.id)
        .first(&mut conn)
        .map_err(|_| AppError::not_found("user profile not found"))?;
    let target: User = users::table
        .find(target_id)
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "target user not found"))?;

    let mine = load_profile(&mut conn, &me, today)?;
    let theirs = load_profile(&mut conn, &target, today)?;
    let score = scorer::compatibility_score(&mine, &theirs, &state.config.compat_weights);

    Ok(Json(ApiResponse::ok(CompatibilityResponse { target_id, score })))
}

fn load_profile(conn: &mut PgConnection, user: &User, today: chrono::NaiveDate) -> AppResult<ScoreProfile> {
    let hobby_ids: Vec<i32> = user_hobbies::table
        .filter(user_hobbies::user_id.eq(user.id))
        .select(user_hobbies::hobby_id)
        .load(conn)?;

    let location_ids: Vec<i32> = user_locations::table
        .filter(user_locations::user_id.eq(user.id))
        .select(user_locations::location_id)
        .load(conn)?;

    let scores: Vec<i32> = user_ratings::table
        .filter(user_ratings::rated_id.eq(user.id))
        .select(user_ratings::score)
        .load(conn)?;
    let rating_avg = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<i32>() as f64 / scores.len() as f64)
    };

    Ok(ScoreProfile {
        hobby_ids,
        location_ids,
        age: user.age_on(today),
        rating_avg,
    })
}
