use chrono::{DateTime, Duration, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use kindred_shared::errors::{unique_violation, AppError, AppResult, ErrorCode};

use crate::models::{Friendship, NewFriendship, NewSwipe, Swipe, SwipeAction};
use crate::schema::{friendships, swipes, users};
use crate::services::notifications::{self, NotificationPayload};

/// Result of recording one swipe.
#[derive(Debug, Serialize)]
pub struct SwipeOutcome {
    pub swipe: Swipe,
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendship: Option<Friendship>,
    /// True only when this call materialized the friendship (the race winner
    /// and the first of the two likes to complete). Fan-out keys off this.
    #[serde(skip)]
    pub newly_matched: bool,
}

/// Order an unordered user pair so the friendship row is unique per pair
/// regardless of which side liked first.
pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

/// Record a directed swipe and detect a mutual match.
///
/// Runs as one transaction: the swipe insert, the friendship check-then-create
/// and both match notifications commit together or not at all. Concurrent
/// mutual likes both run the same sequence; the unique constraint on the
/// canonical pair decides the winner and the loser adopts the winner's row.
pub fn record_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    target_id: Uuid,
    action: SwipeAction,
    cooldown_days: i64,
) -> AppResult<SwipeOutcome> {
    if swiper_id == target_id {
        return Err(AppError::new(ErrorCode::CannotSwipeSelf, "cannot swipe on yourself"));
    }

    conn.transaction::<_, AppError, _>(|conn| {
        let now = Utc::now();

        let target_exists: bool = diesel::select(diesel::dsl::exists(
            users::table.filter(users::id.eq(target_id)),
        ))
        .get_result(conn)?;
        if !target_exists {
            return Err(AppError::new(ErrorCode::UserNotFound, "target user not found"));
        }

        if let Some(existing) = directed_swipe(conn, swiper_id, target_id)? {
            match existing.action.as_str() {
                // A LIKE never expires; repeating the swipe is idempotent and
                // just reports the current match state.
                "like" => return existing_like_outcome(conn, existing, now),
                _ => {
                    if !existing.is_expired(now) {
                        return Err(AppError::with_details(
                            ErrorCode::SwipeCooldownActive,
                            "you passed on this user recently",
                            serde_json::json!({ "expires_at": existing.expires_at }),
                        ));
                    }
                    // Expired NOPE: void edge, replace it.
                    diesel::delete(swipes::table.find(existing.id)).execute(conn)?;
                }
            }
        }

        let expires_at = match action {
            SwipeAction::Like => None,
            SwipeAction::Nope => Some(now + Duration::days(cooldown_days)),
        };

        // Savepoint so a lost insert race aborts only this statement, not
        // the surrounding transaction.
        let inserted = conn.transaction::<Swipe, diesel::result::Error, _>(|conn| {
            diesel::insert_into(swipes::table)
                .values(&NewSwipe {
                    swiper_id,
                    target_id,
                    action: action.as_str().to_string(),
                    expires_at,
                })
                .get_result(conn)
        });

        let swipe = match inserted {
            Ok(swipe) => swipe,
            // A concurrent request for the same directed pair won the insert;
            // adopt its row instead of surfacing the constraint error.
            Err(e) if unique_violation(&e) => {
                let existing = directed_swipe(conn, swiper_id, target_id)?
                    .ok_or_else(|| AppError::internal("swipe row vanished after unique violation"))?;
                if existing.action == "nope" && !existing.is_expired(now) {
                    return Err(AppError::with_details(
                        ErrorCode::SwipeCooldownActive,
                        "you passed on this user recently",
                        serde_json::json!({ "expires_at": existing.expires_at }),
                    ));
                }
                return existing_like_outcome(conn, existing, now);
            }
            Err(e) => return Err(e.into()),
        };

        if action != SwipeAction::Like {
            return Ok(SwipeOutcome {
                swipe,
                is_match: false,
                friendship: None,
                newly_matched: false,
            });
        }

        match live_reverse_like(conn, swiper_id, target_id, now)? {
            Some(_) => {
                let (friendship, newly_matched) = materialize_friendship(conn, swiper_id, target_id)?;
                Ok(SwipeOutcome {
                    swipe,
                    is_match: true,
                    friendship: Some(friendship),
                    newly_matched,
                })
            }
            None => Ok(SwipeOutcome {
                swipe,
                is_match: false,
                friendship: None,
                newly_matched: false,
            }),
        }
    })
}

/// Read-only pair state for GET /swipe/status.
#[derive(Debug, Serialize)]
pub struct SwipePairStatus {
    /// The caller's live action toward the target, if any. An expired NOPE
    /// is a void edge and reported as none.
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    pub is_match: bool,
}

pub fn swipe_status(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    target_id: Uuid,
) -> AppResult<SwipePairStatus> {
    let now = Utc::now();

    let outgoing = directed_swipe(conn, swiper_id, target_id)?
        .filter(|s| !s.is_expired(now));

    let cooldown_until = outgoing
        .as_ref()
        .filter(|s| s.action == "nope")
        .and_then(|s| s.expires_at);

    let (low, high) = canonical_pair(swiper_id, target_id);
    let is_match: bool = diesel::select(diesel::dsl::exists(
        friendships::table
            .filter(friendships::user_low_id.eq(low))
            .filter(friendships::user_high_id.eq(high)),
    ))
    .get_result(conn)?;

    Ok(SwipePairStatus {
        action: outgoing.map(|s| s.action),
        cooldown_until,
        is_match,
    })
}

fn directed_swipe(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    target_id: Uuid,
) -> Result<Option<Swipe>, diesel::result::Error> {
    swipes::table
        .filter(swipes::swiper_id.eq(swiper_id))
        .filter(swipes::target_id.eq(target_id))
        .first::<Swipe>(conn)
        .optional()
}

fn live_reverse_like(
    conn: &mut PgConnection,
    swiper_id: Uuid,
    target_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Option<Swipe>, diesel::result::Error> {
    Ok(directed_swipe(conn, target_id, swiper_id)?
        .filter(|s| s.action == "like" && !s.is_expired(now)))
}

fn existing_like_outcome(
    conn: &mut PgConnection,
    existing: Swipe,
    now: DateTime<Utc>,
) -> AppResult<SwipeOutcome> {
    let (swiper_id, target_id) = (existing.swiper_id, existing.target_id);
    let reverse = live_reverse_like(conn, swiper_id, target_id, now)?;

    if reverse.is_none() {
        return Ok(SwipeOutcome {
            swipe: existing,
            is_match: false,
            friendship: None,
            newly_matched: false,
        });
    }

    let (friendship, newly_matched) = materialize_friendship(conn, swiper_id, target_id)?;
    Ok(SwipeOutcome {
        swipe: existing,
        is_match: true,
        friendship: Some(friendship),
        newly_matched,
    })
}

/// Check-then-create on the canonical pair. The existence re-check plus the
/// unique constraint make exactly one row survive two concurrent mutual
/// likes; only the creating side writes the match notifications.
fn materialize_friendship(
    conn: &mut PgConnection,
    user_a: Uuid,
    user_b: Uuid,
) -> AppResult<(Friendship, bool)> {
    let (low, high) = canonical_pair(user_a, user_b);

    let existing = friendships::table
        .filter(friendships::user_low_id.eq(low))
        .filter(friendships::user_high_id.eq(high))
        .first::<Friendship>(conn)
        .optional()?;

    if let Some(friendship) = existing {
        return Ok((friendship, false));
    }

    // Savepoint: losing the concurrent double-create must leave the outer
    // transaction usable so the winner's row can be read back.
    let inserted = conn.transaction::<Friendship, diesel::result::Error, _>(|conn| {
        diesel::insert_into(friendships::table)
            .values(&NewFriendship {
                user_low_id: low,
                user_high_id: high,
            })
            .get_result(conn)
    });

    let friendship = match inserted {
        Ok(friendship) => friendship,
        Err(e) if unique_violation(&e) => {
            // Lost the race: the other side's transaction created the row
            // (and the notifications). Return the winner's row.
            let winner = friendships::table
                .filter(friendships::user_low_id.eq(low))
                .filter(friendships::user_high_id.eq(high))
                .first::<Friendship>(conn)?;
            return Ok((winner, false));
        }
        Err(e) => return Err(e.into()),
    };

    let name_a = display_name(conn, user_a)?;
    let name_b = display_name(conn, user_b)?;

    notifications::create(
        conn,
        user_a,
        &NotificationPayload::FriendMatched {
            friendship_id: friendship.id,
            friend_id: user_b,
            friend_name: name_b,
        },
    )?;
    notifications::create(
        conn,
        user_b,
        &NotificationPayload::FriendMatched {
            friendship_id: friendship.id,
            friend_id: user_a,
            friend_name: name_a,
        },
    )?;

    Ok((friendship, true))
}

fn display_name(conn: &mut PgConnection, user_id: Uuid) -> Result<String, diesel::result::Error> {
    users::table
        .find(user_id)
        .select(users::display_name)
        .first(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn canonical_pair_orders_low_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (low, high) = canonical_pair(a, b);
        assert!(low < high);
    }

    #[test]
    fn canonical_pair_of_distinct_users_never_collapses() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (low, high) = canonical_pair(a, b);
        assert_ne!(low, high);
    }
}
