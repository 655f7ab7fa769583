use chrono::Utc;
use diesel::dsl::count_star;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use kindred_shared::errors::{unique_violation, AppError, AppResult, ErrorCode};

use crate::models::{
    Conversation, Event, EventStatus, JoinRequest, NewJoinRequest, NewParticipant, Participant,
    RequestStatus, User,
};
use crate::participation::{conversations, eligibility};
use crate::schema::{event_join_requests, event_participants, events, users};
use crate::services::notifications::{self, NotificationPayload};

pub struct AcceptOutcome {
    pub event: Event,
    pub request: JoinRequest,
    pub participant: Participant,
    pub conversation: Conversation,
    pub joined_count: i64,
    pub became_full: bool,
}

pub struct LeaveOutcome {
    pub event: Event,
    pub joined_count: i64,
    pub reopened: bool,
    pub conversation_id: Option<Uuid>,
}

/// Status transition after an accepted request, if any.
/// An open event flips to full exactly when the cap is reached; a host who
/// set any other status keeps it.
fn accept_transition(status: EventStatus, joined_count: i64, max_participants: i32) -> Option<EventStatus> {
    if status == EventStatus::Open && joined_count >= max_participants as i64 {
        Some(EventStatus::Full)
    } else {
        None
    }
}

/// Status transition after a participant leaves, if any.
/// Only the leave-triggered reopen is automated: full reverts to open when
/// the count drops below the cap. Other statuses are never touched.
fn leave_transition(status: EventStatus, joined_count: i64, max_participants: i32) -> Option<EventStatus> {
    if status == EventStatus::Full && joined_count < max_participants as i64 {
        Some(EventStatus::Open)
    } else {
        None
    }
}

/// Create a PENDING join request for (event, user).
///
/// Capacity is not checked here; requests are non-binding and capacity is
/// enforced inside accept. The host notification commits with the request.
pub fn request_join(
    conn: &mut PgConnection,
    event_id: Uuid,
    user_id: Uuid,
    message: Option<String>,
    rejected_blocks_rerequest: bool,
) -> AppResult<(JoinRequest, Event)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let event = find_event(conn, event_id)?;

        let status = parse_status(&event)?;
        if !status.admits_requests() {
            return Err(AppError::new(
                ErrorCode::EventNotOpen,
                "event is not accepting join requests",
            ));
        }

        if event.host_id == user_id {
            return Err(AppError::new(
                ErrorCode::HostCannotJoin,
                "you are hosting this event",
            ));
        }

        let user: User = users::table
            .find(user_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

        let already_joined: bool = diesel::select(diesel::dsl::exists(
            event_participants::table
                .filter(event_participants::event_id.eq(event_id))
                .filter(event_participants::user_id.eq(user_id)),
        ))
        .get_result(conn)?;
        if already_joined {
            return Err(AppError::new(
                ErrorCode::AlreadyParticipant,
                "you already joined this event",
            ));
        }

        let existing: Option<JoinRequest> = event_join_requests::table
            .filter(event_join_requests::event_id.eq(event_id))
            .filter(event_join_requests::user_id.eq(user_id))
            .first::<JoinRequest>(conn)
            .optional()?;

        if let Some(request) = existing {
            match request.status.parse::<RequestStatus>() {
                Ok(RequestStatus::Pending) => {
                    return Err(AppError::new(
                        ErrorCode::DuplicatePendingRequest,
                        "you already have a pending request for this event",
                    ));
                }
                Ok(RequestStatus::Rejected) => {
                    if rejected_blocks_rerequest {
                        return Err(AppError::new(
                            ErrorCode::PreviouslyRejected,
                            "your previous request for this event was declined",
                        ));
                    }
                    diesel::delete(event_join_requests::table.find(request.id)).execute(conn)?;
                }
                // ACCEPTED without a live participant row: the participant
                // left; the stale row is cleared so the pair can re-request.
                Ok(RequestStatus::Accepted) => {
                    diesel::delete(event_join_requests::table.find(request.id)).execute(conn)?;
                }
                Err(e) => return Err(AppError::internal(e)),
            }
        }

        eligibility::check_eligibility(&event, &user, Utc::now().date_naive())?;

        let inserted = diesel::insert_into(event_join_requests::table)
            .values(&NewJoinRequest {
                event_id,
                user_id,
                status: RequestStatus::Pending.as_str().to_string(),
                message,
            })
            .get_result::<JoinRequest>(conn);

        let request = match inserted {
            Ok(request) => request,
            Err(e) if unique_violation(&e) => {
                return Err(AppError::new(
                    ErrorCode::DuplicatePendingRequest,
                    "you already have a pending request for this event",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        notifications::create(
            conn,
            event.host_id,
            &NotificationPayload::JoinRequested {
                event_id,
                request_id: request.id,
                requester_id: user_id,
                requester_name: user.display_name.clone(),
            },
        )?;

        Ok((request, event))
    })
}

/// Accept a pending request. One atomic unit: the capacity re-check, the
/// request flip, the participant insert, the conversation provisioning, the
/// status transition and the notification all commit together or not at all.
pub fn accept_request(
    conn: &mut PgConnection,
    event_id: Uuid,
    request_id: Uuid,
    acting_user_id: Uuid,
) -> AppResult<AcceptOutcome> {
    conn.transaction::<_, AppError, _>(|conn| {
        // Row lock serializes concurrent accepts racing for the last seat;
        // the count below is read against the locked, authoritative state.
        let event: Event = events::table
            .find(event_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::EventNotFound, "event not found"))?;

        if event.host_id != acting_user_id {
            return Err(AppError::new(
                ErrorCode::NotEventHost,
                "only the host can accept join requests",
            ));
        }

        let request: JoinRequest = event_join_requests::table
            .find(request_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::RequestNotFound, "join request not found"))?;

        if request.event_id != event_id {
            return Err(AppError::new(
                ErrorCode::RequestNotFound,
                "join request does not belong to this event",
            ));
        }

        if request.status != RequestStatus::Pending.as_str() {
            return Err(AppError::new(
                ErrorCode::RequestNotPending,
                "join request was already responded to",
            ));
        }

        let joined_count: i64 = participant_count(conn, event_id)?;
        if joined_count >= event.max_participants as i64 {
            return Err(AppError::new(ErrorCode::EventFull, "event is full"));
        }

        let request = diesel::update(event_join_requests::table.find(request.id))
            .set((
                event_join_requests::status.eq(RequestStatus::Accepted.as_str()),
                event_join_requests::responded_at.eq(Some(Utc::now())),
            ))
            .get_result::<JoinRequest>(conn)?;

        let inserted = diesel::insert_into(event_participants::table)
            .values(&NewParticipant {
                event_id,
                user_id: request.user_id,
            })
            .get_result::<Participant>(conn);

        let participant = match inserted {
            Ok(participant) => participant,
            Err(e) if unique_violation(&e) => {
                return Err(AppError::new(
                    ErrorCode::AlreadyParticipant,
                    "user already joined this event",
                ));
            }
            Err(e) => return Err(e.into()),
        };

        // First acceptance creates the conversation with the host in it;
        // later acceptances only add the new participant.
        let conversation = conversations::ensure_conversation(conn, event_id)?;
        conversations::ensure_member(conn, conversation.id, event.host_id)?;
        conversations::ensure_member(conn, conversation.id, request.user_id)?;

        let joined_name = display_name(conn, request.user_id)?;
        conversations::post_system_message(
            conn,
            conversation.id,
            &format!("{joined_name} joined the event"),
        )?;

        let new_count = joined_count + 1;
        let status = parse_status(&event)?;
        let became_full = match accept_transition(status, new_count, event.max_participants) {
            Some(next) => {
                set_event_status(conn, event_id, next)?;
                true
            }
            None => false,
        };

        notifications::create(
            conn,
            request.user_id,
            &NotificationPayload::RequestAccepted {
                event_id,
                event_title: event.title.clone(),
            },
        )?;

        Ok(AcceptOutcome {
            event,
            request,
            participant,
            conversation,
            joined_count: new_count,
            became_full,
        })
    })
}

/// Decline a pending request. No capacity or conversation side effects.
pub fn reject_request(
    conn: &mut PgConnection,
    event_id: Uuid,
    request_id: Uuid,
    acting_user_id: Uuid,
) -> AppResult<(JoinRequest, Event)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let event = find_event(conn, event_id)?;

        if event.host_id != acting_user_id {
            return Err(AppError::new(
                ErrorCode::NotEventHost,
                "only the host can reject join requests",
            ));
        }

        let request: JoinRequest = event_join_requests::table
            .find(request_id)
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::RequestNotFound, "join request not found"))?;

        if request.event_id != event_id {
            return Err(AppError::new(
                ErrorCode::RequestNotFound,
                "join request does not belong to this event",
            ));
        }

        if request.status != RequestStatus::Pending.as_str() {
            return Err(AppError::new(
                ErrorCode::RequestNotPending,
                "join request was already responded to",
            ));
        }

        let request = diesel::update(event_join_requests::table.find(request.id))
            .set((
                event_join_requests::status.eq(RequestStatus::Rejected.as_str()),
                event_join_requests::responded_at.eq(Some(Utc::now())),
            ))
            .get_result::<JoinRequest>(conn)?;

        notifications::create(
            conn,
            request.user_id,
            &NotificationPayload::RequestRejected {
                event_id,
                event_title: event.title.clone(),
            },
        )?;

        Ok((request, event))
    })
}

/// Remove a participant and fully reset the (event, user) pair.
///
/// Deleting the join-request rows alongside the participant row is the only
/// path that clears a REJECTED history, so the pair may request again later.
pub fn leave_event(conn: &mut PgConnection, event_id: Uuid, user_id: Uuid) -> AppResult<LeaveOutcome> {
    conn.transaction::<_, AppError, _>(|conn| {
        let event: Event = events::table
            .find(event_id)
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| AppError::new(ErrorCode::EventNotFound, "event not found"))?;

        let participant: Participant = event_participants::table
            .filter(event_participants::event_id.eq(event_id))
            .filter(event_participants::user_id.eq(user_id))
            .first(conn)
            .optional()?
            .ok_or_else(|| {
                AppError::new(ErrorCode::NotParticipant, "you are not a participant of this event")
            })?;

        if event.has_started(Utc::now()) {
            return Err(AppError::new(
                ErrorCode::EventAlreadyStarted,
                "cannot leave an event that already took place",
            ));
        }

        diesel::delete(event_participants::table.find(participant.id)).execute(conn)?;
        diesel::delete(
            event_join_requests::table
                .filter(event_join_requests::event_id.eq(event_id))
                .filter(event_join_requests::user_id.eq(user_id)),
        )
        .execute(conn)?;

        let joined_count = participant_count(conn, event_id)?;
        let reopened = match leave_transition(parse_status(&event)?, joined_count, event.max_participants) {
            Some(next) => {
                set_event_status(conn, event_id, next)?;
                true
            }
            None => false,
        };

        let conversation_id = match conversations::conversation_for_event(conn, event_id)? {
            Some(conversation) => {
                conversations::soft_leave(conn, conversation.id, user_id)?;
                let left_name = display_name(conn, user_id)?;
                conversations::post_system_message(
                    conn,
                    conversation.id,
                    &format!("{left_name} left the event"),
                )?;
                Some(conversation.id)
            }
            None => None,
        };

        Ok(LeaveOutcome {
            event,
            joined_count,
            reopened,
            conversation_id,
        })
    })
}

pub fn participant_count(conn: &mut PgConnection, event_id: Uuid) -> Result<i64, diesel::result::Error> {
    event_participants::table
        .filter(event_participants::event_id.eq(event_id))
        .select(count_star())
        .first(conn)
}

fn find_event(conn: &mut PgConnection, event_id: Uuid) -> AppResult<Event> {
    events::table
        .find(event_id)
        .first::<Event>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::EventNotFound, "event not found"))
}

fn parse_status(event: &Event) -> AppResult<EventStatus> {
    event
        .status_enum()
        .ok_or_else(|| AppError::internal(format!("event {} has unknown status {}", event.id, event.status)))
}

fn set_event_status(
    conn: &mut PgConnection,
    event_id: Uuid,
    status: EventStatus,
) -> Result<(), diesel::result::Error> {
    diesel::update(events::table.find(event_id))
        .set((
            events::status.eq(status.as_str()),
            events::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    Ok(())
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
    fn open_event_flips_to_full_at_cap() {
        assert_eq!(accept_transition(EventStatus::Open, 5, 5), Some(EventStatus::Full));
        assert_eq!(accept_transition(EventStatus::Open, 4, 5), None);
    }

    #[test]
    fn non_open_statuses_never_flip_to_full() {
        assert_eq!(accept_transition(EventStatus::Ongoing, 5, 5), None);
        assert_eq!(accept_transition(EventStatus::Draft, 5, 5), None);
        assert_eq!(accept_transition(EventStatus::Full, 5, 5), None);
    }

    #[test]
    fn full_event_reopens_when_count_drops_below_cap() {
        assert_eq!(leave_transition(EventStatus::Full, 4, 5), Some(EventStatus::Open));
        assert_eq!(leave_transition(EventStatus::Full, 5, 5), None);
    }

    #[test]
    fn manually_set_statuses_do_not_spuriously_reopen() {
        assert_eq!(leave_transition(EventStatus::Cancelled, 4, 5), None);
        assert_eq!(leave_transition(EventStatus::Ongoing, 4, 5), None);
        assert_eq!(leave_transition(EventStatus::Open, 4, 5), None);
    }
}
