use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Swipe & friendship errors
/// - E2xxx: Event participation errors
/// - E3xxx: Conversation errors
/// - E4xxx: Notification errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    BadRequest,

    // Swipe & friendship (E1xxx)
    UserNotFound,
    CannotSwipeSelf,
    SwipeCooldownActive,

    // Event participation (E2xxx)
    EventNotFound,
    RequestNotFound,
    EventNotOpen,
    EventFull,
    EventAlreadyStarted,
    AlreadyParticipant,
    NotParticipant,
    DuplicatePendingRequest,
    PreviouslyRejected,
    NotEligible,
    HostCannotJoin,
    RequestNotPending,
    NotEventHost,

    // Conversation (E3xxx)
    ConversationNotFound,
    NotConversationMember,

    // Notification (E4xxx)
    NotificationNotFound,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::BadRequest => "E0006",

            // Swipe & friendship
            Self::UserNotFound => "E1001",
            Self::CannotSwipeSelf => "E1002",
            Self::SwipeCooldownActive => "E1003",

            // Event participation
            Self::EventNotFound => "E2001",
            Self::RequestNotFound => "E2002",
            Self::EventNotOpen => "E2003",
            Self::EventFull => "E2004",
            Self::EventAlreadyStarted => "E2005",
            Self::AlreadyParticipant => "E2006",
            Self::NotParticipant => "E2007",
            Self::DuplicatePendingRequest => "E2008",
            Self::PreviouslyRejected => "E2009",
            Self::NotEligible => "E2010",
            Self::HostCannotJoin => "E2011",
            Self::RequestNotPending => "E2012",
            Self::NotEventHost => "E2013",

            // Conversation
            Self::ConversationNotFound => "E3001",
            Self::NotConversationMember => "E3002",

            // Notification
            Self::NotificationNotFound => "E4001",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::NotEligible => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::UserNotFound | Self::EventNotFound | Self::RequestNotFound
            | Self::NotParticipant | Self::ConversationNotFound
            | Self::NotificationNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotEventHost | Self::CannotSwipeSelf
            | Self::NotConversationMember => StatusCode::FORBIDDEN,
            Self::SwipeCooldownActive | Self::EventNotOpen | Self::EventFull
            | Self::EventAlreadyStarted | Self::AlreadyParticipant | Self::DuplicatePendingRequest
            | Self::PreviouslyRejected | Self::HostCannotJoin
            | Self::RequestNotPending => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A typed domain rejection carrying its stable code.
    #[error("{message}")]
    Domain {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Domain {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Domain {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

/// True when the diesel error is a unique-constraint violation.
///
/// Concurrent writers losing a race on (event_id, user_id), (swiper_id,
/// target_id) or the canonical friendship pair land here and must be mapped
/// to the matching domain error instead of a raw storage error.
pub fn unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(diesel::result::DatabaseErrorKind::UniqueViolation, _)
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Domain { code, message, details } => (
                code.status_code(),
                ApiErrorResponse::with_details(code.code(), message, details),
            ),
            Self::Validation(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new(ErrorCode::ValidationError.code(), message),
            ),
            Self::Database(diesel::result::Error::NotFound) => (
                StatusCode::NOT_FOUND,
                ApiErrorResponse::new(ErrorCode::NotFound.code(), "resource not found"),
            ),
            Self::Database(err) => {
                tracing::error!(error = %err, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), "database error"),
                )
            }
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new(ErrorCode::InternalError.code(), "internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_family_maps_to_409() {
        for code in [
            ErrorCode::SwipeCooldownActive,
            ErrorCode::EventFull,
            ErrorCode::AlreadyParticipant,
            ErrorCode::DuplicatePendingRequest,
            ErrorCode::PreviouslyRejected,
            ErrorCode::EventAlreadyStarted,
        ] {
            assert_eq!(code.status_code(), StatusCode::CONFLICT, "{:?}", code);
        }
    }

    #[test]
    fn host_only_actions_map_to_403() {
        assert_eq!(ErrorCode::NotEventHost.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError,
            ErrorCode::ValidationError,
            ErrorCode::NotFound,
            ErrorCode::Unauthorized,
            ErrorCode::Forbidden,
            ErrorCode::BadRequest,
            ErrorCode::UserNotFound,
            ErrorCode::CannotSwipeSelf,
            ErrorCode::SwipeCooldownActive,
            ErrorCode::EventNotFound,
            ErrorCode::RequestNotFound,
            ErrorCode::EventNotOpen,
            ErrorCode::EventFull,
            ErrorCode::EventAlreadyStarted,
            ErrorCode::AlreadyParticipant,
            ErrorCode::NotParticipant,
            ErrorCode::DuplicatePendingRequest,
            ErrorCode::PreviouslyRejected,
            ErrorCode::NotEligible,
            ErrorCode::HostCannotJoin,
            ErrorCode::RequestNotPending,
            ErrorCode::NotEventHost,
            ErrorCode::ConversationNotFound,
            ErrorCode::NotConversationMember,
            ErrorCode::NotificationNotFound,
        ];
        let mut seen = std::collections::HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn unique_violation_detects_kind() {
        let err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key")),
        );
        assert!(unique_violation(&err));
        assert!(!unique_violation(&diesel::result::Error::NotFound));
    }
}
