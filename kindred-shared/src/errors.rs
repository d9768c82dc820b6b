use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{domain}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E2xxx: Profile errors
/// - E3xxx: Matching errors (swipes, matches, daily picks, AI providers)
/// - E4xxx: Messaging errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,
    TokenExpired,
    TokenInvalid,

    // Profiles (E2xxx)
    UserNotFound,
    NoEmbedding,
    InvalidProfile,

    // Matching (E3xxx)
    DuplicateSwipe,
    CannotSwipeSelf,
    MatchNotFound,
    DailyPicksNotFound,
    PickNotFound,
    ProviderError,

    // Messaging (E4xxx)
    NotMatchParticipant,
    EmptyMessage,
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
            Self::ServiceUnavailable => "E0007",
            Self::BadRequest => "E0008",
            Self::TokenExpired => "E0010",
            Self::TokenInvalid => "E0011",

            // Profiles
            Self::UserNotFound => "E2001",
            Self::NoEmbedding => "E2002",
            Self::InvalidProfile => "E2003",

            // Matching
            Self::DuplicateSwipe => "E3001",
            Self::CannotSwipeSelf => "E3002",
            Self::MatchNotFound => "E3003",
            Self::DailyPicksNotFound => "E3004",
            Self::PickNotFound => "E3005",
            Self::ProviderError => "E3006",

            // Messaging
            Self::NotMatchParticipant => "E4001",
            Self::EmptyMessage => "E4002",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::ProviderError => StatusCode::BAD_GATEWAY,
            Self::ValidationError | Self::BadRequest | Self::InvalidProfile
            | Self::EmptyMessage | Self::CannotSwipeSelf => StatusCode::BAD_REQUEST,
            Self::NoEmbedding => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound | Self::UserNotFound | Self::MatchNotFound
            | Self::DailyPicksNotFound | Self::PickNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchParticipant => StatusCode::FORBIDDEN,
            Self::DuplicateSwipe => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Failure of an external AI or index provider (network, timeout, bad reply).
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderError, message)
    }

    /// The error code when this is a known application error.
    ///
    /// `Validation` maps to `ValidationError` and a diesel `NotFound` maps to
    /// `NotFound`; other infrastructure failures have no code.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            AppError::Known { code, .. } => Some(*code),
            AppError::Validation(_) => Some(ErrorCode::ValidationError),
            AppError::Database(diesel::result::Error::NotFound) => Some(ErrorCode::NotFound),
            _ => None,
        }
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code() == Some(code)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
                    tracing::error!(code = code.code(), "{message}");
                }
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_codes_map_to_expected_statuses() {
        assert_eq!(ErrorCode::DuplicateSwipe.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::NotMatchParticipant.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::ProviderError.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorCode::DailyPicksNotFound.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn code_is_recoverable_from_error() {
        let err = AppError::new(ErrorCode::DuplicateSwipe, "already swiped");
        assert!(err.is(ErrorCode::DuplicateSwipe));
        assert_eq!(AppError::Validation("x".into()).code(), Some(ErrorCode::ValidationError));
        assert_eq!(AppError::Internal(anyhow::anyhow!("boom")).code(), None);
    }

    #[test]
    fn codes_are_unique() {
        let all = [
            ErrorCode::InternalError, ErrorCode::ValidationError, ErrorCode::NotFound,
            ErrorCode::Unauthorized, ErrorCode::Forbidden, ErrorCode::ServiceUnavailable,
            ErrorCode::BadRequest, ErrorCode::TokenExpired, ErrorCode::TokenInvalid,
            ErrorCode::UserNotFound, ErrorCode::NoEmbedding, ErrorCode::InvalidProfile,
            ErrorCode::DuplicateSwipe, ErrorCode::CannotSwipeSelf, ErrorCode::MatchNotFound,
            ErrorCode::DailyPicksNotFound, ErrorCode::PickNotFound, ErrorCode::ProviderError,
            ErrorCode::NotMatchParticipant, ErrorCode::EmptyMessage,
        ];
        let mut codes: Vec<&str> = all.iter().map(|c| c.code()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
