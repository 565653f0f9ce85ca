//! Error type shared by services, repositories and handlers.
//!
//! Every failure carries a stable machine code and an HTTP status, and
//! renders as `{"error": {"code", "message"}}`. Storage, token and
//! internal failures are logged here and reach clients as generic text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::domain::{ConflictReason, MatchOutcome};

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed bearer token
    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Session or ledger rule violation
    #[error("{}", .0.message())]
    Conflict(ConflictReason),

    #[error("{0}")]
    Validation(String),

    /// Embedding extractor unreachable, slow or failing
    #[error("Embedding extraction failed: {0}")]
    ExternalService(String),

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[error("Authentication error")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    error: ErrorBody,
    /// Match details when a face could not be attributed
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<MatchOutcome>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ErrorResponse {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            identity: None,
        }
    }

    pub fn with_identity(mut self, identity: MatchOutcome) -> Self {
        self.identity = Some(identity);
        self
    }
}

impl AppError {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        AppError::Forbidden(reason.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        AppError::ExternalService(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable code clients branch on.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(reason) => reason.code(),
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Jwt(_) => "AUTH_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to show a client. Details of opaque failures go to the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => {
                tracing::error!(error = ?e, "Database failure");
                "A database error occurred".to_string()
            }
            AppError::Internal(detail) => {
                tracing::error!(%detail, "Internal failure");
                "An internal error occurred".to_string()
            }
            AppError::Jwt(e) => {
                tracing::debug!(error = %e, "Token rejected");
                "Invalid or expired token".to_string()
            }
            AppError::ExternalService(detail) => {
                tracing::warn!(%detail, "Extractor failure");
                self.to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.code(), self.public_message());
        (self.status(), Json(body)).into_response()
    }
}

/// `Option` to `NotFound` in one call.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &'static str) -> AppResult<T> {
        self.ok_or(AppError::NotFound(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_carries_reason_code() {
        let err = AppError::Conflict(ConflictReason::AlreadyCheckedOut);
        assert_eq!(err.code(), "ALREADY_CHECKED_OUT");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_external_service_is_bad_gateway() {
        let err = AppError::external("timed out");
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "Embedding extraction failed: timed out");
    }

    #[test]
    fn test_not_found_names_entity() {
        let err: AppResult<()> = None.ok_or_not_found("Attendance record");
        assert_eq!(err.unwrap_err().to_string(), "Attendance record not found");
    }

    #[test]
    fn test_envelope_omits_identity_unless_set() {
        let plain = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "gone")).unwrap();
        assert_eq!(plain["error"]["code"], "NOT_FOUND");
        assert!(plain.get("identity").is_none());

        let face = ErrorResponse::new("FACE_NOT_RECOGNIZED", "Face not recognized").with_identity(
            MatchOutcome::NoMatch {
                nearest_distance: None,
            },
        );
        let value = serde_json::to_value(face).unwrap();
        assert_eq!(value["identity"]["outcome"], "no_match");
    }
}
