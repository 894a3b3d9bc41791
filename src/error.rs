use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

use crate::models::orders;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Error kinds surfaced by the engagement engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The conversation already has an order; carries it so a retrying
    /// client can treat the call as already done.
    #[error("Conflict: an order already exists for this conversation")]
    DuplicateOrder(Box<orders::Model>),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Error code string for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::DuplicateOrder(_) => "already_done",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Database(_) => "database_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::DuplicateOrder(_))
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::DuplicateOrder(_) => StatusCode::CONFLICT,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "error": self.error_code(),
            "message": self.to_string(),
        });
        if let Self::DuplicateOrder(order) = self {
            body["order"] = serde_json::json!(order);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// True when the storage layer rejected a write on a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            EngineError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EngineError::InvalidArgument("role".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EngineError::not_found("Quote").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::forbidden("nope").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            EngineError::conflict("twice").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::Unauthenticated("expired".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(EngineError::conflict("x").error_code(), "conflict");
        assert_eq!(EngineError::validation("x").error_code(), "validation_error");
        assert!(EngineError::conflict("x").is_conflict());
        assert!(!EngineError::forbidden("x").is_conflict());
    }

    #[test]
    fn test_not_found_message_names_the_entity() {
        assert_eq!(
            EngineError::not_found("Order 42").to_string(),
            "Order 42 not found"
        );
    }
}
