//! Tagged API error type
//!
//! Every failure carries an explicit kind that maps onto the HTTP status
//! code and the JSON error envelope. Call sites never classify errors by
//! message content.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed input: bad id format, missing required field, invalid enum
    /// value. 400.
    Validation(String),
    /// Not signed in. 401.
    Unauthorized(String),
    /// Signed in but not allowed: wrong role, not the resource owner. 403.
    Forbidden(String),
    /// Missing article/comment/subscriber/user. 404.
    NotFound(String),
    /// Duplicate email/username/slug, or a conditional write whose
    /// condition did not hold. 409.
    Conflict(String),
    /// Unexpected infrastructure failure. Detail is logged server-side; the
    /// client only sees a generic message. 500.
    Internal(String),
}

impl ApiError {
    /// Wrap an unexpected error, logging the detail and keeping the client
    /// message generic.
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        log::error!("Internal error: {}", err);
        ApiError::Internal("Internal server error".to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::Internal(_) => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::Validation(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        ApiError::internal(err)
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    success: bool,
    error: ErrorBody<'a>,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorEnvelope {
            success: false,
            error: ErrorBody {
                kind: self.kind(),
                message: self.message(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_hides_detail_from_clients() {
        let err = ApiError::internal("connection refused to 10.0.0.5:5432");
        assert_eq!(err.message(), "Internal server error");
    }
}
