// API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Fieldless error classification, used to compare errors and to report
/// per-record outcomes without carrying message text around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadInput,
    AuthenticationRequired,
    Forbidden,
    NotAuthorized,
    NotFound,
    Internal,
}

/// Caller-visible error. Every operation of the request pipeline surfaces
/// exactly one of these kinds; collaborator errors are converted on the way out.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("bad input: {0}")]
    BadInput(String),

    // 403 Forbidden
    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    // 403 Forbidden
    #[error("forbidden: {0}")]
    Forbidden(String),

    // 401 Unauthorized
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    // 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    // 500 Internal Server Error
    #[error("internal: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::BadInput(_) => ErrorKind::BadInput,
            ApiError::AuthenticationRequired(_) => ErrorKind::AuthenticationRequired,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotAuthorized(_) => ErrorKind::NotAuthorized,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadInput(_) => 400,
            ApiError::AuthenticationRequired(_) | ApiError::Forbidden(_) => 403,
            ApiError::NotAuthorized(_) => 401,
            ApiError::NotFound(_) => 404,
            ApiError::Internal(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadInput(msg)
            | ApiError::AuthenticationRequired(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotAuthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadInput(_) => "BAD_INPUT",
            ApiError::AuthenticationRequired(_) => "AUTHENTICATION_REQUIRED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotAuthorized(_) => "NOT_AUTHORIZED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        ApiError::BadInput(message.into())
    }

    pub fn authentication_required(message: impl Into<String>) -> Self {
        ApiError::AuthenticationRequired(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_authorized(message: impl Into<String>) -> Self {
        ApiError::NotAuthorized(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

// Convert collaborator error types to ApiError
impl From<crate::storage::StoreError> for ApiError {
    fn from(err: crate::storage::StoreError) -> Self {
        match err {
            crate::storage::StoreError::NotFound(id) => {
                ApiError::not_found(format!("record '{}' not found", id))
            }
            crate::storage::StoreError::InvalidDocument(msg) => ApiError::bad_input(msg),
            crate::storage::StoreError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal("database error occurred")
            }
        }
    }
}

impl From<crate::storage::blob::BlobError> for ApiError {
    fn from(err: crate::storage::blob::BlobError) -> Self {
        match err {
            crate::storage::blob::BlobError::NotFound(id) => {
                ApiError::not_found(format!("blob '{}' not found", id))
            }
            crate::storage::blob::BlobError::InvalidId(id) => {
                ApiError::bad_input(format!("invalid blob id '{}'", id))
            }
            crate::storage::blob::BlobError::Io(io_err) => {
                tracing::error!("Blob storage error: {}", io_err);
                ApiError::internal("file storage error occurred")
            }
        }
    }
}

impl From<crate::auth::HashError> for ApiError {
    fn from(err: crate::auth::HashError) -> Self {
        tracing::error!("Password hashing error: {}", err);
        ApiError::internal("failed to secure record")
    }
}

impl From<crate::data::parser::ParseError> for ApiError {
    fn from(err: crate::data::parser::ParseError) -> Self {
        use crate::data::parser::ParseError;
        match err {
            ParseError::BadInput(msg) => ApiError::bad_input(msg),
            ParseError::EndOfStream => ApiError::bad_input("unexpected end of record stream"),
            ParseError::Io(io_err) => {
                tracing::error!("Record stream read error: {}", io_err);
                ApiError::internal("failed to read record stream")
            }
            ParseError::Callback(api_err) => api_err,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_input(format!("invalid JSON: {}", err))
    }
}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::bad_input("x").status_code(), 400);
        assert_eq!(ApiError::authentication_required("x").status_code(), 403);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::not_authorized("x").status_code(), 401);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::internal("x").status_code(), 500);
    }

    #[test]
    fn test_end_of_stream_is_bad_input() {
        let err: ApiError = crate::data::parser::ParseError::EndOfStream.into();
        assert_eq!(err.kind(), ErrorKind::BadInput);
    }

    #[test]
    fn test_json_body() {
        let body = ApiError::not_found("record 'loki' not found").to_json();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["message"], "record 'loki' not found");
    }
}
