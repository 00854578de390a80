use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::tier::Tier;

/// StoreError
///
/// A failure of the persistence layer itself (connectivity, timeout, constraint).
/// Distinct from "not found", which stores report as `Ok(None)` / `Ok(false)`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store timed out waiting for a connection")]
    Timeout,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            other => StoreError::Database(other),
        }
    }
}

/// AccessError
///
/// Every way credential resolution can reject a request. Each variant carries
/// enough context (tier, field, hash, user) to render a precise client message.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{tier} request rejected: field `{field}` {reason}")]
    InvalidRequest {
        tier: Tier,
        field: &'static str,
        reason: &'static str,
    },
    #[error("hash `{hash}` does not match any visible folder")]
    HashUnknown { hash: String },
    #[error("credentials rejected for user {user_id}")]
    CredentialInvalid { user_id: i64 },
    #[error("{tier} credential lookup failed: {source}")]
    Store {
        tier: Tier,
        #[source]
        source: StoreError,
    },
}

impl AccessError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AccessError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            AccessError::HashUnknown { .. } => StatusCode::NOT_FOUND,
            AccessError::CredentialInvalid { .. } => StatusCode::UNAUTHORIZED,
            AccessError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::InvalidRequest { .. } => "INVALID_REQUEST",
            AccessError::HashUnknown { .. } => "HASH_UNKNOWN",
            AccessError::CredentialInvalid { .. } => "CREDENTIAL_INVALID",
            AccessError::Store { .. } => "STORE_ERROR",
        }
    }
}

/// ApiError
///
/// The error type returned by handlers and the tier middleware. Converts into a
/// JSON body of the form `{"error": true, "code": ..., "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("upstream service failed: {0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Access(err) => err.status_code(),
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Access(err) => err.error_code(),
            ApiError::Store(_) => "STORE_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ApiError::Upstream(_) => "BAD_GATEWAY",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-facing message. Store failures are reported generically; the
    /// underlying cause only goes to the log.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Store(_) | ApiError::Access(AccessError::Store { .. }) => {
                "internal storage error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({
            "error": true,
            "code": self.error_code(),
            "message": self.client_message(),
        });
        (status, Json(body)).into_response()
    }
}
