// crates/backend-lib/src/error.rs

//! Error taxonomy + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recruit_auth_common::{ErrorBody, ErrorResponse};
use thiserror::Error;
use uuid::Uuid;

use crate::storage::StoreError;
use crate::validation::ValidationError;

/// Domain failures of the auth operations
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email not verified")]
    EmailNotVerified,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("Token already used")]
    TokenAlreadyUsed,

    #[error("Invalid session")]
    InvalidSession,

    #[error("Session expired")]
    ExpiredSession,

    #[error("Session revoked")]
    RevokedSession,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Too many authentication attempts")]
    RateLimited,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::TokenAlreadyUsed => AuthError::TokenAlreadyUsed,
            other => AuthError::Storage(other.to_string()),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::InvalidInput(err.to_string())
    }
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials
            | AuthError::EmailNotVerified
            | AuthError::InvalidSession
            | AuthError::ExpiredSession
            | AuthError::RevokedSession => StatusCode::UNAUTHORIZED,
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::TokenAlreadyUsed
            | AuthError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Storage(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::DuplicateEmail => "DUPLICATE_EMAIL",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::ExpiredToken => "EXPIRED_TOKEN",
            AuthError::TokenAlreadyUsed => "TOKEN_ALREADY_USED",
            AuthError::InvalidSession => "INVALID_SESSION",
            AuthError::ExpiredSession => "EXPIRED_SESSION",
            AuthError::RevokedSession => "REVOKED_SESSION",
            AuthError::InvalidInput(_) => "INVALID_INPUT",
            AuthError::RateLimited => "AUTH_RATE_LIMITED",
            AuthError::Storage(_) | AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to a client
    pub fn sanitized_message(&self) -> String {
        match self {
            AuthError::Storage(_) | AuthError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
            AuthError::RateLimited => {
                "Too many authentication attempts, please try again later".to_string()
            },
            other => other.to_string(),
        }
    }
}

/// Error returned by HTTP handlers and middleware
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(err) => err.status_code(),
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Auth(err) => err.error_code(),
            AppError::RateLimitExceeded => "RATE_LIMITED",
        }
    }

    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Auth(err) => err.sanitized_message(),
            AppError::RateLimitExceeded => "Rate limit exceeded, please try again later".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal detail stays in the log, keyed by an id the client can quote.
        let correlation_id = if status.is_server_error() {
            let id = Uuid::new_v4().to_string();
            tracing::error!(correlation_id = %id, error = %self, "request failed");
            Some(id)
        } else {
            None
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code().to_string(),
                message: self.sanitized_message(),
                correlation_id,
            },
        };

        (status, Json(body)).into_response()
    }
}
