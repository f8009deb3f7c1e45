//! HTTP mapping of every error kind
use axum::{http::StatusCode, response::IntoResponse};
use recruit_auth::error::{AppError, AuthError};
use recruit_auth_common::ErrorResponse;

#[test]
fn test_error_table() {
    let cases = [
        (AuthError::DuplicateEmail, StatusCode::CONFLICT, "DUPLICATE_EMAIL"),
        (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
        (AuthError::EmailNotVerified, StatusCode::UNAUTHORIZED, "EMAIL_NOT_VERIFIED"),
        (AuthError::InvalidToken, StatusCode::BAD_REQUEST, "INVALID_TOKEN"),
        (AuthError::ExpiredToken, StatusCode::BAD_REQUEST, "EXPIRED_TOKEN"),
        (AuthError::TokenAlreadyUsed, StatusCode::BAD_REQUEST, "TOKEN_ALREADY_USED"),
        (AuthError::InvalidSession, StatusCode::UNAUTHORIZED, "INVALID_SESSION"),
        (AuthError::ExpiredSession, StatusCode::UNAUTHORIZED, "EXPIRED_SESSION"),
        (AuthError::RevokedSession, StatusCode::UNAUTHORIZED, "REVOKED_SESSION"),
        (
            AuthError::InvalidInput("bad".into()),
            StatusCode::BAD_REQUEST,
            "INVALID_INPUT",
        ),
        (AuthError::RateLimited, StatusCode::TOO_MANY_REQUESTS, "AUTH_RATE_LIMITED"),
        (
            AuthError::Storage("io".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
        ),
        (
            AuthError::Internal("boom".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
        ),
    ];

    for (err, status, code) in cases {
        assert_eq!(err.status_code(), status, "{err:?}");
        assert_eq!(err.error_code(), code, "{err:?}");
    }
    assert_eq!(AppError::RateLimitExceeded.error_code(), "RATE_LIMITED");
}

#[tokio::test]
async fn test_error_envelope_shape() {
    let response = AppError::from(AuthError::ExpiredToken).into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(raw["error"].get("correlationId").is_none());

    let body: ErrorResponse = serde_json::from_value(raw).unwrap();
    assert_eq!(body.error.code, "EXPIRED_TOKEN");
    assert_eq!(body.error.message, "Token expired");
}
