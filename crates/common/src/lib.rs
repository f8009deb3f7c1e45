// ================
// common/src/lib.rs
// ================
//! Wire types shared by the auth server and its clients.
//! Field names follow the JSON contract of the `/auth/*` endpoints (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of `POST /auth/sign-up`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/sign-in`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    /// Long-lived session when true (the default), browser-session cookie otherwise
    #[serde(default)]
    pub remember_me: Option<bool>,
}

/// Body of `POST /auth/sign-out`.
/// The handle may also arrive as a cookie or bearer header, so the body is optional.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct SignOutRequest {
    #[serde(default)]
    pub session: Option<String>,
}

/// Body of `POST /auth/forgot-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of `POST /auth/reset-password`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Body (or query string) of `/auth/verify-email`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub token: String,
}

/// Public view of a user; never carries the password hash.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Response of a successful sign-up
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub user: UserView,
}

/// Response of a successful sign-in.
/// Browser clients use the cookie; the token is repeated here for non-browser clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: UserView,
}

/// Response of `GET /auth/session`
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user: UserView,
}

/// Generic acknowledgement for operations with nothing else to report
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Error envelope returned by every failing endpoint
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    /// Stable machine-readable code, e.g. `EMAIL_NOT_VERIFIED`
    pub code: String,
    pub message: String,
    /// Present on 500 responses only; matches the server-side log line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}
