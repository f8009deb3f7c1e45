// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! HTTP endpoints for the auth operations.
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use recruit_auth_common::{
    ForgotPasswordRequest, ResetPasswordRequest, SessionResponse, SignInRequest, SignInResponse,
    SignOutRequest, SignUpRequest, SignUpResponse, StatusResponse, VerifyEmailRequest,
};
use tracing::{error, warn};
use zeroize::Zeroizing;

use super::extract::{
    clear_session_cookie, session_cookie, session_token, ClientIp, CurrentUser,
};
use crate::auth::{RateLimitAction, RateLimitDecision, RateLimitHook};
use crate::error::{AppError, AuthError};
use crate::validation::normalize_email;
use crate::AppState;

/// Keys the auth hook is consulted with for one request
fn limiter_keys(ip: &str, email: &str) -> [String; 2] {
    [format!("ip:{ip}"), format!("email:{}", normalize_email(email))]
}

fn is_limited(hook: &dyn RateLimitHook, action: RateLimitAction, keys: &[String]) -> bool {
    keys.iter()
        .any(|key| hook.check(action, key) == RateLimitDecision::Limited)
}

/// `POST /auth/sign-up`
pub async fn sign_up(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SignUpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .sign_up(body.name, &body.email, Zeroizing::new(body.password))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse { user: user.view() }),
    ))
}

/// `POST /auth/sign-in`
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<SignInRequest>,
) -> Result<impl IntoResponse, AppError> {
    let hook = state.auth_limiter.as_ref();
    let keys = limiter_keys(&ip, &body.email);
    if is_limited(hook, RateLimitAction::SignIn, &keys) {
        warn!(client_ip = %ip, "sign-in throttled");
        return Err(AuthError::RateLimited.into());
    }

    let remember_me = body.remember_me.unwrap_or(true);
    let signed_in = match state
        .auth
        .sign_in(&body.email, Zeroizing::new(body.password), remember_me)
        .await
    {
        Ok(signed_in) => signed_in,
        Err(err) => {
            if matches!(err, AuthError::InvalidCredentials) {
                keys.iter()
                    .for_each(|key| hook.record_failure(RateLimitAction::SignIn, key));
            }
            return Err(err.into());
        },
    };
    keys.iter()
        .for_each(|key| hook.record_success(RateLimitAction::SignIn, key));

    let session_settings = &state.settings.session;
    let max_age = remember_me.then(|| session_settings.ttl_for(true).num_seconds());
    let cookie = session_cookie(session_settings, &signed_in.session.token, max_age);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SignInResponse {
            token: signed_in.session.token,
            expires_at: signed_in.session.expires_at,
            user: signed_in.user.view(),
        }),
    ))
}

/// `POST /auth/sign-out`. Always 200, always clears the cookie.
pub async fn sign_out(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let from_body = serde_json::from_slice::<SignOutRequest>(&body)
        .unwrap_or_default()
        .session
        .filter(|token| !token.is_empty());
    let token =
        from_body.or_else(|| session_token(&headers, &state.settings.session.cookie_name));

    if let Some(token) = token {
        if let Err(err) = state.auth.sign_out(&token).await {
            error!(error = %err, "sign-out failed");
        }
    }

    (
        [(header::SET_COOKIE, clear_session_cookie(&state.settings.session))],
        Json(StatusResponse::ok()),
    )
}

/// `POST /auth/forgot-password`. Same answer for every email.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let hook = state.auth_limiter.as_ref();
    let keys = limiter_keys(&ip, &body.email);

    if is_limited(hook, RateLimitAction::ForgotPassword, &keys) {
        warn!(client_ip = %ip, "forgot-password throttled");
    } else {
        keys.iter()
            .for_each(|key| hook.record_failure(RateLimitAction::ForgotPassword, key));
        state.auth.forgot_password(&body.email).await?;
    }

    Ok(Json(StatusResponse::ok()))
}

/// `POST /auth/reset-password`
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .reset_password(&body.token, Zeroizing::new(body.new_password))
        .await?;
    Ok(Json(StatusResponse::ok()))
}

/// `GET /auth/verify-email?token=…`
pub async fn verify_email_query(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_email(&query.token).await?;
    Ok(Json(StatusResponse::ok()))
}

/// `POST /auth/verify-email`
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_email(&body.token).await?;
    Ok(Json(StatusResponse::ok()))
}

/// `GET /auth/session`
pub async fn get_session(CurrentUser(user): CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

/// `GET /health`
pub async fn health() -> &'static str {
    "Healthy"
}
