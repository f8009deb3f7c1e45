// ============================
// recruit-auth/src/router.rs
// ============================
//! HTTP router for the auth endpoints.
use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, Uri},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::handlers::auth::{
    forgot_password, get_session, health, reset_password, sign_in, sign_out, sign_up,
    verify_email, verify_email_query,
};
use crate::middleware::rate_limit;
use crate::AppState;

/// Create the auth router
pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route(
            "/auth/verify-email",
            get(verify_email_query).post(verify_email),
        )
        .route("/auth/session", get(get_session))
        .route_layer(from_fn_with_state(state.clone(), rate_limit));

    Router::new()
        .merge(auth_routes)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.settings.app_url))
        .with_state(state)
}

/// Only the application origin may call with credentials
fn cors_layer(app_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true);

    match app_origin(app_url) {
        Some(origin) => layer.allow_origin(origin),
        None => {
            warn!(app_url, "app_url has no usable origin, cross-origin calls disabled");
            layer
        },
    }
}

/// `scheme://host[:port]` of a URL
fn app_origin(app_url: &str) -> Option<HeaderValue> {
    let uri: Uri = app_url.parse().ok()?;
    let origin = format!("{}://{}", uri.scheme_str()?, uri.authority()?);
    HeaderValue::from_str(&origin).ok()
}
