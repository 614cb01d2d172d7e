//! HTTP route handlers and router assembly.
//!
//! `/health` and `/auth/*` are public. Everything under `/api` passes
//! through [`auth_middleware`] first.

pub mod auth;
pub mod health;
pub mod projects;
pub mod secrets;

use std::sync::Arc;

use axum::http::header::{
    AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderValue, Method};
use axum::middleware as axum_mw;
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Maximum in-flight register/login requests. Each one runs Argon2.
pub const AUTH_CONCURRENCY_LIMIT: usize = 16;

/// Build the Axum router with all routes and middleware.
pub fn router(state: Arc<AppState>, cors_origin: HeaderValue) -> Router {
    let authenticated_routes = Router::new()
        .merge(auth::me_router())
        .merge(projects::router())
        .merge(secrets::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    // Concurrency-limit credential routes to bound Argon2 memory use.
    let credential_routes =
        auth::router().layer(ConcurrencyLimitLayer::new(AUTH_CONCURRENCY_LIMIT));

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .merge(health::router())
        .merge(credential_routes)
        .merge(authenticated_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
