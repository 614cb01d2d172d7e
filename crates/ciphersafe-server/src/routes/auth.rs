//! Account routes: registration, login and the current user.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use ciphersafe_core::IssuedSession;
use ciphersafe_storage::User;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Request body for both registration and login.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Build the public auth router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Build the router for the authenticated `/api/me` endpoint.
pub fn me_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/me", get(me))
}

/// `POST /auth/register`
async fn register(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let Json(body) = body?;
    let user = state.accounts.register(&body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /auth/login`
async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<IssuedSession>, AppError> {
    let Json(body) = body?;
    let session = state.accounts.login(&body.email, &body.password).await?;
    Ok(Json(session))
}

/// `GET /api/me`
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.accounts.current_user(auth.user_id).await?))
}
