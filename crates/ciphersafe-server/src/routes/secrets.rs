//! Secret routes.
//!
//! Plaintext values arrive in the create request and leave only in the
//! listing response. Creation answers with the record minus its value.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use ciphersafe_core::SecretListing;
use ciphersafe_storage::Secret;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Request body for creating a secret.
#[derive(Deserialize)]
pub struct CreateSecretRequest {
    pub project_id: i64,
    pub key: String,
    pub value: String,
}

impl std::fmt::Debug for CreateSecretRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateSecretRequest")
            .field("project_id", &self.project_id)
            .field("key", &self.key)
            .field("value", &"[redacted]")
            .finish()
    }
}

/// Build the secrets router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/secrets", post(create_secret))
        .route("/api/secrets/{secret_id}", delete(delete_secret))
        .route("/api/projects/{project_id}/secrets", get(list_secrets))
}

/// `POST /api/secrets`
///
/// `Secret` skips its value when serialized, so the sealed envelope is
/// never echoed back.
async fn create_secret(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<CreateSecretRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Secret>), AppError> {
    let Json(body) = body?;
    let secret = state
        .secrets
        .create(auth.user_id, body.project_id, &body.key, &body.value)
        .await?;
    Ok((StatusCode::CREATED, Json(secret)))
}

/// `GET /api/projects/{project_id}/secrets`
async fn list_secrets(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    project_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SecretListing>, AppError> {
    let Path(project_id) = project_id?;
    let listing = state.secrets.list(auth.user_id, project_id).await?;
    Ok(Json(listing))
}

/// `DELETE /api/secrets/{secret_id}`
///
/// Authorization is decided by the project the secret is stored under;
/// nothing in the request can redirect the check.
async fn delete_secret(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    secret_id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(secret_id) = secret_id?;
    state.secrets.delete(auth.user_id, secret_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
