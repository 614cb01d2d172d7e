//! Project routes. Every project listed or created belongs to the caller.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};

use ciphersafe_storage::Project;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Request body for creating a project.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// Response for project listing.
#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

/// Build the projects router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/projects", get(list_projects).post(create_project))
}

/// `POST /api/projects`
async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let Json(body) = body?;
    let project = state.projects.create(auth.user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// `GET /api/projects`
async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProjectListResponse>, AppError> {
    let projects = state.projects.list(auth.user_id).await?;
    Ok(Json(ProjectListResponse { projects }))
}
