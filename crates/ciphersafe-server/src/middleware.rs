//! Bearer-token authentication middleware.
//!
//! Resolves `Authorization: Bearer <token>` to a user id and injects
//! [`AuthUser`] into request extensions. Handlers behind this layer never
//! see an unauthenticated request.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller, as established by [`auth_middleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Axum middleware that authenticates API requests.
///
/// # Errors
///
/// Returns [`AppError::Unauthenticated`] if the header is missing, does not
/// use the Bearer scheme, or carries an invalid or expired token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated("missing Authorization header".to_owned()))?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AppError::Unauthenticated("Authorization header must use Bearer scheme".to_owned())
        })?;

    let user_id = state.accounts.authenticate(token).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        AppError::from(e)
    })?;

    req.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(req).await)
}
