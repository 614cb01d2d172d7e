//! Project service.

use std::sync::Arc;

use ciphersafe_storage::{Project, Store};
use tracing::info;

use crate::error::ServiceError;

/// Maximum project name length in characters.
pub const MAX_NAME_LEN: usize = 128;

/// Creates and lists projects for their owner.
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
}

impl ProjectService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a project owned by `owner_id`. The name is trimmed first.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for a blank or overlong name.
    /// - [`ServiceError::NotFound`] if the owner no longer exists.
    /// - [`ServiceError::Internal`] if storage fails.
    pub async fn create(&self, owner_id: i64, name: &str) -> Result<Project, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("project name is required".to_owned()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(ServiceError::Validation(format!(
                "project name must be at most {MAX_NAME_LEN} characters"
            )));
        }

        let project = self.store.insert_project(owner_id, name).await?;
        info!(project_id = project.id, owner_id, "project created");
        Ok(project)
    }

    /// Every project owned by `owner_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if storage fails.
    pub async fn list(&self, owner_id: i64) -> Result<Vec<Project>, ServiceError> {
        Ok(self.store.list_projects_by_owner(owner_id).await?)
    }
}

impl std::fmt::Debug for ProjectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectService").finish_non_exhaustive()
    }
}
