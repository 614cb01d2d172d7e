//! Project ownership gate.
//!
//! Ownership is the only authorization relationship: a user may touch a
//! secret iff they own the secret's parent project. Every secret read,
//! write and delete goes through [`OwnershipGate::require`].

use std::sync::Arc;

use ciphersafe_storage::{Project, Store};
use tracing::debug;

use crate::error::ServiceError;

/// Authorizes users against the stored owner of a project.
#[derive(Clone)]
pub struct OwnershipGate {
    store: Arc<dyn Store>,
}

impl OwnershipGate {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Whether `user_id` owns `project_id`. `false` if the project does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the lookup itself fails.
    pub async fn authorize(&self, user_id: i64, project_id: i64) -> Result<bool, ServiceError> {
        Ok(self.owned_project(user_id, project_id).await?.is_some())
    }

    /// Load `project_id` if and only if `user_id` owns it.
    ///
    /// A missing project and a project owned by someone else are
    /// indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthorized`] when access is denied.
    pub async fn require(&self, user_id: i64, project_id: i64) -> Result<Project, ServiceError> {
        self.owned_project(user_id, project_id).await?.ok_or_else(|| {
            debug!(user_id, project_id, "ownership check denied");
            ServiceError::Unauthorized("you do not have permission for this project".to_owned())
        })
    }

    async fn owned_project(
        &self,
        user_id: i64,
        project_id: i64,
    ) -> Result<Option<Project>, ServiceError> {
        let project = self.store.find_project(project_id).await?;
        Ok(project.filter(|p| p.owner_id == user_id))
    }
}

impl std::fmt::Debug for OwnershipGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ciphersafe_storage::MemoryStore;

    async fn fixture() -> (OwnershipGate, i64, i64, i64) {
        let store = MemoryStore::new();
        let owner = store.insert_user("a@x.com", "h").await.unwrap();
        let other = store.insert_user("b@x.com", "h").await.unwrap();
        let project = store.insert_project(owner.id, "infra").await.unwrap();
        (
            OwnershipGate::new(Arc::new(store)),
            owner.id,
            other.id,
            project.id,
        )
    }

    #[tokio::test]
    async fn owner_is_authorized() {
        let (gate, owner, _, project) = fixture().await;
        assert!(gate.authorize(owner, project).await.unwrap());
        assert_eq!(gate.require(owner, project).await.unwrap().id, project);
    }

    #[tokio::test]
    async fn non_owner_is_denied() {
        let (gate, _, other, project) = fixture().await;
        assert!(!gate.authorize(other, project).await.unwrap());
        assert!(matches!(
            gate.require(other, project).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn missing_project_is_denied() {
        let (gate, owner, _, _) = fixture().await;
        assert!(!gate.authorize(owner, 9_999).await.unwrap());
        assert!(matches!(
            gate.require(owner, 9_999).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }
}
