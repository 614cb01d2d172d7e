//! In-memory store for tests and development.
//!
//! All tables live in `BTreeMap`s behind one `RwLock`, so every operation
//! sees a consistent snapshot and constraint checks cannot race with the
//! insert they guard. Nothing persists past process exit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::{Project, Secret, Store, StorageError, User};

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    projects: BTreeMap<i64, Project>,
    secrets: BTreeMap<i64, Secret>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id = self.next_id.saturating_add(1);
        self.next_id
    }
}

/// An in-memory [`Store`].
///
/// Cloning is cheap and clones share state. Ids are allocated from a single
/// monotonic counter, so they are unique across all three tables, and
/// `BTreeMap` ordering makes listings come back oldest first.
///
/// # Examples
///
/// ```
/// # use ciphersafe_storage::{MemoryStore, Store};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// let user = store.insert_user("a@x.com", "$argon2id$...").await.unwrap();
/// let project = store.insert_project(user.id, "infra").await.unwrap();
/// assert_eq!(project.owner_id, user.id);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the sealed value of an existing secret.
    ///
    /// Not part of [`Store`]: secrets have no update operation. This exists
    /// so tests can simulate at-rest corruption. Returns `false` if the
    /// secret does not exist.
    pub async fn overwrite_secret_value(&self, id: i64, sealed_value: &str) -> bool {
        let mut tables = self.tables.write().await;
        match tables.secrets.get_mut(&id) {
            Some(secret) => {
                sealed_value.clone_into(&mut secret.value);
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StorageError::Conflict {
                entity: "users",
                reason: "email already registered".to_owned(),
            });
        }

        let user = User {
            id: tables.allocate_id(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_project(&self, owner_id: i64, name: &str) -> Result<Project, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&owner_id) {
            return Err(StorageError::ForeignKey {
                entity: "projects",
                parent: "user",
                parent_id: owner_id,
            });
        }

        let project = Project {
            id: tables.allocate_id(),
            name: name.to_owned(),
            owner_id,
            created_at: Utc::now(),
        };
        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: i64) -> Result<Option<Project>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).cloned())
    }

    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn insert_secret(
        &self,
        project_id: i64,
        key: &str,
        sealed_value: &str,
    ) -> Result<Secret, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project_id) {
            return Err(StorageError::ForeignKey {
                entity: "secrets",
                parent: "project",
                parent_id: project_id,
            });
        }

        let secret = Secret {
            id: tables.allocate_id(),
            project_id,
            key: key.to_owned(),
            value: sealed_value.to_owned(),
            created_at: Utc::now(),
        };
        tables.secrets.insert(secret.id, secret.clone());
        Ok(secret)
    }

    async fn find_secret(&self, id: i64) -> Result<Option<Secret>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.secrets.get(&id).cloned())
    }

    async fn list_secrets_by_project(&self, project_id: i64) -> Result<Vec<Secret>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .secrets
            .values()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_secret(&self, id: i64) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().await;
        Ok(tables.secrets.remove(&id).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryStore::new();
        store.insert_user("a@x.com", "h1").await.unwrap();
        let err = store.insert_user("a@x.com", "h2").await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict { entity: "users", .. }));
    }

    #[tokio::test]
    async fn find_user_by_email_and_id() {
        let store = MemoryStore::new();
        let user = store.insert_user("a@x.com", "hash").await.unwrap();

        let by_email = store.find_user_by_email("a@x.com").await.unwrap();
        assert_eq!(by_email, Some(user.clone()));
        assert_eq!(store.find_user(user.id).await.unwrap(), Some(user));
        assert_eq!(store.find_user_by_email("b@x.com").await.unwrap(), None);
    }

    #[tokio::test]
    async fn project_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = store.insert_project(42, "infra").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::ForeignKey { parent: "user", parent_id: 42, .. }
        ));
    }

    #[tokio::test]
    async fn secret_requires_existing_project() {
        let store = MemoryStore::new();
        let err = store.insert_secret(7, "K", "00").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::ForeignKey { parent: "project", parent_id: 7, .. }
        ));
    }

    #[tokio::test]
    async fn list_projects_filters_by_owner() {
        let store = MemoryStore::new();
        let a = store.insert_user("a@x.com", "h").await.unwrap();
        let b = store.insert_user("b@x.com", "h").await.unwrap();
        let p1 = store.insert_project(a.id, "one").await.unwrap();
        store.insert_project(b.id, "other").await.unwrap();
        let p2 = store.insert_project(a.id, "two").await.unwrap();

        let projects = store.list_projects_by_owner(a.id).await.unwrap();
        assert_eq!(projects, vec![p1, p2]);
    }

    #[tokio::test]
    async fn list_secrets_filters_by_project() {
        let store = MemoryStore::new();
        let user = store.insert_user("a@x.com", "h").await.unwrap();
        let p1 = store.insert_project(user.id, "one").await.unwrap();
        let p2 = store.insert_project(user.id, "two").await.unwrap();
        let s1 = store.insert_secret(p1.id, "A", "aa").await.unwrap();
        store.insert_secret(p2.id, "B", "bb").await.unwrap();

        let secrets = store.list_secrets_by_project(p1.id).await.unwrap();
        assert_eq!(secrets, vec![s1]);
    }

    #[tokio::test]
    async fn delete_secret_reports_whether_removed() {
        let store = MemoryStore::new();
        let user = store.insert_user("a@x.com", "h").await.unwrap();
        let project = store.insert_project(user.id, "infra").await.unwrap();
        let secret = store.insert_secret(project.id, "K", "ff").await.unwrap();

        assert!(store.delete_secret(secret.id).await.unwrap());
        assert!(!store.delete_secret(secret.id).await.unwrap());
        assert_eq!(store.find_secret(secret.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ids_are_unique_across_tables() {
        let store = MemoryStore::new();
        let user = store.insert_user("a@x.com", "h").await.unwrap();
        let project = store.insert_project(user.id, "infra").await.unwrap();
        let secret = store.insert_secret(project.id, "K", "ff").await.unwrap();
        assert!(user.id < project.id && project.id < secret.id);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let user = store.insert_user("a@x.com", "h").await.unwrap();
        assert_eq!(clone.find_user(user.id).await.unwrap(), Some(user));
    }
}
