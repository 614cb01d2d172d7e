//! Storage layer for `CipherSafe`.
//!
//! This crate defines the [`Store`] trait: the relational persistence
//! contract the core services depend on. It knows nothing about
//! encryption or authorization. Secret values arrive here already sealed.
//!
//! Two implementations are provided:
//!
//! - [`PostgresStore`]: production backend, backed by `PostgreSQL` (feature `postgres-backend`)
//! - [`MemoryStore`]: in-memory, for tests and throwaway dev runs

mod error;
mod memory;
mod models;
#[cfg(feature = "postgres-backend")]
mod postgres;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use models::{Project, Secret, User};
#[cfg(feature = "postgres-backend")]
pub use postgres::PostgresStore;

/// Relational persistence for users, projects and secrets.
///
/// Implementations must enforce a unique user email and the
/// Project→User and Secret→Project foreign keys. They must be safe to share
/// across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait Store: Send + Sync + 'static {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Conflict`] if the email is already registered.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError>;

    /// Look up a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_user(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Look up a user by email (exact match).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Insert a new project owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ForeignKey`] if the owner does not exist.
    async fn insert_project(&self, owner_id: i64, name: &str) -> Result<Project, StorageError>;

    /// Look up a project by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_project(&self, id: i64) -> Result<Option<Project>, StorageError>;

    /// List all projects owned by `owner_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StorageError>;

    /// Insert a sealed secret under `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ForeignKey`] if the project does not exist.
    async fn insert_secret(
        &self,
        project_id: i64,
        key: &str,
        sealed_value: &str,
    ) -> Result<Secret, StorageError>;

    /// Look up a secret by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn find_secret(&self, id: i64) -> Result<Option<Secret>, StorageError>;

    /// List all secrets in a project, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn list_secrets_by_project(&self, project_id: i64) -> Result<Vec<Secret>, StorageError>;

    /// Delete a secret. Returns `false` if nothing was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Query`] if the backend fails.
    async fn delete_secret(&self, id: i64) -> Result<bool, StorageError>;
}
