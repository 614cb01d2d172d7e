//! `PostgreSQL` store.
//!
//! Three tables (`users`, `projects`, `secrets`) with the unique and
//! foreign-key constraints the [`Store`] contract requires. Tables are
//! created on connect if they do not exist.
//!
//! Feature-gated behind `postgres-backend`. Uses `sqlx` with the Tokio
//! runtime, so every operation is fully async.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::{Project, Secret, Store, StorageError, User};

/// `SQLSTATE` for `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// `SQLSTATE` for `foreign_key_violation`.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (\
        id            BIGSERIAL   PRIMARY KEY, \
        email         TEXT        NOT NULL UNIQUE, \
        password_hash TEXT        NOT NULL, \
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()\
    )",
    "CREATE TABLE IF NOT EXISTS projects (\
        id         BIGSERIAL   PRIMARY KEY, \
        name       TEXT        NOT NULL, \
        owner_id   BIGINT      NOT NULL REFERENCES users (id) ON DELETE CASCADE, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
    )",
    "CREATE INDEX IF NOT EXISTS idx_projects_owner_id ON projects (owner_id)",
    "CREATE TABLE IF NOT EXISTS secrets (\
        id         BIGSERIAL   PRIMARY KEY, \
        project_id BIGINT      NOT NULL REFERENCES projects (id) ON DELETE CASCADE, \
        key        TEXT        NOT NULL, \
        value      TEXT        NOT NULL, \
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()\
    )",
    "CREATE INDEX IF NOT EXISTS idx_secrets_project_id ON secrets (project_id)",
];

/// A [`Store`] backed by `PostgreSQL`.
///
/// Thread-safe via `PgPool` (connection pool).
///
/// # Examples
///
/// ```no_run
/// # use ciphersafe_storage::PostgresStore;
/// # #[tokio::main]
/// # async fn main() {
/// let store = PostgresStore::connect("postgres://localhost/ciphersafe").await.unwrap();
/// # }
/// ```
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("pool", &"[PgPool]")
            .finish_non_exhaustive()
    }
}

impl PostgresStore {
    /// Connect to `PostgreSQL` and create the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the connection or schema setup
    /// fails. The connection string is never included in the error.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Open {
                target: "[redacted]".to_owned(),
                reason: e.to_string(),
            })?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| StorageError::Open {
                    target: "[redacted]".to_owned(),
                    reason: format!("schema setup failed: {e}"),
                })?;
        }

        info!("postgres schema ready");
        Ok(Self { pool })
    }

    /// Return a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a `sqlx` error onto the storage taxonomy by SQLSTATE.
fn classify(
    err: sqlx::Error,
    operation: &'static str,
    entity: &'static str,
    parent: Option<(&'static str, i64)>,
) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                return StorageError::Conflict {
                    entity,
                    reason: db_err.message().to_owned(),
                };
            }
            Some(FOREIGN_KEY_VIOLATION) => {
                if let Some((parent, parent_id)) = parent {
                    return StorageError::ForeignKey {
                        entity,
                        parent,
                        parent_id,
                    };
                }
            }
            _ => {}
        }
    }
    query_error(operation)(err)
}

fn query_error(operation: &'static str) -> impl Fn(sqlx::Error) -> StorageError {
    move |e| StorageError::Query {
        operation,
        reason: e.to_string(),
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StorageError> {
        sqlx::query_as::<_, User>(
            r"INSERT INTO users (email, password_hash)
              VALUES ($1, $2)
              RETURNING id, email, password_hash, created_at",
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "insert user", "users", None))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("find user"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("find user by email"))
    }

    async fn insert_project(&self, owner_id: i64, name: &str) -> Result<Project, StorageError> {
        sqlx::query_as::<_, Project>(
            r"INSERT INTO projects (name, owner_id)
              VALUES ($1, $2)
              RETURNING id, name, owner_id, created_at",
        )
        .bind(name)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "insert project", "projects", Some(("user", owner_id))))
    }

    async fn find_project(&self, id: i64) -> Result<Option<Project>, StorageError> {
        sqlx::query_as::<_, Project>(
            "SELECT id, name, owner_id, created_at FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("find project"))
    }

    async fn list_projects_by_owner(&self, owner_id: i64) -> Result<Vec<Project>, StorageError> {
        sqlx::query_as::<_, Project>(
            r"SELECT id, name, owner_id, created_at FROM projects
              WHERE owner_id = $1
              ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("list projects"))
    }

    async fn insert_secret(
        &self,
        project_id: i64,
        key: &str,
        sealed_value: &str,
    ) -> Result<Secret, StorageError> {
        sqlx::query_as::<_, Secret>(
            r"INSERT INTO secrets (project_id, key, value)
              VALUES ($1, $2, $3)
              RETURNING id, project_id, key, value, created_at",
        )
        .bind(project_id)
        .bind(key)
        .bind(sealed_value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify(e, "insert secret", "secrets", Some(("project", project_id))))
    }

    async fn find_secret(&self, id: i64) -> Result<Option<Secret>, StorageError> {
        sqlx::query_as::<_, Secret>(
            "SELECT id, project_id, key, value, created_at FROM secrets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error("find secret"))
    }

    async fn list_secrets_by_project(&self, project_id: i64) -> Result<Vec<Secret>, StorageError> {
        sqlx::query_as::<_, Secret>(
            r"SELECT id, project_id, key, value, created_at FROM secrets
              WHERE project_id = $1
              ORDER BY id",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(query_error("list secrets"))
    }

    async fn delete_secret(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM secrets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(query_error("delete secret"))?;

        Ok(result.rows_affected() > 0)
    }
}
