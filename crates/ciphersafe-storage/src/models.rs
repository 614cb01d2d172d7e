//! Persisted records.
//!
//! Ids are opaque `i64`s assigned by the store. Fields that must never
//! reach a client (password hashes, sealed envelopes) are skipped during
//! serialization.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres-backend", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A project owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres-backend", derive(sqlx::FromRow))]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A secret as stored: `value` is always a sealed envelope, never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "postgres-backend", derive(sqlx::FromRow))]
pub struct Secret {
    pub id: i64,
    pub project_id: i64,
    pub key: String,
    #[serde(skip)]
    pub value: String,
    pub created_at: DateTime<Utc>,
}
