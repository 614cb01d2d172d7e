//! Storage error types.
//!
//! Every variant carries enough context to diagnose the failure without a
//! debugger. Constraint violations get their own variants so the service
//! layer can map them to domain errors without inspecting messages.

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Failed to connect to or initialise the backing database.
    #[error("failed to open storage at '{target}': {reason}")]
    Open { target: String, reason: String },

    /// A unique constraint was violated (e.g. duplicate user email).
    #[error("unique constraint violated on {entity}: {reason}")]
    Conflict { entity: &'static str, reason: String },

    /// A referenced parent row does not exist.
    #[error("{entity} references missing {parent} {parent_id}")]
    ForeignKey {
        entity: &'static str,
        parent: &'static str,
        parent_id: i64,
    },

    /// A query failed for reasons other than a constraint violation.
    #[error("{operation} failed: {reason}")]
    Query {
        operation: &'static str,
        reason: String,
    },
}
