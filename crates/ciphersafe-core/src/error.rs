//! Error types for `ciphersafe-core`.
//!
//! Each error variant carries enough context to diagnose the problem without
//! a debugger. Crypto and session errors never include key material,
//! plaintext, or token contents.

use ciphersafe_storage::StorageError;

/// Errors from the cipher envelope.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// A key was supplied with the wrong length.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A key was supplied as hex but could not be decoded.
    #[error("invalid key encoding: {reason}")]
    InvalidKeyEncoding { reason: String },

    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// The envelope could not be opened: bad encoding, truncated, unknown
    /// version, wrong key, wrong associated data, or tampered tag. The
    /// causes are deliberately not distinguished beyond `reason`.
    #[error("envelope authentication failed: {reason}")]
    AuthenticationFailure { reason: String },
}

/// Reasons a session token is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Not three base64url segments, or a segment is not valid JSON.
    #[error("malformed session token: {reason}")]
    Malformed { reason: String },

    /// The header names an algorithm other than the one we sign with.
    #[error("unexpected signing algorithm '{found}'")]
    AlgorithmMismatch { found: String },

    /// The signature does not verify under our signing key.
    #[error("session token signature is invalid")]
    BadSignature,

    /// The token's expiry has passed.
    #[error("session token expired at {expired_at}")]
    Expired { expired_at: i64 },

    /// The `sub` claim is missing or is not a user id.
    #[error("session token subject is missing or malformed")]
    InvalidSubject,

    /// The signing key could not be used.
    #[error("session signing failed: {reason}")]
    Signing { reason: String },
}

/// Domain error taxonomy returned by every service operation.
///
/// The HTTP layer maps each variant to exactly one status code and never
/// inspects the message text.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing, invalid, or expired credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but the caller does not own the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored envelope failed to open. Treated as data corruption.
    #[error("stored data failed authentication: {0}")]
    AuthenticationFailure(String),

    /// A uniqueness constraint was violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or crypto configuration failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict { .. } => Self::Conflict(err.to_string()),
            StorageError::ForeignKey { .. } => Self::NotFound(err.to_string()),
            StorageError::Open { .. } | StorageError::Query { .. } => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::AuthenticationFailure { .. } => {
                Self::AuthenticationFailure(err.to_string())
            }
            CryptoError::InvalidKeyLength { .. }
            | CryptoError::InvalidKeyEncoding { .. }
            | CryptoError::Encryption { .. } => Self::Internal(err.to_string()),
        }
    }
}

impl From<SessionError> for ServiceError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Signing { .. } => Self::Internal(err.to_string()),
            SessionError::Malformed { .. }
            | SessionError::AlgorithmMismatch { .. }
            | SessionError::BadSignature
            | SessionError::Expired { .. }
            | SessionError::InvalidSubject => Self::Unauthenticated(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_conflict_maps_to_conflict() {
        let err = ServiceError::from(StorageError::Conflict {
            entity: "users",
            reason: "duplicate".to_owned(),
        });
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn storage_query_maps_to_internal() {
        let err = ServiceError::from(StorageError::Query {
            operation: "find user",
            reason: "connection reset".to_owned(),
        });
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn envelope_failure_is_not_internal() {
        let err = ServiceError::from(CryptoError::AuthenticationFailure {
            reason: "tag mismatch".to_owned(),
        });
        assert!(matches!(err, ServiceError::AuthenticationFailure(_)));
    }

    #[test]
    fn every_rejected_token_is_unauthenticated() {
        for err in [
            SessionError::BadSignature,
            SessionError::InvalidSubject,
            SessionError::Expired { expired_at: 0 },
            SessionError::AlgorithmMismatch {
                found: "none".to_owned(),
            },
        ] {
            assert!(matches!(
                ServiceError::from(err),
                ServiceError::Unauthenticated(_)
            ));
        }
    }
}
