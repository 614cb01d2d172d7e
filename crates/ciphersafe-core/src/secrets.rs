//! Secret service: the only path by which secret values are written, read
//! or deleted.
//!
//! Values are sealed before they reach the store and opened on the way
//! out. Each envelope is bound to its project id and key name through the
//! AEAD associated data, so a sealed value copied into another row does not
//! open. Every operation passes the ownership gate first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ciphersafe_storage::{Secret, Store};
use serde::Serialize;
use tracing::{info, warn};

use crate::crypto::EnvelopeCipher;
use crate::error::ServiceError;
use crate::ownership::OwnershipGate;

/// Maximum secret key length in characters.
pub const MAX_KEY_LEN: usize = 256;

/// Maximum plaintext value size in bytes (1 MiB).
pub const MAX_VALUE_BYTES: usize = 1_048_576;

/// A secret with its value opened. Only ever built in memory for a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecryptedSecret {
    pub id: i64,
    pub project_id: i64,
    pub key: String,
    pub value: String,
    pub created_at: DateTime<Utc>,
}

/// Result of listing a project's secrets.
#[derive(Debug, Clone, Serialize)]
pub struct SecretListing {
    pub secrets: Vec<DecryptedSecret>,
    /// Entries omitted because their envelope failed to open.
    pub skipped: usize,
}

/// Associated data binding an envelope to its row.
fn secret_aad(project_id: i64, key: &str) -> Vec<u8> {
    format!("ciphersafe/secret/v1:{project_id}:{key}").into_bytes()
}

/// Creates, lists and deletes secrets on behalf of an authenticated user.
#[derive(Clone)]
pub struct SecretService {
    store: Arc<dyn Store>,
    gate: OwnershipGate,
    cipher: Arc<EnvelopeCipher>,
}

impl SecretService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, cipher: Arc<EnvelopeCipher>) -> Self {
        Self {
            gate: OwnershipGate::new(Arc::clone(&store)),
            store,
            cipher,
        }
    }

    /// Seal and store a new secret under `project_id`.
    ///
    /// The returned record still holds the sealed envelope.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for an empty or oversized key or value.
    /// - [`ServiceError::Unauthorized`] if `user_id` does not own the project.
    /// - [`ServiceError::Internal`] if sealing or storage fails.
    pub async fn create(
        &self,
        user_id: i64,
        project_id: i64,
        key: &str,
        value: &str,
    ) -> Result<Secret, ServiceError> {
        validate_key(key)?;
        validate_value(value)?;

        self.gate.require(user_id, project_id).await?;

        let sealed = self
            .cipher
            .seal(value.as_bytes(), &secret_aad(project_id, key))?;
        let secret = self.store.insert_secret(project_id, key, &sealed).await?;

        info!(secret_id = secret.id, project_id, user_id, "secret created");
        Ok(secret)
    }

    /// Open every secret in `project_id`.
    ///
    /// Secrets whose envelope fails to open are left out of the listing,
    /// logged with their id, and counted in [`SecretListing::skipped`].
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthorized`] if `user_id` does not own the project.
    /// - [`ServiceError::Internal`] if storage fails.
    pub async fn list(&self, user_id: i64, project_id: i64) -> Result<SecretListing, ServiceError> {
        self.gate.require(user_id, project_id).await?;

        let stored = self.store.list_secrets_by_project(project_id).await?;
        let mut secrets = Vec::with_capacity(stored.len());
        let mut skipped = 0usize;

        for secret in stored {
            match self.open(&secret) {
                Ok(value) => secrets.push(DecryptedSecret {
                    id: secret.id,
                    project_id: secret.project_id,
                    key: secret.key,
                    value,
                    created_at: secret.created_at,
                }),
                Err(e) => {
                    skipped = skipped.saturating_add(1);
                    warn!(
                        secret_id = secret.id,
                        project_id,
                        error = %e,
                        "skipping secret that failed to decrypt"
                    );
                }
            }
        }

        Ok(SecretListing { secrets, skipped })
    }

    /// Delete a secret, authorizing against the project it is stored under.
    ///
    /// Returns the deleted record.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the secret does not exist.
    /// - [`ServiceError::Unauthorized`] if `user_id` does not own the
    ///   secret's project.
    /// - [`ServiceError::Internal`] if storage fails.
    pub async fn delete(&self, user_id: i64, secret_id: i64) -> Result<Secret, ServiceError> {
        let secret = self
            .store
            .find_secret(secret_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("secret not found".to_owned()))?;

        self.gate.require(user_id, secret.project_id).await?;

        if !self.store.delete_secret(secret.id).await? {
            return Err(ServiceError::NotFound("secret not found".to_owned()));
        }

        info!(secret_id, project_id = secret.project_id, user_id, "secret deleted");
        Ok(secret)
    }

    fn open(&self, secret: &Secret) -> Result<String, ServiceError> {
        let plaintext = self
            .cipher
            .open(&secret.value, &secret_aad(secret.project_id, &secret.key))?;
        String::from_utf8(plaintext).map_err(|_| {
            ServiceError::AuthenticationFailure("decrypted value is not valid UTF-8".to_owned())
        })
    }
}

impl std::fmt::Debug for SecretService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretService")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

fn validate_key(key: &str) -> Result<(), ServiceError> {
    if key.trim().is_empty() {
        return Err(ServiceError::Validation("key is required".to_owned()));
    }
    if key.chars().count() > MAX_KEY_LEN {
        return Err(ServiceError::Validation(format!(
            "key must be at most {MAX_KEY_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::Validation("value is required".to_owned()));
    }
    if value.len() > MAX_VALUE_BYTES {
        return Err(ServiceError::Validation(
            "value must be under 1 MiB".to_owned(),
        ));
    }
    Ok(())
}
