//! Shared application state for the `CipherSafe` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`. The services hold the store and the keys; no
//! handler touches either directly.

use std::sync::Arc;

use ciphersafe_core::{
    AccountService, EncryptionKey, EnvelopeCipher, ProjectService, SecretService, SessionIssuer,
    SigningKey,
};
use ciphersafe_storage::Store;

/// Shared application state passed to all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Registration, login and token resolution.
    pub accounts: AccountService,
    /// Project creation and listing.
    pub projects: ProjectService,
    /// Ownership-gated secret operations.
    pub secrets: SecretService,
}

impl AppState {
    /// Wire the services over one store and the two configured keys.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, master_key: EncryptionKey, signing_key: SigningKey) -> Self {
        let cipher = Arc::new(EnvelopeCipher::new(master_key));
        let issuer = Arc::new(SessionIssuer::new(signing_key));
        Self {
            accounts: AccountService::new(Arc::clone(&store), issuer),
            projects: ProjectService::new(Arc::clone(&store)),
            secrets: SecretService::new(store, cipher),
        }
    }
}
