//! Account service: registration, login and bearer-token resolution.
//!
//! Argon2 is deliberately slow, so hashing and verification run on the
//! blocking pool instead of the async workers.

use std::sync::Arc;

use ciphersafe_storage::{Store, User};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::password::{hash_password, verify_password};
use crate::session::{IssuedSession, SessionIssuer};

/// Minimum password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum password length in bytes. Caps the work done per login attempt.
pub const MAX_PASSWORD_BYTES: usize = 1024;

/// Maximum email length in bytes.
pub const MAX_EMAIL_LEN: usize = 254;

const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Registers users, checks credentials and resolves session tokens.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
    issuer: Arc<SessionIssuer>,
}

impl AccountService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, issuer: Arc<SessionIssuer>) -> Self {
        Self { store, issuer }
    }

    /// Register a new user. The email is trimmed and lowercased.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] for a malformed email or a password
    ///   outside the allowed length.
    /// - [`ServiceError::Conflict`] if the email is already registered.
    /// - [`ServiceError::Internal`] if hashing or storage fails.
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = normalize_email(email)?;
        validate_password(password)?;

        let owned = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hash_password(&owned))
            .await
            .map_err(|e| ServiceError::Internal(format!("hashing task failed: {e}")))?
            .map_err(|e| ServiceError::Internal(format!("password hashing failed: {e}")))?;

        let user = self.store.insert_user(&email, &hash).await?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Check credentials and issue a session token.
    ///
    /// An unknown email and a wrong password produce the same error.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthenticated`] for bad credentials.
    /// - [`ServiceError::Internal`] if storage or signing fails.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedSession, ServiceError> {
        let Ok(email) = normalize_email(email) else {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()));
        };
        if password.is_empty() || password.len() > MAX_PASSWORD_BYTES {
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()));
        }

        let Some(user) = self.store.find_user_by_email(&email).await? else {
            warn!("login failed: unknown email");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()));
        };

        let owned = password.to_owned();
        let stored = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&owned, &stored))
            .await
            .map_err(|e| ServiceError::Internal(format!("verification task failed: {e}")))?;

        if !matches {
            warn!(user_id = user.id, "login failed: wrong password");
            return Err(ServiceError::Unauthenticated(INVALID_CREDENTIALS.to_owned()));
        }

        let session = self.issuer.issue(user.id)?;
        info!(user_id = user.id, "user logged in");
        Ok(session)
    }

    /// Resolve a bearer token to the user id it was issued for.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] for any invalid or expired
    /// token.
    pub fn authenticate(&self, token: &str) -> Result<i64, ServiceError> {
        Ok(self.issuer.validate(token)?)
    }

    /// Load the user a validated token refers to.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Unauthenticated`] if the user no longer exists.
    /// - [`ServiceError::Internal`] if storage fails.
    pub async fn current_user(&self, user_id: i64) -> Result<User, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::Unauthenticated("user no longer exists".to_owned()))
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ServiceError::Validation("email is required".to_owned()));
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(ServiceError::Validation(format!(
            "email must be at most {MAX_EMAIL_LEN} bytes"
        )));
    }
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(ServiceError::Validation("email is not valid".to_owned())),
    }
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ServiceError::Validation(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::SigningKey;
    use ciphersafe_storage::MemoryStore;

    fn service() -> AccountService {
        let issuer = SessionIssuer::new(SigningKey::from_bytes(b"test-signing-key-0123456789"));
        AccountService::new(Arc::new(MemoryStore::new()), Arc::new(issuer))
    }

    #[tokio::test]
    async fn register_login_and_resolve() {
        let accounts = service();
        let user = accounts
            .register("  Alice@Example.COM ", "password123")
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert!(user.password_hash.starts_with("$argon2id$"));

        let session = accounts
            .login("alice@example.com", "password123")
            .await
            .unwrap();
        let user_id = accounts.authenticate(&session.token).unwrap();
        assert_eq!(user_id, user.id);
        assert_eq!(accounts.current_user(user_id).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_regardless_of_case() {
        let accounts = service();
        accounts.register("a@x.com", "password123").await.unwrap();
        assert!(matches!(
            accounts.register("A@X.com", "password456").await,
            Err(ServiceError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let accounts = service();
        assert!(matches!(
            accounts.register("a@x.com", "short").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            accounts.register("not-an-email", "password123").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            accounts.register("   ", "password123").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            accounts
                .register("a@x.com", &"p".repeat(MAX_PASSWORD_BYTES + 1))
                .await,
            Err(ServiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn bad_credentials_share_one_message() {
        let accounts = service();
        accounts.register("a@x.com", "password123").await.unwrap();

        let wrong_password = accounts.login("a@x.com", "password124").await.unwrap_err();
        let unknown_email = accounts.login("b@x.com", "password123").await.unwrap_err();
        assert!(matches!(wrong_password, ServiceError::Unauthenticated(_)));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn garbage_token_is_unauthenticated() {
        let accounts = service();
        assert!(matches!(
            accounts.authenticate("not.a.token"),
            Err(ServiceError::Unauthenticated(_))
        ));
    }

    #[tokio::test]
    async fn token_for_missing_user_is_unauthenticated() {
        let accounts = service();
        assert!(matches!(
            accounts.current_user(77).await,
            Err(ServiceError::Unauthenticated(_))
        ));
    }
}
