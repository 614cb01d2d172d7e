//! Core library for `CipherSafe`.
//!
//! Contains the cipher envelope, password hashing, session tokens, the
//! project ownership gate, and the account, project and secret services.
//! This crate depends on `ciphersafe-storage` for the [`Store`] trait and
//! knows nothing about HTTP.
//!
//! [`Store`]: ciphersafe_storage::Store

pub mod accounts;
pub mod crypto;
pub mod error;
pub mod ownership;
pub mod password;
pub mod projects;
pub mod secrets;
pub mod session;

pub use accounts::AccountService;
pub use crypto::{EncryptionKey, EnvelopeCipher};
pub use error::{CryptoError, ServiceError, SessionError};
pub use ownership::OwnershipGate;
pub use projects::ProjectService;
pub use secrets::{DecryptedSecret, SecretListing, SecretService};
pub use session::{IssuedSession, SessionIssuer, SigningKey};
