//! Server configuration for `CipherSafe`.
//!
//! Read once at startup into an immutable [`ServerConfig`]. Missing or
//! malformed required values are a hard error; the server never starts with
//! a half-configured key.

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use ciphersafe_core::crypto::KEY_LEN;
use ciphersafe_core::{EncryptionKey, SigningKey};

/// Minimum accepted length of `JWT_SECRET_KEY` in bytes.
pub const MIN_SIGNING_KEY_LEN: usize = 16;

const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Configuration errors. Messages name the variable, never its value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be set")]
    Missing { var: &'static str },

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Browser origin allowed by CORS.
    pub cors_origin: HeaderValue,
    /// Key for sealing secret values.
    pub master_key: EncryptionKey,
    /// Key for signing session tokens.
    pub signing_key: SigningKey,
}

/// Supported storage backend types.
#[derive(Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// PostgreSQL persistent storage.
    Postgres { url: String },
}

impl fmt::Debug for StorageBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("Memory"),
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("url", &"[redacted]")
                .finish(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `MASTER_ENCRYPTION_KEY` (required): 64 hex chars or exactly 32 raw bytes
    /// - `JWT_SECRET_KEY` (required): session signing key, at least 16 bytes
    /// - `DATABASE_URL`: required unless `CIPHERSAFE_STORAGE=memory`
    /// - `CIPHERSAFE_STORAGE`: `postgres` (default) or `memory`
    /// - `CIPHERSAFE_BIND_ADDR`: full bind address (overrides `PORT`)
    /// - `PORT`: port to bind on `0.0.0.0`
    /// - `CIPHERSAFE_LOG_LEVEL`: log filter (default: `info`)
    /// - `CIPHERSAFE_CORS_ORIGIN`: allowed origin (default: `http://localhost:3000`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or any
    /// variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let master_key = parse_master_key(lookup("MASTER_ENCRYPTION_KEY"))?;
        let signing_key = parse_signing_key(lookup("JWT_SECRET_KEY"))?;

        // Priority: CIPHERSAFE_BIND_ADDR > PORT > default.
        let bind_addr = if let Some(addr) = lookup("CIPHERSAFE_BIND_ADDR") {
            addr.parse().map_err(|e| ConfigError::Invalid {
                var: "CIPHERSAFE_BIND_ADDR",
                reason: format!("{e}"),
            })?
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().map_err(|e| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{e}"),
            })?;
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            SocketAddr::from(DEFAULT_BIND_ADDR)
        };

        let storage_backend = match lookup("CIPHERSAFE_STORAGE")
            .unwrap_or_else(|| "postgres".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            "postgres" | "postgresql" => {
                let url = lookup("DATABASE_URL")
                    .filter(|u| !u.is_empty())
                    .ok_or(ConfigError::Missing {
                        var: "DATABASE_URL",
                    })?;
                StorageBackendType::Postgres { url }
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "CIPHERSAFE_STORAGE",
                    reason: format!("unknown backend `{other}`"),
                });
            }
        };

        let log_level = lookup("CIPHERSAFE_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let cors_origin = lookup("CIPHERSAFE_CORS_ORIGIN")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_owned());
        let cors_origin = HeaderValue::from_str(&cors_origin).map_err(|e| ConfigError::Invalid {
            var: "CIPHERSAFE_CORS_ORIGIN",
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            storage_backend,
            log_level,
            cors_origin,
            master_key,
            signing_key,
        })
    }
}

fn parse_master_key(raw: Option<String>) -> Result<EncryptionKey, ConfigError> {
    const VAR: &str = "MASTER_ENCRYPTION_KEY";
    let raw = raw.filter(|v| !v.is_empty()).ok_or(ConfigError::Missing { var: VAR })?;

    if raw.len() == KEY_LEN * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        return EncryptionKey::from_hex(&raw).map_err(|e| ConfigError::Invalid {
            var: VAR,
            reason: e.to_string(),
        });
    }
    if raw.len() == KEY_LEN {
        return EncryptionKey::from_slice(raw.as_bytes()).map_err(|e| ConfigError::Invalid {
            var: VAR,
            reason: e.to_string(),
        });
    }

    Err(ConfigError::Invalid {
        var: VAR,
        reason: format!(
            "expected {} hex characters or {KEY_LEN} raw bytes, got {} bytes",
            KEY_LEN * 2,
            raw.len()
        ),
    })
}

fn parse_signing_key(raw: Option<String>) -> Result<SigningKey, ConfigError> {
    const VAR: &str = "JWT_SECRET_KEY";
    let raw = raw.filter(|v| !v.is_empty()).ok_or(ConfigError::Missing { var: VAR })?;

    if raw.len() < MIN_SIGNING_KEY_LEN {
        return Err(ConfigError::Invalid {
            var: VAR,
            reason: format!("must be at least {MIN_SIGNING_KEY_LEN} bytes"),
        });
    }
    Ok(SigningKey::from_bytes(raw.as_bytes()))
}
