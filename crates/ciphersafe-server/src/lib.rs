//! `CipherSafe` HTTP server.
//!
//! Wires together the core services, storage backend, and HTTP routes into
//! a running Axum server. The binary in `main.rs` only loads configuration,
//! picks a store, and serves [`routes::router`].

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
