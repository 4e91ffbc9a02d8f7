//! # Onto Auth Library
//!
//! Keycloak token lifecycle for the Onto tool server: acquiring tokens
//! through OAuth2 grants, persisting them, and handing out an access token
//! that is valid right now, refreshing it when it is not.
//!
//! Modules:
//! - `config`: service configuration, loading and validation
//! - `cache`: token bundle model and the per-session cache
//! - `keycloak`: OAuth2 grants and unverified claim decoding
//! - `session_state`: client of the remote session-state service
//! - `store`: token store contract with local-file and session-state backends
//! - `auth`: the orchestrator combining client and store

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod keycloak;
pub mod session_state;
pub mod store;
pub mod tests;
pub mod utils;


pub use crate::auth::Authenticator;
pub use crate::cache::{SessionKey, TokenBundle, TokenStatus};
pub use crate::config::types::*;
pub use crate::error::{AuthError, ErrorKind};
pub use crate::store::{TokenBackend, TokenStore};
