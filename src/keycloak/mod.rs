//! Keycloak module
//!
//! OAuth2 grants against the realm token endpoint and unverified claim decoding.

pub mod claims;
pub mod client;
pub mod endpoints;

pub use claims::{decode_claims, is_expired, Claims};
pub use client::{KeycloakClient, UserInfo};
pub use endpoints::KeycloakEndpoints;
