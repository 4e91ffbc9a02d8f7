use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::settings::LoggingConfig;
use crate::error::AuthError;
use crate::utils::constants::{MODE_HTTP, MODE_STDIO};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub keycloak: KeycloakConfig,
    #[serde(default)]
    pub mode: DeploymentMode,
    #[serde(default)]
    pub session_state: SessionStateConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub onto: OntoConfig,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Identity provider
/// ================================
/// Client credentials for the Keycloak realm; immutable once loaded.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct KeycloakConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl KeycloakConfig {
    pub fn new(base_url: &str, realm: &str, client_id: &str, client_secret: Option<&str>) -> Self {
        Self {
            base_url: base_url.to_owned(),
            realm: realm.to_owned(),
            client_id: client_id.to_owned(),
            client_secret: client_secret.map(str::to_owned),
        }
    }

    /// Configured secret, ignoring blank values.
    pub fn secret(&self) -> Option<&str> {
        self.client_secret.as_deref().filter(|s| !s.is_empty())
    }
}

/// ================================
/// Deployment
/// ================================
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// single local process, tokens in a per-user file
    #[default]
    Stdio,
    /// multi-session HTTP service, tokens in the session-state service
    Http,
}

impl FromStr for DeploymentMode {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            MODE_STDIO => Ok(DeploymentMode::Stdio),
            MODE_HTTP => Ok(DeploymentMode::Http),
            other => Err(AuthError::Configuration(format!(
                "MCP_TRANSPORT must be '{MODE_STDIO}' or '{MODE_HTTP}', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionStateConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// directory holding `tokens.json`; defaults to `~/.onto_mcp`
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OntoConfig {
    pub api_base: String,
}
