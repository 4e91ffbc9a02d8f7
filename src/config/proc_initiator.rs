use std::path::PathBuf;

use crate::config::settings::LoggingConfig;
use crate::config::types::ServiceConfig;
use crate::utils::constants::TOKEN_DIR_NAME;

pub fn initiate_default_values(mut config: ServiceConfig) -> ServiceConfig {
    config.keycloak.base_url = trim_base_url(&config.keycloak.base_url);
    config.keycloak.client_secret = non_blank(config.keycloak.client_secret.take());

    config.session_state.api_key = non_blank(config.session_state.api_key.take());
    // session-state service is hosted next to the Onto API unless told otherwise
    config.session_state.base_url = non_blank(config.session_state.base_url.take())
        .or_else(|| non_blank(Some(config.onto.api_base.clone())))
        .map(|url| trim_base_url(&url));

    if config.storage.dir.is_none() {
        config.storage.dir = Some(default_token_dir());
    }
    if config.logging.is_none() {
        config.logging = Some(LoggingConfig::default());
    }

    config
}

/// `~/.onto_mcp`, or a relative `.onto_mcp` when no home directory is known.
pub fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(TOKEN_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(TOKEN_DIR_NAME))
}

fn trim_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
