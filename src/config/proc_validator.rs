//! Configuration validation with aggregated errors.
//! - Keycloak coordinates must be present and look like URLs
//! - `http` mode needs the session-state service (base URL + API key)

use tracing::{error, info};
use url::Url;

use crate::config::types::{DeploymentMode, ServiceConfig};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    require("keycloak.base_url", &cfg.keycloak.base_url, &mut errors);
    require("keycloak.realm", &cfg.keycloak.realm, &mut errors);
    require("keycloak.client_id", &cfg.keycloak.client_id, &mut errors);
    require("onto.api_base", &cfg.onto.api_base, &mut errors);

    validate_url("keycloak.base_url", &cfg.keycloak.base_url, &mut errors);
    validate_url("onto.api_base", &cfg.onto.api_base, &mut errors);

    if cfg.keycloak.realm.contains('/') {
        errors.push(format!(
            "keycloak.realm '{}' must not contain '/'",
            cfg.keycloak.realm
        ));
    }

    if cfg.mode == DeploymentMode::Http {
        match cfg.session_state.base_url.as_deref() {
            Some(url) => validate_url("session_state.base_url", url, &mut errors),
            None => errors.push(
                "session_state.base_url (or onto.api_base) is required in http mode".to_string(),
            ),
        }
        if cfg.session_state.api_key.is_none() {
            errors.push("session_state.api_key is required in http mode".to_string());
        }
    }

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config error: {}", e);
        }
        Err(errors)
    }
}

fn require(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{field} is required"));
    }
}

fn validate_url(field: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        return;
    }
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(url) => errors.push(format!(
            "{field} must use http or https, got '{}'",
            url.scheme()
        )),
        Err(e) => errors.push(format!("{field} '{value}' is not a valid URL: {e}")),
    }
}
