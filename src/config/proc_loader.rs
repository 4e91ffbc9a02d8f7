use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_initiator::initiate_default_values;
use crate::config::proc_validator;
use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::types::{
    DeploymentMode, KeycloakConfig, OntoConfig, ServiceConfig, SessionStateConfig, StorageConfig,
};
use crate::error::AuthError;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<ServiceConfig> {
    let content = tokio::fs::read_to_string(path).await?;

    let expanded = expand_env_vars(&content, |name| std::env::var(name).ok());
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let service_config: ServiceConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    finalize(service_config)
}

/// Build the config from process environment variables.
pub fn env_to_config() -> Result<ServiceConfig> {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Build the config from variables resolved by `lookup`.
pub fn config_from_lookup<F>(lookup: F) -> Result<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).unwrap_or_default();

    let mode = match lookup("MCP_TRANSPORT") {
        Some(value) => value.parse::<DeploymentMode>()?,
        None => Default::default(),
    };

    let logging = lookup("LOG_LEVEL").map(|level| {
        let format = lookup("LOG_FORMAT")
            .map(|f| LogFormat::parse(&f))
            .unwrap_or_default();
        LoggingConfig::new(level, format)
    });

    let service_config = ServiceConfig {
        keycloak: KeycloakConfig {
            base_url: get("KEYCLOAK_BASE_URL"),
            realm: get("KEYCLOAK_REALM"),
            client_id: get("KEYCLOAK_CLIENT_ID"),
            client_secret: lookup("KEYCLOAK_CLIENT_SECRET"),
        },
        mode,
        session_state: SessionStateConfig {
            base_url: lookup("SESSION_STATE_API_BASE"),
            api_key: lookup("SESSION_STATE_API_KEY"),
        },
        storage: StorageConfig {
            dir: lookup("ONTO_TOKEN_DIR").map(PathBuf::from),
        },
        onto: OntoConfig {
            api_base: get("ONTO_API_BASE"),
        },
        logging,
    };

    finalize(service_config)
}

fn finalize(service_config: ServiceConfig) -> Result<ServiceConfig> {
    let service_config = initiate_default_values(service_config);
    debug!("validation config ...");
    proc_validator::validate_service_config(&service_config)
        .map_err(|errors| AuthError::Configuration(errors.join("; ")))?;

    Ok(service_config)
}

/// Replace `${VAR}` and `${VAR:default}` placeholders.
pub fn expand_env_vars<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]*))?\}").expect("static regex is valid");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        lookup(var).unwrap_or_else(|| default.to_string())
    })
    .to_string()
}
