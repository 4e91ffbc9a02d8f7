use url::Url;

use crate::config::types::KeycloakConfig;
use crate::error::AuthError;

/// OpenID-Connect endpoints of one realm, all under
/// `{base_url}/realms/{realm}/protocol/openid-connect/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeycloakEndpoints {
    pub token: Url,
    pub auth: Url,
    pub userinfo: Url,
    pub revoke: Url,
}

impl KeycloakEndpoints {
    pub fn from_config(config: &KeycloakConfig) -> Result<Self, AuthError> {
        let base = format!(
            "{}/realms/{}/protocol/openid-connect",
            config.base_url.trim_end_matches('/'),
            config.realm
        );
        Ok(Self {
            token: endpoint(&base, "token")?,
            auth: endpoint(&base, "auth")?,
            userinfo: endpoint(&base, "userinfo")?,
            revoke: endpoint(&base, "revoke")?,
        })
    }
}

fn endpoint(base: &str, name: &str) -> Result<Url, AuthError> {
    let raw = format!("{base}/{name}");
    Url::parse(&raw)
        .map_err(|e| AuthError::Configuration(format!("invalid Keycloak endpoint '{raw}': {e}")))
}
