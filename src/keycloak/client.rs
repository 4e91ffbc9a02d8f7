use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::token_bundle::{TokenBundle, TokenResponse};
use crate::config::types::KeycloakConfig;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::keycloak::claims::{self, Claims};
use crate::keycloak::endpoints::KeycloakEndpoints;
use crate::utils::constants::{DEFAULT_EXPIRY_BUFFER_SECS, IDP_HTTP_TIMEOUT_SECS, OPENID_SCOPE};

/// Claims returned by the userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// OAuth2 token-endpoint client for one Keycloak realm.
///
/// Every grant returns a fresh [`TokenBundle`]; persisting it is the caller's job.
#[derive(Debug, Clone)]
pub struct KeycloakClient {
    config: KeycloakConfig,
    endpoints: KeycloakEndpoints,
    client: Client,
}

impl KeycloakClient {
    pub fn new(config: KeycloakConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(IDP_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(config, client)
    }

    pub fn with_client(config: KeycloakConfig, client: Client) -> Result<Self, AuthError> {
        let endpoints = KeycloakEndpoints::from_config(&config)?;
        Ok(Self { config, endpoints, client })
    }

    pub fn endpoints(&self) -> &KeycloakEndpoints {
        &self.endpoints
    }

    pub fn config(&self) -> &KeycloakConfig {
        &self.config
    }

    /// Resource-owner password credentials grant.
    pub async fn authenticate_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenBundle, AuthError> {
        let mut form = self.base_form("password");
        form.push(("username", username));
        form.push(("password", password));
        form.push(("scope", OPENID_SCOPE));

        let bundle = self.exchange(&form).await.map(|r| TokenBundle::from_response(r, now_i64()))?;
        info!("password grant succeeded for user '{}'", username);
        Ok(bundle)
    }

    /// Client-credentials grant. Needs a configured client secret.
    pub async fn authenticate_with_client_credentials(&self) -> Result<TokenBundle, AuthError> {
        if self.config.secret().is_none() {
            return Err(AuthError::Configuration(
                "client secret required for client credentials flow".into(),
            ));
        }
        let mut form = self.base_form("client_credentials");
        form.push(("scope", OPENID_SCOPE));

        let bundle = self.exchange(&form).await.map(|r| TokenBundle::from_response(r, now_i64()))?;
        info!("client credentials grant succeeded for client '{}'", self.config.client_id);
        Ok(bundle)
    }

    /// Authorization-code flow URL. Pure: no request is made.
    pub fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> Url {
        let mut url = self.endpoints.auth.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", OPENID_SCOPE);
            if let Some(state) = state.filter(|s| !s.is_empty()) {
                query.append_pair("state", state);
            }
        }
        url
    }

    /// Authorization-code grant.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenBundle, AuthError> {
        let mut form = self.base_form("authorization_code");
        form.push(("code", code));
        form.push(("redirect_uri", redirect_uri));

        let bundle = self.exchange(&form).await.map(|r| TokenBundle::from_response(r, now_i64()))?;
        info!("authorization code exchanged");
        Ok(bundle)
    }

    /// Refresh-token grant for `current`.
    ///
    /// Rejected without a request when the stored refresh expiry has passed.
    /// The previous refresh token is kept when the server does not rotate it.
    pub async fn refresh_access_token(&self, current: &TokenBundle) -> Result<TokenBundle, AuthError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoRefreshToken)?;

        if current.is_refresh_expired_at(now_i64(), DEFAULT_EXPIRY_BUFFER_SECS) {
            debug!("refresh token expired locally, skipping refresh request");
            return Err(AuthError::RefreshTokenExpired);
        }

        let mut form = self.base_form("refresh_token");
        form.push(("refresh_token", refresh_token));

        let response = self.exchange(&form).await?;
        info!("access token refreshed");
        Ok(TokenBundle::from_refresh_response(response, current, now_i64()))
    }

    /// Userinfo lookup with a bearer token.
    pub async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .client
            .get(self.endpoints.userinfo.clone())
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("get user info failed: {}", status);
            return Err(AuthError::rejected(status.as_u16(), &body));
        }
        Ok(response.json::<UserInfo>().await?)
    }

    /// Revoke a refresh token at the provider.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AuthError> {
        let mut form = vec![
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = self.config.secret() {
            form.push(("client_secret", secret));
        }

        let response = self
            .client
            .post(self.endpoints.revoke.clone())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::rejected(status.as_u16(), &body));
        }
        Ok(())
    }

    pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
        claims::decode_claims(token)
    }

    pub fn is_expired(token: &str, buffer_seconds: i64) -> bool {
        claims::is_expired(token, buffer_seconds)
    }

    fn base_form<'a>(&'a self, grant_type: &'a str) -> Vec<(&'a str, &'a str)> {
        let mut form = vec![
            ("grant_type", grant_type),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = self.config.secret() {
            form.push(("client_secret", secret));
        }
        form
    }

    async fn exchange(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AuthError> {
        let grant_type = form
            .iter()
            .find(|(k, _)| *k == "grant_type")
            .map(|(_, v)| *v)
            .unwrap_or_default();

        let response = self
            .client
            .post(self.endpoints.token.clone())
            .form(form)
            .send()
            .await
            .inspect_err(|e| warn!("{} grant transport error: {}", grant_type, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("{} grant rejected: {}", grant_type, status);
            return Err(AuthError::rejected(status.as_u16(), &body));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Transport(format!("invalid token response: {e}")))
    }
}
