use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::cache::session_cache::SessionKey;
use crate::cache::token_bundle::{TokenBundle, TokenInfo, TokenResponse};
use crate::config::types::ServiceConfig;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::keycloak::claims::{decode_claims, expiry_claim};
use crate::keycloak::client::{KeycloakClient, UserInfo};
use crate::store::{build_token_backend, TokenBackend, TokenStore};
use crate::utils::constants::{DEFAULT_EXPIRY_BUFFER_SECS, DEFAULT_TOKEN_TYPE};

/// Authenticated user as shown in session diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub email: Option<String>,
    pub name: Option<String>,
    pub username: Option<String>,
}

impl From<UserInfo> for UserSummary {
    fn from(info: UserInfo) -> Self {
        Self {
            email: info.email,
            name: info.name,
            username: info.preferred_username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    #[serde(flatten)]
    pub tokens: TokenInfo,
    pub session_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Single entry point for "a token I can use right now".
///
/// Owns the identity provider client and the token store. Refresh, clearing
/// and persistence stay behind this type; callers only pass their session key
/// (`None` in the single-process deployment).
#[derive(Debug)]
pub struct Authenticator<S = TokenBackend> {
    keycloak: KeycloakClient,
    store: S,
    buffer_seconds: i64,
}

impl Authenticator<TokenBackend> {
    /// Wire the client and the backend selected by `config.mode`.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, AuthError> {
        let keycloak = KeycloakClient::new(config.keycloak.clone())?;
        let store = build_token_backend(config).await?;
        info!("authenticator ready with {} token store", store.name());
        Ok(Self::new(keycloak, store))
    }
}

impl<S: TokenStore> Authenticator<S> {
    pub fn new(keycloak: KeycloakClient, store: S) -> Self {
        Self {
            keycloak,
            store,
            buffer_seconds: DEFAULT_EXPIRY_BUFFER_SECS,
        }
    }

    pub fn with_buffer_seconds(mut self, buffer_seconds: i64) -> Self {
        self.buffer_seconds = buffer_seconds;
        self
    }

    pub fn keycloak(&self) -> &KeycloakClient {
        &self.keycloak
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn login_with_password(
        &self,
        session: Option<&SessionKey>,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let bundle = self.keycloak.authenticate_with_password(username, password).await?;
        self.store.store(session, bundle).await
    }

    pub async fn login_with_client_credentials(
        &self,
        session: Option<&SessionKey>,
    ) -> Result<(), AuthError> {
        let bundle = self.keycloak.authenticate_with_client_credentials().await?;
        self.store.store(session, bundle).await
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: Option<&str>) -> Url {
        self.keycloak.authorization_url(redirect_uri, state)
    }

    pub async fn complete_authorization(
        &self,
        session: Option<&SessionKey>,
        code: &str,
        redirect_uri: &str,
    ) -> Result<(), AuthError> {
        let bundle = self.keycloak.exchange_code_for_token(code, redirect_uri).await?;
        self.store.store(session, bundle).await
    }

    /// Store an access token obtained elsewhere. No refresh token is kept.
    ///
    /// The claims are only decoded to check the shape and recover `exp`.
    pub async fn store_manual_token(
        &self,
        session: Option<&SessionKey>,
        token: &str,
    ) -> Result<(), AuthError> {
        let token = token.trim();
        let claims = decode_claims(token)?;
        let now = now_i64();
        let expires_in = expiry_claim(&claims)
            .map(|exp| exp - now)
            .filter(|remaining| *remaining > 0);

        let response = TokenResponse {
            access_token: token.to_owned(),
            expires_in,
            refresh_token: None,
            refresh_expires_in: None,
            token_type: Some(DEFAULT_TOKEN_TYPE.to_owned()),
        };
        self.store.store(session, TokenBundle::from_response(response, now)).await?;
        info!("manual token stored");
        Ok(())
    }

    /// Valid access token for `session`, refreshing it when needed.
    ///
    /// Any refresh failure clears the stored tokens and yields `None`.
    pub async fn get_valid_access_token(&self, session: Option<&SessionKey>) -> Option<String> {
        let bundle = self.store.snapshot(session).await;
        let access_token = bundle.access_token.clone().filter(|t| !t.is_empty())?;

        if !bundle.is_access_expired_at(now_i64(), self.buffer_seconds) {
            return Some(access_token);
        }

        info!("access token expired, attempting refresh");
        match self.keycloak.refresh_access_token(&bundle).await {
            Ok(refreshed) => {
                let access_token = refreshed.access_token.clone();
                if let Err(e) = self.store.store(session, refreshed).await {
                    warn!("refreshed tokens could not be persisted: {}", e);
                }
                access_token
            }
            Err(e) => {
                warn!("token refresh failed, clearing tokens: {}", e);
                self.discard(session).await;
                None
            }
        }
    }

    /// Cheap check against the stored expiries. Never refreshes.
    pub async fn is_authenticated(&self, session: Option<&SessionKey>) -> bool {
        self.store.has_valid_session(session, self.buffer_seconds).await
    }

    /// Revoke the refresh token (best effort) and clear the stored tokens.
    ///
    /// Returns whether the provider confirmed the revocation. Tokens are
    /// cleared whatever the answer; only a failure to clear is an error.
    pub async fn logout(&self, session: Option<&SessionKey>) -> Result<bool, AuthError> {
        let revoked = match self.store.get_refresh_token(session).await {
            Some(refresh_token) => match self.keycloak.revoke(&refresh_token).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("token revocation failed: {}", e);
                    false
                }
            },
            None => true,
        };

        self.store.clear(session).await?;
        info!("logged out");
        Ok(revoked)
    }

    /// Userinfo for the current token; `None` when unauthenticated or unavailable.
    pub async fn user_info(&self, session: Option<&SessionKey>) -> Option<UserInfo> {
        let access_token = self.get_valid_access_token(session).await?;
        self.keycloak
            .get_user_info(&access_token)
            .await
            .inspect_err(|e| warn!("user info unavailable: {}", e))
            .ok()
    }

    pub async fn session_info(&self, session: Option<&SessionKey>) -> SessionInfo {
        let tokens = self.store.token_info(session, self.buffer_seconds).await;
        let session_status = tokens.status.to_string();
        let user = if self.is_authenticated(session).await {
            self.user_info(session).await.map(UserSummary::from)
        } else {
            None
        };

        SessionInfo {
            tokens,
            session_status,
            user,
        }
    }

    async fn discard(&self, session: Option<&SessionKey>) {
        if let Err(e) = self.store.clear(session).await {
            warn!("failed to clear tokens: {}", e);
        }
    }
}
