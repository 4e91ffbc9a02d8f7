use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::session_cache::{SessionCache, SessionKey};
use crate::cache::token_bundle::TokenBundle;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::session_state::client::{Payload, SessionStateClient};
use crate::store::TokenStore;
use crate::utils::constants::SESSION_STATE_TOKENS_KEY;

/// Token store for the multi-session HTTP deployment.
///
/// Bundles live under the `tokens` key of each session's payload in the
/// session-state service; other keys of the payload belong to someone else
/// and are written back untouched. A per-session in-memory cache avoids a
/// GET on every read and is updated after every write. Sessions without
/// tokens (unknown, logged out) are not cached.
///
/// Writes are GET-then-POST. Two concurrent refreshes for the same session
/// race and the last write wins.
#[derive(Debug)]
pub struct SessionStateTokenStore {
    client: SessionStateClient,
    cache: SessionCache,
}

impl SessionStateTokenStore {
    pub fn new(client: SessionStateClient) -> Self {
        Self {
            client,
            cache: SessionCache::new(),
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Only sessions holding tokens are kept; empty ones are re-read from the service.
    async fn remember(&self, key: &SessionKey, bundle: &TokenBundle) {
        if bundle.is_empty() {
            self.cache.remove(key).await;
        } else {
            self.cache.set(key, bundle.clone()).await;
        }
    }
}

impl TokenStore for SessionStateTokenStore {
    async fn load(&self, session: Option<&SessionKey>) -> Result<TokenBundle, AuthError> {
        let key = session.ok_or(AuthError::SessionContext)?;

        if let Some(bundle) = self.cache.get(key).await {
            debug!("session '{}' tokens served from cache", key);
            return Ok(bundle);
        }

        let state = self.client.get(key.as_str()).await?;
        let bundle = bundle_from_payload(key, &state.payload);
        self.remember(key, &bundle).await;
        Ok(bundle)
    }

    async fn store(&self, session: Option<&SessionKey>, bundle: TokenBundle) -> Result<(), AuthError> {
        let key = session.ok_or(AuthError::SessionContext)?;
        let bundle = bundle.touch(now_i64());
        let value = serde_json::to_value(&bundle)?;

        let merged = self
            .client
            .merge(key.as_str(), |mut payload| {
                payload.insert(SESSION_STATE_TOKENS_KEY.to_owned(), value);
                payload
            })
            .await;

        match merged {
            Ok(_) => {
                self.remember(key, &bundle).await;
                info!("stored tokens for session '{}'", key);
                Ok(())
            }
            Err(e) => {
                // remote state is unknown now, next read must go to the service
                self.cache.remove(key).await;
                Err(e)
            }
        }
    }

    async fn clear(&self, session: Option<&SessionKey>) -> Result<(), AuthError> {
        let key = session.ok_or(AuthError::SessionContext)?;

        let merged = self
            .client
            .merge(key.as_str(), |mut payload| {
                payload.remove(SESSION_STATE_TOKENS_KEY);
                payload
            })
            .await;

        self.cache.remove(key).await;
        merged?;
        info!("cleared tokens for session '{}'", key);
        Ok(())
    }
}

fn bundle_from_payload(key: &SessionKey, payload: &Payload) -> TokenBundle {
    match payload.get(SESSION_STATE_TOKENS_KEY) {
        None | Some(Value::Null) => TokenBundle::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!("session '{}' holds malformed tokens, ignoring: {}", key, e);
            TokenBundle::default()
        }),
    }
}
