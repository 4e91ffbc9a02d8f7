//! Token store backends
//!
//! One contract, two implementations selected once from the deployment mode:
//! - `LocalFileTokenStore`: single process, one obfuscated JSON file per user
//! - `SessionStateTokenStore`: multi-session HTTP service, bundles kept in the
//!   remote session-state service under the caller's session key
//!
//! Every call carries the caller's session key explicitly. The local-file
//! backend ignores it. The session-state backend fails writes without one and
//! degrades reads to "no tokens".

use std::future::Future;

use tracing::{debug, warn};

use crate::cache::session_cache::SessionKey;
use crate::cache::token_bundle::{TokenBundle, TokenInfo, TokenStatus};
use crate::config::types::{DeploymentMode, ServiceConfig};
use crate::config::proc_initiator::default_token_dir;
use crate::error::AuthError;
use crate::helpers::time::now_i64;
use crate::session_state::client::SessionStateClient;

pub mod local_file;
pub mod obfuscation;
pub mod session_store;

pub use local_file::LocalFileTokenStore;
pub use session_store::SessionStateTokenStore;

pub trait TokenStore: Send + Sync {
    /// Current bundle for `session`.
    fn load(
        &self,
        session: Option<&SessionKey>,
    ) -> impl Future<Output = Result<TokenBundle, AuthError>> + Send;

    /// Replace the stored bundle wholesale, stamping `last_updated`.
    fn store(
        &self,
        session: Option<&SessionKey>,
        bundle: TokenBundle,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    fn clear(&self, session: Option<&SessionKey>) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Like `load`, but any failure reads as the empty bundle.
    fn snapshot(&self, session: Option<&SessionKey>) -> impl Future<Output = TokenBundle> + Send {
        async move {
            match self.load(session).await {
                Ok(bundle) => bundle,
                Err(AuthError::SessionContext) => {
                    debug!("token read without session key, treating as unauthenticated");
                    TokenBundle::default()
                }
                Err(e) => {
                    warn!("token read failed, treating as unauthenticated: {}", e);
                    TokenBundle::default()
                }
            }
        }
    }

    fn get_access_token(&self, session: Option<&SessionKey>) -> impl Future<Output = Option<String>> + Send {
        async move {
            self.snapshot(session)
                .await
                .access_token
                .filter(|t| !t.is_empty())
        }
    }

    fn get_refresh_token(&self, session: Option<&SessionKey>) -> impl Future<Output = Option<String>> + Send {
        async move {
            self.snapshot(session)
                .await
                .refresh_token
                .filter(|t| !t.is_empty())
        }
    }

    /// Missing expiry counts as expired.
    fn is_access_expired(
        &self,
        session: Option<&SessionKey>,
        buffer_seconds: i64,
    ) -> impl Future<Output = bool> + Send {
        async move {
            self.snapshot(session)
                .await
                .is_access_expired_at(now_i64(), buffer_seconds)
        }
    }

    /// Missing expiry counts as expired.
    fn is_refresh_expired(
        &self,
        session: Option<&SessionKey>,
        buffer_seconds: i64,
    ) -> impl Future<Output = bool> + Send {
        async move {
            self.snapshot(session)
                .await
                .is_refresh_expired_at(now_i64(), buffer_seconds)
        }
    }

    fn has_valid_session(
        &self,
        session: Option<&SessionKey>,
        buffer_seconds: i64,
    ) -> impl Future<Output = bool> + Send {
        async move {
            self.snapshot(session)
                .await
                .has_valid_session_at(now_i64(), buffer_seconds)
        }
    }

    fn status(
        &self,
        session: Option<&SessionKey>,
        buffer_seconds: i64,
    ) -> impl Future<Output = TokenStatus> + Send {
        async move { self.snapshot(session).await.status_at(now_i64(), buffer_seconds) }
    }

    fn token_info(
        &self,
        session: Option<&SessionKey>,
        buffer_seconds: i64,
    ) -> impl Future<Output = TokenInfo> + Send {
        async move { self.snapshot(session).await.info_at(now_i64(), buffer_seconds) }
    }
}

/// Backend chosen at startup from [`DeploymentMode`].
#[derive(Debug)]
pub enum TokenBackend {
    LocalFile(LocalFileTokenStore),
    SessionState(SessionStateTokenStore),
}

impl TokenBackend {
    pub fn name(&self) -> &'static str {
        match self {
            TokenBackend::LocalFile(_) => "local-file",
            TokenBackend::SessionState(_) => "session-state",
        }
    }
}

impl TokenStore for TokenBackend {
    async fn load(&self, session: Option<&SessionKey>) -> Result<TokenBundle, AuthError> {
        match self {
            TokenBackend::LocalFile(s) => s.load(session).await,
            TokenBackend::SessionState(s) => s.load(session).await,
        }
    }

    async fn store(&self, session: Option<&SessionKey>, bundle: TokenBundle) -> Result<(), AuthError> {
        match self {
            TokenBackend::LocalFile(s) => s.store(session, bundle).await,
            TokenBackend::SessionState(s) => s.store(session, bundle).await,
        }
    }

    async fn clear(&self, session: Option<&SessionKey>) -> Result<(), AuthError> {
        match self {
            TokenBackend::LocalFile(s) => s.clear(session).await,
            TokenBackend::SessionState(s) => s.clear(session).await,
        }
    }
}

pub async fn build_token_backend(config: &ServiceConfig) -> Result<TokenBackend, AuthError> {
    match config.mode {
        DeploymentMode::Stdio => {
            let dir = config.storage.dir.clone().unwrap_or_else(default_token_dir);
            Ok(TokenBackend::LocalFile(LocalFileTokenStore::open(dir).await?))
        }
        DeploymentMode::Http => {
            let client = SessionStateClient::from_config(&config.session_state)?;
            Ok(TokenBackend::SessionState(SessionStateTokenStore::new(client)))
        }
    }
}
