use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::token_bundle::TokenBundle;

/// Opaque identifier scoping a token bundle to one caller session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Returns `None` for blank identifiers.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session-keyed bundle cache: session_key -> last known bundle
#[derive(Debug, Clone, Default)]
pub struct SessionCache {
    inner: Arc<RwLock<HashMap<SessionKey, TokenBundle>>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &SessionKey) -> Option<TokenBundle> {
        self.inner.read().await.get(key).cloned()
    }

    pub async fn set(&self, key: &SessionKey, bundle: TokenBundle) {
        self.inner.write().await.insert(key.clone(), bundle);
    }

    pub async fn remove(&self, key: &SessionKey) {
        self.inner.write().await.remove(key);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
