use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::config::types::SessionStateConfig;
use crate::error::{snippet, AuthError};
use crate::utils::constants::{SESSION_STATE_API_KEY_HEADER, SESSION_STATE_HTTP_TIMEOUT_SECS};

pub type Payload = Map<String, Value>;

/// One context's state as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub context_id: String,
    pub created_at: Option<Value>,
    pub payload: Payload,
    /// `false` when the service answered 404
    pub exists: bool,
}

/// HTTP client of the session-state service (`/session-state/{contextId}`).
///
/// The payload is shared with other features of the server; callers must
/// only touch their own keys.
#[derive(Debug, Clone)]
pub struct SessionStateClient {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl SessionStateClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SESSION_STATE_HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AuthError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(base_url, api_key, client)
    }

    pub fn with_client(base_url: &str, api_key: &str, client: Client) -> Result<Self, AuthError> {
        if api_key.trim().is_empty() {
            return Err(AuthError::Configuration(
                "session-state API key is not configured".into(),
            ));
        }
        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            AuthError::Configuration(format!("invalid session-state base URL '{base_url}': {e}"))
        })?;
        Ok(Self {
            base_url,
            api_key: api_key.to_owned(),
            client,
        })
    }

    pub fn from_config(config: &SessionStateConfig) -> Result<Self, AuthError> {
        let base_url = config.base_url.as_deref().ok_or_else(|| {
            AuthError::Configuration("session-state base URL is not configured".into())
        })?;
        let api_key = config.api_key.as_deref().unwrap_or_default();
        Self::new(base_url, api_key)
    }

    fn state_url(&self, context_id: &str) -> Result<Url, AuthError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AuthError::Configuration("session-state base URL cannot be a base".into()))?
            .pop_if_empty()
            .push("session-state")
            .push(context_id);
        Ok(url)
    }

    /// Current payload for `context_id`; an unknown context yields an empty payload.
    pub async fn get(&self, context_id: &str) -> Result<SessionState, AuthError> {
        let response = self
            .client
            .get(self.state_url(context_id)?)
            .header(SESSION_STATE_API_KEY_HEADER, &self.api_key)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                AuthError::Transport(format!("failed to GET session-state for {context_id}: {e}"))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("no session-state yet for {}", context_id);
            return Ok(SessionState {
                context_id: context_id.to_owned(),
                created_at: None,
                payload: Payload::new(),
                exists: false,
            });
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() || status.is_server_error() {
            return Err(AuthError::Transport(format!(
                "session-state GET {} failed with HTTP {}: {}",
                context_id,
                status.as_u16(),
                snippet(&body)
            )));
        }

        Ok(parse_state(context_id, &body))
    }

    /// Replace the payload for `context_id`.
    pub async fn set(&self, context_id: &str, payload: Payload) -> Result<SessionState, AuthError> {
        let response = self
            .client
            .post(self.state_url(context_id)?)
            .header(SESSION_STATE_API_KEY_HEADER, &self.api_key)
            .header(http::header::ACCEPT, "application/json")
            .json(&json!({ "payload": payload }))
            .send()
            .await
            .map_err(|e| {
                AuthError::Transport(format!("failed to POST session-state for {context_id}: {e}"))
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() || status.is_server_error() {
            return Err(AuthError::Transport(format!(
                "session-state POST {} failed with HTTP {}: {}",
                context_id,
                status.as_u16(),
                snippet(&body)
            )));
        }

        Ok(parse_state(context_id, &body))
    }

    /// Read-modify-write of the payload.
    ///
    /// Not atomic: two concurrent merges for one context race and the last POST wins.
    pub async fn merge<F>(&self, context_id: &str, updater: F) -> Result<SessionState, AuthError>
    where
        F: FnOnce(Payload) -> Payload,
    {
        let current = self.get(context_id).await?;
        let updated = updater(current.payload);
        self.set(context_id, updated).await
    }
}

fn parse_state(context_id: &str, body: &str) -> SessionState {
    let data = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(data)) => data,
        Ok(_) => Map::new(),
        Err(e) => {
            warn!("session-state response for {} is not JSON: {}", context_id, e);
            Map::new()
        }
    };

    let payload = match data.get("payload") {
        Some(Value::Object(payload)) => payload.clone(),
        _ => Payload::new(),
    };

    SessionState {
        context_id: data
            .get("contextId")
            .and_then(Value::as_str)
            .unwrap_or(context_id)
            .to_owned(),
        created_at: data.get("createdAt").cloned().filter(|v| !v.is_null()),
        payload,
        exists: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_payload_is_treated_as_empty() {
        let state = parse_state("ctx", r#"{"contextId":"ctx","createdAt":"2025-01-01","payload":[1,2]}"#);
        assert!(state.payload.is_empty());
        assert_eq!(state.created_at, Some(Value::String("2025-01-01".into())));
        assert!(state.exists);

        let state = parse_state("ctx", "not json");
        assert_eq!(state.context_id, "ctx");
        assert!(state.payload.is_empty());
    }

    #[test]
    fn context_id_is_a_single_path_segment() {
        let client = SessionStateClient::new("http://localhost:9000/api/", "key").unwrap();
        let url = client.state_url("a/b c").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/api/session-state/a%2Fb%20c");
    }

    #[test]
    fn missing_api_key_is_a_configuration_error() {
        let err = SessionStateClient::new("http://localhost:9000", " ").unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }
}
