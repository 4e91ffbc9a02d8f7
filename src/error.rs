use std::fmt;

use thiserror::Error;

use crate::utils::constants::ERROR_BODY_SNIPPET_CHARS;

/// Authentication failures surfaced by the identity provider client,
/// the token stores and the orchestrator.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("identity provider rejected the request with HTTP {status}: {body}")]
    AuthRejected { status: u16, body: String },
    #[error("token decode error: {0}")]
    Decode(String),
    #[error("no session key available for this request")]
    SessionContext,
    #[error("refresh token expired")]
    RefreshTokenExpired,
    #[error("no refresh token stored")]
    NoRefreshToken,
    #[error("token storage error: {0}")]
    Storage(String),
}

/// Coarse classification of [`AuthError`] for callers that render
/// remediation hints instead of parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    AuthRejected,
    Decode,
    SessionContext,
    ReauthenticationRequired,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::AuthRejected => "auth_rejected",
            ErrorKind::Decode => "decode",
            ErrorKind::SessionContext => "session_context",
            ErrorKind::ReauthenticationRequired => "reauthentication_required",
            ErrorKind::Storage => "storage",
        };
        f.write_str(name)
    }
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Configuration(_) => ErrorKind::Configuration,
            AuthError::Transport(_) => ErrorKind::Transport,
            AuthError::AuthRejected { .. } => ErrorKind::AuthRejected,
            AuthError::Decode(_) => ErrorKind::Decode,
            AuthError::SessionContext => ErrorKind::SessionContext,
            AuthError::RefreshTokenExpired | AuthError::NoRefreshToken => {
                ErrorKind::ReauthenticationRequired
            }
            AuthError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Short instruction for the end user.
    pub fn remediation(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "check the Keycloak and session-state settings",
            ErrorKind::Transport => "the identity provider is unreachable, retry later",
            ErrorKind::AuthRejected => "check your credentials and log in again",
            ErrorKind::Decode => "provide a well-formed JWT access token",
            ErrorKind::SessionContext => "the request carries no session, reconnect the client",
            ErrorKind::ReauthenticationRequired => "the session has expired, log in again",
            ErrorKind::Storage => "check permissions of the token storage directory",
        }
    }

    /// Build an [`AuthError::AuthRejected`] keeping only the head of the response body.
    pub fn rejected(status: u16, body: &str) -> Self {
        AuthError::AuthRejected {
            status,
            body: snippet(body),
        }
    }
}

pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_SNIPPET_CHARS).collect()
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Storage(error.to_string())
    }
}
