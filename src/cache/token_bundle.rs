use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::helpers::time::is_past;
use crate::utils::constants::DEFAULT_TOKEN_TYPE;

/// Token endpoint response as returned by Keycloak.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Access + refresh token pair with absolute expiry timestamps (UNIX seconds).
///
/// A bundle without an access token is the unauthenticated state. Bundles are
/// replaced wholesale after every grant; the only carry-over is the previous
/// refresh token when a refresh response does not rotate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default, rename = "access_token_expires_at", deserialize_with = "de_unix_seconds")]
    pub access_expires_at: Option<i64>,
    #[serde(default, rename = "refresh_token_expires_at", deserialize_with = "de_unix_seconds")]
    pub refresh_expires_at: Option<i64>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default, deserialize_with = "de_unix_seconds")]
    pub last_updated: Option<i64>,
}

/// Older token files hold fractional seconds; they are truncated.
fn de_unix_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum UnixSeconds {
        Whole(i64),
        Fractional(f64),
    }

    Ok(match Option::<UnixSeconds>::deserialize(deserializer)? {
        Some(UnixSeconds::Whole(secs)) => Some(secs),
        Some(UnixSeconds::Fractional(secs)) if secs.is_finite() => Some(secs.trunc() as i64),
        _ => None,
    })
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_owned()
}

impl Default for TokenBundle {
    fn default() -> Self {
        Self {
            access_token: None,
            refresh_token: None,
            access_expires_at: None,
            refresh_expires_at: None,
            token_type: default_token_type(),
            last_updated: None,
        }
    }
}

impl TokenBundle {
    /// Build a bundle from a grant response received at `now`.
    ///
    /// Relative lifetimes become absolute timestamps here. A response without
    /// `expires_in` yields an access token that is already expired.
    pub fn from_response(response: TokenResponse, now: i64) -> Self {
        let refresh_expires_at = response
            .refresh_token
            .as_ref()
            .map(|_| now + response.refresh_expires_in.unwrap_or(0));

        Self {
            access_token: Some(response.access_token),
            access_expires_at: Some(now + response.expires_in.unwrap_or(0)),
            refresh_token: response.refresh_token,
            refresh_expires_at,
            token_type: response
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(default_token_type),
            last_updated: Some(now),
        }
    }

    /// Bundle produced by a refresh grant; keeps `previous` refresh token when none was issued.
    pub fn from_refresh_response(response: TokenResponse, previous: &TokenBundle, now: i64) -> Self {
        let mut bundle = Self::from_response(response, now);
        if bundle.refresh_token.is_none() {
            bundle.refresh_token = previous.refresh_token.clone();
            bundle.refresh_expires_at = previous.refresh_expires_at;
        }
        bundle
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.as_deref().map_or(true, str::is_empty)
    }

    pub fn touch(mut self, now: i64) -> Self {
        self.last_updated = Some(now);
        self
    }

    pub fn is_access_expired_at(&self, now: i64, buffer_seconds: i64) -> bool {
        is_past(self.access_expires_at, now, buffer_seconds)
    }

    pub fn is_refresh_expired_at(&self, now: i64, buffer_seconds: i64) -> bool {
        is_past(self.refresh_expires_at, now, buffer_seconds)
    }

    fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Holds an access token that is usable now or recoverable through a refresh.
    pub fn has_valid_session_at(&self, now: i64, buffer_seconds: i64) -> bool {
        if self.is_empty() {
            return false;
        }
        let access_usable = !self.is_access_expired_at(now, buffer_seconds);
        let refresh_usable =
            self.has_refresh_token() && !self.is_refresh_expired_at(now, buffer_seconds);
        access_usable || refresh_usable
    }

    pub fn status_at(&self, now: i64, buffer_seconds: i64) -> TokenStatus {
        if self.is_empty() {
            TokenStatus::NoTokens
        } else if !self.is_access_expired_at(now, buffer_seconds) {
            TokenStatus::Valid
        } else if self.has_refresh_token() && !self.is_refresh_expired_at(now, buffer_seconds) {
            TokenStatus::ExpiredRefreshable
        } else {
            TokenStatus::ExpiredTerminal
        }
    }

    pub fn info_at(&self, now: i64, buffer_seconds: i64) -> TokenInfo {
        TokenInfo {
            has_access_token: !self.is_empty(),
            has_refresh_token: self.has_refresh_token(),
            access_token_expired: self.is_empty() || self.is_access_expired_at(now, buffer_seconds),
            refresh_token_expired: !self.has_refresh_token()
                || self.is_refresh_expired_at(now, buffer_seconds),
            access_token_length: self.access_token.as_ref().map(String::len),
            refresh_token_length: self.refresh_token.as_ref().map(String::len),
            last_updated: self.last_updated,
            status: self.status_at(now, buffer_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    NoTokens,
    Valid,
    ExpiredRefreshable,
    ExpiredTerminal,
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenStatus::NoTokens => "No authentication tokens",
            TokenStatus::Valid => "Authenticated (access token valid)",
            TokenStatus::ExpiredRefreshable => {
                "Authenticated (access token expired, refresh available)"
            }
            TokenStatus::ExpiredTerminal => "Authentication expired (re-authentication required)",
        };
        f.write_str(text)
    }
}

/// Diagnostic view of a stored bundle. Never carries the token values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub has_access_token: bool,
    pub has_refresh_token: bool,
    pub access_token_expired: bool,
    pub refresh_token_expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_length: Option<usize>,
    pub last_updated: Option<i64>,
    pub status: TokenStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_750_000_000;

    fn response() -> TokenResponse {
        TokenResponse {
            access_token: "A".into(),
            expires_in: Some(3600),
            refresh_token: Some("R".into()),
            refresh_expires_in: Some(86400),
            token_type: None,
        }
    }

    #[test]
    fn expiry_is_computed_from_acquisition_time() {
        let bundle = TokenBundle::from_response(response(), T);
        assert_eq!(bundle.access_token.as_deref(), Some("A"));
        assert_eq!(bundle.access_expires_at, Some(T + 3600));
        assert_eq!(bundle.refresh_expires_at, Some(T + 86400));
        assert_eq!(bundle.token_type, "Bearer");
        assert_eq!(bundle.last_updated, Some(T));

        assert!(!bundle.is_access_expired_at(T + 10, 30));
        assert!(bundle.is_access_expired_at(T + 3575, 30));
        assert!(!bundle.is_access_expired_at(T + 3569, 30));
        assert!(bundle.is_access_expired_at(T + 3570, 30));
        assert!(!bundle.is_access_expired_at(T + 3599, 0));
        assert!(bundle.is_access_expired_at(T + 3600, 0));
    }

    #[test]
    fn refresh_response_without_rotation_keeps_previous_refresh_token() {
        let previous = TokenBundle::from_response(response(), T);
        let refreshed = TokenBundle::from_refresh_response(
            TokenResponse {
                access_token: "A2".into(),
                expires_in: Some(300),
                refresh_token: None,
                refresh_expires_in: None,
                token_type: Some("Bearer".into()),
            },
            &previous,
            T + 100,
        );
        assert_eq!(refreshed.access_token.as_deref(), Some("A2"));
        assert_eq!(refreshed.access_expires_at, Some(T + 400));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("R"));
        assert_eq!(refreshed.refresh_expires_at, Some(T + 86400));
    }

    #[test]
    fn status_covers_every_state() {
        assert_eq!(TokenBundle::default().status_at(T, 30), TokenStatus::NoTokens);

        let bundle = TokenBundle::from_response(response(), T);
        assert_eq!(bundle.status_at(T, 30), TokenStatus::Valid);
        assert_eq!(bundle.status_at(T + 4000, 30), TokenStatus::ExpiredRefreshable);
        assert_eq!(bundle.status_at(T + 90000, 30), TokenStatus::ExpiredTerminal);

        assert!(bundle.has_valid_session_at(T + 4000, 30));
        assert!(!bundle.has_valid_session_at(T + 90000, 30));
        assert!(!TokenBundle::default().has_valid_session_at(T, 30));
    }

    #[test]
    fn refresh_token_alone_is_not_a_session() {
        let bundle = TokenBundle {
            refresh_token: Some("R".into()),
            refresh_expires_at: Some(T + 86400),
            ..TokenBundle::default()
        };
        assert!(!bundle.has_valid_session_at(T, 30));
        assert_eq!(bundle.status_at(T, 30), TokenStatus::NoTokens);
    }

    #[test]
    fn fractional_timestamps_are_truncated() {
        let bundle: TokenBundle = serde_json::from_str(
            r#"{"access_token":"A","access_token_expires_at":4102444800.5,
                "refresh_token_expires_at":null,"last_updated":1750000000.25}"#,
        )
        .unwrap();
        assert_eq!(bundle.access_token.as_deref(), Some("A"));
        assert_eq!(bundle.access_expires_at, Some(4_102_444_800));
        assert_eq!(bundle.refresh_expires_at, None);
        assert_eq!(bundle.last_updated, Some(1_750_000_000));

        let whole: TokenBundle =
            serde_json::from_str(r#"{"access_token_expires_at":1750000000}"#).unwrap();
        assert_eq!(whole.access_expires_at, Some(1_750_000_000));
    }

    #[test]
    fn info_reports_lengths_without_values() {
        let info = TokenBundle::from_response(response(), T).info_at(T, 30);
        assert!(info.has_access_token);
        assert_eq!(info.access_token_length, Some(1));
        assert_eq!(info.status, TokenStatus::Valid);
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"status\":\"VALID\""));
    }
}
