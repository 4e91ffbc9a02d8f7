#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;
    use url::Url;

    use crate::error::{AuthError, ErrorKind};
    use crate::helpers::time::now_i64;
    use crate::keycloak::client::KeycloakClient;
    use crate::tests::common::{
        bundle_expiring_in, keycloak_client, keycloak_config, token_body, CLIENT_ID, REVOKE_PATH,
        TOKEN_PATH, USERINFO_PATH,
    };

    #[tokio::test]
    async fn password_grant_returns_bundle_with_absolute_expiry() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "password")
                    .form_urlencoded_tuple("client_id", CLIENT_ID)
                    .form_urlencoded_tuple("username", "alice")
                    .form_urlencoded_tuple("password", "s3cret")
                    .form_urlencoded_tuple("scope", "openid profile email");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(token_body("A", Some("R")));
            })
            .await;

        let before = now_i64();
        let bundle = keycloak_client(&server)
            .authenticate_with_password("alice", "s3cret")
            .await
            .expect("password grant should succeed");
        let after = now_i64();

        token_mock.assert_async().await;
        assert_eq!(bundle.access_token.as_deref(), Some("A"));
        assert_eq!(bundle.refresh_token.as_deref(), Some("R"));
        let access_expires_at = bundle.access_expires_at.expect("access expiry");
        assert!(access_expires_at >= before + 3600 && access_expires_at <= after + 3600);
        let refresh_expires_at = bundle.refresh_expires_at.expect("refresh expiry");
        assert!(refresh_expires_at >= before + 86400 && refresh_expires_at <= after + 86400);
        assert_eq!(bundle.token_type, "Bearer");
    }

    #[tokio::test]
    async fn rejected_password_grant_carries_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "error": "invalid_grant",
                        "error_description": "Invalid user credentials"
                    }));
            })
            .await;

        let err = keycloak_client(&server)
            .authenticate_with_password("alice", "wrong")
            .await
            .unwrap_err();

        match &err {
            AuthError::AuthRejected { status, body } => {
                assert_eq!(*status, 401);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::AuthRejected);
    }

    #[tokio::test]
    async fn client_credentials_without_secret_is_a_configuration_error() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(token_body("A", None));
            })
            .await;

        let err = keycloak_client(&server)
            .authenticate_with_client_credentials()
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Configuration(_)));
        token_mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn client_credentials_send_the_configured_secret() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "client_credentials")
                    .form_urlencoded_tuple("client_secret", "top-secret");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(token_body("service-token", None));
            })
            .await;

        let client =
            KeycloakClient::new(keycloak_config(&server.base_url(), Some("top-secret"))).unwrap();
        let bundle = client.authenticate_with_client_credentials().await.unwrap();

        token_mock.assert_async().await;
        assert_eq!(bundle.access_token.as_deref(), Some("service-token"));
        assert!(bundle.refresh_token.is_none());
        assert!(bundle.refresh_expires_at.is_none());
    }

    #[tokio::test]
    async fn authorization_url_has_exactly_the_expected_parameters() {
        let client = KeycloakClient::new(keycloak_config("https://kc.example.com", None)).unwrap();

        let url = client.authorization_url("http://localhost:8080/callback", None);

        assert_eq!(
            url.as_str().split('?').next().unwrap(),
            "https://kc.example.com/realms/onto/protocol/openid-connect/auth"
        );
        let query = url.query().unwrap();
        assert!(query.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fcallback"));
        assert!(query.contains("scope=openid+profile+email"));

        let parsed = Url::parse(url.as_str()).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("client_id".to_string(), "frontend-prod".to_string()),
                ("redirect_uri".to_string(), "http://localhost:8080/callback".to_string()),
                ("response_type".to_string(), "code".to_string()),
                ("scope".to_string(), "openid profile email".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn authorization_url_appends_state_when_given() {
        let client = KeycloakClient::new(keycloak_config("https://kc.example.com", None)).unwrap();

        let with_state = client.authorization_url("http://localhost/cb", Some("xyz"));
        assert!(with_state.query_pairs().any(|(k, v)| k == "state" && v == "xyz"));

        let blank_state = client.authorization_url("http://localhost/cb", Some(""));
        assert!(!blank_state.query_pairs().any(|(k, _)| k == "state"));
    }

    #[tokio::test]
    async fn authorization_code_is_exchanged_with_its_redirect_uri() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "authorization_code")
                    .form_urlencoded_tuple("code", "abc123")
                    .form_urlencoded_tuple("redirect_uri", "http://localhost:8080/callback");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(token_body("code-access", Some("code-refresh")));
            })
            .await;

        let bundle = keycloak_client(&server)
            .exchange_code_for_token("abc123", "http://localhost:8080/callback")
            .await
            .unwrap();

        token_mock.assert_async().await;
        assert_eq!(bundle.access_token.as_deref(), Some("code-access"));
        assert_eq!(bundle.refresh_token.as_deref(), Some("code-refresh"));
    }

    #[tokio::test]
    async fn expired_refresh_token_is_rejected_without_a_request() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST).path(TOKEN_PATH);
                then.status(200).json_body(token_body("never", None));
            })
            .await;

        let current = bundle_expiring_in("old", -60, Some(("R", -10)));
        let err = keycloak_client(&server)
            .refresh_access_token(&current)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::RefreshTokenExpired));
        assert_eq!(err.kind(), ErrorKind::ReauthenticationRequired);
        token_mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn refresh_within_buffer_is_rejected_locally() {
        let server = MockServer::start_async().await;
        let current = bundle_expiring_in("old", -60, Some(("R", 20)));

        let err = keycloak_client(&server)
            .refresh_access_token(&current)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::RefreshTokenExpired));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails() {
        let server = MockServer::start_async().await;
        let current = bundle_expiring_in("old", -60, None);

        let err = keycloak_client(&server)
            .refresh_access_token(&current)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::NoRefreshToken));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token_when_not_rotated() {
        let server = MockServer::start_async().await;
        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(TOKEN_PATH)
                    .form_urlencoded_tuple("grant_type", "refresh_token")
                    .form_urlencoded_tuple("refresh_token", "R");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"access_token": "A2", "expires_in": 300}));
            })
            .await;

        let current = bundle_expiring_in("A1", -5, Some(("R", 3600)));
        let refreshed = keycloak_client(&server)
            .refresh_access_token(&current)
            .await
            .unwrap();

        token_mock.assert_async().await;
        assert_eq!(refreshed.access_token.as_deref(), Some("A2"));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("R"));
        assert_eq!(refreshed.refresh_expires_at, current.refresh_expires_at);
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        // nothing listens on port 9 on the loopback interface
        let client = KeycloakClient::new(keycloak_config("http://127.0.0.1:9", None)).unwrap();

        let err = client.authenticate_with_password("alice", "pw").await.unwrap_err();

        assert!(matches!(err, AuthError::Transport(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn user_info_uses_bearer_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path(USERINFO_PATH)
                    .header("authorization", "Bearer A");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "sub": "u-1",
                        "email": "alice@example.com",
                        "name": "Alice",
                        "preferred_username": "alice",
                        "locale": "en"
                    }));
            })
            .await;

        let info = keycloak_client(&server).get_user_info("A").await.unwrap();

        assert_eq!(info.email.as_deref(), Some("alice@example.com"));
        assert_eq!(info.preferred_username.as_deref(), Some("alice"));
        assert_eq!(info.extra.get("locale"), Some(&json!("en")));
    }

    #[tokio::test]
    async fn user_info_rejection_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(USERINFO_PATH);
                then.status(401).body("token expired");
            })
            .await;

        let err = keycloak_client(&server).get_user_info("stale").await.unwrap_err();

        assert!(matches!(err, AuthError::AuthRejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn revoke_reports_provider_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(REVOKE_PATH)
                    .form_urlencoded_tuple("refresh_token", "R");
                then.status(500).body("internal error");
            })
            .await;

        let err = keycloak_client(&server).revoke("R").await.unwrap_err();

        assert!(matches!(err, AuthError::AuthRejected { status: 500, .. }));
    }

    #[tokio::test]
    async fn revoke_succeeds_on_ok() {
        let server = MockServer::start_async().await;
        let revoke_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(REVOKE_PATH)
                    .form_urlencoded_tuple("client_id", CLIENT_ID)
                    .form_urlencoded_tuple("refresh_token", "R");
                then.status(200);
            })
            .await;

        keycloak_client(&server).revoke("R").await.unwrap();

        revoke_mock.assert_async().await;
    }
}
