//! Login, logout and the current-user profile refresh.

use reqwest::Method;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ApiClient, ApiError};
use crate::models::{TokenResponse, UserProfile};
use crate::utils::mask_token;

/// Token exchange endpoint (form-encoded credentials)
pub const TOKEN_PATH: &str = "auth/token";

/// Current-user endpoint
pub const ME_PATH: &str = "auth/me";

impl ApiClient {
    /// Exchange credentials for a token and start a session.
    ///
    /// On success the token and `username` are stored and a profile refresh
    /// is spawned without being awaited. On rejection the session is left
    /// as it was and the request error is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let request = self
            .request(Method::POST, TOKEN_PATH)?
            .form(&[("username", username), ("password", password)]);

        let token: TokenResponse = self.send(request).await?.json()?;
        if token.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Token response has an empty access_token".to_string(),
            ));
        }

        self.session
            .set_token(Some(&token.access_token))
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        if let Err(e) = self.session.set_username(Some(username)) {
            warn!(error = %e, "Failed to persist username");
        }
        // Unknown until the profile refresh says otherwise
        if let Err(e) = self.session.set_admin(false) {
            warn!(error = %e, "Failed to reset admin flag");
        }

        info!(username, token = %mask_token(&token.access_token), "Logged in");
        self.spawn_profile_refresh();
        Ok(token)
    }

    /// End the session. Fails only when the stored session could not be
    /// removed, in which case it is still active.
    pub fn logout(&self) -> Result<(), ApiError> {
        if self.session.clear() {
            info!("Logged out");
        } else if self.session.is_authenticated() {
            return Err(ApiError::Storage(
                "Failed to remove the stored session".to_string(),
            ));
        } else {
            debug!("Logout with no active session");
        }
        Ok(())
    }

    /// Fetch `auth/me` and record the username and admin flag.
    ///
    /// Results are only applied if the session still holds the token the
    /// request was sent with. Any failure clears the admin flag and is
    /// returned to the caller.
    pub async fn fetch_current_user(&self) -> Result<UserProfile, ApiError> {
        let token = self.session.token();

        let result = async {
            let request = self.request(Method::GET, ME_PATH)?;
            self.send(request).await?.json::<UserProfile>()
        }
        .await;

        if token.is_none() || self.session.token() != token {
            debug!("Session changed during profile refresh, result discarded");
            return result;
        }

        match &result {
            Ok(profile) => {
                let username = Some(profile.username.as_str()).filter(|u| !u.is_empty());
                if let Some(username) = username {
                    if let Err(e) = self.session.set_username(Some(username)) {
                        warn!(error = %e, "Failed to persist username");
                    }
                }
                if let Err(e) = self.session.set_admin(profile.is_admin) {
                    warn!(error = %e, "Failed to persist admin flag");
                }
                debug!(username = %profile.username, is_admin = profile.is_admin, "Profile refreshed");
            }
            Err(_) => {
                if let Err(e) = self.session.set_admin(false) {
                    warn!(error = %e, "Failed to clear admin flag");
                }
            }
        }

        result
    }

    /// Refresh the profile in a background task. Failures are logged only.
    ///
    /// Returns `None` when called outside a Tokio runtime.
    pub fn spawn_profile_refresh(&self) -> Option<JoinHandle<()>> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, profile refresh skipped");
                return None;
            }
        };

        let client = self.clone();
        Some(handle.spawn(async move {
            if let Err(e) = client.fetch_current_user().await {
                warn!(error = %e, "Profile refresh failed");
            }
        }))
    }

    /// Run once at process start: attach the default header now, then
    /// refresh the profile in the background if a token was persisted.
    pub fn init_auth_on_startup(&self) -> Option<JoinHandle<()>> {
        self.session.attach_auth_header();

        if self.session.token().is_none() {
            debug!("No persisted token at startup");
            return None;
        }
        self.spawn_profile_refresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client_with, json, FakeTransport};
    use crate::api::transport::RequestBody;
    use crate::auth::session::TOKEN_KEY;
    use crate::auth::{Session, SessionState};
    use crate::storage::{FileStore, KeyValueStore, MemoryStore};
    use crate::events::drain;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json as j;

    /// Let spawned tasks run on the current-thread test runtime
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn backend(admin: bool) -> std::sync::Arc<FakeTransport> {
        FakeTransport::new(move |req| match req.url.path() {
            "/auth/token" => json(200, j!({"access_token": "abc123", "token_type": "bearer"})),
            "/auth/me" => json(200, j!({"username": "alice", "is_admin": admin})),
            "/urls/" => json(200, j!([])),
            _ => json(404, j!({"detail": "Not Found"})),
        })
    }

    #[tokio::test]
    async fn test_login_stores_session_and_authorizes_later_requests() {
        let transport = backend(false);
        let (client, session, _) = client_with(transport.clone());

        let token = client.login("alice", "secret").await.unwrap();

        assert_eq!(token.access_token, "abc123");
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(session.username().as_deref(), Some("alice"));
        assert_eq!(session.state(), SessionState::Authenticated);

        client.list_urls().await.unwrap();
        let sent = transport.requests_to("/urls/");
        assert_eq!(sent[0].headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_login_sends_form_credentials() {
        let transport = backend(false);
        let (client, _, _) = client_with(transport.clone());

        client.login("alice", "secret").await.unwrap();

        let sent = transport.requests_to("/auth/token");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            RequestBody::Form(vec![
                ("username".to_string(), "alice".to_string()),
                ("password".to_string(), "secret".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn test_login_refreshes_profile_in_background() {
        let transport = backend(true);
        let (client, session, _) = client_with(transport.clone());

        client.login("alice", "secret").await.unwrap();
        assert!(!session.is_admin());

        settle().await;

        assert_eq!(transport.requests_to("/auth/me").len(), 1);
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_session_unchanged() {
        let transport = FakeTransport::new(|_| json(401, j!({"detail": "Incorrect username or password"})));
        let (client, session, events) = client_with(transport);
        let mut rx = events.subscribe();
        let before = session.snapshot();

        let err = client.login("alice", "wrong").await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(session.snapshot(), before);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_rejected_login_keeps_existing_session() {
        let transport = FakeTransport::new(|_| json(401, j!({"detail": "Incorrect username or password"})));
        let (client, session, events) = client_with(transport);
        let mut rx = events.subscribe();
        session.set_token(Some("existing")).unwrap();
        session.set_username(Some("bob")).unwrap();

        assert!(client.login("alice", "wrong").await.is_err());

        assert_eq!(session.token().as_deref(), Some("existing"));
        assert_eq!(session.username().as_deref(), Some("bob"));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_login_without_access_token_is_invalid_response() {
        let transport = FakeTransport::new(|_| json(200, j!({"token_type": "bearer"})));
        let (client, session, _) = client_with(transport);

        let err = client.login("alice", "secret").await.unwrap_err();

        assert!(matches!(err, ApiError::InvalidResponse(_)));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let transport = backend(true);
        let (client, session, _) = client_with(transport);
        client.login("alice", "secret").await.unwrap();
        settle().await;
        assert!(session.is_admin());

        client.logout().unwrap();

        assert_eq!(session.token(), None);
        assert_eq!(session.username(), None);
        assert!(!session.is_admin());
        assert!(session.auth_header().is_none());

        // Logging out again is a no-op
        client.logout().unwrap();
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    /// Client whose session is backed by a file store that cannot write
    fn client_with_unwritable_store(
        transport: std::sync::Arc<FakeTransport>,
        name: &str,
    ) -> (ApiClient, std::sync::Arc<Session>, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!("phishdash-auth-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::write(&dir, "not a directory").unwrap();

        let store = FileStore::open(&dir).unwrap();
        let session = std::sync::Arc::new(Session::new(std::sync::Arc::new(store)));
        let client = ApiClient::with_transport(
            "http://localhost:8000",
            transport,
            std::sync::Arc::clone(&session),
        )
        .unwrap();
        (client, session, dir)
    }

    #[tokio::test]
    async fn test_login_with_unwritable_storage_stays_anonymous() {
        let transport = backend(false);
        let (client, session, dir) = client_with_unwritable_store(transport.clone(), "login");

        let err = client.login("alice", "secret").await.unwrap_err();

        assert!(matches!(err, ApiError::Storage(_)));
        assert_eq!(session.token(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(session.auth_header().is_none());
        assert!(transport.requests_to("/auth/me").is_empty());

        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn test_logout_with_unwritable_storage_is_an_error() {
        let dir = std::env::temp_dir().join(format!("phishdash-auth-logout-{}", std::process::id()));
        let _ = std::fs::remove_file(&dir);
        let _ = std::fs::remove_dir_all(&dir);
        let store = FileStore::open(&dir).unwrap();
        store.set(TOKEN_KEY, "abc123").unwrap();
        let session = std::sync::Arc::new(Session::new(std::sync::Arc::new(store)));
        let client =
            ApiClient::with_transport("http://localhost:8000", backend(false), std::sync::Arc::clone(&session))
                .unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();

        assert!(matches!(client.logout(), Err(ApiError::Storage(_))));
        assert!(session.is_authenticated());

        let _ = std::fs::remove_file(&dir);
    }

    #[tokio::test]
    async fn test_fetch_current_user_updates_session() {
        let transport = FakeTransport::new(|_| json(200, j!({"username": "alice2", "is_admin": true})));
        let (client, session, _) = client_with(transport);
        session.set_token(Some("abc123")).unwrap();
        session.set_username(Some("alice")).unwrap();

        let profile = client.fetch_current_user().await.unwrap();

        assert_eq!(profile.username, "alice2");
        assert_eq!(session.username().as_deref(), Some("alice2"));
        assert!(session.is_admin());
    }

    #[tokio::test]
    async fn test_fetch_current_user_failure_clears_only_admin_flag() {
        let transport = FakeTransport::new(|_| json(401, j!({"detail": "Could not validate credentials"})));
        let (client, session, events) = client_with(transport);
        let mut rx = events.subscribe();
        session.set_token(Some("abc123")).unwrap();
        session.set_username(Some("alice")).unwrap();
        session.set_admin(true).unwrap();

        let err = client.fetch_current_user().await.unwrap_err();

        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(session.token().as_deref(), Some("abc123"));
        assert_eq!(session.username().as_deref(), Some("alice"));
        assert!(!session.is_admin());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_network_failure_during_refresh_clears_admin_flag() {
        let transport = FakeTransport::new(|_| Err(ApiError::Network("connection refused".to_string())));
        let (client, session, _) = client_with(transport);
        session.set_token(Some("abc123")).unwrap();
        session.set_admin(true).unwrap();

        assert!(matches!(client.fetch_current_user().await, Err(ApiError::Network(_))));
        assert!(session.is_authenticated());
        assert!(!session.is_admin());
    }

    #[tokio::test]
    async fn test_startup_attaches_header_before_returning() {
        let transport = backend(true);
        // Token persisted by a previous run; header not attached yet
        let store = std::sync::Arc::new(MemoryStore::new());
        store.set(TOKEN_KEY, "persisted").unwrap();
        let session = std::sync::Arc::new(Session::new(store));
        let client = ApiClient::with_transport(
            "http://localhost:8000",
            transport.clone(),
            std::sync::Arc::clone(&session),
        )
        .unwrap();
        assert!(session.auth_header().is_none());

        let handle = client.init_auth_on_startup();

        assert_eq!(session.auth_header().unwrap(), "Bearer persisted");
        handle.unwrap().await.unwrap();
        assert_eq!(session.username().as_deref(), Some("alice"));
        assert!(session.is_admin());
        assert_eq!(
            transport.requests_to("/auth/me")[0].headers.get(AUTHORIZATION).unwrap(),
            "Bearer persisted"
        );
    }

    #[tokio::test]
    async fn test_startup_without_token_skips_refresh() {
        let transport = backend(false);
        let (client, session, _) = client_with(transport.clone());

        assert!(client.init_auth_on_startup().is_none());

        settle().await;
        assert!(transport.requests().is_empty());
        assert!(session.auth_header().is_none());
    }

    #[tokio::test]
    async fn test_startup_refresh_failure_is_swallowed() {
        let transport = FakeTransport::new(|_| json(500, j!({"detail": "boom"})));
        let (client, session, _) = client_with(transport);
        session.set_token(Some("persisted")).unwrap();

        let handle = client.init_auth_on_startup().unwrap();

        // The task completes normally; the failure never escapes
        handle.await.unwrap();
        assert!(session.is_authenticated());
        assert!(!session.is_admin());
    }

    #[test]
    fn test_startup_outside_runtime_does_not_panic() {
        let transport = backend(false);
        let (client, session, _) = client_with(transport.clone());
        session.set_token(Some("persisted")).unwrap();

        assert!(client.init_auth_on_startup().is_none());
        assert_eq!(session.auth_header().unwrap(), "Bearer persisted");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_result_discarded_after_logout() {
        let transport = backend(true);
        let (client, session, _) = client_with(transport);
        session.set_token(Some("abc123")).unwrap();

        // Logged out before the refresh gets to run
        let handle = client.spawn_profile_refresh().unwrap();
        client.logout().unwrap();
        handle.await.unwrap();

        assert_eq!(session.username(), None);
        assert!(!session.is_admin());
    }
}
