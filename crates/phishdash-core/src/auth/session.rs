use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use tracing::{debug, warn};

use super::header::bearer_header;
use crate::storage::KeyValueStore;
use crate::utils::mask_token;

/// Storage key for the bearer token
pub const TOKEN_KEY: &str = "access_token";

/// Storage key for the display username
pub const USERNAME_KEY: &str = "username";

/// Storage key for the admin flag
pub const ADMIN_KEY: &str = "is_admin";

/// Stored value meaning "admin"; any other value (or none) is not admin.
const ADMIN_FLAG: &str = "1";

/// Whether the client currently holds a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Point-in-time view of the session fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub token: Option<String>,
    pub username: Option<String>,
    pub is_admin: bool,
}

/// Client session: token store plus the default headers derived from it.
///
/// Shared as `Arc<Session>` between the API client, the interceptors, the
/// bootstrapper and the router. Only login, logout and the 401 path of the
/// response interceptor write to it.
pub struct Session {
    store: Arc<dyn KeyValueStore>,
    default_headers: RwLock<HeaderMap>,
    clear_lock: Mutex<()>,
}

impl Session {
    /// Create a session over `store`. The default `Authorization` header is
    /// not attached until `attach_auth_header` or `set_token` runs.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            default_headers: RwLock::new(HeaderMap::new()),
            clear_lock: Mutex::new(()),
        }
    }

    /// Get the bearer token if one is stored
    pub fn token(&self) -> Option<String> {
        self.store.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    /// Store a token (and update the default header), or remove both on `None`.
    pub fn set_token(&self, token: Option<&str>) -> Result<()> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => {
                let value = bearer_header(token).context("Token is not a valid header value")?;
                self.store
                    .set(TOKEN_KEY, token)
                    .context("Failed to persist token")?;
                self.write_headers().insert(AUTHORIZATION, value);
                debug!(token = %mask_token(token), "Token stored");
            }
            None => {
                self.store
                    .remove(TOKEN_KEY)
                    .context("Failed to remove token")?;
                self.write_headers().remove(AUTHORIZATION);
                debug!("Token removed");
            }
        }
        Ok(())
    }

    pub fn username(&self) -> Option<String> {
        self.store.get(USERNAME_KEY).filter(|u| !u.is_empty())
    }

    pub fn set_username(&self, username: Option<&str>) -> Result<()> {
        match username.filter(|u| !u.is_empty()) {
            Some(username) => self.store.set(USERNAME_KEY, username),
            None => self.store.remove(USERNAME_KEY),
        }
        .context("Failed to persist username")
    }

    /// Admin flag. Only meaningful with a token, so false without one.
    pub fn is_admin(&self) -> bool {
        self.token().is_some() && self.store.get(ADMIN_KEY).as_deref() == Some(ADMIN_FLAG)
    }

    pub fn set_admin(&self, is_admin: bool) -> Result<()> {
        if is_admin {
            self.store.set(ADMIN_KEY, ADMIN_FLAG)
        } else {
            self.store.remove(ADMIN_KEY)
        }
        .context("Failed to persist admin flag")
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token(),
            username: self.username(),
            is_admin: self.is_admin(),
        }
    }

    /// Clear token, username and admin flag together.
    ///
    /// Returns true only for the call that ended an authenticated session;
    /// concurrent or repeated clears return false. If the store cannot be
    /// written the session is left as it was, the failure is logged and
    /// false is returned.
    pub fn clear(&self) -> bool {
        let _guard = self.clear_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.clear_locked()
    }

    /// Clear only if the stored token is still `token`. A stale rejection of
    /// a token that has since been replaced must not end the new session.
    pub fn clear_if_token(&self, token: &str) -> bool {
        let _guard = self.clear_lock.lock().unwrap_or_else(|e| e.into_inner());
        if self.token().as_deref() != Some(token) {
            return false;
        }
        self.clear_locked()
    }

    /// Set or clear the default `Authorization` header from the stored token.
    /// Idempotent: repeated calls leave the same header state.
    pub fn attach_auth_header(&self) {
        let value = self.token().and_then(|token| match bearer_header(&token) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Stored token is not a valid header value");
                None
            }
        });

        let mut headers = self.write_headers();
        match value {
            Some(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            None => {
                headers.remove(AUTHORIZATION);
            }
        }
    }

    /// Headers applied to every outgoing request unless the caller set them.
    pub fn default_headers(&self) -> HeaderMap {
        self.default_headers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The cached default `Authorization` header, if attached.
    pub fn auth_header(&self) -> Option<HeaderValue> {
        self.default_headers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(AUTHORIZATION)
            .cloned()
    }

    /// Caller holds `clear_lock`.
    fn clear_locked(&self) -> bool {
        let was_authenticated = self.is_authenticated();

        if let Err(e) = self
            .store
            .remove_all(&[TOKEN_KEY, USERNAME_KEY, ADMIN_KEY])
        {
            warn!(error = %e, "Failed to clear persisted session");
            return false;
        }
        self.write_headers().remove(AUTHORIZATION);

        if was_authenticated {
            debug!("Session cleared");
        }
        was_authenticated
    }

    fn write_headers(&self) -> std::sync::RwLockWriteGuard<'_, HeaderMap> {
        self.default_headers
            .write()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("username", &self.username())
            .finish()
    }
}
