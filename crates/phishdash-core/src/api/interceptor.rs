//! Request/response hooks run by `ApiClient` around every call.
//!
//! `AuthInterceptor` is the pair the client installs by default:
//!
//! - on the way out it injects `Authorization: Bearer <token>`
//! - on the way back it reacts to 401 (forced logout) and 403 (notice)
//!
//! Both hooks pass the original error through after their side effect.

use std::sync::Arc;

use reqwest::header::AUTHORIZATION;
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use super::transport::{ApiRequest, ApiResponse};
use super::ApiError;
use crate::auth::header::{bearer_header, bearer_token};
use crate::auth::Session;
use crate::events::{EventBus, Notice};

/// Path segment shared by the token and current-user endpoints
pub const AUTH_PATH_SEGMENT: &str = "auth";

pub trait RequestInterceptor: Send + Sync {
    fn on_request(&self, request: &mut ApiRequest);
}

pub trait ResponseInterceptor: Send + Sync {
    /// Observe the outcome of a request. Implementations return the result
    /// they were given unless they have a reason to replace it.
    fn on_response(
        &self,
        request: &ApiRequest,
        result: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError>;
}

/// True when `url` has an `auth` path segment (login, current user).
pub fn targets_auth_endpoint(url: &Url) -> bool {
    url.path_segments()
        .map(|mut segments| segments.any(|s| s == AUTH_PATH_SEGMENT))
        .unwrap_or(false)
}

pub struct AuthInterceptor {
    session: Arc<Session>,
    events: EventBus,
}

impl AuthInterceptor {
    pub fn new(session: Arc<Session>, events: EventBus) -> Self {
        Self { session, events }
    }
}

impl AuthInterceptor {
    /// Clear the session for a rejected non-auth request. Returns true when
    /// the caller should navigate to login.
    ///
    /// A request sent without a token was rejected for lacking one, so the
    /// session is cleared and login is shown regardless of prior state. A
    /// request sent with a token only ends the session still holding it.
    fn clear_for_rejection(&self, request: &ApiRequest) -> bool {
        match bearer_token(&request.headers) {
            Some(token) => self.session.clear_if_token(token),
            None => {
                self.session.clear();
                true
            }
        }
    }
}

impl RequestInterceptor for AuthInterceptor {
    fn on_request(&self, request: &mut ApiRequest) {
        let Some(token) = self.session.token() else {
            return;
        };
        match bearer_header(&token) {
            Ok(value) => {
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Stored token is not a valid header value"),
        }
    }
}

impl ResponseInterceptor for AuthInterceptor {
    fn on_response(
        &self,
        request: &ApiRequest,
        result: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        let error = match result {
            Ok(response) => return Ok(response),
            Err(error) => error,
        };

        match error.status() {
            Some(StatusCode::UNAUTHORIZED) => {
                if targets_auth_endpoint(&request.url) {
                    // Login or profile rejection: the caller handles it, no logout
                    debug!(url = %request.url, "401 from auth endpoint passed through");
                } else if self.clear_for_rejection(request) {
                    warn!(url = %request.url, "Session rejected by server, logging out");
                    self.events.navigate_to_login();
                } else {
                    debug!(url = %request.url, "401 for a replaced token ignored");
                }
            }
            Some(StatusCode::FORBIDDEN) => {
                debug!(url = %request.url, "Access denied");
                self.events.notify(Notice::access_denied());
            }
            _ => {}
        }

        Err(error)
    }
}
