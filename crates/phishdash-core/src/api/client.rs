//! API client for the phishing-risk dashboard backend.
//!
//! This module provides the `ApiClient` struct. Every call goes through the
//! same pipeline: default headers, request interceptors, transport, status
//! check, response interceptors. Nothing is retried; each request is sent at
//! most once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::interceptor::{AuthInterceptor, RequestInterceptor, ResponseInterceptor};
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::ApiError;
use crate::auth::header::merge_missing;
use crate::auth::Session;
use crate::config::Config;
use crate::events::EventBus;

// ============================================================================
// Constants
// ============================================================================

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API client for the dashboard backend.
/// Clone is cheap - the transport, session and interceptors are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: Url,
    pub(crate) session: Arc<Session>,
    request_interceptors: Vec<Arc<dyn RequestInterceptor>>,
    response_interceptors: Vec<Arc<dyn ResponseInterceptor>>,
}

impl ApiClient {
    /// Create a client talking HTTP to `base_url`
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(timeout)?;
        Self::with_transport(base_url, Arc::new(transport), session)
    }

    pub fn from_config(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
            session,
        )
    }

    /// Create a client over any transport. No interceptors are installed.
    pub fn with_transport(
        base_url: &str,
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            transport,
            base_url: Self::parse_base_url(base_url)?,
            session,
            request_interceptors: Vec::new(),
            response_interceptors: Vec::new(),
        })
    }

    /// Base URLs are treated as directories so relative joins keep any
    /// path prefix (`http://host/api` + `urls/` = `http://host/api/urls/`).
    fn parse_base_url(base_url: &str) -> Result<Url, ApiError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let url = Url::parse(&normalized)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!("Invalid base URL {}", base_url)));
        }
        Ok(url)
    }

    /// Install the auth interceptor pair, publishing to `events`.
    pub fn setup_interceptors(&mut self, events: &EventBus) {
        let auth = Arc::new(AuthInterceptor::new(Arc::clone(&self.session), events.clone()));
        self.request_interceptors.push(auth.clone());
        self.response_interceptors.push(auth);
    }

    pub fn add_request_interceptor(&mut self, interceptor: Arc<dyn RequestInterceptor>) {
        self.request_interceptors.push(interceptor);
    }

    pub fn add_response_interceptor(&mut self, interceptor: Arc<dyn ResponseInterceptor>) {
        self.response_interceptors.push(interceptor);
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid path {}: {}", path, e)))
    }

    pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::new(method, self.url(path)?))
    }

    /// Send a request through the interceptor pipeline.
    ///
    /// Non-2xx responses become `ApiError::from_status`; the response
    /// interceptors see every outcome and the final result is theirs.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        merge_missing(&mut request.headers, &self.session.default_headers());
        for interceptor in &self.request_interceptors {
            interceptor.on_request(&mut request);
        }

        debug!(method = %request.method, url = %request.url, "Sending request");

        let result = match self.transport.send(&request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => {
                debug!(status = %response.status, url = %request.url, "Request failed");
                Err(ApiError::from_status(response.status, &response.text()))
            }
            Err(e) => {
                debug!(error = %e, url = %request.url, "No response");
                Err(e)
            }
        };

        self.response_interceptors
            .iter()
            .fold(result, |result, interceptor| interceptor.on_response(&request, result))
    }

    // ===== JSON helpers =====

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path)?.query(query);
        self.send(request).await?.json()
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path)?.json(body)?;
        self.send(request).await?.json()
    }

    pub(crate) async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::PUT, path)?.json(body)?;
        self.send(request).await?.json()
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::DELETE, path)?;
        self.send(request).await?.json()
    }
}
