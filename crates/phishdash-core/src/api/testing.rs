//! Test doubles for the API layer.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::{ApiClient, ApiError};
use crate::auth::Session;
use crate::events::EventBus;
use crate::storage::MemoryStore;

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync;

/// Transport that answers from a closure and records every request.
pub struct FakeTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn new(
        handler: impl Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests whose URL path equals `path` (leading slash included)
    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

pub fn json(status: u16, body: serde_json::Value) -> Result<ApiResponse, ApiError> {
    let status = StatusCode::from_u16(status).unwrap();
    Ok(ApiResponse::json_body(status, &body))
}

/// Client over `transport` with a fresh in-memory session and the auth
/// interceptors installed.
pub fn client_with(transport: Arc<FakeTransport>) -> (ApiClient, Arc<Session>, EventBus) {
    let session = Arc::new(Session::new(Arc::new(MemoryStore::new())));
    let events = EventBus::new();
    let mut client = ApiClient::with_transport(
        "http://localhost:8000",
        transport as Arc<dyn Transport>,
        Arc::clone(&session),
    )
    .unwrap();
    client.setup_interceptors(&events);
    (client, session, events)
}
