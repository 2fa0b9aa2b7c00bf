//! REST API client for the phishing-risk dashboard backend.
//!
//! This module provides the `ApiClient` for the token, current-user, URL,
//! CSV and dashboard analytics endpoints.
//!
//! The API uses bearer token authentication. Tokens are obtained from
//! `auth/token` and attached to every request by the `AuthInterceptor`,
//! which also turns a rejected token into a forced logout.

pub mod auth;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod interceptor;
pub mod transport;
pub mod urls;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ApiClient;
pub use error::ApiError;
pub use interceptor::{AuthInterceptor, RequestInterceptor, ResponseInterceptor};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
