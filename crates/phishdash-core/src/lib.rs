//! Core library for phishdash.
//!
//! Provides the client side of the phishing-risk dashboard API:
//!
//! - `auth`: the session/token store, auth header handling, keychain credentials
//! - `api`: the HTTP client, its interceptor pair, and endpoint wrappers
//! - `router`: route table and the navigation guard
//! - `events`: the navigation/notice bus shared by the HTTP layer and the router
//! - `storage`: durable key-value storage backing the session
//! - `models`: wire types for users, URLs and dashboard analytics
//! - `config`: persisted client configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod events;
pub mod models;
pub mod router;
pub mod storage;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, Session, SessionSnapshot, SessionState};
pub use config::Config;
pub use events::{AppEvent, EventBus, Notice};
pub use router::{GuardDecision, Location, Route, RouteGuard, Router};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
