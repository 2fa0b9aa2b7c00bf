//! Wire models for the dashboard API.
//!
//! This module contains the request and response types exchanged with the
//! backend:
//!
//! - `TokenResponse`, `UserProfile`: token exchange and current-user payloads
//! - `UrlRecord`, `UrlInput`: the tracked URL resource
//! - Dashboard analytics: `GlobalMetrics`, `DomainCount`, `DailyCount`, etc.
//! - `ImportSummary`: result of a CSV import

pub mod dashboard;
pub mod url;
pub mod user;

pub use dashboard::{
    DailyCount, DashboardSummary, DomainCount, GlobalMetrics, RecentUrl, SearchHit, StatusCount,
    ThreatCount,
};
pub use url::{ImportSummary, UrlInput, UrlRecord};
pub use user::{TokenResponse, UserProfile};
