//! Dashboard analytics endpoints (`dashboard/...`).

use tracing::debug;

use super::{ApiClient, ApiError};
use crate::models::{
    DailyCount, DashboardSummary, DomainCount, GlobalMetrics, RecentUrl, SearchHit, StatusCount,
    ThreatCount,
};

const DASHBOARD_PATH: &str = "dashboard/";

// Defaults used by the dashboard view
pub const DEFAULT_DOMAIN_LIMIT: u32 = 10;
pub const DEFAULT_TOP_DOMAIN_LIMIT: u32 = 5;
pub const DEFAULT_URL_LIMIT: u32 = 10;
pub const DEFAULT_EVENT_LIMIT: u32 = 20;

fn limit(limit: u32) -> [(&'static str, String); 1] {
    [("limit", limit.to_string())]
}

impl ApiClient {
    async fn dashboard<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.get_json(&format!("{}{}", DASHBOARD_PATH, endpoint), query)
            .await
    }

    pub async fn metrics(&self) -> Result<GlobalMetrics, ApiError> {
        self.dashboard("metrics", &[]).await
    }

    pub async fn risk_distribution(&self) -> Result<Vec<ThreatCount>, ApiError> {
        self.dashboard("risk-distribution", &[]).await
    }

    pub async fn status_distribution(&self) -> Result<Vec<StatusCount>, ApiError> {
        self.dashboard("status-distribution", &[]).await
    }

    pub async fn domain_counts(&self, max: u32) -> Result<Vec<DomainCount>, ApiError> {
        self.dashboard("domains", &limit(max)).await
    }

    pub async fn top_risky_domains(&self, max: u32) -> Result<Vec<DomainCount>, ApiError> {
        self.dashboard("domains/top", &limit(max)).await
    }

    pub async fn monthly_activity(&self) -> Result<Vec<DailyCount>, ApiError> {
        self.dashboard("activity/monthly", &[]).await
    }

    pub async fn daily_activity(&self) -> Result<Vec<DailyCount>, ApiError> {
        self.dashboard("activity/daily", &[]).await
    }

    pub async fn top_risky_urls(&self, max: u32) -> Result<Vec<RecentUrl>, ApiError> {
        self.dashboard("urls/top", &limit(max)).await
    }

    pub async fn recent_urls(&self, max: u32) -> Result<Vec<RecentUrl>, ApiError> {
        self.dashboard("urls/recent", &limit(max)).await
    }

    pub async fn recent_events(&self, max: u32) -> Result<Vec<RecentUrl>, ApiError> {
        self.dashboard("events", &limit(max)).await
    }

    /// Search URLs and domains. A blank query matches nothing and is not sent.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.dashboard("search", &[("q", query.to_string())]).await
    }

    /// Fetch the dashboard view's panels concurrently. Fails if any panel fails.
    pub async fn summary(&self) -> Result<DashboardSummary, ApiError> {
        let (metrics, top_domains, daily_activity, recent_urls) = futures::try_join!(
            self.metrics(),
            self.top_risky_domains(DEFAULT_TOP_DOMAIN_LIMIT),
            self.daily_activity(),
            self.recent_urls(DEFAULT_URL_LIMIT),
        )?;
        debug!(total = metrics.total, "Dashboard summary fetched");

        Ok(DashboardSummary {
            metrics,
            top_domains,
            daily_activity,
            recent_urls,
        })
    }
}
