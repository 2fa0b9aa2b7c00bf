//! Dashboard analytics payloads.

use serde::{Deserialize, Serialize};

/// `GET dashboard/metrics`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GlobalMetrics {
    pub total: i64,
    #[serde(default)]
    pub by_threat: Vec<ThreatCount>,
    #[serde(default)]
    pub by_status: Vec<StatusCount>,
}

impl GlobalMetrics {
    /// Count for one threat level, zero when absent
    pub fn threat_count(&self, threat: &str) -> i64 {
        self.by_threat
            .iter()
            .filter(|t| t.threat.eq_ignore_ascii_case(threat))
            .map(|t| t.count)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ThreatCount {
    pub threat: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DomainCount {
    pub domain: String,
    pub count: i64,
}

/// One point of the activity time series (`YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

/// Entry of the top/recent URL lists and the event feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RecentUrl {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub threat: Option<String>,
    #[serde(default)]
    pub date_added: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SearchHit {
    pub id: i64,
    pub url: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub threat: Option<String>,
}

/// Everything the dashboard view shows, fetched together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardSummary {
    pub metrics: GlobalMetrics,
    pub top_domains: Vec<DomainCount>,
    pub daily_activity: Vec<DailyCount>,
    pub recent_urls: Vec<RecentUrl>,
}
