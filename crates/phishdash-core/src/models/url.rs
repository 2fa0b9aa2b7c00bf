//! The tracked URL resource and CSV import results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A URL tracked by the dashboard, as returned by `GET urls/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UrlRecord {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub threat: String,
    #[serde(with = "timestamp")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub date_added: DateTime<Utc>,
    pub status: String,
    pub source: String,
}

/// Body for creating or replacing a URL (`POST urls/`, `PUT urls/{id}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct UrlInput {
    pub url: String,
    pub domain: String,
    pub threat: String,
    #[serde(with = "timestamp")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub date_added: DateTime<Utc>,
    pub status: String,
    pub source: String,
}

impl UrlInput {
    /// Derive the domain from the URL host when the caller does not give one.
    pub fn domain_from_url(url: &str) -> Option<String> {
        reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}

impl From<UrlRecord> for UrlInput {
    fn from(record: UrlRecord) -> Self {
        Self {
            url: record.url,
            domain: record.domain,
            threat: record.threat,
            date_added: record.date_added,
            status: record.status,
            source: record.source,
        }
    }
}

/// `POST urls/import` payload, e.g. `{"detail": "12 rows imported"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ImportSummary {
    pub detail: String,
}

impl ImportSummary {
    /// Row count parsed from the detail message, if it has one
    pub fn rows_imported(&self) -> Option<u64> {
        self.detail.split_whitespace().next()?.parse().ok()
    }
}

/// Timestamps are written as RFC 3339. The backend may send naive ISO
/// timestamps without an offset; those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| naive.and_utc())
    }
}
