//! The tracked-URL resource and its CSV import/export.

use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::Method;
use tracing::{debug, info};

use super::transport::FilePart;
use super::{ApiClient, ApiError};
use crate::models::{ImportSummary, UrlInput, UrlRecord};

pub const URLS_PATH: &str = "urls/";
pub const EXPORT_PATH: &str = "urls/export";
pub const IMPORT_PATH: &str = "urls/import";

/// Multipart field the import endpoint reads the file from
const IMPORT_FIELD: &str = "file";
const CSV_MIME: &str = "text/csv";

fn url_path(id: i64) -> String {
    format!("{}{}", URLS_PATH, id)
}

impl ApiClient {
    pub async fn list_urls(&self) -> Result<Vec<UrlRecord>, ApiError> {
        let urls: Vec<UrlRecord> = self.get_json(URLS_PATH, &[]).await?;
        debug!(count = urls.len(), "Fetched URLs");
        Ok(urls)
    }

    pub async fn create_url(&self, input: &UrlInput) -> Result<UrlRecord, ApiError> {
        let record: UrlRecord = self.post_json(URLS_PATH, input).await?;
        info!(id = record.id, url = %record.url, "URL created");
        Ok(record)
    }

    pub async fn update_url(&self, id: i64, input: &UrlInput) -> Result<UrlRecord, ApiError> {
        let record: UrlRecord = self.put_json(&url_path(id), input).await?;
        info!(id, "URL updated");
        Ok(record)
    }

    /// The backend answers with a free-form JSON body, returned as is.
    pub async fn delete_url(&self, id: i64) -> Result<serde_json::Value, ApiError> {
        let body = self.delete_json(&url_path(id)).await?;
        info!(id, "URL deleted");
        Ok(body)
    }

    /// Download every URL as CSV
    pub async fn export_csv(&self) -> Result<Vec<u8>, ApiError> {
        let request = self
            .request(Method::GET, EXPORT_PATH)?
            .header(ACCEPT, HeaderValue::from_static(CSV_MIME));
        let bytes = self.send(request).await?.into_bytes();
        debug!(bytes = bytes.len(), "CSV exported");
        Ok(bytes)
    }

    /// Upload a CSV file. Names without a `.csv` extension are refused
    /// before anything is sent, matching the server's own check.
    pub async fn import_csv(&self, file_name: &str, bytes: Vec<u8>) -> Result<ImportSummary, ApiError> {
        if !file_name.ends_with(".csv") {
            return Err(ApiError::InvalidRequest(format!(
                "File must be a CSV: {}",
                file_name
            )));
        }

        let request = self.request(Method::POST, IMPORT_PATH)?.multipart(FilePart {
            field: IMPORT_FIELD.to_string(),
            file_name: file_name.to_string(),
            mime: CSV_MIME.to_string(),
            bytes,
        });
        let summary: ImportSummary = self.send(request).await?.json()?;
        info!(file = file_name, detail = %summary.detail, "CSV imported");
        Ok(summary)
    }
}
