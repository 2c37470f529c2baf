//! Primary work artifact download and format validation

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use super::http::HttpClient;
use crate::dispatcher::{JobInfo, WorkFormat};

/// The downloaded artifact could not be used; reported once to the dispatcher
#[derive(Debug, Error)]
#[error("work download rejected (status {status_code:?}): {reason}")]
pub struct MismatchError {
    /// HTTP status from the origin, `None` when no response arrived
    pub status_code: Option<u16>,
    pub reason: String,
}

/// Raw work bytes as served by the origin
#[derive(Debug, Clone)]
pub struct WorkArtifact {
    pub bytes: Bytes,
    pub content_type: String,
}

/// Downloads work artifacts from the origin content server
#[derive(Debug, Clone)]
pub struct WorkFetcher {
    client: HttpClient,
    download_base: String,
}

impl WorkFetcher {
    pub fn new(client: HttpClient, download_base: impl Into<String>) -> Self {
        let download_base = download_base.into().trim_end_matches('/').to_string();
        Self {
            client,
            download_base,
        }
    }

    /// `{base}/downloads/{work_id}/file.{format}?updated_at={updated}`
    pub fn download_url(&self, job: &JobInfo) -> String {
        format!(
            "{}/downloads/{}/file.{}?updated_at={}",
            self.download_base,
            job.work_id,
            job.work_format.extension(),
            job.updated
        )
    }

    /// Download the work and check its content-type against the declared format.
    ///
    /// No checksum or size validation happens here.
    pub async fn fetch(&self, job: &JobInfo) -> Result<WorkArtifact, MismatchError> {
        let url = self.download_url(job);
        debug!(%url, "Downloading work");

        let response = self.client.get(&url, None).await.map_err(|e| {
            warn!(%url, error = %e, "Work download failed in transport");
            MismatchError {
                status_code: None,
                reason: e.to_string(),
            }
        })?;

        let status_code = Some(response.status.as_u16());
        if !response.is_success() {
            return Err(MismatchError {
                status_code,
                reason: format!("origin answered {}", response.status),
            });
        }

        let observed = response.content_type.clone().unwrap_or_default();
        if !content_type_matches(job.work_format, &observed) {
            return Err(MismatchError {
                status_code,
                reason: format!(
                    "content-type '{}' does not match expected '{}'",
                    observed,
                    job.work_format.expected_content_type()
                ),
            });
        }

        let bytes = response.bytes().await.map_err(|e| MismatchError {
            status_code,
            reason: e.to_string(),
        })?;

        Ok(WorkArtifact {
            bytes,
            content_type: observed,
        })
    }
}

/// Exact comparison; parameters such as `; charset=` make a mismatch
pub fn content_type_matches(format: WorkFormat, observed: &str) -> bool {
    observed == format.expected_content_type()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::OpaqueToken;
    use crate::worker::http::HttpConfig;
    use std::collections::HashMap;

    fn job(format: WorkFormat) -> JobInfo {
        JobInfo {
            work_id: OpaqueToken::Int(12345),
            updated: OpaqueToken::from("1714557600"),
            work_format: format,
            dispatch_id: OpaqueToken::from("d"),
            report_code: OpaqueToken::from("r"),
            cache_infos: HashMap::new(),
        }
    }

    #[test]
    fn test_download_url() {
        let client = HttpClient::new(HttpConfig::default(), None).unwrap();
        let fetcher = WorkFetcher::new(client, "https://download.example.org/");

        assert_eq!(
            fetcher.download_url(&job(WorkFormat::Epub)),
            "https://download.example.org/downloads/12345/file.epub?updated_at=1714557600"
        );
    }

    #[test]
    fn test_content_type_must_match_exactly() {
        assert!(content_type_matches(WorkFormat::Pdf, "application/pdf"));
        assert!(!content_type_matches(WorkFormat::Pdf, "text/html"));
        assert!(!content_type_matches(WorkFormat::Html, "text/html; charset=utf-8"));
        assert!(!content_type_matches(WorkFormat::Mobi, ""));
    }
}
