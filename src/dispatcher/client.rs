//! HTTP client for the dispatcher's request/fail/submit endpoints

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    JobFailBody, JobPoll, OpaqueToken, RequestJobBody, SubmissionForm, SubmissionOutcome,
};
use super::{DispatcherError, Result};
use crate::config::DispatcherConfig;

const TOKEN_HEADER: &str = "token";

/// Typed wrapper over the dispatcher API.
///
/// Every request carries the shared `token` header. Non-success responses are
/// surfaced as [`DispatcherError::Status`] and never retried here.
#[derive(Debug, Clone)]
pub struct DispatcherClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DispatcherClient {
    /// Build from the dispatcher section of the loaded configuration
    pub fn from_config(config: &DispatcherConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or(DispatcherError::NotConfigured("dispatcher.base_url"))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout.as_duration())
            .build()?;

        Ok(Self::with_client(client, base_url, config.token.clone()))
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Ask the dispatcher for the next job.
    ///
    /// Sends `POST /request_job` with this worker's identity.
    pub async fn request_job(&self, client_name: &str) -> Result<JobPoll> {
        let response = self
            .post("request_job")
            .json(&RequestJobBody { client_name })
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Report a job whose work artifact could not be downloaded.
    ///
    /// `fail_status` is the origin's HTTP status, `None` when no response arrived.
    pub async fn report_failure(
        &self,
        dispatch_id: &OpaqueToken,
        report_code: &OpaqueToken,
        fail_status: Option<u16>,
    ) -> Result<()> {
        let response = self
            .post("job_fail")
            .json(&JobFailBody {
                dispatch_id,
                report_code,
                fail_status,
            })
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Submit the collected bytes as a multipart form.
    ///
    /// An empty reply body counts as an accepted submission with nothing unfetched.
    pub async fn submit_job(&self, form: &SubmissionForm) -> Result<SubmissionOutcome> {
        let response = self
            .post("submit_job")
            .multipart(Self::multipart(form))
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        Ok(Self::submission_outcome(&body))
    }

    // ---- private helpers ----

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, "Dispatcher request");

        let request = self.client.post(url);
        match &self.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    fn multipart(form: &SubmissionForm) -> Form {
        let mut multipart = Form::new();

        for file in &form.files {
            let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
            if let Some(content_type) = file.content_type.as_deref().filter(|ct| !ct.is_empty()) {
                // An unparseable origin content-type is sent without one
                part = match part.mime_str(content_type) {
                    Ok(typed) => typed,
                    Err(_) => Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone()),
                };
            }
            multipart = multipart.part(file.field.clone(), part);
        }

        for (key, value) in &form.fields {
            multipart = multipart.text(key.clone(), value.clone());
        }

        multipart
    }

    /// Ensure the response has a success status code, returning the status
    /// and body text as [`DispatcherError::Status`] otherwise.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(DispatcherError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        Self::decode(&body)
    }

    /// A success status already means accepted; an unreadable body only loses
    /// the unfetched list.
    fn submission_outcome(body: &str) -> SubmissionOutcome {
        if body.trim().is_empty() {
            return SubmissionOutcome::accepted();
        }

        Self::decode(body).unwrap_or_else(|e| {
            warn!(error = %e, "Submit response body is not a submission outcome, treating as accepted");
            SubmissionOutcome::accepted()
        })
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| DispatcherError::MalformedPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client =
            DispatcherClient::with_client(reqwest::Client::new(), "http://dispatcher:8000/", None);
        assert_eq!(client.base_url, "http://dispatcher:8000");
    }

    #[test]
    fn test_undecodable_submit_body_is_accepted() {
        assert_eq!(DispatcherClient::submission_outcome("OK"), SubmissionOutcome::accepted());
        assert_eq!(DispatcherClient::submission_outcome(" \n"), SubmissionOutcome::accepted());

        let refused = DispatcherClient::submission_outcome(r#"{"ok": false}"#);
        assert!(!refused.ok);
    }

    #[test]
    fn test_decode_malformed_is_distinct_error() {
        let result = DispatcherClient::decode::<JobPoll>("{\"status\": \"ok\"}");
        assert!(matches!(result, Err(DispatcherError::MalformedPayload(_))));

        let result = DispatcherClient::decode::<JobPoll>("<html>502</html>");
        assert!(matches!(result, Err(DispatcherError::MalformedPayload(_))));
    }
}
