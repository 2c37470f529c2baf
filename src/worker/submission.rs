//! Submission payload assembly and post-submission reconciliation

use tracing::{debug, info, warn};

use super::http::HttpClient;
use super::supporting::SupportingObject;
use super::work::WorkArtifact;
use crate::dispatcher::{
    DispatcherClient, DispatcherError, FilePart, JobInfo, SubmissionForm, SubmissionOutcome,
    UnfetchedObject,
};

pub const WORK_FIELD: &str = "work";

/// Tally of the best-effort follow-up fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub attempted: usize,
    pub fetched: usize,
    pub not_modified: usize,
    pub failed: usize,
}

/// Flatten the work and supporting objects into submission fields.
///
/// Object `i` is the i-th emitted result: a fetch yields the file
/// `supporting_objects_{i}` plus `supporting_objects_{i}_url` and
/// `supporting_objects_{i}_etag`, a cache hit yields `cached_{i}_object_id`
/// and `cached_{i}_url`.
pub fn assemble(job: &JobInfo, work: &WorkArtifact, objects: &[SupportingObject]) -> SubmissionForm {
    let mut form = SubmissionForm::default();

    form.files.push(FilePart {
        field: WORK_FIELD.to_string(),
        file_name: WORK_FIELD.to_string(),
        bytes: work.bytes.clone(),
        content_type: None,
    });
    form.fields.push(("dispatch_id".to_string(), job.dispatch_id.to_string()));
    form.fields.push(("report_code".to_string(), job.report_code.to_string()));

    for (i, object) in objects.iter().enumerate() {
        match object {
            SupportingObject::CacheHit { object_id, url } => {
                form.fields.push((format!("cached_{i}_object_id"), object_id.to_string()));
                form.fields.push((format!("cached_{i}_url"), url.clone()));
            }
            SupportingObject::Fetched {
                url,
                file_name,
                bytes,
                content_type,
                etag,
            } => {
                form.files.push(FilePart {
                    field: format!("supporting_objects_{i}"),
                    file_name: file_name.clone(),
                    bytes: bytes.clone(),
                    content_type: Some(content_type.clone()),
                });
                form.fields.push((format!("supporting_objects_{i}_url"), url.clone()));
                form.fields.push((format!("supporting_objects_{i}_etag"), etag.clone()));
            }
        }
    }

    form
}

/// Submits results and follows up on anything the dispatcher could not ingest
#[derive(Debug, Clone)]
pub struct SubmissionCoordinator {
    dispatcher: DispatcherClient,
    /// Generic user-agent client for follow-up fetches
    follow_up: HttpClient,
}

impl SubmissionCoordinator {
    pub fn new(dispatcher: DispatcherClient, follow_up: HttpClient) -> Self {
        Self {
            dispatcher,
            follow_up,
        }
    }

    /// Submit once; transport or status failures are returned, never retried.
    pub async fn submit(
        &self,
        job: &JobInfo,
        work: &WorkArtifact,
        objects: &[SupportingObject],
    ) -> Result<SubmissionOutcome, DispatcherError> {
        let form = assemble(job, work, objects);
        debug!(
            files = form.files.len(),
            fields = form.fields.len(),
            "Submitting work"
        );
        self.dispatcher.submit_job(&form).await
    }

    /// One conditional GET per unfetched object. Nothing is reported back.
    pub async fn reconcile(&self, unfetched: &[UnfetchedObject]) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();

        for object in unfetched {
            summary.attempted += 1;
            let url = object.request_url.as_str();

            let response = match self
                .follow_up
                .get(url, object.potential_etag.as_deref())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!(url, error = %e, "Follow-up fetch failed");
                    summary.failed += 1;
                    continue;
                }
            };

            if response.is_not_modified() {
                debug!(url, "Follow-up fetch not modified");
                summary.not_modified += 1;
                continue;
            }

            if !response.is_success() {
                warn!(url, status = %response.status, "Follow-up fetch rejected");
                summary.failed += 1;
                continue;
            }

            match response.bytes().await {
                Ok(bytes) => {
                    debug!(url, size = bytes.len(), "Follow-up fetch complete");
                    summary.fetched += 1;
                }
                Err(e) => {
                    warn!(url, error = %e, "Follow-up fetch body failed");
                    summary.failed += 1;
                }
            }
        }

        if summary.attempted > 0 {
            info!(
                attempted = summary.attempted,
                fetched = summary.fetched,
                not_modified = summary.not_modified,
                failed = summary.failed,
                "Reconciled unfetched objects"
            );
        }

        summary
    }
}
