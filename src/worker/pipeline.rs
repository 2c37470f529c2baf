//! One job execution: poll → download → collect → submit → reconcile

use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use super::http::{HttpClient, HttpConfig};
use super::submission::SubmissionCoordinator;
use super::supporting::SupportingObjectFetcher;
use super::work::WorkFetcher;
use super::{Result, TaskError};
use crate::config::Config;
use crate::dispatcher::{DispatcherClient, JobPoll, WorkFormat};

/// Terminal state of a pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The dispatcher had nothing to hand out
    QueueEmpty,
    /// Polling itself failed; nothing else was attempted
    PollFailed,
    /// Download rejected and reported via `job_fail`
    FailureReported { fail_status: Option<u16> },
    /// Download rejected and the `job_fail` report was lost
    FailureReportLost { fail_status: Option<u16> },
    /// `submit_job` failed or the dispatcher refused the submission
    SubmitFailed,
    /// Submission accepted; `follow_ups` unfetched objects were attempted
    Submitted { supporting: usize, follow_ups: usize },
}

/// Drives one job end-to-end. Holds no state between runs.
#[derive(Clone)]
pub struct JobPipeline {
    client_name: String,
    dispatcher: DispatcherClient,
    work: WorkFetcher,
    supporting: SupportingObjectFetcher,
    submission: SubmissionCoordinator,
}

impl JobPipeline {
    pub fn new(
        client_name: impl Into<String>,
        dispatcher: DispatcherClient,
        work: WorkFetcher,
        supporting: SupportingObjectFetcher,
        submission: SubmissionCoordinator,
    ) -> Self {
        Self {
            client_name: client_name.into(),
            dispatcher,
            work,
            supporting,
            submission,
        }
    }

    /// Wire every component from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let dispatcher = DispatcherClient::from_config(&config.dispatcher)?;

        let proxy = config.origin.proxy.as_deref();
        let origin = HttpClient::new(HttpConfig::from(&config.origin), proxy)?;
        let follow_up = HttpClient::new(
            HttpConfig {
                user_agent: config.reconcile.user_agent.clone(),
                ..HttpConfig::from(&config.origin)
            },
            proxy,
        )?;

        if config.client_name().is_empty() {
            return Err(TaskError::InvalidTask("worker.client_name is empty".to_string()));
        }

        Ok(Self::new(
            config.client_name(),
            dispatcher.clone(),
            WorkFetcher::new(origin.clone(), config.origin.download_base.clone()),
            SupportingObjectFetcher::new(origin, config.supporting.max_metadata_fields),
            SubmissionCoordinator::new(dispatcher, follow_up),
        ))
    }

    /// Run one execution inside its own span
    pub async fn run(&self) -> PipelineOutcome {
        let execution_id = Uuid::now_v7();
        self.execute()
            .instrument(info_span!("pipeline", %execution_id))
            .await
    }

    async fn execute(&self) -> PipelineOutcome {
        let job = match self.dispatcher.request_job(&self.client_name).await {
            Ok(JobPoll::QueueEmpty) => {
                info!("No jobs available in queue");
                return PipelineOutcome::QueueEmpty;
            }
            Ok(JobPoll::Assigned(job)) => job,
            Err(e) => {
                error!(error = %e, "Couldn't request a job");
                return PipelineOutcome::PollFailed;
            }
        };

        let work_id = job.work_id.to_string();
        let dispatch_id = job.dispatch_id.to_string();
        info!(
            work_id,
            dispatch_id,
            updated = %job.updated,
            format = %job.work_format,
            "Downloading work"
        );

        let work = match self.work.fetch(&job).await {
            Ok(work) => work,
            Err(mismatch) => {
                warn!(work_id, error = %mismatch, "Download rejected, reporting to dispatcher");
                let fail_status = mismatch.status_code;
                return match self
                    .dispatcher
                    .report_failure(&job.dispatch_id, &job.report_code, fail_status)
                    .await
                {
                    Ok(()) => {
                        info!(work_id, "Fail report success");
                        PipelineOutcome::FailureReported { fail_status }
                    }
                    Err(e) => {
                        error!(work_id, error = %e, "Couldn't report failed job");
                        PipelineOutcome::FailureReportLost { fail_status }
                    }
                };
            }
        };

        let objects = if job.work_format == WorkFormat::Html {
            let page_url = self.work.download_url(&job);
            self.supporting
                .fetch_all(&work.bytes, &page_url, &job.cache_infos)
                .await
        } else {
            Vec::new()
        };

        info!(
            work_id,
            size = work.bytes.len(),
            supporting = objects.len(),
            "Downloaded work, submitting"
        );

        let outcome = match self.submission.submit(&job, &work, &objects).await {
            Ok(outcome) if outcome.ok => outcome,
            Ok(_) => {
                error!(work_id, "Dispatcher refused the submission");
                return PipelineOutcome::SubmitFailed;
            }
            Err(e) => {
                error!(work_id, error = %e, "Work report has failed");
                return PipelineOutcome::SubmitFailed;
            }
        };

        info!(
            work_id,
            unfetched = outcome.unfetched_objects.len(),
            "Work report success"
        );

        let follow_ups = if outcome.unfetched_objects.is_empty() {
            0
        } else {
            self.submission
                .reconcile(&outcome.unfetched_objects)
                .await
                .attempted
        };

        PipelineOutcome::Submitted {
            supporting: objects.len(),
            follow_ups,
        }
    }
}
