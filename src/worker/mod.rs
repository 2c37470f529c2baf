//! Job pipeline
//!
//! A [`JobPipeline`] polls the dispatcher for one job, downloads the work
//! from the origin, collects supporting objects for html works, submits the
//! bytes and follows up on anything the dispatcher could not ingest.

pub mod http;
pub mod pipeline;
pub mod submission;
pub mod supporting;
pub mod work;

pub use pipeline::{JobPipeline, PipelineOutcome};
pub use submission::{ReconcileSummary, SubmissionCoordinator};
pub use supporting::{ImgSrcExtractor, MarkupExtractor, SupportingObject, SupportingObjectFetcher};
pub use work::{MismatchError, WorkArtifact, WorkFetcher};

use thiserror::Error;

/// Errors raised while wiring a pipeline
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Dispatcher client setup failed: {0}")]
    Dispatcher(#[from] crate::dispatcher::DispatcherError),

    #[error("Origin client setup failed: {0}")]
    Origin(#[from] http::FetchError),

    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

pub type Result<T> = std::result::Result<T, TaskError>;
