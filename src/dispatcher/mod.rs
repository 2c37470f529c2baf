//! Dispatcher contract: request a job, report a failure, submit a result
//!
//! Payloads are decoded into explicit schemas at the boundary; a body that
//! does not fit its schema is a [`DispatcherError::MalformedPayload`].

mod client;
pub mod models;

pub use client::DispatcherClient;
pub use models::{
    CacheInfo, FilePart, JobInfo, JobPoll, OpaqueToken, SubmissionForm, SubmissionOutcome,
    UnfetchedObject, WorkFormat,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The dispatcher returned a non-2xx status code.
    #[error("dispatcher error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("malformed dispatcher payload: {0}")]
    MalformedPayload(String),

    #[error("not configured: {0}")]
    NotConfigured(&'static str),
}

pub type Result<T> = std::result::Result<T, DispatcherError>;
