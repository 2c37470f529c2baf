//! Wire schemas for the dispatcher contract

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque correlation value echoed back to the dispatcher in its original JSON type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OpaqueToken {
    Int(i64),
    Text(String),
}

impl fmt::Display for OpaqueToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpaqueToken::Int(value) => write!(f, "{}", value),
            OpaqueToken::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for OpaqueToken {
    fn from(value: &str) -> Self {
        OpaqueToken::Text(value.to_string())
    }
}

impl From<i64> for OpaqueToken {
    fn from(value: i64) -> Self {
        OpaqueToken::Int(value)
    }
}

/// Declared format of a work artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkFormat {
    Pdf,
    Epub,
    Html,
    Azw3,
    Mobi,
}

impl WorkFormat {
    /// File extension used in the origin download path
    pub fn extension(&self) -> &'static str {
        match self {
            WorkFormat::Pdf => "pdf",
            WorkFormat::Epub => "epub",
            WorkFormat::Html => "html",
            WorkFormat::Azw3 => "azw3",
            WorkFormat::Mobi => "mobi",
        }
    }

    /// Transport content-type the origin must report for this format
    pub fn expected_content_type(&self) -> &'static str {
        match self {
            WorkFormat::Pdf => "application/pdf",
            WorkFormat::Epub => "application/epub+zip",
            WorkFormat::Html => "text/html",
            WorkFormat::Azw3 => "application/vnd.amazon.ebook",
            WorkFormat::Mobi => "application/x-mobipocket-ebook",
        }
    }
}

impl fmt::Display for WorkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Previously stored copy of a supporting object
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheInfo {
    pub etag: String,
    pub object_id: OpaqueToken,
    pub url: String,
}

/// A job handed out by `request_job`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobInfo {
    pub work_id: OpaqueToken,
    pub updated: OpaqueToken,
    pub work_format: WorkFormat,
    pub dispatch_id: OpaqueToken,
    pub report_code: OpaqueToken,
    /// Keyed by the resource URL as it appears in the markup
    #[serde(default)]
    pub cache_infos: HashMap<String, CacheInfo>,
}

/// Result of polling the dispatcher
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "status")]
pub enum JobPoll {
    #[serde(rename = "ok")]
    Assigned(JobInfo),
    #[serde(rename = "queue empty", alias = "queue_empty")]
    QueueEmpty,
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestJobBody<'a> {
    pub client_name: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct JobFailBody<'a> {
    pub dispatch_id: &'a OpaqueToken,
    pub report_code: &'a OpaqueToken,
    pub fail_status: Option<u16>,
}

/// Supporting object the dispatcher wants retrieved out-of-band
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UnfetchedObject {
    pub request_url: String,
    #[serde(default)]
    pub potential_etag: Option<String>,
}

/// Dispatcher reply to `submit_job`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmissionOutcome {
    #[serde(default = "default_ok")]
    pub ok: bool,
    #[serde(default)]
    pub unfetched_objects: Vec<UnfetchedObject>,
}

fn default_ok() -> bool {
    true
}

impl SubmissionOutcome {
    /// Outcome for an accepted submission with nothing left to fetch
    pub fn accepted() -> Self {
        Self {
            ok: true,
            unfetched_objects: Vec::new(),
        }
    }
}

/// File part of a submission
#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
    /// `None` sends the part without a declared content-type
    pub content_type: Option<String>,
}

/// Flattened multipart payload for `submit_job`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl SubmissionForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|part| part.field == name)
    }
}
