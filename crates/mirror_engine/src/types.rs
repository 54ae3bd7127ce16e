use std::fmt;

use mirror_core::{JobId, JobStatus, MirrorSummary, ResourceKind, TransitionError};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusChanged {
        job_id: JobId,
        status: JobStatus,
    },
    ResourceSettled {
        job_id: JobId,
        index: usize,
        url: Url,
        kind: ResourceKind,
        error: Option<FetchError>,
    },
    JobCompleted {
        job_id: JobId,
        result: Result<MirrorArtifact, MirrorFailure>,
    },
}

/// Raw response body plus what the transport told us about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: bytes::Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

/// The downloadable result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub summary: MirrorSummary,
}

/// Job-level failures. Resource fetch errors never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MirrorFailure {
    #[error("document fetch failed: {0}")]
    DocumentFetch(FetchError),
    #[error("archive build failed: {0}")]
    ArchiveBuild(String),
    #[error("cancelled")]
    Cancelled,
    #[error("job state error: {0}")]
    State(#[from] TransitionError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
