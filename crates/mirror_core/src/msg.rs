use crate::{JobId, JobStatus, MirrorSummary, ResourceKind, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// The search collaborator finished and delivered its hits.
    SearchResultsReceived(Vec<SearchResult>),
    /// User asked to mirror a typed or pasted URL.
    MirrorRequested { url: String },
    /// User asked to mirror the search hit at `index`.
    MirrorResultRequested { index: usize },
    /// User asked to abandon a running job.
    CancelRequested { job_id: JobId },
    /// Engine moved a job to a new stage.
    JobStatusChanged { job_id: JobId, status: JobStatus },
    /// Engine finished one resource fetch.
    ResourceSettled {
        job_id: JobId,
        kind: ResourceKind,
        fetched: bool,
    },
    /// Engine finished a job.
    JobDone {
        job_id: JobId,
        result: JobResultKind,
    },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResultKind {
    Succeeded {
        file_name: String,
        summary: MirrorSummary,
    },
    DocumentFetchFailed { reason: String },
    BuildFailed { reason: String },
    Cancelled,
}

impl JobResultKind {
    pub fn terminal_status(&self) -> JobStatus {
        match self {
            JobResultKind::Succeeded { .. } => JobStatus::Succeeded,
            JobResultKind::DocumentFetchFailed { .. } => JobStatus::FailedTotal,
            JobResultKind::BuildFailed { .. } => JobStatus::BuildFailed,
            JobResultKind::Cancelled => JobStatus::Cancelled,
        }
    }
}
