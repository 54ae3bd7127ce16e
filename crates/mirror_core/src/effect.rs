use url::Url;

use crate::{JobId, MirrorSummary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartMirror { job_id: JobId, url: Url },
    CancelMirror { job_id: JobId },
    Notify(Notification),
}

/// User-facing outcome banner. At most one per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Succeeded {
        job_id: JobId,
        file_name: String,
        summary: MirrorSummary,
    },
    Failed { job_id: JobId, reason: String },
    Rejected { input: String, reason: String },
}
