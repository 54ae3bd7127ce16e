use crate::{JobId, JobStatus, MirrorSummary, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub jobs: Vec<JobRowView>,
    pub search_results: Vec<SearchResult>,
    pub active_jobs: usize,
    pub dirty: bool,
}

impl AppViewModel {
    /// True once every known job reached a terminal status.
    pub fn all_settled(&self) -> bool {
        self.active_jobs == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub url: String,
    pub status: JobStatus,
    pub summary: MirrorSummary,
    pub file_name: Option<String>,
}
