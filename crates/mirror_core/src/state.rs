use std::collections::BTreeMap;

use url::Url;

use crate::view_model::{AppViewModel, JobRowView};
use crate::{JobId, JobResultKind, JobStatus, MirrorSummary, ResourceKind, SearchResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct JobRow {
    url: Url,
    status: JobStatus,
    summary: MirrorSummary,
    result: Option<JobResultKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    jobs: BTreeMap<JobId, JobRow>,
    search_results: Vec<SearchResult>,
    last_source: Option<Url>,
    next_job_id: JobId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            next_job_id: 1,
            ..Self::default()
        }
    }

    pub fn view(&self) -> AppViewModel {
        let jobs = self
            .jobs
            .iter()
            .map(|(job_id, row)| JobRowView {
                job_id: *job_id,
                url: row.url.to_string(),
                status: row.status,
                summary: row.summary,
                file_name: match &row.result {
                    Some(JobResultKind::Succeeded { file_name, .. }) => Some(file_name.clone()),
                    _ => None,
                },
            })
            .collect::<Vec<_>>();
        let active_jobs = jobs.iter().filter(|j| !j.status.is_terminal()).count();
        AppViewModel {
            jobs,
            search_results: self.search_results.clone(),
            active_jobs,
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Most recently mirrored page; relative input is resolved against it.
    pub fn last_source(&self) -> Option<&Url> {
        self.last_source.as_ref()
    }

    pub fn search_result(&self, index: usize) -> Option<&SearchResult> {
        self.search_results.get(index)
    }

    pub(crate) fn set_search_results(&mut self, results: Vec<SearchResult>) {
        self.search_results = results;
        self.dirty = true;
    }

    pub(crate) fn start_job(&mut self, url: Url) -> JobId {
        let job_id = self.next_job_id.max(1);
        self.next_job_id = job_id + 1;
        self.last_source = Some(url.clone());
        self.jobs.insert(
            job_id,
            JobRow {
                url,
                status: JobStatus::Pending,
                summary: MirrorSummary::default(),
                result: None,
            },
        );
        self.dirty = true;
        job_id
    }

    pub(crate) fn is_active(&self, job_id: JobId) -> bool {
        self.jobs
            .get(&job_id)
            .is_some_and(|row| !row.status.is_terminal())
    }

    /// Applies a stage change; stale or backward updates are dropped.
    pub(crate) fn apply_status(&mut self, job_id: JobId, status: JobStatus) {
        if let Some(row) = self.jobs.get_mut(&job_id) {
            if !row.status.is_terminal() && status > row.status {
                row.status = status;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn apply_resource(&mut self, job_id: JobId, kind: ResourceKind, fetched: bool) {
        if let Some(row) = self.jobs.get_mut(&job_id) {
            if row.status.is_terminal() {
                return;
            }
            let counts = match kind {
                ResourceKind::Stylesheet => &mut row.summary.stylesheets,
                ResourceKind::Script => &mut row.summary.scripts,
            };
            if fetched {
                counts.fetched += 1;
            } else {
                counts.failed += 1;
            }
            self.dirty = true;
        }
    }

    /// Records the final result. Returns false when the job is unknown or
    /// already has one.
    pub(crate) fn apply_done(&mut self, job_id: JobId, result: JobResultKind) -> bool {
        let Some(row) = self.jobs.get_mut(&job_id) else {
            return false;
        };
        if row.result.is_some() {
            return false;
        }
        row.status = result.terminal_status();
        if let JobResultKind::Succeeded { summary, .. } = &result {
            row.summary = *summary;
        }
        row.result = Some(result);
        self.dirty = true;
        true
    }
}
