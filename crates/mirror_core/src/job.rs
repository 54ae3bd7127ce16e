//! Data model for a single mirroring attempt.
//!
//! A [`MirrorJob`] only ever moves forward through [`JobStatus`]; every
//! mutator checks the current status and refuses out-of-order writes, so the
//! pipeline driving it cannot accidentally rewind or double-write state.

use std::fmt;

use thiserror::Error;
use url::Url;

pub type JobId = u64;

/// Lifecycle of a mirroring job.
///
/// The ordering of the variants is the order of the pipeline; the four last
/// variants are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobStatus {
    Pending,
    FetchingDocument,
    DiscoveringResources,
    FetchingResources,
    Building,
    Succeeded,
    FailedTotal,
    BuildFailed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded
                | JobStatus::FailedTotal
                | JobStatus::BuildFailed
                | JobStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal forward step.
    pub fn can_advance_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            JobStatus::Pending => false,
            JobStatus::FetchingDocument => self == JobStatus::Pending,
            JobStatus::DiscoveringResources => self == JobStatus::FetchingDocument,
            JobStatus::FetchingResources => self == JobStatus::DiscoveringResources,
            JobStatus::Building => self == JobStatus::FetchingResources,
            JobStatus::Succeeded | JobStatus::BuildFailed => self == JobStatus::Building,
            JobStatus::FailedTotal => self == JobStatus::FetchingDocument,
            JobStatus::Cancelled => true,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::FetchingDocument => "fetching document",
            JobStatus::DiscoveringResources => "discovering resources",
            JobStatus::FetchingResources => "fetching resources",
            JobStatus::Building => "building",
            JobStatus::Succeeded => "succeeded",
            JobStatus::FailedTotal => "failed",
            JobStatus::BuildFailed => "build failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stylesheet,
    Script,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Stylesheet => f.write_str("stylesheet"),
            ResourceKind::Script => f.write_str("script"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    Pending,
    Fetched { body: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move job from {from} to {to}")]
    IllegalStatus { from: JobStatus, to: JobStatus },
    #[error("{field} may only be set while {expected}, job is {actual}")]
    WrongStage {
        field: &'static str,
        expected: JobStatus,
        actual: JobStatus,
    },
    #[error("{field} already set")]
    AlreadySet { field: &'static str },
    #[error("resource {index} does not exist")]
    UnknownResource { index: usize },
    #[error("resource {index} already settled")]
    ResourceSettled { index: usize },
}

/// One discovered stylesheet or script and what happened when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTask {
    pub url: Url,
    pub kind: ResourceKind,
    outcome: ResourceOutcome,
}

impl ResourceTask {
    pub fn new(url: Url, kind: ResourceKind) -> Self {
        Self {
            url,
            kind,
            outcome: ResourceOutcome::Pending,
        }
    }

    pub fn outcome(&self) -> &ResourceOutcome {
        &self.outcome
    }

    pub fn body(&self) -> Option<&str> {
        match &self.outcome {
            ResourceOutcome::Fetched { body } => Some(body),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ResourceOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.outcome != ResourceOutcome::Pending
    }

    fn settle(
        &mut self,
        index: usize,
        result: Result<String, String>,
    ) -> Result<(), TransitionError> {
        if self.is_settled() {
            return Err(TransitionError::ResourceSettled { index });
        }
        self.outcome = match result {
            Ok(body) => ResourceOutcome::Fetched { body },
            Err(error) => ResourceOutcome::Failed { error },
        };
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KindCounts {
    pub fetched: usize,
    pub failed: usize,
}

/// Per-kind tally of resource outcomes, reported with the final artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MirrorSummary {
    pub stylesheets: KindCounts,
    pub scripts: KindCounts,
}

impl MirrorSummary {
    pub fn failed(&self) -> usize {
        self.stylesheets.failed + self.scripts.failed
    }

    pub fn fetched(&self) -> usize {
        self.stylesheets.fetched + self.scripts.fetched
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorJob {
    id: JobId,
    source_url: Url,
    status: JobStatus,
    document: Option<Vec<u8>>,
    resources: Option<Vec<ResourceTask>>,
    archive: Option<Vec<u8>>,
}

impl MirrorJob {
    pub fn new(id: JobId, source_url: Url) -> Self {
        Self {
            id,
            source_url,
            status: JobStatus::Pending,
            document: None,
            resources: None,
            archive: None,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn document(&self) -> Option<&[u8]> {
        self.document.as_deref()
    }

    pub fn resources(&self) -> &[ResourceTask] {
        self.resources.as_deref().unwrap_or(&[])
    }

    pub fn archive(&self) -> Option<&[u8]> {
        self.archive.as_deref()
    }

    /// Consumes the job, handing off the built archive if there is one.
    pub fn into_archive(self) -> Option<Vec<u8>> {
        self.archive
    }

    /// Moves to a non-terminal stage, or to `Cancelled`.
    ///
    /// Terminal outcomes that carry data go through [`Self::succeed`],
    /// [`Self::fail_document`] and [`Self::fail_build`] instead.
    pub fn advance(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if matches!(
            next,
            JobStatus::Succeeded | JobStatus::FailedTotal | JobStatus::BuildFailed
        ) || !self.status.can_advance_to(next)
        {
            return Err(TransitionError::IllegalStatus {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn set_document(&mut self, document: Vec<u8>) -> Result<(), TransitionError> {
        self.expect_stage("document", JobStatus::FetchingDocument)?;
        if self.document.is_some() {
            return Err(TransitionError::AlreadySet { field: "document" });
        }
        self.document = Some(document);
        Ok(())
    }

    pub fn set_resources(&mut self, resources: Vec<ResourceTask>) -> Result<(), TransitionError> {
        self.expect_stage("resources", JobStatus::DiscoveringResources)?;
        if self.resources.is_some() {
            return Err(TransitionError::AlreadySet { field: "resources" });
        }
        self.resources = Some(resources);
        Ok(())
    }

    /// Records the outcome of resource `index`. Each task settles once.
    pub fn settle_resource(
        &mut self,
        index: usize,
        result: Result<String, String>,
    ) -> Result<(), TransitionError> {
        self.expect_stage("resource outcome", JobStatus::FetchingResources)?;
        let task = self
            .resources
            .as_mut()
            .and_then(|tasks| tasks.get_mut(index))
            .ok_or(TransitionError::UnknownResource { index })?;
        task.settle(index, result)
    }

    pub fn fail_document(&mut self) -> Result<(), TransitionError> {
        self.finish(JobStatus::FailedTotal)
    }

    pub fn fail_build(&mut self) -> Result<(), TransitionError> {
        self.finish(JobStatus::BuildFailed)
    }

    pub fn succeed(&mut self, archive: Vec<u8>) -> Result<(), TransitionError> {
        self.finish(JobStatus::Succeeded)?;
        self.archive = Some(archive);
        Ok(())
    }

    /// Successful bodies of `kind` in discovery order, each followed by a newline.
    pub fn aggregate(&self, kind: ResourceKind) -> String {
        let mut out = String::new();
        for body in self
            .resources()
            .iter()
            .filter(|task| task.kind == kind)
            .filter_map(ResourceTask::body)
        {
            out.push_str(body);
            out.push('\n');
        }
        out
    }

    pub fn summary(&self) -> MirrorSummary {
        let mut summary = MirrorSummary::default();
        for task in self.resources() {
            let counts = match task.kind {
                ResourceKind::Stylesheet => &mut summary.stylesheets,
                ResourceKind::Script => &mut summary.scripts,
            };
            match task.outcome() {
                ResourceOutcome::Fetched { .. } => counts.fetched += 1,
                ResourceOutcome::Failed { .. } => counts.failed += 1,
                ResourceOutcome::Pending => {}
            }
        }
        summary
    }

    fn finish(&mut self, terminal: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_advance_to(terminal) {
            return Err(TransitionError::IllegalStatus {
                from: self.status,
                to: terminal,
            });
        }
        self.status = terminal;
        Ok(())
    }

    fn expect_stage(
        &self,
        field: &'static str,
        expected: JobStatus,
    ) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError::WrongStage {
                field,
                expected,
                actual: self.status,
            });
        }
        Ok(())
    }
}
