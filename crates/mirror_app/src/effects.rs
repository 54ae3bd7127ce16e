use std::time::Duration;

use mirror_core::{Effect, JobId, JobResultKind, Msg, Notification};
use mirror_engine::{
    ArchiveWriter, EngineError, EngineEvent, EngineHandle, MirrorArtifact, MirrorFailure,
};
use mirror_logging::{mirror_error, mirror_info, mirror_warn};

/// Executes effects against the engine and turns engine events back into
/// messages for the session state.
pub struct EffectRunner {
    engine: EngineHandle,
    writer: ArchiveWriter,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, writer: ArchiveWriter) -> Self {
        Self { engine, writer }
    }

    pub fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartMirror { job_id, url } => {
                    mirror_info!("StartMirror job_id={} url={}", job_id, url);
                    self.engine.mirror(job_id, url);
                }
                Effect::CancelMirror { job_id } => {
                    mirror_info!("CancelMirror job_id={}", job_id);
                    self.engine.cancel(job_id);
                }
                Effect::Notify(notification) => notify(&notification),
            }
        }
    }

    /// Waits up to `timeout` for the next engine event. Fails once the
    /// engine is gone, since no pending job can settle after that.
    pub fn poll(&self, timeout: Duration) -> Result<Option<Msg>, EngineError> {
        let Some(event) = self.engine.recv_timeout(timeout)? else {
            return Ok(None);
        };
        Ok(Some(match event {
            EngineEvent::StatusChanged { job_id, status } => {
                Msg::JobStatusChanged { job_id, status }
            }
            EngineEvent::ResourceSettled {
                job_id,
                kind,
                error,
                ..
            } => Msg::ResourceSettled {
                job_id,
                kind,
                fetched: error.is_none(),
            },
            EngineEvent::JobCompleted { job_id, result } => Msg::JobDone {
                job_id,
                result: self.finish(job_id, result),
            },
        }))
    }

    fn finish(
        &self,
        job_id: JobId,
        result: Result<MirrorArtifact, MirrorFailure>,
    ) -> JobResultKind {
        match result {
            Ok(artifact) => match self.writer.save(&artifact.file_name, &artifact.bytes) {
                Ok(path) => {
                    mirror_info!("Job {} saved {:?}", job_id, path);
                    JobResultKind::Succeeded {
                        file_name: artifact.file_name,
                        summary: artifact.summary,
                    }
                }
                Err(err) => {
                    mirror_error!("Job {} could not save {}: {}", job_id, artifact.file_name, err);
                    JobResultKind::BuildFailed {
                        reason: err.to_string(),
                    }
                }
            },
            Err(MirrorFailure::DocumentFetch(err)) => JobResultKind::DocumentFetchFailed {
                reason: err.to_string(),
            },
            Err(MirrorFailure::Cancelled) => JobResultKind::Cancelled,
            Err(failure @ (MirrorFailure::ArchiveBuild(_) | MirrorFailure::State(_))) => {
                JobResultKind::BuildFailed {
                    reason: failure.to_string(),
                }
            }
        }
    }

    pub fn output_dir(&self) -> &std::path::Path {
        self.writer.dir()
    }
}

fn notify(notification: &Notification) {
    match notification {
        Notification::Succeeded {
            job_id,
            file_name,
            summary,
        } => {
            if summary.failed() > 0 {
                mirror_warn!(
                    "Job {}: {} of {} resources could not be fetched",
                    job_id,
                    summary.failed(),
                    summary.failed() + summary.fetched()
                );
            }
            println!("[{job_id}] saved {file_name}");
        }
        Notification::Failed { job_id, reason } => println!("[{job_id}] failed: {reason}"),
        Notification::Rejected { input, reason } => println!("skipped {input:?}: {reason}"),
    }
}
