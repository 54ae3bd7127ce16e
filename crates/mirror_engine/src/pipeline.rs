//! One mirroring job, end to end.
//!
//! The pipeline is strictly sequential (document, discovery, resources,
//! archive) except for the resource stage, which fetches every discovered
//! resource at once. Only the document fetch and the archive build can fail
//! the job; everything else degrades into a smaller archive.

use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use mirror_core::{JobId, JobStatus, MirrorJob, ResourceKind, ResourceTask};
use mirror_logging::{mirror_debug, mirror_info, mirror_warn};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::archive::build_archive;
use crate::decode::decode_text;
use crate::discover::ResourceDiscoverer;
use crate::fetch::{Fetcher, ProgressSink};
use crate::filename::ArchiveNamer;
use crate::{EngineEvent, FetchError, MirrorArtifact, MirrorFailure};

pub struct MirrorPipeline {
    fetcher: Arc<dyn Fetcher>,
    discoverer: ResourceDiscoverer,
    namer: ArchiveNamer,
}

impl MirrorPipeline {
    pub fn new(fetcher: Arc<dyn Fetcher>, namer: ArchiveNamer) -> Self {
        Self {
            fetcher,
            discoverer: ResourceDiscoverer::new(),
            namer,
        }
    }

    pub fn with_discoverer(mut self, discoverer: ResourceDiscoverer) -> Self {
        self.discoverer = discoverer;
        self
    }

    /// Runs a job to a terminal state, reporting each transition to `sink`.
    ///
    /// The final `JobCompleted` event is left to the caller, which owns the
    /// returned artifact.
    pub async fn run(
        &self,
        job_id: JobId,
        source_url: Url,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<MirrorArtifact, MirrorFailure> {
        mirror_info!("Job {} mirroring {}", job_id, source_url);
        let job = MirrorJob::new(job_id, source_url);
        let result = self.drive(job, sink, cancel).await;
        match &result {
            Ok(artifact) => mirror_info!(
                "Job {} packaged {} ({} resources fetched, {} failed)",
                job_id,
                artifact.file_name,
                artifact.summary.fetched(),
                artifact.summary.failed()
            ),
            Err(failure) => mirror_warn!("Job {} ended without archive: {}", job_id, failure),
        }
        result
    }

    async fn drive(
        &self,
        mut job: MirrorJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<MirrorArtifact, MirrorFailure> {
        advance(&mut job, JobStatus::FetchingDocument, sink)?;
        let source = job.source_url().clone();
        let fetched = match until_cancelled(cancel, self.fetcher.fetch(source.as_str())).await {
            None => return cancel_job(&mut job, sink),
            Some(Ok(output)) => output,
            Some(Err(err)) => {
                job.fail_document()?;
                report(&job, sink);
                return Err(MirrorFailure::DocumentFetch(err));
            }
        };
        mirror_debug!(
            "Job {}: fetched {} -> {} ({} bytes)",
            job.id(),
            fetched.metadata.original_url,
            fetched.metadata.final_url,
            fetched.metadata.byte_len
        );
        job.set_document(fetched.bytes.to_vec())?;

        advance(&mut job, JobStatus::DiscoveringResources, sink)?;
        // Relative references resolve against where the page actually came from.
        let page_url = Url::parse(&fetched.metadata.final_url).unwrap_or(source);
        let decoded = decode_text(&fetched.bytes, fetched.metadata.content_type.as_deref());
        if decoded.had_errors {
            mirror_warn!(
                "Job {}: document is not valid {}, invalid bytes replaced",
                job.id(),
                decoded.encoding_label
            );
        }
        let discovered = self.discoverer.discover(&decoded.text, &page_url);
        job.set_resources(
            discovered
                .into_iter()
                .map(|resource| ResourceTask::new(resource.url, resource.kind))
                .collect(),
        )?;

        advance(&mut job, JobStatus::FetchingResources, sink)?;
        let settled = self.fetch_resources(&mut job, sink, cancel).await?;
        if !settled || cancel.is_cancelled() {
            return cancel_job(&mut job, sink);
        }

        advance(&mut job, JobStatus::Building, sink)?;
        let document = job.document().map(<[u8]>::to_vec).unwrap_or_default();
        let styles = job.aggregate(ResourceKind::Stylesheet);
        let scripts = job.aggregate(ResourceKind::Script);
        let built = tokio::task::spawn_blocking(move || build_archive(&document, &styles, &scripts))
            .await
            .map_err(|err| err.to_string())
            .and_then(|result| result.map_err(|err| err.to_string()));

        let bytes = match built {
            Ok(bytes) => bytes,
            Err(reason) => {
                job.fail_build()?;
                report(&job, sink);
                return Err(MirrorFailure::ArchiveBuild(reason));
            }
        };

        let summary = job.summary();
        job.succeed(bytes)?;
        report(&job, sink);
        Ok(MirrorArtifact {
            file_name: self.namer.next_name(),
            bytes: job.into_archive().unwrap_or_default(),
            summary,
        })
    }

    /// Fetches every task concurrently and settles each as it completes.
    ///
    /// Returns `false` when cancelled; in-flight fetches are dropped.
    async fn fetch_resources(
        &self,
        job: &mut MirrorJob,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<bool, MirrorFailure> {
        let fetcher = self.fetcher.as_ref();
        let mut in_flight = job
            .resources()
            .iter()
            .enumerate()
            .map(|(index, task)| {
                let url = task.url.clone();
                async move {
                    let result = fetch_resource(fetcher, &url).await;
                    (index, result)
                }
            })
            .collect::<FuturesUnordered<_>>();

        mirror_debug!("Job {}: fetching {} resources", job.id(), in_flight.len());

        loop {
            let Some(next) = until_cancelled(cancel, in_flight.next()).await else {
                return Ok(false);
            };
            let Some((index, result)) = next else {
                return Ok(true);
            };

            let Some(task) = job.resources().get(index) else {
                continue;
            };
            if let Err(err) = &result {
                mirror_warn!("Job {}: {} {} failed: {}", job.id(), task.kind, task.url, err);
            }
            sink.emit(EngineEvent::ResourceSettled {
                job_id: job.id(),
                index,
                url: task.url.clone(),
                kind: task.kind,
                error: result.as_ref().err().cloned(),
            });
            job.settle_resource(index, result.map_err(|err| err.to_string()))?;
        }
    }
}

async fn fetch_resource(fetcher: &dyn Fetcher, url: &Url) -> Result<String, FetchError> {
    let output = fetcher.fetch(url.as_str()).await?;
    let decoded = decode_text(&output.bytes, output.metadata.content_type.as_deref());
    if decoded.had_errors {
        mirror_warn!(
            "{} is not valid {}, invalid bytes replaced",
            url,
            decoded.encoding_label
        );
    } else {
        mirror_debug!(
            "{} fetched ({} bytes, {})",
            output.metadata.final_url,
            output.metadata.byte_len,
            decoded.encoding_label
        );
    }
    Ok(decoded.text)
}

/// Resolves to `None` if `cancel` fires first.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        output = fut => Some(output),
    }
}

fn advance(
    job: &mut MirrorJob,
    status: JobStatus,
    sink: &dyn ProgressSink,
) -> Result<(), MirrorFailure> {
    job.advance(status)?;
    report(job, sink);
    Ok(())
}

fn report(job: &MirrorJob, sink: &dyn ProgressSink) {
    mirror_debug!("Job {} -> {}", job.id(), job.status());
    sink.emit(EngineEvent::StatusChanged {
        job_id: job.id(),
        status: job.status(),
    });
}

fn cancel_job<T>(job: &mut MirrorJob, sink: &dyn ProgressSink) -> Result<T, MirrorFailure> {
    advance(job, JobStatus::Cancelled, sink)?;
    Err(MirrorFailure::Cancelled)
}
