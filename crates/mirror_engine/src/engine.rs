use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use mirror_core::JobId;
use mirror_logging::{mirror_debug, mirror_error};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::discover::ResourceDiscoverer;
use crate::fetch::{ChannelProgressSink, FetchSettings, Fetcher, ReqwestFetcher};
use crate::filename::{system_clock, ArchiveNamer, Clock};
use crate::pipeline::MirrorPipeline;
use crate::{EngineEvent, FetchError};

#[derive(Clone)]
pub struct EngineConfig {
    pub fetch: FetchSettings,
    pub clock: Clock,
    pub max_resources: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchSettings::default(),
            clock: system_clock(),
            max_resources: 5_000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to build http client: {0}")]
    Client(#[from] FetchError),
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("engine thread stopped")]
    Disconnected,
}

enum EngineCommand {
    Mirror { job_id: JobId, url: Url },
    Cancel { job_id: JobId },
}

type CancelRegistry = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Runs mirroring jobs on a background tokio runtime.
///
/// Dropping the handle stops the engine thread; jobs still in flight are
/// abandoned with the runtime.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(config.fetch.clone())?);
        Self::with_fetcher(config, fetcher)
    }

    pub fn with_fetcher(
        config: EngineConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let pipeline = Arc::new(
            MirrorPipeline::new(fetcher, ArchiveNamer::new(config.clock))
                .with_discoverer(ResourceDiscoverer::with_max_resources(config.max_resources)),
        );

        thread::spawn(move || {
            let tokens: CancelRegistry = Arc::new(Mutex::new(HashMap::new()));
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Mirror { job_id, url } => {
                        let token = CancellationToken::new();
                        if let Ok(mut map) = tokens.lock() {
                            map.insert(job_id, token.clone());
                        }
                        let pipeline = pipeline.clone();
                        let tokens = tokens.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            run_job(&pipeline, job_id, url, token, event_tx).await;
                            if let Ok(mut map) = tokens.lock() {
                                map.remove(&job_id);
                            }
                        });
                    }
                    EngineCommand::Cancel { job_id } => {
                        let token = tokens.lock().ok().and_then(|map| map.get(&job_id).cloned());
                        match token {
                            Some(token) => token.cancel(),
                            None => mirror_debug!("Cancel for unknown or finished job {}", job_id),
                        }
                    }
                }
            }
            mirror_debug!("Engine command channel closed, shutting down");
        });

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn mirror(&self, job_id: JobId, url: Url) {
        if self.cmd_tx.send(EngineCommand::Mirror { job_id, url }).is_err() {
            mirror_error!("Engine thread is gone, dropping job {}", job_id);
        }
    }

    pub fn cancel(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { job_id });
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time; `Disconnected` means no event will ever arrive.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineError> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineError::Disconnected),
        }
    }
}

async fn run_job(
    pipeline: &MirrorPipeline,
    job_id: JobId,
    url: Url,
    cancel: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let result = pipeline.run(job_id, url, &sink, &cancel).await;
    let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
}
