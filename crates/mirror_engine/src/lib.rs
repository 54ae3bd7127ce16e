//! Mirror engine: fetching, discovery, archive building and job execution.
mod archive;
mod decode;
mod discover;
mod engine;
mod fetch;
mod filename;
mod persist;
mod pipeline;
mod types;

pub use archive::{
    build_archive, ArchiveBuildError, ARCHIVE_ENTRIES, DOCUMENT_ENTRY, SCRIPTS_ENTRY,
    STYLES_ENTRY,
};
pub use decode::{decode_text, DecodedText};
pub use discover::{DiscoveredResource, ResourceDiscoverer};
pub use engine::{EngineConfig, EngineError, EngineHandle};
pub use fetch::{ChannelProgressSink, FetchSettings, Fetcher, ProgressSink, ReqwestFetcher};
pub use filename::{archive_file_name, system_clock, ArchiveNamer, Clock};
pub use persist::{ensure_output_dir, ArchiveWriter, PersistError};
pub use pipeline::MirrorPipeline;
pub use types::{
    EngineEvent, FailureKind, FetchError, FetchMetadata, FetchOutput, MirrorArtifact,
    MirrorFailure,
};
