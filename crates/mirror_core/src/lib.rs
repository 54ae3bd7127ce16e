//! Mirror core: job data model and the pure session state machine.
mod effect;
mod job;
mod msg;
mod source;
mod state;
mod update;
mod view_model;

pub use effect::{Effect, Notification};
pub use job::{
    JobId, JobStatus, KindCounts, MirrorJob, MirrorSummary, ResourceKind, ResourceOutcome,
    ResourceTask, TransitionError,
};
pub use msg::{JobResultKind, Msg};
pub use source::{is_page_relative, parse_source_url, SearchResult, SourceUrlError};
pub use state::AppState;
pub use update::update;
pub use view_model::{AppViewModel, JobRowView};
