//! Client-side sync core for the notetaker app.
//! This crate owns the local note collection and keeps it consistent with
//! the remote backend's snapshot and change streams.

pub mod backend;
pub mod config;
pub mod engine;
pub mod logging;
pub mod model;
pub mod session;
pub mod snapshot;
pub mod store;

pub use backend::memory::InMemoryBackend;
pub use backend::{ChangeKind, NoteBackend, TransportError, TransportResult};
pub use config::{ConfigRejection, CoreConfig};
pub use engine::reconciler::{EngineView, IntentStatus, ReconciliationEngine};
pub use engine::sink::{IntentFailure, IntentSink, RecordingIntentSink};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::composer::ComposerState;
pub use model::intent::{CreateNoteInput, DeleteNoteInput, Intent, IntentKind, UpdateNoteInput};
pub use model::note::{Note, NoteId, NoteValidationError};
pub use session::{
    SessionError, SessionHandle, SessionResult, SnapshotStatus, SyncSession, UserCommand,
};
pub use snapshot::SnapshotLoader;
pub use store::collection::{NoteCollection, UpsertOutcome};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
