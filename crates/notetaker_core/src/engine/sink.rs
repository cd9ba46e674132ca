//! Outbound intent sinks.

use crate::backend::{TransportError, TransportResult};
use crate::model::intent::{Intent, IntentKind};
use crate::model::note::NoteId;
use serde::Serialize;

/// Receives intents emitted by the engine.
///
/// Implementations must not block; delivery is fire-and-forget.
pub trait IntentSink {
    fn emit(&mut self, intent: Intent) -> TransportResult<()>;
}

/// Sink that keeps every emitted intent in memory.
#[derive(Debug, Default)]
pub struct RecordingIntentSink {
    intents: Vec<Intent>,
}

impl RecordingIntentSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }
}

impl IntentSink for RecordingIntentSink {
    fn emit(&mut self, intent: Intent) -> TransportResult<()> {
        self.intents.push(intent);
        Ok(())
    }
}

/// Failed intent report surfaced to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntentFailure {
    pub kind: IntentKind,
    pub note_id: Option<NoteId>,
    pub message: String,
}

impl IntentFailure {
    pub fn new(intent: &Intent, error: &TransportError) -> Self {
        Self {
            kind: intent.kind(),
            note_id: intent.note_id().map(str::to_string),
            message: error.to_string(),
        }
    }
}
