//! Reconciliation state machine.
//!
//! # Responsibility
//! - Apply snapshot and remote events to the owned `NoteCollection`.
//! - Route composer submits to create or update intents.
//! - Surface pending and failed intents without changing transitions.
//!
//! # Invariants
//! - One mutation at a time; callers serialize access (`&mut self`).
//! - A create event never overwrites a stored note: a create carries the
//!   first version of a note, so anything already stored under its id is at
//!   least as new. Create and update for one id therefore converge to the
//!   update's text in either arrival order.
//! - `on_remote_update` clears the composer for any update event, matching
//!   the historical client behavior. Whether it should only clear for the
//!   locally pending id is unresolved.
//! - A submitted update keeps the composer populated until an update event
//!   is observed.

use crate::engine::sink::{IntentFailure, IntentSink};
use crate::model::composer::ComposerState;
use crate::model::intent::Intent;
use crate::model::note::{Note, NoteId, NoteValidationError};
use crate::store::collection::{NoteCollection, UpsertOutcome};
use log::{debug, info, warn};
use serde::Serialize;

/// Diagnostics about intents that have not been confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IntentStatus {
    /// Id of a submitted update still waiting for its update event.
    pub pending_update: Option<NoteId>,
    /// Most recent intent failure reported by the sink or dispatcher.
    pub last_failure: Option<IntentFailure>,
}

/// Owned read-only copy of engine state for rendering layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineView {
    pub notes: Vec<Note>,
    pub composer: ComposerState,
    pub status: IntentStatus,
}

/// Single-writer store for notes and composer state.
pub struct ReconciliationEngine<S: IntentSink> {
    notes: NoteCollection,
    composer: ComposerState,
    status: IntentStatus,
    sink: S,
}

impl<S: IntentSink> ReconciliationEngine<S> {
    pub fn new(sink: S) -> Self {
        Self {
            notes: NoteCollection::new(),
            composer: ComposerState::default(),
            status: IntentStatus::default(),
            sink,
        }
    }

    pub fn notes(&self) -> &NoteCollection {
        &self.notes
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn status(&self) -> &IntentStatus {
        &self.status
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn view(&self) -> EngineView {
        EngineView {
            notes: self.notes.as_slice().to_vec(),
            composer: self.composer.clone(),
            status: self.status.clone(),
        }
    }

    /// Replaces the collection with an authoritative snapshot.
    ///
    /// # Errors
    /// - Returns a validation error and leaves state untouched when any note
    ///   carries a blank id.
    pub fn on_snapshot(&mut self, notes: Vec<Note>) -> Result<(), NoteValidationError> {
        for note in &notes {
            note.validate()?;
        }
        let received = notes.len();
        self.notes.replace_all(notes);
        info!(
            "event=snapshot_applied module=engine status=ok received={} notes={}",
            received,
            self.notes.len()
        );
        Ok(())
    }

    /// Applies a remote create event.
    ///
    /// Appends unknown ids; a note already stored under the id is kept.
    pub fn on_remote_create(&mut self, note: Note) -> Result<UpsertOutcome, NoteValidationError> {
        self.apply_remote("create", note, NoteCollection::insert_if_absent)
    }

    /// Applies a remote update event (replace in place or append) and clears
    /// the composer.
    pub fn on_remote_update(&mut self, note: Note) -> Result<UpsertOutcome, NoteValidationError> {
        let outcome = self.apply_remote("update", note, NoteCollection::upsert)?;
        // Clears on every update, not only the locally pending one.
        self.composer.clear();
        self.status.pending_update = None;
        Ok(outcome)
    }

    /// Applies a remote delete event. Unknown ids are ignored.
    pub fn on_remote_delete(&mut self, note: &Note) -> Option<Note> {
        let removed = self.notes.remove(&note.id);
        debug!(
            "event=remote_delete module=engine note_id={} removed={} notes={}",
            note.id,
            removed.is_some(),
            self.notes.len()
        );
        removed
    }

    /// Sets the draft text; the edit target is kept.
    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.composer.draft_text = text.into();
    }

    /// Starts editing an existing note.
    pub fn select_for_edit(&mut self, id: impl Into<NoteId>, text: impl Into<String>) {
        let id = id.into();
        debug!(
            "event=select_for_edit module=engine note_id={} target_known={}",
            id,
            self.notes.contains(&id)
        );
        self.composer.target_id = Some(id);
        self.composer.draft_text = text.into();
    }

    /// Emits an update intent when editing, otherwise a create intent.
    ///
    /// A create clears the draft immediately. An update leaves the composer
    /// untouched until the matching update event arrives.
    pub fn submit_intent(&mut self) -> Intent {
        let intent = match self.composer.target_id.clone() {
            Some(id) => {
                self.status.pending_update = Some(id.clone());
                Intent::update(id, self.composer.draft_text.clone())
            }
            None => Intent::create(std::mem::take(&mut self.composer.draft_text)),
        };
        self.dispatch(intent.clone());
        intent
    }

    /// Emits a delete intent. The note stays until its delete event arrives.
    pub fn delete_intent(&mut self, id: impl Into<NoteId>) -> Intent {
        let intent = Intent::delete(id);
        self.dispatch(intent.clone());
        intent
    }

    /// Records an asynchronous intent failure.
    ///
    /// Composer and collection are left as they are; a failed update stops
    /// being reported as pending.
    pub fn on_intent_failed(&mut self, failure: IntentFailure) {
        warn!(
            "event=intent_failed module=engine kind={} note_id={} error={}",
            failure.kind.as_str(),
            failure.note_id.as_deref().unwrap_or("-"),
            failure.message
        );
        if failure.note_id.is_some() && self.status.pending_update == failure.note_id {
            self.status.pending_update = None;
        }
        self.status.last_failure = Some(failure);
    }

    fn apply_remote(
        &mut self,
        channel: &'static str,
        note: Note,
        apply: fn(&mut NoteCollection, Note) -> UpsertOutcome,
    ) -> Result<UpsertOutcome, NoteValidationError> {
        if let Err(err) = note.validate() {
            warn!(
                "event=remote_event_rejected module=engine channel={} error={}",
                channel, err
            );
            return Err(err);
        }
        let note_id = note.id.clone();
        let outcome = apply(&mut self.notes, note);
        debug!(
            "event=remote_apply module=engine channel={} note_id={} outcome={:?} notes={}",
            channel,
            note_id,
            outcome,
            self.notes.len()
        );
        Ok(outcome)
    }

    fn dispatch(&mut self, intent: Intent) {
        let sent = intent.clone();
        match self.sink.emit(intent) {
            Ok(()) => {
                self.status.last_failure = None;
                info!(
                    "event=intent_emitted module=engine kind={} note_id={} text_len={}",
                    sent.kind().as_str(),
                    sent.note_id().unwrap_or("-"),
                    text_len(&sent)
                );
            }
            Err(err) => self.on_intent_failed(IntentFailure::new(&sent, &err)),
        }
    }
}

fn text_len(intent: &Intent) -> usize {
    match intent {
        Intent::Create(input) => input.text.chars().count(),
        Intent::Update(input) => input.text.chars().count(),
        Intent::Delete(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::ReconciliationEngine;
    use crate::backend::{TransportError, TransportResult};
    use crate::engine::sink::{IntentSink, RecordingIntentSink};
    use crate::model::intent::{Intent, IntentKind};
    use crate::model::note::Note;

    struct ClosedSink;

    impl IntentSink for ClosedSink {
        fn emit(&mut self, _intent: Intent) -> TransportResult<()> {
            Err(TransportError::Unavailable("dispatcher stopped".to_string()))
        }
    }

    #[test]
    fn remote_event_with_blank_id_is_rejected_without_mutation() {
        let mut engine = ReconciliationEngine::new(RecordingIntentSink::new());
        assert!(engine.on_remote_create(Note::new("", "x")).is_err());
        assert!(engine.on_remote_update(Note::new(" ", "x")).is_err());
        assert!(engine.notes().is_empty());
    }

    #[test]
    fn invalid_snapshot_leaves_previous_collection() {
        let mut engine = ReconciliationEngine::new(RecordingIntentSink::new());
        engine.on_snapshot(vec![Note::new("a", "x")]).unwrap();

        let result = engine.on_snapshot(vec![Note::new("b", "y"), Note::new("", "z")]);
        assert!(result.is_err());
        assert_eq!(engine.notes().ids(), vec!["a"]);
    }

    #[test]
    fn sink_failure_is_surfaced_without_changing_transitions() {
        let mut engine = ReconciliationEngine::new(ClosedSink);
        engine.set_draft_text("new note");

        let intent = engine.submit_intent();
        assert_eq!(intent, Intent::create("new note"));
        assert_eq!(engine.composer().draft_text, "");

        let failure = engine
            .status()
            .last_failure
            .clone()
            .expect("failure should be recorded");
        assert_eq!(failure.kind, IntentKind::Create);
        assert!(failure.message.contains("dispatcher stopped"));
    }

    #[test]
    fn failed_update_clears_pending_but_keeps_composer() {
        let mut engine = ReconciliationEngine::new(ClosedSink);
        engine.select_for_edit("a", "edited");
        engine.submit_intent();

        assert!(engine.status().pending_update.is_none());
        assert_eq!(engine.composer().target_id.as_deref(), Some("a"));
        assert_eq!(engine.composer().draft_text, "edited");
    }
}
