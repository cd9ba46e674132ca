//! Local composer (draft editing) state.
//!
//! # Invariants
//! - `target_id == None` means "compose a new note".
//! - `target_id` is a non-owning reference; the note may already be gone.

use crate::model::note::NoteId;
use serde::Serialize;

/// Text box state the user is currently editing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComposerState {
    pub draft_text: String,
    pub target_id: Option<NoteId>,
}

impl ComposerState {
    /// Returns whether submit would route to an update intent.
    pub fn is_editing(&self) -> bool {
        self.target_id.is_some()
    }

    /// Resets to the empty "compose new" state.
    pub fn clear(&mut self) {
        self.draft_text.clear();
        self.target_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::ComposerState;

    #[test]
    fn clear_resets_draft_and_target() {
        let mut composer = ComposerState {
            draft_text: "draft".to_string(),
            target_id: Some("1".to_string()),
        };
        assert!(composer.is_editing());

        composer.clear();
        assert_eq!(composer, ComposerState::default());
        assert!(!composer.is_editing());
    }
}
