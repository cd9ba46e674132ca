//! Ordered note collection keyed by id.
//!
//! # Invariants
//! - At most one `Note` per `id`.
//! - Replacing an existing id keeps its position; new ids are appended.
//! - `insert_if_absent` never overwrites an existing entry.
//! - Order reflects arrival, not creation time.

use crate::model::note::{Note, NoteId};

/// Outcome of an upsert, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Id already present; the stored note was kept.
    Kept,
}

/// Ordered sequence of notes with insert-or-replace-by-id semantics.
///
/// Lookups are linear scans; collections are expected to stay small.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteCollection {
    notes: Vec<Note>,
}

impl NoteCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection.
    ///
    /// Duplicate ids in `notes` collapse onto the first position with the
    /// last text, so the one-note-per-id invariant survives bad snapshots.
    pub fn replace_all(&mut self, notes: Vec<Note>) {
        self.notes.clear();
        for note in notes {
            self.upsert(note);
        }
    }

    /// Replaces the note with the same id in place, or appends it.
    pub fn upsert(&mut self, note: Note) -> UpsertOutcome {
        match self.position(&note.id) {
            Some(index) => {
                self.notes[index] = note;
                UpsertOutcome::Replaced
            }
            None => {
                self.notes.push(note);
                UpsertOutcome::Inserted
            }
        }
    }

    /// Appends `note` unless its id is already present.
    pub fn insert_if_absent(&mut self, note: Note) -> UpsertOutcome {
        if self.contains(&note.id) {
            return UpsertOutcome::Kept;
        }
        self.notes.push(note);
        UpsertOutcome::Inserted
    }

    /// Removes the note with `id`, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Note> {
        self.position(id).map(|index| self.notes.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.iter()
    }

    pub fn as_slice(&self) -> &[Note] {
        &self.notes
    }

    /// Returns ids in collection order.
    pub fn ids(&self) -> Vec<NoteId> {
        self.notes.iter().map(|note| note.id.clone()).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{NoteCollection, UpsertOutcome};
    use crate::model::note::Note;

    #[test]
    fn upsert_replaces_in_place_and_appends_new_ids() {
        let mut collection = NoteCollection::new();
        collection.replace_all(vec![Note::new("a", "1"), Note::new("b", "2")]);

        assert_eq!(collection.upsert(Note::new("a", "1b")), UpsertOutcome::Replaced);
        assert_eq!(collection.upsert(Note::new("c", "3")), UpsertOutcome::Inserted);

        assert_eq!(collection.ids(), vec!["a", "b", "c"]);
        assert_eq!(collection.get("a").map(|n| n.text.as_str()), Some("1b"));
    }

    #[test]
    fn insert_if_absent_keeps_existing_text() {
        let mut collection = NoteCollection::new();
        assert_eq!(
            collection.insert_if_absent(Note::new("a", "newer")),
            UpsertOutcome::Inserted
        );
        assert_eq!(
            collection.insert_if_absent(Note::new("a", "older")),
            UpsertOutcome::Kept
        );
        assert_eq!(collection.get("a").map(|n| n.text.as_str()), Some("newer"));
    }

    #[test]
    fn replace_all_collapses_duplicate_ids() {
        let mut collection = NoteCollection::new();
        collection.replace_all(vec![
            Note::new("a", "first"),
            Note::new("b", "other"),
            Note::new("a", "last"),
        ]);

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.ids(), vec!["a", "b"]);
        assert_eq!(collection.get("a").map(|n| n.text.as_str()), Some("last"));
    }

    #[test]
    fn remove_missing_id_is_noop() {
        let mut collection = NoteCollection::new();
        collection.upsert(Note::new("a", "x"));

        assert!(collection.remove("missing").is_none());
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.remove("a"), Some(Note::new("a", "x")));
        assert!(collection.is_empty());
    }
}
