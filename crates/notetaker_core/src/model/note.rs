//! Note domain model.
//!
//! # Responsibility
//! - Define the canonical `{id, text}` record exchanged with the backend.
//! - Validate identity before a note may enter the local collection.
//!
//! # Invariants
//! - `id` is assigned by the backend, opaque, and immutable once assigned.
//! - A note with a blank `id` is never accepted into local state.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque backend-assigned note identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NoteId = String;

/// Validation error for inbound note payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteValidationError {
    /// `id` is empty or whitespace only.
    BlankId,
}

impl Display for NoteValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "note id must not be blank"),
        }
    }
}

impl Error for NoteValidationError {}

/// One note as seen by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Stable backend id.
    pub id: NoteId,
    /// Plain text content. Older payloads name this field `note`.
    #[serde(alias = "note")]
    pub text: String,
}

impl Note {
    pub fn new(id: impl Into<NoteId>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Checks identity invariants required by the local collection.
    pub fn validate(&self) -> Result<(), NoteValidationError> {
        if self.id.trim().is_empty() {
            return Err(NoteValidationError::BlankId);
        }
        Ok(())
    }
}
