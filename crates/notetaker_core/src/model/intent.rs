//! Outbound mutation intents.
//!
//! An intent expresses a desired change that the backend has not confirmed
//! yet. Confirmation arrives later as a remote event.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};

/// Input for a create intent. The backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateNoteInput {
    #[serde(alias = "note")]
    pub text: String,
}

/// Input for an update intent (full text replacement).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNoteInput {
    pub id: NoteId,
    #[serde(alias = "note")]
    pub text: String,
}

/// Input for a delete intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteNoteInput {
    pub id: NoteId,
}

/// Intent category, used in logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Create,
    Update,
    Delete,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// One outbound mutation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "input", rename_all = "snake_case")]
pub enum Intent {
    Create(CreateNoteInput),
    Update(UpdateNoteInput),
    Delete(DeleteNoteInput),
}

impl Intent {
    pub fn create(text: impl Into<String>) -> Self {
        Self::Create(CreateNoteInput { text: text.into() })
    }

    pub fn update(id: impl Into<NoteId>, text: impl Into<String>) -> Self {
        Self::Update(UpdateNoteInput {
            id: id.into(),
            text: text.into(),
        })
    }

    pub fn delete(id: impl Into<NoteId>) -> Self {
        Self::Delete(DeleteNoteInput { id: id.into() })
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Self::Create(_) => IntentKind::Create,
            Self::Update(_) => IntentKind::Update,
            Self::Delete(_) => IntentKind::Delete,
        }
    }

    /// Returns the targeted note id; `None` for creates.
    pub fn note_id(&self) -> Option<&str> {
        match self {
            Self::Create(_) => None,
            Self::Update(input) => Some(input.id.as_str()),
            Self::Delete(input) => Some(input.id.as_str()),
        }
    }
}
