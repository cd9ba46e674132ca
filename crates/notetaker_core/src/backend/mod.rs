//! Remote backend boundary.
//!
//! # Responsibility
//! - Describe the managed backend as one async trait: snapshot fetch, three
//!   fire-and-forget mutations and three change subscriptions.
//! - Define the transport error taxonomy shared by every backend call.
//!
//! # Invariants
//! - Backends never hand out notes with blank ids.
//! - Dropping a subscription receiver releases the subscription.

use crate::model::intent::{CreateNoteInput, DeleteNoteInput, Intent, UpdateNoteInput};
use crate::model::note::{Note, NoteValidationError};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::sync::broadcast;

pub mod memory;
pub mod wire;

pub type TransportResult<T> = Result<T, TransportError>;

/// Live change channel published by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Create, ChangeKind::Update, ChangeKind::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Any failed backend call or subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Backend could not be reached or the call did not complete.
    Unavailable(String),
    /// Backend answered but refused the operation.
    Rejected {
        operation: &'static str,
        message: String,
    },
    /// Payload could not be decoded.
    Decode(String),
    /// Payload decoded but carries an invalid note.
    InvalidNote(NoteValidationError),
    /// Subscription could not be opened.
    Subscription(ChangeKind, String),
}

impl Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "backend unavailable: {message}"),
            Self::Rejected { operation, message } => {
                write!(f, "backend rejected {operation}: {message}")
            }
            Self::Decode(message) => write!(f, "invalid backend payload: {message}"),
            Self::InvalidNote(err) => write!(f, "invalid note in backend payload: {err}"),
            Self::Subscription(kind, message) => {
                write!(f, "{} subscription failed: {message}", kind.as_str())
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidNote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteValidationError> for TransportError {
    fn from(value: NoteValidationError) -> Self {
        Self::InvalidNote(value)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Managed note backend consumed by the sync core.
///
/// Mutations only acknowledge receipt; their effect is observed through the
/// matching change subscription.
#[async_trait]
pub trait NoteBackend: Send + Sync {
    /// Fetches every note currently stored.
    async fn fetch_all(&self) -> TransportResult<Vec<Note>>;
    /// Requests a new note; the backend assigns the id.
    async fn create_note(&self, input: CreateNoteInput) -> TransportResult<()>;
    /// Requests a full text replacement.
    async fn update_note(&self, input: UpdateNoteInput) -> TransportResult<()>;
    /// Requests a deletion.
    async fn delete_note(&self, input: DeleteNoteInput) -> TransportResult<()>;
    /// Opens one live change subscription.
    fn subscribe(&self, kind: ChangeKind) -> TransportResult<broadcast::Receiver<Note>>;

    /// Routes one intent to the matching mutation call.
    async fn execute(&self, intent: Intent) -> TransportResult<()> {
        match intent {
            Intent::Create(input) => self.create_note(input).await,
            Intent::Update(input) => self.update_note(input).await,
            Intent::Delete(input) => self.delete_note(input).await,
        }
    }
}
